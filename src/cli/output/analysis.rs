use std::collections::HashMap;

use crate::{
    storage::entities::{ActivityEntity, SessionEntity},
    utils::hours::Hours,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityUsage {
    pub activity_id: String,
    pub name: String,
    pub total: Hours,
}

/// Returns lifetime totals of the selected activities, largest first.
///
/// Totals are not limited to the dashboard window. Activities without any finished time and ids
/// that no longer match an activity are left out. Ties keep the order of `selection`.
pub fn analyze_activities(
    sessions: &[SessionEntity],
    activities: &[ActivityEntity],
    selection: &[String],
) -> Vec<ActivityUsage> {
    let mut totals = HashMap::<&str, Hours>::new();
    for session in sessions {
        if let Some(duration) = session.duration() {
            *totals.entry(session.activity_id.as_str()).or_default() +=
                Hours::from_duration(duration);
        }
    }

    let mut usages = selection
        .iter()
        .filter_map(|id| activities.iter().find(|a| a.id == *id))
        .filter_map(|activity| {
            let total = totals.get(activity.id.as_str()).copied()?;
            (*total > 0.).then(|| ActivityUsage {
                activity_id: activity.id.clone(),
                name: activity.name.to_string(),
                total,
            })
        })
        .collect::<Vec<_>>();

    usages.sort_by(|a, b| b.total.total_cmp(&a.total));
    usages
}

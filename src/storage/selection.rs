use std::collections::HashSet;

use super::entities::ActivityEntity;

/// Resolves the activities the dashboard should include.
///
/// An empty stored list means the user never narrowed the selection, so every known activity
/// counts as selected. Duplicates are dropped while keeping the first occurrence.
pub fn resolve_selection(stored: &[String], activities: &[ActivityEntity]) -> Vec<String> {
    if stored.is_empty() {
        return activities.iter().map(|a| a.id.clone()).collect();
    }
    let mut seen = HashSet::new();
    stored
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Adds `activity_id` to the selection or removes it when it's already there.
pub fn toggle(selection: &[String], activity_id: &str) -> Vec<String> {
    if selection.iter().any(|id| id == activity_id) {
        selection
            .iter()
            .filter(|id| *id != activity_id)
            .cloned()
            .collect()
    } else {
        let mut next = selection.to_vec();
        next.push(activity_id.to_string());
        next
    }
}

/// Selects everything, or clears the selection when everything is already selected.
///
/// Clearing stores an empty list, which [resolve_selection] reads back as "all activities".
pub fn toggle_all(selection: &[String], activities: &[ActivityEntity]) -> Vec<String> {
    let selected = selection.iter().map(String::as_str).collect::<HashSet<_>>();
    let everything_selected = !activities.is_empty()
        && selected.len() == activities.len()
        && activities.iter().all(|a| selected.contains(a.id.as_str()));
    if everything_selected {
        vec![]
    } else {
        activities.iter().map(|a| a.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::storage::entities::{ActivityEntity, ActivityName};

    use super::{resolve_selection, toggle, toggle_all};

    fn activities(ids: &[&str]) -> Vec<ActivityEntity> {
        ids.iter()
            .map(|id| {
                ActivityEntity::new(
                    *id,
                    ActivityName::new_opt(id).unwrap(),
                    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                    None,
                )
            })
            .collect()
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn empty_stored_selection_means_all() {
        let known = activities(&["a", "b", "c"]);
        assert_eq!(resolve_selection(&[], &known), ids(&["a", "b", "c"]));
    }

    #[test]
    fn explicit_selection_is_kept() {
        let known = activities(&["a", "b", "c"]);
        assert_eq!(resolve_selection(&ids(&["c", "a", "c"]), &known), ids(&["c", "a"]));
    }

    #[test]
    fn no_activities_resolves_to_no_selection() {
        assert!(resolve_selection(&[], &[]).is_empty());
    }

    #[test]
    fn toggle_adds_and_removes() {
        let selection = toggle(&ids(&["a"]), "b");
        assert_eq!(selection, ids(&["a", "b"]));
        assert_eq!(toggle(&selection, "a"), ids(&["b"]));
    }

    #[test]
    fn toggle_all_flips_between_all_and_cleared() {
        let known = activities(&["a", "b"]);
        assert_eq!(toggle_all(&ids(&["a"]), &known), ids(&["a", "b"]));
        assert!(toggle_all(&ids(&["b", "a"]), &known).is_empty());
    }
}

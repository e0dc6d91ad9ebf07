use std::{fmt::Display, ops::Deref, str::FromStr};

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A named category time is tracked against.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntity {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ActivityEntity {
    pub fn new(
        id: impl Into<String>,
        name: ActivityName,
        created_at: DateTime<Utc>,
        color: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.0,
            created_at,
            color,
        }
    }

    /// Merges `patch` into the record. `id` and `created_at` can't be patched.
    pub fn apply(&mut self, patch: ActivityPatch) {
        if let Some(name) = patch.name {
            self.name = name.0;
        }
        if let Some(color) = patch.color {
            self.color = Some(color);
        }
    }
}

/// Fields of an [ActivityEntity] that may change after creation.
#[derive(Debug, Clone, Default)]
pub struct ActivityPatch {
    pub name: Option<ActivityName>,
    pub color: Option<String>,
}

/// A trimmed, non-empty activity name. Parsing is where blank names get rejected, before
/// anything touches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityName(String);

impl ActivityName {
    pub fn new_opt(value: &str) -> Option<ActivityName> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(ActivityName(trimmed.to_string()))
        }
    }
}

impl FromStr for ActivityName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityName::new_opt(s).ok_or_else(|| anyhow!("Activity name can't be empty"))
    }
}

impl Deref for ActivityName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ActivityName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One timed interval of an activity. `end_time` stays empty while the session is running.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntity {
    pub id: String,
    pub activity_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl SessionEntity {
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Length of a finished session. Running sessions have none.
    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Time since start, used for the live counter.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.end_time.unwrap_or(now) - self.start_time
    }
}

/// Snapshot written by `stint export`.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub export_date: DateTime<Utc>,
    pub user_name: Option<String>,
    pub activities: Vec<ActivityEntity>,
    pub sessions: Vec<SessionEntity>,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{ActivityEntity, ActivityName, ActivityPatch, SessionEntity};

    #[test]
    fn activity_name_is_trimmed() {
        assert_eq!(&*ActivityName::new_opt("  Reading ").unwrap(), "Reading");
        assert!(ActivityName::new_opt("   ").is_none());
        assert!("".parse::<ActivityName>().is_err());
    }

    #[test]
    fn session_reads_records_written_by_older_clients() {
        let raw = r#"{"id":"1712300000000","activityId":"1","startTime":"2024-04-05T10:00:00.000Z","endTime":null}"#;
        let session: SessionEntity = serde_json::from_str(raw).unwrap();
        assert!(session.is_active());
        assert_eq!(
            session.start_time,
            Utc.with_ymd_and_hms(2024, 4, 5, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn activity_json_uses_camel_case_and_skips_missing_color() {
        let activity = ActivityEntity::new(
            "1",
            ActivityName::new_opt("Sport").unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 5, 10, 0, 0).unwrap(),
            None,
        );
        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(value["createdAt"], "2024-04-05T10:00:00Z");
        assert!(value.get("color").is_none());
    }

    #[test]
    fn patch_keeps_identity() {
        let created = Utc.with_ymd_and_hms(2024, 4, 5, 10, 0, 0).unwrap();
        let mut activity =
            ActivityEntity::new("1", ActivityName::new_opt("Sport").unwrap(), created, None);
        activity.apply(ActivityPatch {
            name: ActivityName::new_opt("Running"),
            color: Some("#ff0000".into()),
        });
        assert_eq!(activity.id, "1");
        assert_eq!(activity.created_at, created);
        assert_eq!(activity.name, "Running");
        assert_eq!(activity.color.as_deref(), Some("#ff0000"));
    }

    #[test]
    fn duration_only_for_finished_sessions() {
        let start = Utc.with_ymd_and_hms(2024, 4, 5, 10, 0, 0).unwrap();
        let session = SessionEntity {
            id: "1".into(),
            activity_id: "a".into(),
            start_time: start,
            end_time: None,
        };
        assert_eq!(session.duration(), None);
        assert_eq!(
            session.elapsed(start + Duration::seconds(5)),
            Duration::seconds(5)
        );
        let finished = SessionEntity {
            end_time: Some(start + Duration::minutes(30)),
            ..session
        };
        assert_eq!(finished.duration(), Some(Duration::minutes(30)));
    }
}

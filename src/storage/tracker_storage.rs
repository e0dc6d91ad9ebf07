use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::utils::clock::Clock;

use super::{
    entities::{ActivityEntity, ActivityName, ActivityPatch, ExportDocument, SessionEntity},
    key_value::KeyValueStore,
};

/// Keys the tracker persists under. The names are kept compatible with data written by earlier
/// clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKey {
    UserName,
    Activities,
    Sessions,
    HasCompletedOnboarding,
    SelectedActivityIds,
}

impl StorageKey {
    pub const ALL: [StorageKey; 5] = [
        StorageKey::UserName,
        StorageKey::Activities,
        StorageKey::Sessions,
        StorageKey::HasCompletedOnboarding,
        StorageKey::SelectedActivityIds,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::UserName => "@user_name",
            StorageKey::Activities => "@activities",
            StorageKey::Sessions => "@sessions",
            StorageKey::HasCompletedOnboarding => "@has_completed_onboarding",
            StorageKey::SelectedActivityIds => "@selected_activity_ids",
        }
    }
}

/// Accessor over activities, sessions and the scalar settings.
///
/// Every mutation loads the whole collection, changes it in memory and writes the whole
/// collection back. Plain getters never fail: a missing key or a broken value reads as the empty
/// default and the problem is logged. Mutations that the user waits on return errors instead, and
/// they refuse to run on top of a collection that failed to load so a bad read can't be written
/// back as an empty list.
pub struct TrackerStorage<S: KeyValueStore> {
    store: S,
    clock: Box<dyn Clock>,
}

impl<S: KeyValueStore> TrackerStorage<S> {
    pub fn new(store: S, clock: Box<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.time()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    async fn load<T: DeserializeOwned>(&self, key: StorageKey) -> Result<Option<T>> {
        let Some(raw) = self.store.get_item(key.as_str()).await? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("Stored value under {} is not valid", key.as_str()))?;
        Ok(Some(value))
    }

    async fn load_or_default<T: DeserializeOwned + Default>(&self, key: StorageKey) -> T {
        match self.load::<T>(key).await {
            Ok(v) => v.unwrap_or_default(),
            Err(e) => {
                error!("Failed to read {}: {e:?}", key.as_str());
                T::default()
            }
        }
    }

    async fn save<T: Serialize + ?Sized>(&self, key: StorageKey, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set_item(key.as_str(), &raw).await
    }

    pub async fn get_activities(&self) -> Vec<ActivityEntity> {
        self.load_or_default(StorageKey::Activities).await
    }

    pub async fn get_sessions(&self) -> Vec<SessionEntity> {
        self.load_or_default(StorageKey::Sessions).await
    }

    async fn load_activities(&self) -> Result<Vec<ActivityEntity>> {
        Ok(self
            .load(StorageKey::Activities)
            .await?
            .unwrap_or_default())
    }

    async fn load_sessions(&self) -> Result<Vec<SessionEntity>> {
        Ok(self.load(StorageKey::Sessions).await?.unwrap_or_default())
    }

    pub async fn save_activities(&self, activities: &[ActivityEntity]) -> Result<()> {
        self.save(StorageKey::Activities, activities).await
    }

    pub async fn save_sessions(&self, sessions: &[SessionEntity]) -> Result<()> {
        self.save(StorageKey::Sessions, sessions).await
    }

    /// Appends `activity` as is. The id is trusted to be unique.
    pub async fn add_activity(&self, activity: ActivityEntity) -> Result<()> {
        let mut activities = self.load_activities().await?;
        activities.push(activity);
        self.save_activities(&activities).await
    }

    /// Creates an activity stamped with the current time. Ids are creation timestamps in
    /// milliseconds, moved forward when two activities land on the same millisecond.
    #[instrument(skip(self))]
    pub async fn create_activity(
        &self,
        name: ActivityName,
        color: Option<String>,
    ) -> Result<ActivityEntity> {
        let mut activities = self.load_activities().await?;
        let now = self.now();
        let id = next_id(now, activities.iter().map(|a| a.id.as_str()));
        let activity = ActivityEntity::new(id, name, now, color);
        activities.push(activity.clone());
        self.save_activities(&activities).await?;
        info!("Created activity {}", activity.id);
        Ok(activity)
    }

    /// Merges `patch` into the activity with `activity_id`. Unknown ids are ignored.
    #[instrument(skip(self))]
    pub async fn update_activity(&self, activity_id: &str, patch: ActivityPatch) -> Result<()> {
        let mut activities = self.load_activities().await?;
        let Some(activity) = activities.iter_mut().find(|a| a.id == activity_id) else {
            debug!("No activity {activity_id} to update");
            return Ok(());
        };
        activity.apply(patch);
        self.save_activities(&activities).await
    }

    /// Removes the activity together with every session recorded for it.
    #[instrument(skip(self))]
    pub async fn delete_activity(&self, activity_id: &str) -> Result<()> {
        let activities = self.load_activities().await?;
        let sessions = self.load_sessions().await?;

        // Sessions go first: a failure in between leaves an activity without sessions rather
        // than sessions pointing at nothing.
        let sessions = sessions
            .into_iter()
            .filter(|s| s.activity_id != activity_id)
            .collect::<Vec<_>>();
        self.save_sessions(&sessions).await?;

        let activities = activities
            .into_iter()
            .filter(|a| a.id != activity_id)
            .collect::<Vec<_>>();
        self.save_activities(&activities).await?;
        info!("Deleted activity {activity_id}");
        Ok(())
    }

    /// Starts a new running session. Fails if the activity already has one running or if the
    /// write doesn't go through.
    #[instrument(skip(self))]
    pub async fn start_session(&self, activity_id: &str) -> Result<SessionEntity> {
        let mut sessions = self.load_sessions().await?;
        if let Some(active) = sessions
            .iter()
            .find(|s| s.activity_id == activity_id && s.is_active())
        {
            bail!(
                "Activity {activity_id} already has a running session {}",
                active.id
            );
        }

        let now = self.now();
        let session = SessionEntity {
            id: next_id(now, sessions.iter().map(|s| s.id.as_str())),
            activity_id: activity_id.to_string(),
            start_time: now,
            end_time: None,
        };
        sessions.push(session.clone());
        self.save_sessions(&sessions)
            .await
            .inspect_err(|e| error!("Failed to start session: {e:?}"))?;
        info!("Started session {} for {activity_id}", session.id);
        Ok(session)
    }

    /// Stamps the end time on a running session and returns it. Unknown or already finished
    /// sessions are left alone.
    #[instrument(skip(self))]
    pub async fn end_session(&self, session_id: &str) -> Result<Option<SessionEntity>> {
        let mut sessions = self.load_sessions().await?;
        let Some(session) = sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.is_active())
        else {
            debug!("No running session {session_id} to end");
            return Ok(None);
        };
        session.end_time = Some(self.now());
        let ended = session.clone();
        self.save_sessions(&sessions).await?;
        info!("Ended session {session_id}");
        Ok(Some(ended))
    }

    pub async fn get_active_session(&self, activity_id: &str) -> Option<SessionEntity> {
        self.get_sessions()
            .await
            .into_iter()
            .find(|s| s.activity_id == activity_id && s.is_active())
    }

    /// The finished session of `activity_id` that ended last.
    pub async fn last_completed_session(&self, activity_id: &str) -> Option<SessionEntity> {
        self.get_sessions()
            .await
            .into_iter()
            .filter(|s| s.activity_id == activity_id && !s.is_active())
            .max_by_key(|s| s.end_time)
    }

    /// Raw stored selection. An empty list means nothing was chosen yet, see
    /// [resolve_selection](super::selection::resolve_selection).
    pub async fn get_selected_activity_ids(&self) -> Vec<String> {
        self.load_or_default(StorageKey::SelectedActivityIds).await
    }

    pub async fn save_selected_activity_ids(&self, activity_ids: &[String]) {
        if let Err(e) = self.save(StorageKey::SelectedActivityIds, activity_ids).await {
            error!("Error saving selected activity ids: {e:?}");
        }
    }

    pub async fn get_user_name(&self) -> Option<String> {
        match self.store.get_item(StorageKey::UserName.as_str()).await {
            Ok(v) => v,
            Err(e) => {
                error!("Error getting user name: {e:?}");
                None
            }
        }
    }

    pub async fn set_user_name(&self, name: &str) {
        if let Err(e) = self.store.set_item(StorageKey::UserName.as_str(), name).await {
            error!("Error setting user name: {e:?}");
        }
    }

    pub async fn has_completed_onboarding(&self) -> bool {
        match self
            .store
            .get_item(StorageKey::HasCompletedOnboarding.as_str())
            .await
        {
            Ok(v) => v.as_deref() == Some("true"),
            Err(e) => {
                error!("Error getting onboarding status: {e:?}");
                false
            }
        }
    }

    pub async fn set_has_completed_onboarding(&self, completed: bool) {
        let value = if completed { "true" } else { "false" };
        if let Err(e) = self
            .store
            .set_item(StorageKey::HasCompletedOnboarding.as_str(), value)
            .await
        {
            error!("Error setting onboarding status: {e:?}");
        }
    }

    /// Removes every key the tracker knows about. Keys that fail to go away are reported but the
    /// rest are still removed.
    #[instrument(skip(self))]
    pub async fn clear_all_data(&self) -> Result<()> {
        let keys = StorageKey::ALL
            .iter()
            .map(|k| k.as_str().to_string())
            .collect();
        self.store
            .multi_remove(keys)
            .await
            .inspect_err(|e| warn!("Clearing data was incomplete: {e:?}"))
    }

    /// Everything a user owns, ready to be written out as an export.
    pub async fn export_snapshot(&self) -> ExportDocument {
        ExportDocument {
            export_date: self.now(),
            user_name: self.get_user_name().await,
            activities: self.get_activities().await,
            sessions: self.get_sessions().await,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Millisecond timestamp of `now` as an id, bumped until it doesn't collide with `taken`.
fn next_id<'a>(now: DateTime<Utc>, taken: impl Iterator<Item = &'a str>) -> String {
    let taken = taken.collect::<HashSet<_>>();
    let mut candidate = now.timestamp_millis();
    while taken.contains(candidate.to_string().as_str()) {
        candidate += 1;
    }
    candidate.to_string()
}

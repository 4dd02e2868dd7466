//! Persistence interfaces of the minutes service.

use async_trait::async_trait;

use super::types::{AudioFile, Minute, MinuteDraft, Profile};
use crate::structured::ActionItem;
use crate::Result;

/// Relational store of profiles, minutes, action items and audio metadata.
#[async_trait]
pub trait MinutesRepository: Send + Sync {
    async fn find_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    async fn insert_profile(&self, profile: Profile) -> Result<()>;

    /// Insert a minute and return its generated id.
    async fn insert_minute(&self, draft: MinuteDraft) -> Result<String>;

    async fn find_minute(&self, minute_id: &str) -> Result<Option<Minute>>;

    /// Most recently created minute owned by `owner_id`.
    async fn latest_minute(&self, owner_id: &str) -> Result<Option<Minute>>;

    /// Minutes owned by `owner_id`, newest first.
    async fn list_minutes(&self, owner_id: &str) -> Result<Vec<Minute>>;

    /// Set the summary of a minute owned by `owner_id`. Returns whether a row matched.
    async fn update_summary(&self, minute_id: &str, owner_id: &str, summary: &str) -> Result<bool>;

    async fn insert_action_items(&self, minute_id: &str, items: &[ActionItem]) -> Result<()>;

    /// Delete all action items of a minute. Returns the number removed.
    async fn delete_action_items(&self, minute_id: &str) -> Result<usize>;

    async fn action_items(&self, minute_id: &str) -> Result<Vec<ActionItem>>;

    async fn insert_audio_file(&self, file: AudioFile) -> Result<()>;

    /// Recordings of a minute, newest first.
    async fn audio_files(&self, minute_id: &str) -> Result<Vec<AudioFile>>;
}

/// Object store holding uploaded recordings.
#[async_trait]
pub trait AudioStorage: Send + Sync {
    /// Store `bytes` under `path`. Fails if the path is taken.
    async fn upload(&self, path: &str, content_type: &str, bytes: &[u8]) -> Result<()>;

    async fn remove(&self, path: &str) -> Result<()>;
}

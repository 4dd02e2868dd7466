//! Process-local repository and object store.
//!
//! Used by tests and the CLI. Individual writes can be made to fail so that partial-failure
//! paths of the service are reachable.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repository::{AudioStorage, MinutesRepository};
use super::types::{AudioFile, Minute, MinuteDraft, Profile};
use crate::error::{Error, ErrorContext};
use crate::structured::ActionItem;
use crate::Result;

#[derive(Default)]
struct Tables {
    profiles: HashMap<String, Profile>,
    minutes: Vec<Minute>,
    action_items: HashMap<String, Vec<ActionItem>>,
    audio_files: Vec<AudioFile>,
}

#[derive(Default)]
pub struct InMemoryMinutesRepository {
    tables: RwLock<Tables>,
    fail_action_items: AtomicBool,
    fail_audio_files: AtomicBool,
}

fn injected(table: &str) -> Error {
    Error::storage_with_context(
        "insert rejected",
        ErrorContext::new()
            .with_field_path(table)
            .with_source("in_memory_repository"),
    )
}

impl InMemoryMinutesRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every action item insert fail.
    pub fn fail_action_item_inserts(&self, fail: bool) {
        self.fail_action_items.store(fail, Ordering::SeqCst);
    }

    /// Make every audio metadata insert fail.
    pub fn fail_audio_file_inserts(&self, fail: bool) {
        self.fail_audio_files.store(fail, Ordering::SeqCst);
    }

    /// Every audio row, in insertion order.
    pub async fn stored_audio_files(&self) -> Vec<AudioFile> {
        self.tables.read().await.audio_files.clone()
    }

    pub async fn minute_count(&self) -> usize {
        self.tables.read().await.minutes.len()
    }
}

#[async_trait]
impl MinutesRepository for InMemoryMinutesRepository {
    async fn find_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(user_id).cloned())
    }

    async fn insert_profile(&self, profile: Profile) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.profiles.contains_key(&profile.user_id) {
            return Err(Error::storage_with_context(
                "duplicate key",
                ErrorContext::new()
                    .with_field_path("profiles.id")
                    .with_details(profile.user_id.clone()),
            ));
        }
        tables.profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    async fn insert_minute(&self, draft: MinuteDraft) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.tables.write().await.minutes.push(Minute {
            id: id.clone(),
            owner_id: draft.owner_id,
            department_id: draft.department_id,
            title: draft.title,
            meeting_date: draft.meeting_date,
            raw_text: draft.raw_text,
            summary: draft.summary,
            created_at: draft.created_at,
        });
        Ok(id)
    }

    async fn find_minute(&self, minute_id: &str) -> Result<Option<Minute>> {
        Ok(self
            .tables
            .read()
            .await
            .minutes
            .iter()
            .find(|m| m.id == minute_id)
            .cloned())
    }

    async fn latest_minute(&self, owner_id: &str) -> Result<Option<Minute>> {
        // ties on created_at go to the later insert
        Ok(self
            .tables
            .read()
            .await
            .minutes
            .iter()
            .enumerate()
            .filter(|(_, m)| m.owner_id == owner_id)
            .max_by_key(|(i, m)| (m.created_at, *i))
            .map(|(_, m)| m.clone()))
    }

    async fn list_minutes(&self, owner_id: &str) -> Result<Vec<Minute>> {
        let tables = self.tables.read().await;
        let mut owned: Vec<(usize, &Minute)> = tables
            .minutes
            .iter()
            .enumerate()
            .filter(|(_, m)| m.owner_id == owner_id)
            .collect();
        owned.sort_by_key(|(i, m)| Reverse((m.created_at, *i)));
        Ok(owned.into_iter().map(|(_, m)| m.clone()).collect())
    }

    async fn update_summary(&self, minute_id: &str, owner_id: &str, summary: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .minutes
            .iter_mut()
            .find(|m| m.id == minute_id && m.owner_id == owner_id)
        {
            Some(minute) => {
                minute.summary = Some(summary.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_action_items(&self, minute_id: &str, items: &[ActionItem]) -> Result<()> {
        if self.fail_action_items.load(Ordering::SeqCst) {
            return Err(injected("action_items"));
        }
        self.tables
            .write()
            .await
            .action_items
            .entry(minute_id.to_string())
            .or_default()
            .extend_from_slice(items);
        Ok(())
    }

    async fn delete_action_items(&self, minute_id: &str) -> Result<usize> {
        Ok(self
            .tables
            .write()
            .await
            .action_items
            .remove(minute_id)
            .map(|items| items.len())
            .unwrap_or(0))
    }

    async fn action_items(&self, minute_id: &str) -> Result<Vec<ActionItem>> {
        Ok(self
            .tables
            .read()
            .await
            .action_items
            .get(minute_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_audio_file(&self, file: AudioFile) -> Result<()> {
        if self.fail_audio_files.load(Ordering::SeqCst) {
            return Err(injected("audio_files"));
        }
        self.tables.write().await.audio_files.push(file);
        Ok(())
    }

    async fn audio_files(&self, minute_id: &str) -> Result<Vec<AudioFile>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<(usize, &AudioFile)> = tables
            .audio_files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.minute_id == minute_id)
            .collect();
        rows.sort_by_key(|(i, f)| Reverse((f.created_at, *i)));
        Ok(rows.into_iter().map(|(_, f)| f.clone()).collect())
    }
}

#[derive(Default)]
pub struct InMemoryAudioStorage {
    objects: RwLock<HashMap<String, (String, Vec<u8>)>>,
}

impl InMemoryAudioStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl AudioStorage for InMemoryAudioStorage {
    async fn upload(&self, path: &str, content_type: &str, bytes: &[u8]) -> Result<()> {
        let mut objects = self.objects.write().await;
        if objects.contains_key(path) {
            return Err(Error::storage_with_context(
                "object already exists",
                ErrorContext::new().with_field_path(path),
            ));
        }
        objects.insert(path.to_string(), (content_type.to_string(), bytes.to_vec()));
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.objects.write().await.remove(path);
        Ok(())
    }
}

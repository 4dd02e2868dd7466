use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::structured::ActionItem;

/// Per-user record linking an account to its department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub department_id: String,
}

/// A stored set of minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minute {
    pub id: String,
    pub owner_id: String,
    pub department_id: String,
    pub title: String,
    pub meeting_date: Option<String>,
    pub raw_text: String,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Minute row before the repository assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinuteDraft {
    pub owner_id: String,
    pub department_id: String,
    pub title: String,
    pub meeting_date: Option<String>,
    pub raw_text: String,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Minutes submitted from the editor, optionally with AI results attached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMinute {
    pub title: String,
    pub meeting_date: Option<String>,
    pub raw_text: String,
    pub summary: Option<String>,
    pub actions: Option<Vec<ActionItem>>,
}

/// Uploaded recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AudioUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Metadata row of a stored recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFile {
    pub minute_id: String,
    pub file_path: String,
    pub mime_type: String,
    pub duration_secs: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// One row of the minutes list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinuteOverview {
    pub minute_id: String,
    pub title: String,
    pub meeting_date: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Minute> for MinuteOverview {
    fn from(m: Minute) -> Self {
        Self {
            minute_id: m.id,
            title: m.title,
            meeting_date: m.meeting_date,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinuteList {
    pub minutes: Vec<MinuteOverview>,
}

/// A minute with its action items (creation order) and recordings (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinuteDetail {
    pub minute: Minute,
    pub action_items: Vec<ActionItem>,
    pub audio_files: Vec<AudioFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMinute {
    pub minute_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedActions {
    pub saved_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestMinute {
    pub minute_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAudio {
    pub file_path: String,
}

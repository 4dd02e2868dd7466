use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::repository::{AudioStorage, MinutesRepository};
use super::types::{
    AudioFile, AudioUpload, LatestMinute, MinuteDetail, MinuteDraft, MinuteList,
    MinuteOverview, NewMinute, Profile, SavedActions, SavedMinute, UploadedAudio,
};
use crate::actions::{ActionResponse, Empty};
use crate::clock::{system_clock, Clock};
use crate::config::MinutesConfig;
use crate::error::{Error, ErrorContext};
use crate::guard::group_thousands;
use crate::identity::AuthenticatedUser;
use crate::structured::ActionItem;

const LOGIN_REQUIRED: &str = "ログインが必要です";
const PROFILE_UNAVAILABLE: &str = "プロフィール情報が取得できませんでした";
const MINUTE_NOT_FOUND: &str = "指定された議事録が見つかりません";
const FETCH_FAILED: &str = "議事録の取得に失敗しました";

static UNSAFE_FILE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9._-]").expect("valid regex"));

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    UNSAFE_FILE_CHARS.replace_all(name, "_").into_owned()
}

/// Persistence operations behind the minutes editor.
///
/// Every operation except [`ensure_profile`](Self::ensure_profile) answers with an
/// [`ActionResponse`]; backend errors are logged and replaced by a localized message.
#[derive(Clone)]
pub struct MinutesService {
    repo: Arc<dyn MinutesRepository>,
    storage: Arc<dyn AudioStorage>,
    config: MinutesConfig,
    clock: Arc<dyn Clock>,
}

impl MinutesService {
    pub fn new(
        repo: Arc<dyn MinutesRepository>,
        storage: Arc<dyn AudioStorage>,
        config: MinutesConfig,
    ) -> Self {
        Self {
            repo,
            storage,
            config,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &MinutesConfig {
        &self.config
    }

    /// Return the caller's profile, creating it in the default department on first login.
    pub async fn ensure_profile(&self, user: &AuthenticatedUser) -> crate::Result<Profile> {
        let department_id = self.config.default_department_id.clone().ok_or_else(|| {
            Error::configuration_with_context(
                "DEFAULT_DEPARTMENT_ID is not set",
                ErrorContext::new().with_field_path("DEFAULT_DEPARTMENT_ID"),
            )
        })?;

        if let Some(profile) = self.repo.find_profile(&user.id).await? {
            return Ok(profile);
        }

        let profile = Profile {
            user_id: user.id.clone(),
            department_id,
        };
        self.repo.insert_profile(profile.clone()).await?;
        tracing::info!(user = %user.id, department = %profile.department_id, "profile created");
        Ok(profile)
    }

    async fn profile_of(&self, user: &AuthenticatedUser) -> Option<Profile> {
        match self.repo.find_profile(&user.id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(user = %user.id, error = %e, "profile lookup failed");
                None
            }
        }
    }

    pub async fn save_minute(
        &self,
        user: Option<&AuthenticatedUser>,
        minute: NewMinute,
    ) -> ActionResponse<SavedMinute> {
        let Some(user) = user else {
            return ActionResponse::fail(LOGIN_REQUIRED);
        };
        if minute.title.trim().is_empty() {
            return ActionResponse::fail("タイトルは必須です");
        }
        if minute.raw_text.trim().is_empty() {
            return ActionResponse::fail("raw_textは必須です");
        }
        let limit = self.config.raw_text_max_chars;
        if minute.raw_text.chars().count() > limit {
            return ActionResponse::fail(format!(
                "raw_textは{}文字以下にしてください",
                group_thousands(limit as u64)
            ));
        }
        let Some(profile) = self.profile_of(user).await else {
            return ActionResponse::fail(PROFILE_UNAVAILABLE);
        };

        let draft = MinuteDraft {
            owner_id: user.id.clone(),
            department_id: profile.department_id,
            title: minute.title.trim().to_string(),
            meeting_date: minute.meeting_date.filter(|d| !d.trim().is_empty()),
            raw_text: minute.raw_text,
            summary: minute.summary.filter(|s| !s.trim().is_empty()),
            created_at: self.clock.now(),
        };
        let minute_id = match self.repo.insert_minute(draft).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(user = %user.id, error = %e, "minute insert failed");
                return ActionResponse::fail("データベースへの保存に失敗しました");
            }
        };

        if let Some(actions) = minute.actions.filter(|a| !a.is_empty()) {
            // the minute stays saved even when its items cannot be
            if let Err(e) = self.repo.insert_action_items(&minute_id, &actions).await {
                tracing::error!(minute = %minute_id, count = actions.len(), error = %e, "action item insert failed");
            }
        }

        tracing::info!(user = %user.id, minute = %minute_id, "minute saved");
        ActionResponse::ok(SavedMinute { minute_id })
    }

    pub async fn update_summary(
        &self,
        user: Option<&AuthenticatedUser>,
        minute_id: &str,
        summary: &str,
    ) -> ActionResponse<Empty> {
        let Some(user) = user else {
            return ActionResponse::fail(LOGIN_REQUIRED);
        };
        if minute_id.trim().is_empty() {
            return ActionResponse::fail("議事録IDが指定されていません");
        }
        let summary = summary.trim();
        if summary.is_empty() {
            return ActionResponse::fail("要約内容が空です");
        }

        match self.repo.update_summary(minute_id, &user.id, summary).await {
            Ok(true) => ActionResponse::done(),
            Ok(false) => ActionResponse::fail(MINUTE_NOT_FOUND),
            Err(e) => {
                tracing::error!(minute = %minute_id, error = %e, "summary update failed");
                ActionResponse::fail("データベースへの保存に失敗しました")
            }
        }
    }

    /// Replace the action items of a minute owned by the caller.
    pub async fn save_actions(
        &self,
        user: Option<&AuthenticatedUser>,
        minute_id: &str,
        actions: &[ActionItem],
    ) -> ActionResponse<SavedActions> {
        if minute_id.trim().is_empty() {
            return ActionResponse::fail("議事録IDが指定されていません");
        }
        if actions.is_empty() {
            return ActionResponse::fail("保存するアクション項目がありません");
        }
        let Some(user) = user else {
            return ActionResponse::fail(LOGIN_REQUIRED);
        };

        let minute = match self.repo.find_minute(minute_id).await {
            Ok(Some(m)) => m,
            Ok(None) => return ActionResponse::fail(MINUTE_NOT_FOUND),
            Err(e) => {
                tracing::error!(minute = %minute_id, error = %e, "minute lookup failed");
                return ActionResponse::fail(MINUTE_NOT_FOUND);
            }
        };
        if minute.owner_id != user.id {
            tracing::warn!(minute = %minute_id, user = %user.id, "action save on foreign minute");
            return ActionResponse::fail("他のユーザーの議事録にはアクションを保存できません");
        }

        if let Err(e) = self.repo.delete_action_items(minute_id).await {
            tracing::error!(minute = %minute_id, error = %e, "action item delete failed");
            return ActionResponse::fail("アクション項目の削除に失敗しました");
        }
        if let Err(e) = self.repo.insert_action_items(minute_id, actions).await {
            tracing::error!(minute = %minute_id, error = %e, "action item insert failed");
            return ActionResponse::fail("アクション項目の保存に失敗しました");
        }

        ActionResponse::ok(SavedActions {
            saved_count: actions.len(),
        })
    }

    pub async fn latest_minute(&self, user: Option<&AuthenticatedUser>) -> ActionResponse<LatestMinute> {
        let Some(user) = user else {
            return ActionResponse::fail(LOGIN_REQUIRED);
        };
        match self.repo.latest_minute(&user.id).await {
            Ok(Some(m)) => ActionResponse::ok(LatestMinute {
                minute_id: m.id,
                title: m.title,
            }),
            Ok(None) => ActionResponse::fail("保存済みの議事録がありません"),
            Err(e) => {
                tracing::error!(user = %user.id, error = %e, "latest minute lookup failed");
                ActionResponse::fail("エラーが発生しました")
            }
        }
    }

    /// Minutes owned by the caller, newest first.
    pub async fn list_minutes(&self, user: Option<&AuthenticatedUser>) -> ActionResponse<MinuteList> {
        let Some(user) = user else {
            return ActionResponse::fail(LOGIN_REQUIRED);
        };
        match self.repo.list_minutes(&user.id).await {
            Ok(rows) => ActionResponse::ok(MinuteList {
                minutes: rows.into_iter().map(MinuteOverview::from).collect(),
            }),
            Err(e) => {
                tracing::error!(user = %user.id, error = %e, "minutes list failed");
                ActionResponse::fail(FETCH_FAILED)
            }
        }
    }

    /// A minute owned by the caller with its action items and recordings.
    ///
    /// Failing item or recording lookups are logged and leave those lists empty.
    pub async fn minute_detail(
        &self,
        user: Option<&AuthenticatedUser>,
        minute_id: &str,
    ) -> ActionResponse<MinuteDetail> {
        let Some(user) = user else {
            return ActionResponse::fail(LOGIN_REQUIRED);
        };
        if minute_id.trim().is_empty() {
            return ActionResponse::fail("議事録IDが指定されていません");
        }

        let minute = match self.repo.find_minute(minute_id).await {
            Ok(Some(m)) if m.owner_id == user.id => m,
            Ok(_) => return ActionResponse::fail(MINUTE_NOT_FOUND),
            Err(e) => {
                tracing::error!(minute = %minute_id, error = %e, "minute lookup failed");
                return ActionResponse::fail(FETCH_FAILED);
            }
        };

        let action_items = self.repo.action_items(minute_id).await.unwrap_or_else(|e| {
            tracing::warn!(minute = %minute_id, error = %e, "action item lookup failed");
            Vec::new()
        });
        let audio_files = self.repo.audio_files(minute_id).await.unwrap_or_else(|e| {
            tracing::warn!(minute = %minute_id, error = %e, "audio file lookup failed");
            Vec::new()
        });

        ActionResponse::ok(MinuteDetail {
            minute,
            action_items,
            audio_files,
        })
    }

    /// Store a recording under `{department}/{minute}/{timestamp_ms}_{name}` and record it.
    pub async fn upload_audio(
        &self,
        user: Option<&AuthenticatedUser>,
        minute_id: &str,
        file: Option<AudioUpload>,
    ) -> ActionResponse<UploadedAudio> {
        let Some(user) = user else {
            return ActionResponse::fail(LOGIN_REQUIRED);
        };
        let Some(profile) = self.profile_of(user).await else {
            return ActionResponse::fail(PROFILE_UNAVAILABLE);
        };
        let file = match file {
            Some(f) if !minute_id.trim().is_empty() => f,
            _ => return ActionResponse::fail("ファイルまたは議事録IDが指定されていません"),
        };
        if file.mime_type != self.config.audio_mime_type {
            return ActionResponse::fail(format!(
                "{}形式のファイルのみアップロード可能です",
                self.config.audio_mime_type
            ));
        }
        if file.size() > self.config.audio_max_bytes {
            return ActionResponse::fail(format!(
                "ファイルサイズは{}MB以下にしてください",
                self.config.audio_max_bytes / (1024 * 1024)
            ));
        }

        match self.repo.find_minute(minute_id).await {
            Ok(Some(m)) if m.owner_id == user.id => {}
            Ok(_) => return ActionResponse::fail("議事録が見つからないか、アクセス権限がありません"),
            Err(e) => {
                tracing::error!(minute = %minute_id, error = %e, "minute lookup failed");
                return ActionResponse::fail("議事録が見つからないか、アクセス権限がありません");
            }
        }

        let file_path = format!(
            "{}/{}/{}_{}",
            profile.department_id,
            minute_id,
            self.clock.now().timestamp_millis(),
            sanitize_file_name(&file.file_name)
        );

        if let Err(e) = self.storage.upload(&file_path, &file.mime_type, &file.bytes).await {
            tracing::error!(path = %file_path, error = %e, "audio upload failed");
            return ActionResponse::fail("ファイルのアップロードに失敗しました");
        }

        let record = AudioFile {
            minute_id: minute_id.to_string(),
            file_path: file_path.clone(),
            mime_type: file.mime_type,
            duration_secs: None,
            created_at: self.clock.now(),
        };
        if let Err(e) = self.repo.insert_audio_file(record).await {
            tracing::error!(path = %file_path, error = %e, "audio metadata insert failed");
            if let Err(e) = self.storage.remove(&file_path).await {
                tracing::warn!(path = %file_path, error = %e, "orphaned audio object");
            }
            return ActionResponse::fail("データベースへの保存に失敗しました");
        }

        tracing::info!(minute = %minute_id, path = %file_path, bytes = file.bytes.len(), "audio stored");
        ActionResponse::ok(UploadedAudio { file_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("会議 録音(1).m4a"), "______1_.m4a");
        assert_eq!(sanitize_file_name("team-sync_v2.mp4"), "team-sync_v2.mp4");
    }
}

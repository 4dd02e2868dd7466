//! 议事录持久化：保存、列表与详情、要约更新、行动项与录音上传。
//!
//! # Minutes Persistence
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`MinutesService`] | Validates requests, checks ownership and shapes [`ActionResponse`](crate::actions::ActionResponse)s |
//! | [`MinutesRepository`] | Relational store of profiles, minutes, action items and audio rows |
//! | [`AudioStorage`] | Object store for recordings |
//! | [`InMemoryMinutesRepository`] / [`InMemoryAudioStorage`] | Process-local implementations |
//!
//! ```rust
//! use minutes_ai::config::MinutesConfig;
//! use minutes_ai::identity::AuthenticatedUser;
//! use minutes_ai::minutes::{InMemoryAudioStorage, InMemoryMinutesRepository, MinutesService, NewMinute};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let service = MinutesService::new(
//!     Arc::new(InMemoryMinutesRepository::new()),
//!     Arc::new(InMemoryAudioStorage::new()),
//!     MinutesConfig::default().with_default_department_id("sales"),
//! );
//! let user = AuthenticatedUser::new("u-1");
//! service.ensure_profile(&user).await.unwrap();
//!
//! let saved = service
//!     .save_minute(Some(&user), NewMinute {
//!         title: "Weekly sync".into(),
//!         raw_text: "Decided to ship on Friday.".into(),
//!         ..Default::default()
//!     })
//!     .await;
//! assert!(saved.is_success());
//! # });
//! ```

mod memory;
mod repository;
mod service;
mod types;

pub use memory::{InMemoryAudioStorage, InMemoryMinutesRepository};
pub use repository::{AudioStorage, MinutesRepository};
pub use service::{sanitize_file_name, MinutesService};
pub use types::{
    AudioFile, AudioUpload, LatestMinute, Minute, MinuteDetail, MinuteDraft, MinuteList,
    MinuteOverview, NewMinute, Profile, SavedActions, SavedMinute, UploadedAudio,
};

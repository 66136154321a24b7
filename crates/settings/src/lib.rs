//! Settings orchestration for the spike alert dashboard.
//!
//! This crate provides:
//! - HTTP client for the user settings API
//! - In-memory settings session with save-time validation
//! - Inline pair-setting edits with per-cell rollback
//! - Edit/refresh guard for the template editor

pub mod api;
pub mod config;
pub mod error;
pub mod session;
pub mod sync;

pub use api::{HttpSettingsApi, SettingsApi, UserRecord};
pub use config::{is_blacklisted, resolve_timezone, ClientConfig, TelegramSettings};
pub use error::{ApiError, ApiResult, SessionError, SessionResult};
pub use session::{PairField, SessionFlags, SettingsSession};
pub use sync::EditSyncGuard;

//! Core model for spike detection strategies.
//!
//! Conditions, strategies, template placeholders, condition summaries and
//! save-time validation. No I/O happens here.

pub mod condition;
pub mod describe;
pub mod error;
pub mod exchange;
pub mod format;
pub mod placeholder;
pub mod strategy;
pub mod template;
pub mod validate;

pub use condition::*;
pub use describe::*;
pub use error::*;
pub use exchange::*;
pub use format::*;
pub use placeholder::*;
pub use strategy::*;
pub use validate::*;

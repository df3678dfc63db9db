//! Shared leaf utilities: secret material, redaction, durations, config.

pub mod config;
pub mod duration;
pub mod error;
pub mod redact;
pub mod secret;
pub mod timefilter;

pub use config::{CoreConfig, RemoteConfig};
pub use duration::parse_duration;
pub use error::ConfigError;
pub use redact::redact_all;
pub use secret::{REDACTION_TOKEN, Secret, SecretKind, SecretRef};
pub use timefilter::{AgeCmp, filter_by_age};

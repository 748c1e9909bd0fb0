//! LCCN Core Library
//!
//! Core types, filter normalization and matching for the lifecycle change
//! notification subscription engine.

pub mod config;
pub mod error;
pub mod matcher;
pub mod normalize;
pub mod types;

pub use config::LccnConfig;
pub use error::{Error, Result};

/// LCCN version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Notification type that carries operation type/state information
pub const OPERATION_OCCURRENCE_NOTIFICATION: &str = "VnfLcmOperationOccurrenceNotification";

/// Notification type emitted when an instance identifier is created
pub const IDENTIFIER_CREATION_NOTIFICATION: &str = "VnfIdentifierCreationNotification";

/// Notification type emitted when an instance identifier is deleted
pub const IDENTIFIER_DELETION_NOTIFICATION: &str = "VnfIdentifierDeletionNotification";

/// Maximum callback URI length accepted at registration
pub const MAX_CALLBACK_URI_LENGTH: usize = 2048;

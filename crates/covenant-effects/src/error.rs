//! Errors raised by the permission runtime.
//!
//! Every variant is a hard assertion failure of the running contract code. The
//! interpreter turns them into `AssertionError`s carrying the same message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::level::PermissionLevel;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PermissionError {
    /// The frame lacks the level required on `(object, class)`.
    #[error("{}", .required.denial_message())]
    InsufficientPermission {
        required: PermissionLevel,
        class: String,
    },

    #[error("Cannot pop a specification frame that is not the top frame.")]
    NotTopFrame,

    /// A permission was requested with no frame to grant it in.
    #[error("No specification frame is active.")]
    NoActiveFrame,

    #[error("The class info for this class has already been registered.")]
    DuplicateClassInfo { class: String },

    /// The background reclaimer thread could not be started.
    #[error("failed to start reclaimer: {reason}")]
    ReclaimerSpawn { reason: String },
}

impl PermissionError {
    pub fn insufficient(required: PermissionLevel, class: impl Into<String>) -> Self {
        PermissionError::InsufficientPermission {
            required,
            class: class.into(),
        }
    }
}

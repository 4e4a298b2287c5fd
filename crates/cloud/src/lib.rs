//! Third-party integrations: file storage and the generative-AI API.
//!
//! Both are opaque collaborators behind small client types so handlers can
//! treat them as optional capabilities (unset configuration means the
//! feature answers 503).

pub mod ai;
pub mod storage;

pub use ai::{AiClient, AiConfig, AiError, ChatTurn};
pub use storage::{
    DriveStorage, S3Storage, StorageConfig, StorageError, StorageProvider, StoredFile,
};

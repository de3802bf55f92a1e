pub mod enums;
pub mod error;
pub mod message;
pub mod record;
pub mod update;

// Re-exports for convenience
pub use enums::{AttachmentSync, EmptyTagPolicy};
pub use error::{Result, SyncError};
pub use message::{Attachment, Author, Message, Reaction};
pub use record::{ExternalFileRef, ExternalRecord};
pub use update::{PropertyChanges, UpdateOperation};

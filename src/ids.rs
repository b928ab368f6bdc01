//! Unique-suffix generation for uploaded filenames.

/// Produces the short suffix appended to an uploaded file's stem so that
/// repeated uploads of the same screenshot never collide. Injectable so tests
/// can assert deterministic generated filenames.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
pub trait IdSource: Send + Sync {
    fn short_id(&self) -> String;
}

/// Eight hex characters of a fresh v4 UUID.
pub struct UuidIds;

impl IdSource for UuidIds {
    fn short_id(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
    }
}

//! Durable key/value storage for the session.
//!
//! The session store is the only writer. Token and user are always written
//! in one [`SessionStorage::write_batch`] call so a reader never sees one
//! without the other. Ending a session wipes the backend with
//! [`SessionStorage::clear`].

use crate::error::StorageResult;

pub mod file;
pub mod memory;

pub use file::FileSessionStorage;
pub use memory::MemorySessionStorage;

/// Storage keys.
pub mod keys {
    /// Bearer token (opaque string)
    pub const TOKEN: &str = "blog_token";
    /// Serialized user identity (JSON)
    pub const USER: &str = "blog_user";
}

/// A key/value store that can apply several writes as a unit.
///
/// Calls are synchronous and are made from async effects on runtime worker
/// threads while the session transition lock is held. Implementations must
/// finish quickly and must not wait on the async runtime.
pub trait SessionStorage: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Apply writes as one unit; `None` removes the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written. On error no entry
    /// of the batch has been applied.
    fn write_batch(&self, entries: &[(&str, Option<&str>)]) -> StorageResult<()>;

    /// Remove every key. Used when a session ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn clear(&self) -> StorageResult<()>;
}

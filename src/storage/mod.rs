//! Account persistence (spec §4.5, §6). [`Storage`] is the seam between
//! the account manager and the backing store; two implementations ship
//! behind Cargo features, matching the spec's "pluggable persistence
//! layer" framing in §1.

use crate::error::StorageError;
use crate::model::{Account, Roster};

#[cfg(feature = "file-storage")]
pub mod file;
#[cfg(feature = "sqlite-storage")]
pub mod sqlite;

/// A roster slot, `"1"`, `"2"`, or `"3"` (spec §3).
pub type SlotKey<'a> = &'a str;

/// The persistence seam consumed by the account manager. Implementations
/// need not be internally synchronized against concurrent access to the
/// *same* account — callers serialize via [`crate::lock::AccountLocks`]
/// before ever calling through this trait (spec §5).
pub trait Storage {
    /// Load the account record, or `Ok(None)` if it has never been saved.
    fn load_account(&self, email: &str) -> Result<Option<Account>, StorageError>;

    /// Persist the account record, creating it if absent.
    fn save_account(&self, email: &str, account: &Account) -> Result<(), StorageError>;

    /// Load a slot's roster, or an empty roster if none has been written yet.
    fn load_roster(&self, email: &str, slot: SlotKey) -> Result<Roster, StorageError>;

    /// Persist a slot's roster.
    fn save_roster(&self, email: &str, slot: SlotKey, roster: &Roster) -> Result<(), StorageError>;

    /// Append a raw save dump for forensic purposes (spec §6). Best-effort:
    /// callers log but do not fail a save over a dump-append error.
    fn append_raw_dump(&self, email: &str, raw: &str) -> Result<(), StorageError>;
}

//! Save-protocol core for a local trainer-roster game backend.
//!
//! This crate implements the wire codec, delta-application engine,
//! profile-identity function, account/roster state management, and
//! request dispatch for a cloud-save emulator. The HTTP transport,
//! URL-decoding of request bodies, and any interactive save-editing
//! tooling are left to callers — this crate consumes an already
//! name→value-decoded parameter map and produces an ordered response.
//!
//! Module map:
//! - [`codec`]: the digit-substitution numeric codec and the blob codec
//!   built on top of it.
//! - [`delta`]: applies a roster delta stream, resolving unstable `myID`s.
//! - [`profile_id`]: the client-validated identity recurrence.
//! - [`model`]: the account/roster data model.
//! - [`storage`]: the pluggable persistence seam, with file and (feature
//!   `sqlite-storage`) sqlite-backed implementations.
//! - [`lock`]: per-account request serialization.
//! - [`account`]: ties storage and locking into load/create/save flows.
//! - [`config`], [`response`], [`dispatcher`]: the external request/response
//!   surface.

pub mod account;
pub mod codec;
pub mod config;
pub mod delta;
pub mod dispatcher;
pub mod error;
pub mod lock;
pub mod model;
pub mod profile_id;
pub mod response;
pub mod storage;

pub use account::AccountManager;
pub use config::Config;
pub use error::{DispatchError, StorageError};
pub use lock::AccountLocks;
pub use model::{Account, KvMap, PokemonRecord, Rarity, Roster, Slot};
pub use response::CROSSDOMAIN_XML;

//! Account state manager (C5, spec §4.5): load/create/save the account
//! record and its three roster slots, serialized per-account via
//! [`crate::lock::AccountLocks`].

use rand::Rng;

use crate::error::StorageError;
use crate::lock::AccountLocks;
use crate::model::{Account, Roster, Slot, POKEDEX_SIZE};
use crate::storage::Storage;

const SAVE_TOKEN_LEN: usize = 14;
const SAVE_TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

fn random_save_token() -> String {
    let mut rng = rand::thread_rng();
    (0..SAVE_TOKEN_LEN)
        .map(|_| SAVE_TOKEN_ALPHABET[rng.gen_range(0..SAVE_TOKEN_ALPHABET.len())] as char)
        .collect()
}

fn random_trainer_id() -> i64 {
    rand::thread_rng().gen_range(1000..=99999)
}

/// A fresh account: random trainer id and save token, three default
/// slots, empty pokedex/inventory/achievements/extraInfo (spec §4.5),
/// and `password` set from whatever the creating request supplied (may
/// be empty if the client sent none).
pub fn new_account(password: &str) -> Account {
    Account {
        trainer_id: random_trainer_id(),
        current_save: random_save_token(),
        password: password.to_string(),
        slot1: Slot::default(),
        slot2: Slot::default(),
        slot3: Slot::default(),
        pokedex: "0".repeat(POKEDEX_SIZE),
    }
}

/// The account plus all three slot rosters, as loaded together for the
/// load flow (spec §2: "account manager loads account and three
/// rosters").
pub struct LoadedAccount {
    pub account: Account,
    pub roster1: Roster,
    pub roster2: Roster,
    pub roster3: Roster,
}

/// Orchestrates [`Storage`] reads/writes under [`AccountLocks`]
/// serialization. Pure glue: every decision documented here is already
/// specified in §4.5/§4.6; this type just sequences the calls.
pub struct AccountManager<'a, S: Storage> {
    storage: &'a S,
    locks: &'a AccountLocks,
}

impl<'a, S: Storage> AccountManager<'a, S> {
    pub fn new(storage: &'a S, locks: &'a AccountLocks) -> Self {
        AccountManager { storage, locks }
    }

    /// Run `f` with the account's lock held for its entire duration,
    /// giving `f` an already-loaded account (`None` if it has never been
    /// saved) to read, modify, and persist however it needs to — the
    /// whole load-modify-save cycle as one critical section (spec §5/§9:
    /// "acquired for the duration of the load-modify-save cycle").
    pub fn transact<T>(
        &self,
        email: &str,
        f: impl FnOnce(&AccountManager<'a, S>, Option<LoadedAccount>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        self.locks.with_lock(email, || {
            let loaded = self.load_unlocked(email)?;
            f(self, loaded)
        })
    }

    pub(crate) fn load_unlocked(&self, email: &str) -> Result<Option<LoadedAccount>, StorageError> {
        let account = match self.storage.load_account(email)? {
            Some(a) => a,
            None => return Ok(None),
        };
        let roster1 = self.storage.load_roster(email, "1")?;
        let roster2 = self.storage.load_roster(email, "2")?;
        let roster3 = self.storage.load_roster(email, "3")?;
        Ok(Some(LoadedAccount {
            account,
            roster1,
            roster2,
            roster3,
        }))
    }

    pub(crate) fn create_unlocked(&self, email: &str, password: &str) -> Result<Account, StorageError> {
        let account = new_account(password);
        self.storage.save_account(email, &account)?;
        self.storage.save_roster(email, "1", &Roster::new())?;
        self.storage.save_roster(email, "2", &Roster::new())?;
        self.storage.save_roster(email, "3", &Roster::new())?;
        Ok(account)
    }

    pub(crate) fn save_unlocked(&self, email: &str, account: &Account, slot: &str, roster: &Roster) -> Result<(), StorageError> {
        self.storage.save_account(email, account)?;
        self.storage.save_roster(email, slot, roster)
    }

    /// Load the account and all three rosters. `None` if the account has
    /// never been saved (spec §4.5: "returns null account if none
    /// exists"). Callers that go on to modify and save should use
    /// [`Self::transact`] instead, so the lock spans the whole cycle.
    pub fn load(&self, email: &str) -> Result<Option<LoadedAccount>, StorageError> {
        self.locks.with_lock(email, || self.load_unlocked(email))
    }

    /// Create a fresh account and persist it immediately with three empty
    /// rosters, returning the new record. Prefer [`Self::transact`] when
    /// creation is part of a larger load-modify-save cycle.
    pub fn create(&self, email: &str, password: &str) -> Result<Account, StorageError> {
        self.locks.with_lock(email, || self.create_unlocked(email, password))
    }

    /// Atomically replace the account record and one slot's roster (spec
    /// §4.5: "atomic replace of the account record and the named slot's
    /// roster"). Prefer [`Self::transact`] when this follows a load of the
    /// same account in the same request.
    pub fn save(&self, email: &str, account: &Account, slot: &str, roster: &Roster) -> Result<(), StorageError> {
        self.locks.with_lock(email, || self.save_unlocked(email, account, slot, roster))
    }

    pub(crate) fn append_raw_dump_unlocked(&self, email: &str, raw: &str) -> Result<(), StorageError> {
        self.storage.append_raw_dump(email, raw)
    }

    /// Append a raw save dump for forensic purposes (spec §6). Not part of
    /// the load-modify-save atomicity guarantee — callers treat a failure
    /// here as non-fatal to the save itself.
    pub fn append_raw_dump(&self, email: &str, raw: &str) -> Result<(), StorageError> {
        self.locks.with_lock(email, || self.append_raw_dump_unlocked(email, raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::file::FileStorage;

    #[test]
    fn create_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let locks = AccountLocks::new();
        let manager = AccountManager::new(&storage, &locks);

        assert!(manager.load("a@b.com").unwrap().is_none());
        let created = manager.create("a@b.com", "").unwrap();
        assert_eq!(created.current_save.len(), SAVE_TOKEN_LEN);

        let loaded = manager.load("a@b.com").unwrap().unwrap();
        assert_eq!(loaded.account.trainer_id, created.trainer_id);
        assert_eq!(loaded.roster1.len(), 0);
    }

    #[test]
    fn save_replaces_named_slot_only() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let locks = AccountLocks::new();
        let manager = AccountManager::new(&storage, &locks);

        let account = manager.create("a@b.com", "").unwrap();
        let roster = vec![crate::model::PokemonRecord::blank(1)];
        manager.save("a@b.com", &account, "2", &roster).unwrap();

        let loaded = manager.load("a@b.com").unwrap().unwrap();
        assert_eq!(loaded.roster1.len(), 0);
        assert_eq!(loaded.roster2.len(), 1);
        assert_eq!(loaded.roster3.len(), 0);
    }

    #[test]
    fn new_account_trainer_id_in_range() {
        for _ in 0..50 {
            let account = new_account("");
            assert!(account.trainer_id >= 1000 && account.trainer_id <= 99999);
            assert_eq!(account.pokedex.len(), POKEDEX_SIZE);
        }
    }

    #[test]
    fn new_account_stores_the_given_password() {
        let account = new_account("hunter2");
        assert_eq!(account.password, "hunter2");
    }

    #[test]
    fn transact_holds_the_lock_across_create_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let locks = AccountLocks::new();
        let manager = AccountManager::new(&storage, &locks);

        let roster = vec![crate::model::PokemonRecord::blank(1)];
        manager
            .transact("a@b.com", |mgr, loaded| {
                let account = match loaded {
                    Some(l) => l.account,
                    None => mgr.create_unlocked("a@b.com", "pw")?,
                };
                mgr.save_unlocked("a@b.com", &account, "1", &roster)
            })
            .unwrap();

        let loaded = manager.load("a@b.com").unwrap().unwrap();
        assert_eq!(loaded.account.password, "pw");
        assert_eq!(loaded.roster1.len(), 1);
    }
}

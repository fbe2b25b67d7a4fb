//! Optional sqlite-backed [`Storage`] implementation, enabled by the
//! `sqlite-storage` feature. Schema holds the same JSON-equivalent blobs
//! the file backend uses, just addressed by SQL instead of a path.

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::model::{Account, Roster};

use super::{SlotKey, Storage};

pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (email TEXT PRIMARY KEY, body TEXT NOT NULL)",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS rosters (email TEXT NOT NULL, slot TEXT NOT NULL, body TEXT NOT NULL, PRIMARY KEY (email, slot))",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS raw_dumps (email TEXT NOT NULL, line TEXT NOT NULL)",
            [],
        )?;
        Ok(SqliteStorage { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open(":memory:")
    }
}

impl Storage for SqliteStorage {
    fn load_account(&self, email: &str) -> Result<Option<Account>, StorageError> {
        let conn = self.conn.lock().expect("sqlite connection mutex poisoned");
        let body: Option<String> = conn
            .query_row("SELECT body FROM accounts WHERE email = ?1", params![email], |row| row.get(0))
            .optional()?;
        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    fn save_account(&self, email: &str, account: &Account) -> Result<(), StorageError> {
        let body = serde_json::to_string(account)?;
        let conn = self.conn.lock().expect("sqlite connection mutex poisoned");
        conn.execute(
            "INSERT INTO accounts (email, body) VALUES (?1, ?2)
             ON CONFLICT(email) DO UPDATE SET body = excluded.body",
            params![email, body],
        )?;
        Ok(())
    }

    fn load_roster(&self, email: &str, slot: SlotKey) -> Result<Roster, StorageError> {
        let conn = self.conn.lock().expect("sqlite connection mutex poisoned");
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM rosters WHERE email = ?1 AND slot = ?2",
                params![email, slot],
                |row| row.get(0),
            )
            .optional()?;
        match body {
            Some(body) => Ok(serde_json::from_str(&body)?),
            None => Ok(Roster::new()),
        }
    }

    fn save_roster(&self, email: &str, slot: SlotKey, roster: &Roster) -> Result<(), StorageError> {
        let body = serde_json::to_string(roster)?;
        let conn = self.conn.lock().expect("sqlite connection mutex poisoned");
        conn.execute(
            "INSERT INTO rosters (email, slot, body) VALUES (?1, ?2, ?3)
             ON CONFLICT(email, slot) DO UPDATE SET body = excluded.body",
            params![email, slot, body],
        )?;
        Ok(())
    }

    fn append_raw_dump(&self, email: &str, raw: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().expect("sqlite connection mutex poisoned");
        conn.execute("INSERT INTO raw_dumps (email, line) VALUES (?1, ?2)", params![email, raw])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PokemonRecord;

    fn sample_account() -> Account {
        Account {
            trainer_id: 1000,
            current_save: "abcdefghijklmn".to_string(),
            password: "p".to_string(),
            slot1: Default::default(),
            slot2: Default::default(),
            slot3: Default::default(),
            pokedex: "0".repeat(crate::model::POKEDEX_SIZE),
        }
    }

    #[test]
    fn missing_account_loads_as_none() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert!(storage.load_account("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn account_upsert_roundtrips() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let mut account = sample_account();
        storage.save_account("a@b.com", &account).unwrap();
        account.trainer_id = 2000;
        storage.save_account("a@b.com", &account).unwrap();
        let loaded = storage.load_account("a@b.com").unwrap().unwrap();
        assert_eq!(loaded.trainer_id, 2000);
    }

    #[test]
    fn roster_roundtrips_per_slot() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let roster = vec![PokemonRecord::blank(1)];
        storage.save_roster("a@b.com", "3", &roster).unwrap();
        assert_eq!(storage.load_roster("a@b.com", "3").unwrap().len(), 1);
        assert_eq!(storage.load_roster("a@b.com", "1").unwrap().len(), 0);
    }
}

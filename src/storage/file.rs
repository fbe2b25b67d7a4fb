//! Default file-backed [`Storage`] implementation (spec §6: "per account,
//! one record file holding the Account entity in JSON-equivalent form;
//! per `(account, slot)`, one roster file ... a raw save dump per account
//! is also written for forensic purposes").

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::model::{Account, Roster};

use super::{SlotKey, Storage};

/// Persists each account as flat JSON files under a base directory:
///
/// ```text
/// <base>/<email>/account.json
/// <base>/<email>/roster_<slot>.json
/// <base>/<email>/raw.log
/// ```
///
/// Email is used directly as a directory component; callers are expected
/// to have already validated it doesn't contain path separators or `..`
/// (the dispatcher rejects an `Email` parameter containing `..`, `/`, or
/// `\`, or that is empty, before it ever reaches here — see
/// `dispatcher::email_is_safe`).
pub struct FileStorage {
    base: PathBuf,
}

impl FileStorage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        FileStorage { base: base.into() }
    }

    fn account_dir(&self, email: &str) -> PathBuf {
        self.base.join(email)
    }

    fn account_path(&self, email: &str) -> PathBuf {
        self.account_dir(email).join("account.json")
    }

    fn roster_path(&self, email: &str, slot: SlotKey) -> PathBuf {
        self.account_dir(email).join(format!("roster_{slot}.json"))
    }

    fn raw_dump_path(&self, email: &str) -> PathBuf {
        self.account_dir(email).join("raw.log")
    }
}

/// Write `contents` to `path` atomically: write to a sibling `.tmp` file,
/// flush, then rename over the destination (spec §5: "writes of the
/// account record and roster file must be atomic").
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let tmp_path = path.with_extension("tmp");
    let mut tmp = fs::File::create(&tmp_path)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

impl Storage for FileStorage {
    fn load_account(&self, email: &str) -> Result<Option<Account>, StorageError> {
        let path = self.account_path(email);
        match fs::read(&path) {
            Ok(bytes) => {
                let account: Account = serde_json::from_slice(&bytes)?;
                Ok(Some(account))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_account(&self, email: &str, account: &Account) -> Result<(), StorageError> {
        let body = serde_json::to_vec_pretty(account)?;
        write_atomic(&self.account_path(email), &body)
    }

    fn load_roster(&self, email: &str, slot: SlotKey) -> Result<Roster, StorageError> {
        let path = self.roster_path(email, slot);
        match fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Roster::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save_roster(&self, email: &str, slot: SlotKey, roster: &Roster) -> Result<(), StorageError> {
        let body = serde_json::to_vec_pretty(roster)?;
        write_atomic(&self.roster_path(email, slot), &body)
    }

    fn append_raw_dump(&self, email: &str, raw: &str) -> Result<(), StorageError> {
        let dir = self.account_dir(email);
        fs::create_dir_all(&dir)?;
        let mut f = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.raw_dump_path(email))?;
        writeln!(f, "{raw}")?;
        Ok(())
    }
}

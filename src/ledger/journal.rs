use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{Account, AccountNumber, IdentityNumber};

use super::memory::AccountIndex;
use super::traits::{AccountStore, InsertOutcome, TierUpdate};

/// Errors that can occur during journal operations.
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A single mutation recorded in the account journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JournalEntry {
    #[serde(rename = "upsert")]
    Upsert { account: Account },

    #[serde(rename = "delete")]
    Delete { identity_number: IdentityNumber },
}

/// Appends entries as `JSON\tCRC32` lines.
pub struct JournalWriter {
    writer: BufWriter<File>,
    entries_written: u64,
}

impl JournalWriter {
    /// Open or create a journal file for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(JournalWriter {
            writer: BufWriter::new(file),
            entries_written: 0,
        })
    }

    pub fn append(&mut self, entry: &JournalEntry) -> Result<(), JournalError> {
        let json = serde_json::to_string(entry)?;
        let checksum = crc32fast::hash(json.as_bytes());

        writeln!(self.writer, "{}\t{:08x}", json, checksum)?;
        self.entries_written += 1;

        Ok(())
    }

    /// Flush buffered entries and sync file data to disk.
    pub fn sync(&mut self) -> Result<(), JournalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }
}

/// Reads journal entries, skipping lines that fail their checksum.
pub struct JournalReader {
    reader: BufReader<File>,
    line_buffer: String,
    entries_read: u64,
    errors: u64,
}

impl JournalReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let file = File::open(path)?;

        Ok(JournalReader {
            reader: BufReader::new(file),
            line_buffer: String::with_capacity(512),
            entries_read: 0,
            errors: 0,
        })
    }

    /// Read the next valid entry, or `None` at end of file.
    pub fn next_entry(&mut self) -> Result<Option<JournalEntry>, JournalError> {
        loop {
            self.line_buffer.clear();
            if self.reader.read_line(&mut self.line_buffer)? == 0 {
                return Ok(None);
            }

            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }

            let Some((json, crc)) = line.rsplit_once('\t') else {
                self.errors += 1;
                warn!("Invalid journal line format, skipping");
                continue;
            };

            let Ok(expected) = u32::from_str_radix(crc, 16) else {
                self.errors += 1;
                warn!("Unreadable journal checksum, skipping");
                continue;
            };

            let actual = crc32fast::hash(json.as_bytes());
            if actual != expected {
                self.errors += 1;
                warn!(
                    "Journal checksum mismatch: expected {:08x}, got {:08x}",
                    expected, actual
                );
                continue;
            }

            match serde_json::from_str(json) {
                Ok(entry) => {
                    self.entries_read += 1;
                    return Ok(Some(entry));
                }
                Err(e) => {
                    self.errors += 1;
                    warn!(error = %e, "Undecodable journal entry, skipping");
                }
            }
        }
    }

    pub fn entries_read(&self) -> u64 {
        self.entries_read
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }
}

impl Iterator for JournalReader {
    type Item = Result<JournalEntry, JournalError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

/// Statistics from replaying a journal on open.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub entries: u64,
    pub errors: u64,
    pub accounts: usize,
}

/// Account store backed by an in-memory index and an append-only journal.
///
/// Every mutation is appended and synced while the index write lock is held,
/// so the journal order matches the order mutations became visible.
pub struct JournaledStore {
    index: RwLock<AccountIndex>,
    writer: Mutex<JournalWriter>,
}

impl JournaledStore {
    /// Open the journal at `path`, replaying any existing entries.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, ReplayStats), JournalError> {
        let path = path.as_ref();
        let mut index = AccountIndex::default();
        let mut stats = ReplayStats::default();

        if path.exists() {
            let mut reader = JournalReader::open(path)?;
            while let Some(entry) = reader.next_entry()? {
                match entry {
                    JournalEntry::Upsert { account } => index.upsert(account),
                    JournalEntry::Delete { identity_number } => {
                        index.remove(&identity_number);
                    }
                }
            }
            stats.entries = reader.entries_read();
            stats.errors = reader.errors();
        }
        stats.accounts = index.len();

        info!(
            path = %path.display(),
            entries = stats.entries,
            errors = stats.errors,
            accounts = stats.accounts,
            "Account journal replayed"
        );

        let store = JournaledStore {
            index: RwLock::new(index),
            writer: Mutex::new(JournalWriter::open(path)?),
        };

        Ok((store, stats))
    }

    fn record(writer: &mut JournalWriter, entry: &JournalEntry) -> Result<(), JournalError> {
        writer.append(entry)?;
        writer.sync()
    }
}

#[async_trait]
impl AccountStore for JournaledStore {
    async fn get(&self, identity: &IdentityNumber) -> anyhow::Result<Option<Account>> {
        Ok(self.index.read().get(identity).cloned())
    }

    async fn find_by_email(&self, email_key: &str) -> anyhow::Result<Option<Account>> {
        Ok(self.index.read().find_by_email(email_key).cloned())
    }

    async fn find_by_phone(&self, phone_key: &str) -> anyhow::Result<Option<Account>> {
        Ok(self.index.read().find_by_phone(phone_key).cloned())
    }

    async fn find_by_account_number(
        &self,
        number: &AccountNumber,
    ) -> anyhow::Result<Option<Account>> {
        Ok(self.index.read().find_by_account_number(number).cloned())
    }

    async fn set(&self, account: &Account) -> anyhow::Result<()> {
        let mut writer = self.writer.lock();
        let mut index = self.index.write();

        Self::record(
            &mut writer,
            &JournalEntry::Upsert {
                account: account.clone(),
            },
        )?;
        index.upsert(account.clone());
        Ok(())
    }

    async fn delete(&self, identity: &IdentityNumber) -> anyhow::Result<bool> {
        let mut writer = self.writer.lock();
        let mut index = self.index.write();

        if index.get(identity).is_none() {
            return Ok(false);
        }
        Self::record(
            &mut writer,
            &JournalEntry::Delete {
                identity_number: identity.clone(),
            },
        )?;
        Ok(index.remove(identity).is_some())
    }

    async fn compare_and_insert(&self, account: &Account) -> anyhow::Result<InsertOutcome> {
        let mut writer = self.writer.lock();
        let mut index = self.index.write();

        if let Some((field, existing)) = index.conflict(account) {
            return Ok(InsertOutcome::Conflict {
                field,
                existing: Box::new(existing.clone()),
            });
        }

        Self::record(
            &mut writer,
            &JournalEntry::Upsert {
                account: account.clone(),
            },
        )?;
        index.upsert(account.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn compare_and_set_tier(
        &self,
        identity: &IdentityNumber,
        expected: u8,
        tier: u8,
    ) -> anyhow::Result<TierUpdate> {
        let mut writer = self.writer.lock();
        let mut index = self.index.write();

        let account = match index.prepare_tier(identity, expected, tier) {
            TierUpdate::Updated(account) => account,
            unchanged => return Ok(unchanged),
        };

        Self::record(
            &mut writer,
            &JournalEntry::Upsert {
                account: account.clone(),
            },
        )?;
        index.upsert(account.clone());
        Ok(TierUpdate::Updated(account))
    }

    async fn count(&self) -> anyhow::Result<usize> {
        Ok(self.index.read().len())
    }
}

//! Persistent badge configuration.
//!
//! A string-keyed byte-valued map with `get`/`set`/`flush`. The well-known
//! keys and their fallbacks live in [`keys`] and the typed accessors of
//! [`ConfigExt`]; unknown keys are permitted and survive untouched.
//!
//! Two implementations: [`MemoryConfig`] for tests and simulation, and
//! [`RedbConfig`] persisting to a database file (by convention
//! `/data/config` on the badge filesystem).

use std::{
    collections::BTreeMap,
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::ConfigError;

/// Well-known configuration keys.
pub mod keys {
    /// Display name used in chat, at most 10 bytes.
    pub const ALIAS: &str = "alias";
    /// Display name for the nametag app.
    pub const NAMETAG: &str = "nametag";
    /// Radio transmit power in dBm.
    pub const RADIO_TX_POWER: &str = "radio_tx_power";
    /// TTL for outgoing chat messages.
    pub const CHAT_TTL: &str = "chat_ttl";
    /// Extra pause between transmissions, in milliseconds.
    pub const SEND_COOLDOWN_MS: &str = "send_cooldown_ms";
}

/// String-keyed byte-valued persistent map.
///
/// Implementations are shared between apps as `Arc<dyn ConfigStore>`;
/// methods take `&self` and synchronize internally.
pub trait ConfigStore: Send + Sync {
    /// Value stored under a key, if any.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store a value under a key.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), ConfigError>;

    /// Persist pending writes to stable storage.
    fn flush(&self) -> Result<(), ConfigError>;

    /// All entries, sorted by key (for the config manager listing).
    fn entries(&self) -> Vec<(String, Vec<u8>)>;
}

/// Typed accessors with the documented defaults and clamping.
///
/// Invalid stored values are logged and fall back to the default.
pub trait ConfigExt: ConfigStore {
    /// `alias`, truncated to at most 10 bytes. Empty when unset.
    ///
    /// Byte 10 may fall inside a multibyte character (the store accepts
    /// arbitrary UTF-8, including via signed overrides); the cut lands on
    /// the last character boundary that fits.
    fn alias(&self) -> String {
        let mut alias = self.get_str(keys::ALIAS).unwrap_or_default();
        if alias.len() > 10 {
            let cut = alias
                .char_indices()
                .map(|(i, _)| i)
                .take_while(|&i| i <= 10)
                .last()
                .unwrap_or(0);
            alias.truncate(cut);
        }
        alias
    }

    /// `nametag` display name.
    fn nametag(&self) -> String {
        self.get_str(keys::NAMETAG).unwrap_or_else(|| "Your Name Here!".to_owned())
    }

    /// `radio_tx_power` in dBm, default 9.
    fn radio_tx_power(&self) -> i8 {
        self.get_parsed(keys::RADIO_TX_POWER).unwrap_or(9)
    }

    /// `chat_ttl`, default 3, clamped to the 4-bit TTL field.
    fn chat_ttl(&self) -> u8 {
        self.get_parsed::<u8>(keys::CHAT_TTL).unwrap_or(3).min(15)
    }

    /// `send_cooldown_ms` as a duration, default 1 ms.
    fn send_cooldown(&self) -> Duration {
        Duration::from_millis(self.get_parsed(keys::SEND_COOLDOWN_MS).unwrap_or(1))
    }

    /// Seed every well-known key that is missing with its default.
    fn ensure_defaults(&self) -> Result<(), ConfigError> {
        let defaults: [(&str, &[u8]); 5] = [
            (keys::ALIAS, b""),
            (keys::NAMETAG, b"Your Name Here!"),
            (keys::RADIO_TX_POWER, b"9"),
            (keys::CHAT_TTL, b"3"),
            (keys::SEND_COOLDOWN_MS, b"1"),
        ];
        for (key, value) in defaults {
            if self.get(key).is_none() {
                self.set(key, value)?;
            }
        }
        Ok(())
    }

    /// Value decoded as UTF-8, `None` when missing or not text.
    fn get_str(&self, key: &str) -> Option<String> {
        let bytes = self.get(key)?;
        match String::from_utf8(bytes) {
            Ok(s) => Some(s),
            Err(_) => {
                tracing::warn!(key, "config value is not valid UTF-8, using default");
                None
            },
        }
    }

    /// Value parsed from its decimal text form, `None` when missing or
    /// malformed.
    fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        let text = self.get_str(key)?;
        match text.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(key, %text, "config value failed to parse, using default");
                None
            },
        }
    }
}

impl<T: ConfigStore + ?Sized> ConfigExt for T {}

/// In-memory configuration for tests and simulation.
#[derive(Debug, Default, Clone)]
pub struct MemoryConfig {
    entries: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryConfig {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfig {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), ConfigError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ConfigError::Storage("config mutex poisoned".into()))?;
        entries.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn flush(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    fn entries(&self) -> Vec<(String, Vec<u8>)> {
        self.entries
            .lock()
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

const CONFIG_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("config");

/// Durable configuration backed by a redb database file.
///
/// Writes go through in their own transaction, so `flush` has nothing left
/// to do; it exists to satisfy the store contract shared with buffered
/// implementations.
#[derive(Clone)]
pub struct RedbConfig {
    db: Arc<Database>,
}

impl RedbConfig {
    /// Open or create the database at the given path.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Storage`] when the file cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        let txn = db.begin_write().map_err(storage_err)?;
        {
            let _ = txn.open_table(CONFIG_TABLE).map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl ConfigStore for RedbConfig {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let txn = self.db.begin_read().ok()?;
        let table = txn.open_table(CONFIG_TABLE).ok()?;
        let value = table.get(key).ok()??;
        Some(value.value().to_vec())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), ConfigError> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = txn.open_table(CONFIG_TABLE).map_err(storage_err)?;
            table.insert(key, value).map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    fn entries(&self) -> Vec<(String, Vec<u8>)> {
        let Ok(txn) = self.db.begin_read() else { return Vec::new() };
        let Ok(table) = txn.open_table(CONFIG_TABLE) else { return Vec::new() };
        let Ok(iter) = table.iter() else { return Vec::new() };

        let mut entries: Vec<(String, Vec<u8>)> = iter
            .filter_map(|result| {
                let (key, value) = result.ok()?;
                Some((key.value().to_owned(), value.value().to_vec()))
            })
            .collect();
        entries.sort();
        entries
    }
}

fn storage_err(err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Storage(err.to_string())
}

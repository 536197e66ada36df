//! Persistence of the price window across wake cycles
//!
//! The device keeps no RAM across deep sleep, so the window is written to a
//! key-value store as one fixed-size blob after every successful fetch and
//! read back at the start of the next cycle. Writes are whole-blob
//! overwrites; a blob torn by power loss fails to decode and is treated as a
//! cold start.

mod codec;

pub use codec::{DecodeError, MAGIC, SCHEMA_VERSION, WINDOW_SIZE};

extern crate alloc;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::convert::Infallible;
use core::fmt::Debug;

use log::{error, info, warn};
use thiserror_no_std::Error;

use crate::prices::PriceWindow;
use crate::time::Timestamp;

/// Key the price window blob is stored under
pub const WINDOW_KEY: &str = "price_window";

/// Byte-oriented key-value storage, e.g. an NVS partition on flash
pub trait KeyValueStore {
    /// Backend specific failure
    type Error: Debug;

    /// Read the blob stored under `key`, `None` if there is none
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Replace the blob stored under `key`
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Errors talking to the key-value store
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("Failed to read {key} from storage")]
    Read { key: &'static str },

    #[error("Failed to write {key} to storage")]
    Write { key: &'static str },
}

/// Load the persisted window, falling back to a cold start
///
/// A missing, unreadable or undecodable blob all mean "no prior state";
/// this never fails.
pub fn load_window<K: KeyValueStore>(store: &mut K, now: Timestamp) -> PriceWindow {
    match store.get(WINDOW_KEY) {
        Ok(Some(bytes)) => match PriceWindow::deserialize(&bytes) {
            Ok(window) => {
                info!(
                    "Loaded price window last updated {}",
                    window.last_update()
                );
                window
            }
            Err(e) => {
                warn!("Discarding stored price window: {}", e);
                PriceWindow::cold_start(now)
            }
        },
        Ok(None) => {
            info!("No stored price window, starting cold");
            PriceWindow::cold_start(now)
        }
        Err(e) => {
            warn!("Failed to read stored price window: {:?}", e);
            PriceWindow::cold_start(now)
        }
    }
}

/// Persist the window as one blob
pub fn save_window<K: KeyValueStore>(
    store: &mut K,
    window: &PriceWindow,
) -> Result<(), StorageError> {
    store.put(WINDOW_KEY, &window.serialize()).map_err(|e| {
        error!("Failed to write price window: {:?}", e);
        StorageError::Write { key: WINDOW_KEY }
    })
}

/// RAM-backed store for hosts and tests
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw blob under `key`, if any
    pub fn raw(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }
}

impl KeyValueStore for MemoryStore {
    type Error = Infallible;

    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        self.entries.insert(String::from(key), bytes.to_vec());
        Ok(())
    }
}

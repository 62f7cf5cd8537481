//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`].
//!
//! - **`target_os = "espidf"`**: one `EspNvs` handle per call on the
//!   default NVS partition.  ESP-IDF commits are atomic per key.
//! - **host**: an in-memory map keyed `namespace::key`.
//!
//! The alarm config is stored as a single postcard blob and is validated
//! both before it is written and after it is read back.

#[cfg(not(target_os = "espidf"))]
use std::cell::RefCell;
#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::AlarmConfig;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

const CONFIG_NAMESPACE: &str = "powerwatch";
const CONFIG_KEY: &str = "alarmcfg";
/// Upper bound for the encoded config (strings dominate: 24 + 2 * 160 + 8).
const MAX_CONFIG_BLOB: usize = 512;

/// Backend failures, mapped to [`ConfigError`] at the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NvsError {
    /// The stored blob is larger than the read buffer.
    BufferTooSmall,
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    Io,
}

pub struct NvsAdapter {
    #[cfg(target_os = "espidf")]
    partition: EspDefaultNvsPartition,
    #[cfg(not(target_os = "espidf"))]
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Wrap the default NVS partition taken in `main`.
    #[cfg(target_os = "espidf")]
    pub fn new(partition: EspDefaultNvsPartition) -> Self {
        info!("NvsAdapter: ESP-IDF NVS");
        Self { partition }
    }

    /// In-memory simulation backend.
    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("NvsAdapter: simulation backend");
        Self {
            store: RefCell::new(HashMap::new()),
        }
    }

    #[cfg(target_os = "espidf")]
    fn open(&self, namespace: &str, write: bool) -> Result<EspNvs<NvsDefault>, NvsError> {
        EspNvs::new(self.partition.clone(), namespace, write).map_err(|e| {
            warn!("NVS: open '{}' failed: {}", namespace, e);
            NvsError::Io
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{namespace}::{key}")
    }

    /// Read `key` into `buf`; `Ok(None)` if absent.
    fn get(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<Option<usize>, NvsError> {
        #[cfg(target_os = "espidf")]
        {
            let nvs = self.open(namespace, false)?;
            match nvs.get_blob(key, buf) {
                Ok(found) => Ok(found.map(<[u8]>::len)),
                Err(e) => {
                    warn!("NVS: read {}::{} failed: {}", namespace, key, e);
                    Err(NvsError::Io)
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            let store = self.store.borrow();
            let Some(data) = store.get(&Self::composite_key(namespace, key)) else {
                return Ok(None);
            };
            let dst = buf.get_mut(..data.len()).ok_or(NvsError::BufferTooSmall)?;
            dst.copy_from_slice(data);
            Ok(Some(data.len()))
        }
    }

    fn put(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), NvsError> {
        #[cfg(target_os = "espidf")]
        {
            let mut nvs = self.open(namespace, true)?;
            nvs.set_blob(key, data).map_err(|e| {
                warn!("NVS: write {}::{} failed: {}", namespace, key, e);
                NvsError::Io
            })
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(Self::composite_key(namespace, key), data.to_vec());
            Ok(())
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<AlarmConfig, ConfigError> {
        let mut buf = [0u8; MAX_CONFIG_BLOB];
        let len = match self.get(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(Some(len)) => len,
            Ok(None) => {
                info!("NvsAdapter: no stored config, using defaults");
                return Ok(AlarmConfig::default());
            }
            Err(NvsError::BufferTooSmall) => return Err(ConfigError::Corrupted),
            Err(_) => return Err(ConfigError::IoError),
        };
        let cfg: AlarmConfig = postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        info!("NvsAdapter: loaded config ({} bytes)", len);
        Ok(cfg)
    }

    fn save(&self, config: &AlarmConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_CONFIG_BLOB {
            return Err(ConfigError::StorageFull);
        }
        self.put(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)
            .map_err(|_| ConfigError::IoError)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

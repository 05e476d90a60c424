//! Peripheral configuration.
//!
//! All tunables for the GUI server and its delivery worker. The owning
//! application decides where the blob lives (NVS, flash, compiled-in);
//! this module only validates and (de)serializes it.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::fragment::{DEFAULT_MAX_TRANSFER_LEN, MIN_CONTENT_BUDGET};
use crate::protocol::queue::QueueConfig;

pub type Name = heapless::String<32>;

/// Core GUI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiConfig {
    /// Advertised device name.
    pub device_name: Name,
    /// Model name exposed to clients; falls back to `device_name`.
    pub model_name: Option<Name>,
    /// Maximum simultaneously subscribed clients (0 is treated as 1).
    pub client_limit: u8,
    /// Smallest content budget worth transmitting with (never below 10).
    pub min_content_budget: u16,
    /// Delay between retries when the transport buffer is full (ms).
    pub retry_backoff_ms: u32,
    /// Delivery worker stack (KiB).
    pub worker_stack_kb: u16,
    /// Largest payload a receiver will reassemble (bytes).
    pub max_transfer_len: u32,
}

impl Default for GuiConfig {
    fn default() -> Self {
        let mut device_name = Name::new();
        let _ = device_name.push_str("BLE Remote");
        Self {
            device_name,
            model_name: None,
            client_limit: 1,
            min_content_budget: MIN_CONTENT_BUDGET,
            retry_backoff_ms: 10,
            worker_stack_kb: 8,
            max_transfer_len: DEFAULT_MAX_TRANSFER_LEN as u32,
        }
    }
}

impl GuiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.device_name.is_empty() {
            return Err(Error::Config("device_name must not be empty"));
        }
        if self.min_content_budget < MIN_CONTENT_BUDGET {
            return Err(Error::Config("min_content_budget below 10"));
        }
        if self.retry_backoff_ms == 0 || self.retry_backoff_ms > 1000 {
            return Err(Error::Config("retry_backoff_ms out of range 1..=1000"));
        }
        if self.worker_stack_kb < 4 {
            return Err(Error::Config("worker_stack_kb below 4"));
        }
        if self.max_transfer_len == 0 {
            return Err(Error::Config("max_transfer_len must be positive"));
        }
        Ok(())
    }

    pub fn model_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(self.device_name.as_str())
    }

    pub fn effective_client_limit(&self) -> usize {
        usize::from(self.client_limit.max(1))
    }

    pub fn effective_min_budget(&self) -> u16 {
        self.min_content_budget.max(MIN_CONTENT_BUDGET)
    }

    pub fn queue_config(&self) -> QueueConfig {
        let mut q = QueueConfig {
            retry_backoff: Duration::from_millis(u64::from(self.retry_backoff_ms.max(1))),
            client_limit: self.effective_client_limit(),
            ..QueueConfig::default()
        };
        q.worker.stack_kb = usize::from(self.worker_stack_kb);
        q
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::Config("serialize failed"))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let cfg: Self = postcard::from_bytes(bytes).map_err(|_| Error::Config("corrupt config blob"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

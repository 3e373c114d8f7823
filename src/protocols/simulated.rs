//! In-memory transport for tests and demos.
//!
//! `SimulatedTransport` does not touch the network. Register contents and
//! failures are scripted through a [`SimulatedHandle`], which stays usable
//! after the transport has been moved into a driver.
//!
//! # Example
//!
//! ```rust
//! use fieldgw::protocols::simulated::SimulatedTransport;
//!
//! let sim = SimulatedTransport::new("sim:102");
//! let handle = sim.handle();
//! handle.set_words("DB1.DBD0", vec![0x0000, 0x4228]);
//! handle.fail_read("checksum mismatch");
//! ```

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::core::config::DriverConfig;
use crate::core::data::Value;
use crate::core::error::{GatewayError, Result};
use crate::core::traits::{RawValue, Transport};
use crate::gateway::factory::TransportConnector;

/// Operation a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Open,
    Close,
    Read,
}

#[derive(Debug, Default)]
struct SimulatedState {
    /// address -> stored value
    registers: DashMap<String, RawValue>,
    /// Active failures and their messages.
    faults: DashMap<Fault, String>,
    connected: AtomicBool,
    /// Unknown addresses read as this word when `fill_enabled`.
    fill_enabled: AtomicBool,
    fill_word: AtomicU16,
    latency_ms: AtomicU64,
    read_count: AtomicU64,
}

/// Scripting side of a [`SimulatedTransport`].
#[derive(Debug, Clone)]
pub struct SimulatedHandle {
    state: Arc<SimulatedState>,
}

impl SimulatedHandle {
    /// Store raw registers at `address`, in device word order.
    pub fn set_words(&self, address: impl Into<String>, words: Vec<u16>) {
        self.state
            .registers
            .insert(address.into(), RawValue::Words(words));
    }

    /// Store an already-decoded value at `address`.
    pub fn set_value(&self, address: impl Into<String>, value: impl Into<Value>) {
        self.state
            .registers
            .insert(address.into(), RawValue::Scalar(value.into()));
    }

    pub fn remove(&self, address: &str) {
        self.state.registers.remove(address);
    }

    /// Answer reads of unknown addresses with `word` repeated instead of an error.
    pub fn fill_unknown(&self, word: u16) {
        self.state.fill_word.store(word, Ordering::Relaxed);
        self.state.fill_enabled.store(true, Ordering::Relaxed);
    }

    /// Make every `open` fail with `message` until cleared.
    pub fn fail_open(&self, message: impl Into<String>) {
        self.state.faults.insert(Fault::Open, message.into());
    }

    /// Make every `close` fail with `message` until cleared.
    pub fn fail_close(&self, message: impl Into<String>) {
        self.state.faults.insert(Fault::Close, message.into());
    }

    /// Make every `read` fail with `message` until cleared.
    pub fn fail_read(&self, message: impl Into<String>) {
        self.state.faults.insert(Fault::Read, message.into());
    }

    pub fn clear_fault(&self, fault: Fault) {
        self.state.faults.remove(&fault);
    }

    pub fn clear_faults(&self) {
        self.state.faults.clear();
    }

    /// Delay applied to every operation.
    pub fn set_latency(&self, latency: Duration) {
        self.state
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Simulate the peer going away: the transport reports disconnected.
    pub fn drop_connection(&self) {
        self.state.connected.store(false, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    /// Number of reads that reached the transport.
    pub fn read_count(&self) -> u64 {
        self.state.read_count.load(Ordering::Relaxed)
    }
}

/// Transport backed by an in-memory register map.
#[derive(Debug)]
pub struct SimulatedTransport {
    endpoint: String,
    state: Arc<SimulatedState>,
}

impl SimulatedTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            state: Arc::new(SimulatedState::default()),
        }
    }

    /// Pre-load registers at `address`.
    #[must_use]
    pub fn with_words(self, address: impl Into<String>, words: Vec<u16>) -> Self {
        self.handle().set_words(address, words);
        self
    }

    /// Scripting handle sharing this transport's state.
    pub fn handle(&self) -> SimulatedHandle {
        SimulatedHandle {
            state: Arc::clone(&self.state),
        }
    }

    async fn delay(&self) {
        let ms = self.state.latency_ms.load(Ordering::Relaxed);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn fault(&self, fault: Fault) -> Option<String> {
        self.state.faults.get(&fault).map(|m| m.value().clone())
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    async fn open(&mut self) -> Result<()> {
        self.delay().await;
        if let Some(message) = self.fault(Fault::Open) {
            return Err(GatewayError::Connection(message));
        }
        self.state.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.delay().await;
        if let Some(message) = self.fault(Fault::Close) {
            return Err(GatewayError::Connection(message));
        }
        self.state.connected.store(false, Ordering::Release);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    async fn read(&mut self, address: &str, word_count: usize) -> Result<RawValue> {
        self.delay().await;
        self.state.read_count.fetch_add(1, Ordering::Relaxed);

        if !self.is_connected() {
            return Err(GatewayError::NotConnected);
        }
        if let Some(message) = self.fault(Fault::Read) {
            return Err(GatewayError::protocol(message));
        }

        let stored = match self.state.registers.get(address) {
            Some(entry) => entry.value().clone(),
            None if self.state.fill_enabled.load(Ordering::Relaxed) => {
                let word = self.state.fill_word.load(Ordering::Relaxed);
                RawValue::Words(vec![word; word_count])
            }
            None => {
                return Err(GatewayError::protocol(format!(
                    "no data at address {}",
                    address
                )))
            }
        };

        // Longer blocks are truncated like a real register read; shorter ones
        // are handed on so the decoder reports the count mismatch.
        Ok(match stored {
            RawValue::Words(mut words) if words.len() > word_count => {
                words.truncate(word_count);
                RawValue::Words(words)
            }
            other => other,
        })
    }
}

/// Connector handing out one [`SimulatedTransport`] per device.
///
/// Handles stay reachable by device id for scripting.
#[derive(Debug, Default)]
pub struct SimulatedConnector {
    handles: DashMap<Uuid, SimulatedHandle>,
    fill: Option<u16>,
}

impl SimulatedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// New transports answer unknown addresses with `word` (see [`SimulatedHandle::fill_unknown`]).
    #[must_use]
    pub fn with_fill(mut self, word: u16) -> Self {
        self.fill = Some(word);
        self
    }

    /// Scripting handle of the transport created for `device_id`.
    pub fn handle(&self, device_id: Uuid) -> Option<SimulatedHandle> {
        self.handles.get(&device_id).map(|h| h.value().clone())
    }
}

impl TransportConnector for SimulatedConnector {
    fn create(
        &self,
        driver: &str,
        config: &DriverConfig,
        _parameters: &serde_json::Value,
    ) -> Result<Box<dyn Transport>> {
        let transport = SimulatedTransport::new(config.endpoint());
        let handle = transport.handle();
        if let Some(word) = self.fill {
            handle.fill_unknown(word);
        }
        self.handles.insert(config.device_id(), handle);
        tracing::debug!(driver, device_id = %config.device_id(), "Created simulated transport");
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_open_read_close() {
        let mut sim = SimulatedTransport::new("sim:502").with_words("100", vec![1, 2, 3]);
        assert!(!sim.is_connected());

        sim.open().await.unwrap();
        assert!(sim.is_connected());

        let raw = sim.read("100", 2).await.unwrap();
        assert_eq!(raw, RawValue::Words(vec![1, 2]));
        assert_eq!(sim.handle().read_count(), 1);

        sim.close().await.unwrap();
        assert!(!sim.is_connected());
    }

    #[tokio::test]
    async fn test_simulated_faults() {
        let mut sim = SimulatedTransport::new("sim:502");
        let handle = sim.handle();

        handle.fail_open("refused");
        assert_eq!(
            sim.open().await,
            Err(GatewayError::Connection("refused".into()))
        );

        handle.clear_faults();
        sim.open().await.unwrap();

        handle.fail_read("crc error");
        let err = sim.read("100", 1).await.unwrap_err();
        assert!(err.to_string().contains("crc error"));

        handle.clear_fault(Fault::Read);
        let err = sim.read("100", 1).await.unwrap_err();
        assert!(err.to_string().contains("no data at address 100"));

        handle.fill_unknown(0xFFFF);
        assert_eq!(
            sim.read("100", 2).await.unwrap(),
            RawValue::Words(vec![0xFFFF, 0xFFFF])
        );
    }

    #[tokio::test]
    async fn test_simulated_drop_connection() {
        let mut sim = SimulatedTransport::new("sim:502");
        let handle = sim.handle();
        handle.set_value("M0.0", true);

        sim.open().await.unwrap();
        assert_eq!(
            sim.read("M0.0", 1).await.unwrap(),
            RawValue::Scalar(Value::Bool(true))
        );

        handle.drop_connection();
        assert!(!sim.is_connected());
        assert_eq!(sim.read("M0.0", 1).await, Err(GatewayError::NotConnected));
    }
}

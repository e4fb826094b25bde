//! Scriptable in-memory transport for tests.

use super::fanout::NotifyFanout;
use super::{BleTransport, CharacteristicRef, NotificationStream, WriteMode};
use crate::error::TransportError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    connected: bool,
    hang_reads: bool,
    reads: HashMap<CharacteristicRef, Vec<u8>>,
    read_failures: HashMap<CharacteristicRef, TransportError>,
    write_failures: HashMap<CharacteristicRef, TransportError>,
    ensure_results: VecDeque<Result<(), TransportError>>,
    ensure_calls: usize,
    disconnect_calls: usize,
    writes: Vec<(CharacteristicRef, Vec<u8>)>,
    subscribers: HashMap<CharacteristicRef, NotifyFanout>,
}

pub(crate) struct FakeTransport {
    address: String,
    state: Mutex<State>,
}

impl FakeTransport {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            state: Mutex::new(State {
                connected: true,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn set_read(&self, characteristic: CharacteristicRef, value: &[u8]) {
        self.state().reads.insert(characteristic, value.to_vec());
    }

    pub fn fail_reads_of(&self, characteristic: CharacteristicRef, error: TransportError) {
        self.state().read_failures.insert(characteristic, error);
    }

    pub fn fail_writes_to(&self, characteristic: CharacteristicRef, error: TransportError) {
        self.state().write_failures.insert(characteristic, error);
    }

    /// Queue the outcome of the next `ensure_characteristics` call.
    pub fn push_ensure_result(&self, result: Result<(), TransportError>) {
        self.state().ensure_results.push_back(result);
    }

    pub fn hang_reads(&self) {
        self.state().hang_reads = true;
    }

    pub fn ensure_calls(&self) -> usize {
        self.state().ensure_calls
    }

    pub fn disconnect_calls(&self) -> usize {
        self.state().disconnect_calls
    }

    pub fn writes(&self) -> Vec<(CharacteristicRef, Vec<u8>)> {
        self.state().writes.clone()
    }

    pub fn writes_to(&self, characteristic: CharacteristicRef) -> Vec<Vec<u8>> {
        self.state()
            .writes
            .iter()
            .filter(|(c, _)| *c == characteristic)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn notify(&self, characteristic: CharacteristicRef, value: Vec<u8>) {
        let fanout = self.state().subscribers.get(&characteristic).cloned();
        if let Some(fanout) = fanout {
            fanout.publish(&value);
        }
    }

    /// Simulate a link drop: subsequent calls fail, streams end.
    pub fn drop_link(&self) {
        let mut state = self.state();
        state.connected = false;
        for (_, fanout) in state.subscribers.drain() {
            fanout.close();
        }
    }
}

#[async_trait]
impl BleTransport for FakeTransport {
    fn address(&self) -> &str {
        &self.address
    }

    async fn is_connected(&self) -> bool {
        self.state().connected
    }

    async fn ensure_characteristics(
        &self,
        _characteristics: &[CharacteristicRef],
    ) -> Result<(), TransportError> {
        let mut state = self.state();
        state.ensure_calls += 1;
        if !state.connected {
            return Err(TransportError::Disconnected);
        }
        state.ensure_results.pop_front().unwrap_or(Ok(()))
    }

    async fn read(&self, characteristic: CharacteristicRef) -> Result<Vec<u8>, TransportError> {
        let hang = {
            let state = self.state();
            if !state.connected {
                return Err(TransportError::Disconnected);
            }
            if let Some(err) = state.read_failures.get(&characteristic) {
                return Err(err.clone());
            }
            state.hang_reads
        };
        if hang {
            futures::future::pending::<()>().await;
        }
        self.state()
            .reads
            .get(&characteristic)
            .cloned()
            .ok_or(TransportError::CharacteristicNotFound {
                service: characteristic.service,
                characteristic: characteristic.characteristic,
            })
    }

    async fn write(
        &self,
        characteristic: CharacteristicRef,
        value: &[u8],
        _mode: WriteMode,
    ) -> Result<(), TransportError> {
        let mut state = self.state();
        if !state.connected {
            return Err(TransportError::Disconnected);
        }
        if let Some(err) = state.write_failures.get(&characteristic) {
            return Err(err.clone());
        }
        state.writes.push((characteristic, value.to_vec()));
        Ok(())
    }

    async fn subscribe(
        &self,
        characteristic: CharacteristicRef,
    ) -> Result<NotificationStream, TransportError> {
        let mut state = self.state();
        if !state.connected {
            return Err(TransportError::Disconnected);
        }
        Ok(state.subscribers.entry(characteristic).or_default().subscribe())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.state().disconnect_calls += 1;
        self.drop_link();
        Ok(())
    }
}

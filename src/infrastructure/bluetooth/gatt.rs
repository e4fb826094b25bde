//! Bounded access to a transport.
//!
//! Every operation is raced against the operation timeout and the owning
//! connection's cancellation token, so a dropped link never blocks a caller.

use super::{BleTransport, CharacteristicRef, NotificationStream, WriteMode};
use crate::error::TransportError;
use crate::protocol::OperationRequest;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Clone)]
pub struct GattClient {
    transport: Arc<dyn BleTransport>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl GattClient {
    pub fn new(transport: Arc<dyn BleTransport>, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            transport,
            timeout,
            cancel,
        }
    }

    pub fn address(&self) -> &str {
        self.transport.address()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn is_connected(&self) -> bool {
        !self.cancel.is_cancelled() && self.transport.is_connected().await
    }

    /// Token that fires when the owning connection is torn down.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(TransportError::Cancelled),
            result = tokio::time::timeout(self.timeout, fut) => match result {
                Ok(inner) => inner,
                Err(_) => Err(TransportError::Timeout {
                    operation,
                    timeout: self.timeout,
                }),
            },
        }
    }

    pub async fn ensure_characteristics(
        &self,
        characteristics: &[CharacteristicRef],
    ) -> Result<(), TransportError> {
        self.bounded(
            "discover",
            self.transport.ensure_characteristics(characteristics),
        )
        .await
    }

    pub async fn read(&self, characteristic: CharacteristicRef) -> Result<Vec<u8>, TransportError> {
        let value = self
            .bounded("read", self.transport.read(characteristic))
            .await?;
        trace!(
            "Read {} -> {:02X?}",
            characteristic.characteristic,
            value
        );
        Ok(value)
    }

    pub async fn write(
        &self,
        characteristic: CharacteristicRef,
        value: &[u8],
    ) -> Result<(), TransportError> {
        trace!("Write {} <- {:02X?}", characteristic.characteristic, value);
        self.bounded(
            "write",
            self.transport
                .write(characteristic, value, WriteMode::WithResponse),
        )
        .await
    }

    pub async fn send(
        &self,
        characteristic: CharacteristicRef,
        request: OperationRequest,
    ) -> Result<(), TransportError> {
        self.write(characteristic, &request.as_bytes()).await
    }

    /// Subscribe; the stream ends when the connection is torn down.
    pub async fn subscribe(
        &self,
        characteristic: CharacteristicRef,
    ) -> Result<NotificationStream, TransportError> {
        let stream = self
            .bounded("subscribe", self.transport.subscribe(characteristic))
            .await?;
        let token = self.cancel.clone();
        Ok(stream
            .take_until(async move { token.cancelled().await })
            .boxed())
    }

    pub async fn disconnect(&self) -> Result<(), TransportError> {
        tokio::time::timeout(self.timeout, self.transport.disconnect())
            .await
            .map_err(|_| TransportError::Timeout {
                operation: "disconnect",
                timeout: self.timeout,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::fake::FakeTransport;
    use uuid::Uuid;

    const CHAR: CharacteristicRef = CharacteristicRef::new(Uuid::from_u128(1), Uuid::from_u128(2));

    #[tokio::test]
    async fn test_cancelled_client_fails_fast() {
        let fake = Arc::new(FakeTransport::new("AA"));
        let cancel = CancellationToken::new();
        let client = GattClient::new(fake.clone(), Duration::from_secs(5), cancel.clone());

        cancel.cancel();
        assert_eq!(client.read(CHAR).await, Err(TransportError::Cancelled));
        assert!(fake.writes().is_empty());
    }

    #[tokio::test]
    async fn test_hanging_read_times_out() {
        let fake = Arc::new(FakeTransport::new("AA"));
        fake.hang_reads();
        let client = GattClient::new(fake, Duration::from_millis(20), CancellationToken::new());

        let err = client.read(CHAR).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout { operation: "read", .. }));
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_subscription_ends_on_cancel() {
        let fake = Arc::new(FakeTransport::new("AA"));
        let cancel = CancellationToken::new();
        let client = GattClient::new(fake.clone(), Duration::from_secs(5), cancel.clone());

        let mut stream = client.subscribe(CHAR).await.unwrap();
        fake.notify(CHAR, vec![1]);
        assert_eq!(stream.next().await, Some(vec![1]));

        cancel.cancel();
        assert_eq!(stream.next().await, None);
    }
}

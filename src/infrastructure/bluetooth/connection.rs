//! Camera Connection Module
//!
//! Owns one device session and hands out its remote control delegate.

use super::{BleTransport, GattClient};
use crate::domain::models::{
    Camera, CameraEvent, ConnectionStatus, MessageSeverity, StatusMessage,
};
use crate::domain::settings::BleSettings;
use crate::remote::{RemoteControlDelegate, WifiLink};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of the cached delegate.
enum DelegateSlot {
    Uninitialized,
    Ready(Arc<RemoteControlDelegate>),
    /// Creation failed; the next access tries again.
    FailedLastAttempt,
}

/// Live session with one camera
///
/// Single owner: callers serialize access, so delegate creation needs no
/// internal locking.
pub struct CameraConnection {
    camera: Camera,
    gatt: GattClient,
    wifi: Arc<dyn WifiLink>,
    settings: BleSettings,
    cancel: CancellationToken,
    delegate: DelegateSlot,
    event_sender: mpsc::UnboundedSender<CameraEvent>,
}

impl CameraConnection {
    /// Wrap an established transport session
    pub fn new(
        camera: Camera,
        transport: Arc<dyn BleTransport>,
        wifi: Arc<dyn WifiLink>,
        settings: BleSettings,
        event_sender: mpsc::UnboundedSender<CameraEvent>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let gatt = GattClient::new(transport, settings.operation_timeout(), cancel.clone());

        info!("Connection opened for {} ({})", camera.name, camera.address);
        let _ = event_sender.send(CameraEvent::ConnectionStatus(ConnectionStatus::Connected));

        Self {
            camera,
            gatt,
            wifi,
            settings,
            cancel,
            delegate: DelegateSlot::Uninitialized,
            event_sender,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Connected and not torn down
    pub async fn is_connected(&self) -> bool {
        self.gatt.is_connected().await
    }

    /// Get the remote control delegate, creating it on first use
    ///
    /// A successful delegate is cached and returned unchanged afterwards. A
    /// failed creation caches nothing: this call returns `None` and the next
    /// call attempts creation once more.
    pub async fn remote_control_delegate(&mut self) -> Option<Arc<RemoteControlDelegate>> {
        if let DelegateSlot::Ready(delegate) = &self.delegate {
            return Some(delegate.clone());
        }
        if matches!(self.delegate, DelegateSlot::FailedLastAttempt) {
            debug!("Retrying delegate creation for {}", self.camera.address);
            self.delegate = DelegateSlot::Uninitialized;
        }

        match self
            .camera
            .vendor
            .create_delegate(self.gatt.clone(), self.wifi.clone(), &self.settings)
            .await
        {
            Ok(delegate) => {
                let delegate = Arc::new(delegate);
                self.delegate = DelegateSlot::Ready(delegate.clone());
                self.send_log("Remote control ready", MessageSeverity::Success);
                Some(delegate)
            }
            Err(e) => {
                warn!(
                    "Could not create remote control for {}: {}",
                    self.camera.address, e
                );
                self.delegate = DelegateSlot::FailedLastAttempt;
                self.send_log(
                    &format!("Remote control unavailable: {}", e),
                    MessageSeverity::Warning,
                );
                None
            }
        }
    }

    /// Tear down the session
    ///
    /// Cancels in-flight commands and observation streams, drops the cached
    /// delegate and disconnects the transport. Calling twice is harmless.
    pub async fn disconnect(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }

        let slot = std::mem::replace(&mut self.delegate, DelegateSlot::Uninitialized);
        if let DelegateSlot::Ready(delegate) = slot {
            delegate.disconnect_wifi().await;
        }

        self.cancel.cancel();
        if let Err(e) = self.gatt.disconnect().await {
            warn!("Transport disconnect for {} failed: {}", self.camera.address, e);
        }

        info!("Disconnected from {}", self.camera.address);
        let _ = self
            .event_sender
            .send(CameraEvent::ConnectionStatus(ConnectionStatus::Disconnected));
        self.send_log("Disconnected", MessageSeverity::Info);
    }

    /// Send a log message
    fn send_log(&self, message: &str, severity: MessageSeverity) {
        let _ = self.event_sender.send(CameraEvent::LogMessage(StatusMessage {
            message: message.to_string(),
            severity,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::infrastructure::bluetooth::fake::FakeTransport;
    use crate::remote::wifi::fake::FakeWifiLink;
    use crate::vendor::{sony, Vendor};
    use futures::StreamExt;

    fn camera() -> Camera {
        Camera {
            id: "sony:AA:BB".into(),
            name: "ILCE-7M4".into(),
            address: "AA:BB".into(),
            vendor: Vendor::Sony,
        }
    }

    fn connection(
        fake: Arc<FakeTransport>,
    ) -> (CameraConnection, mpsc::UnboundedReceiver<CameraEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = CameraConnection::new(
            camera(),
            fake,
            Arc::new(FakeWifiLink::default()),
            BleSettings::default(),
            tx,
        );
        (connection, rx)
    }

    #[tokio::test]
    async fn test_delegate_is_cached() {
        let fake = Arc::new(FakeTransport::new("AA:BB"));
        let (mut connection, _rx) = connection(fake.clone());

        let first = connection.remote_control_delegate().await.unwrap();
        let second = connection.remote_control_delegate().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fake.ensure_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_creation_retries_on_next_call() {
        let fake = Arc::new(FakeTransport::new("AA:BB"));
        fake.push_ensure_result(Err(TransportError::CharacteristicNotFound {
            service: sony::DESCRIPTOR.battery.service,
            characteristic: sony::DESCRIPTOR.battery.characteristic,
        }));
        let (mut connection, _rx) = connection(fake.clone());

        assert!(connection.remote_control_delegate().await.is_none());
        assert_eq!(fake.ensure_calls(), 1);

        assert!(connection.remote_control_delegate().await.is_some());
        assert_eq!(fake.ensure_calls(), 2);

        connection.remote_control_delegate().await.unwrap();
        assert_eq!(fake.ensure_calls(), 2);
    }

    #[tokio::test]
    async fn test_disconnect_ends_streams_and_is_idempotent() {
        let fake = Arc::new(FakeTransport::new("AA:BB"));
        let (mut connection, _rx) = connection(fake.clone());
        let delegate = connection.remote_control_delegate().await.unwrap();
        let mut battery = delegate.observe_battery().await.unwrap();

        connection.disconnect().await;
        connection.disconnect().await;

        assert_eq!(battery.next().await, None);
        assert_eq!(fake.disconnect_calls(), 1);
        assert!(!connection.is_connected().await);

        let err = delegate.trigger_shutter().await.unwrap_err();
        assert!(err.is_transport_unavailable());
        assert!(connection.remote_control_delegate().await.is_none());
        assert_eq!(fake.ensure_calls(), 1);
    }

    #[tokio::test]
    async fn test_connection_events() {
        let fake = Arc::new(FakeTransport::new("AA:BB"));
        let (mut connection, mut rx) = connection(fake);
        connection.disconnect().await;

        let mut statuses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let CameraEvent::ConnectionStatus(status) = event {
                statuses.push(status);
            }
        }
        assert_eq!(
            statuses,
            vec![ConnectionStatus::Connected, ConnectionStatus::Disconnected]
        );
    }
}

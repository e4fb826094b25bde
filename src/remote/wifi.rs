//! Phone-side Wi-Fi collaborators used by connection mode escalation.

use crate::domain::models::{LiveViewFrame, TouchPoint};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use std::sync::Arc;

/// Access point credentials read from the camera.
#[derive(Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: String,
    pub passphrase: String,
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Joins and leaves the camera's access point.
#[async_trait]
pub trait WifiLink: Send + Sync {
    async fn join(
        &self,
        credentials: &WifiCredentials,
    ) -> anyhow::Result<Arc<dyn HighBandwidthChannel>>;

    async fn leave(&self) -> anyhow::Result<()>;
}

/// Session over the camera's access point.
#[async_trait]
pub trait HighBandwidthChannel: Send + Sync {
    async fn live_view(&self) -> anyhow::Result<BoxStream<'static, LiveViewFrame>>;

    async fn touch_af(&self, point: TouchPoint) -> anyhow::Result<()>;

    async fn close(&self) -> anyhow::Result<()>;
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use bytes::Bytes;
    use futures::StreamExt;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct FakeWifiLink {
        pub fail_join: bool,
        joined: Mutex<Vec<WifiCredentials>>,
        leaves: Mutex<usize>,
        pub channel: Arc<FakeChannel>,
    }

    impl FakeWifiLink {
        pub fn failing() -> Self {
            Self {
                fail_join: true,
                ..Default::default()
            }
        }

        pub fn joined(&self) -> Vec<WifiCredentials> {
            self.joined.lock().unwrap().clone()
        }

        pub fn leaves(&self) -> usize {
            *self.leaves.lock().unwrap()
        }
    }

    #[async_trait]
    impl WifiLink for FakeWifiLink {
        async fn join(
            &self,
            credentials: &WifiCredentials,
        ) -> anyhow::Result<Arc<dyn HighBandwidthChannel>> {
            if self.fail_join {
                anyhow::bail!("association rejected");
            }
            self.joined.lock().unwrap().push(credentials.clone());
            Ok(self.channel.clone())
        }

        async fn leave(&self) -> anyhow::Result<()> {
            *self.leaves.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeChannel {
        touches: Mutex<Vec<TouchPoint>>,
        closed: Mutex<bool>,
    }

    impl FakeChannel {
        pub fn touches(&self) -> Vec<TouchPoint> {
            self.touches.lock().unwrap().clone()
        }

        pub fn is_closed(&self) -> bool {
            *self.closed.lock().unwrap()
        }
    }

    #[async_trait]
    impl HighBandwidthChannel for FakeChannel {
        async fn live_view(&self) -> anyhow::Result<BoxStream<'static, LiveViewFrame>> {
            let frames = vec![LiveViewFrame {
                jpeg: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]),
            }];
            Ok(futures::stream::iter(frames).boxed())
        }

        async fn touch_af(&self, point: TouchPoint) -> anyhow::Result<()> {
            self.touches.lock().unwrap().push(point);
            Ok(())
        }

        async fn close(&self) -> anyhow::Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }
}

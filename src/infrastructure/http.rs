//! HTTP seam for firmware checks.

use crate::domain::settings::FirmwareSettings;
use crate::error::HttpError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body of a 2xx response, or `HttpError::Status`.
    pub fn into_success_body(self) -> Result<String, HttpError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(HttpError::Status(self.status))
        }
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError>;

    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse, HttpError>;
}

/// `reqwest` client with connect and overall timeouts
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::Request(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    /// Client using the configured firmware timeout (10 s by default).
    pub fn from_settings(settings: &FirmwareSettings) -> Result<Self, HttpError> {
        Self::new(settings.http_timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn finish(response: reqwest::Response) -> Result<HttpResponse, HttpError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_error)?;
        debug!("HTTP {} ({} bytes)", status, body.len());
        Ok(HttpResponse { status, body })
    }
}

fn map_error(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout
    } else {
        HttpError::Request(e.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_error)?;
        Self::finish(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse, HttpError> {
        debug!("POST {}", url);
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await.map_err(map_error)?;
        Self::finish(response).await
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct RecordedRequest {
        pub method: &'static str,
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub body: Option<serde_json::Value>,
    }

    /// Replays queued responses and records requests.
    #[derive(Default)]
    pub(crate) struct FakeHttpClient {
        responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl FakeHttpClient {
        pub fn respond(&self, status: u16, body: &str) {
            self.responses.lock().unwrap().push_back(Ok(HttpResponse {
                status,
                body: body.to_string(),
            }));
        }

        pub fn fail(&self, error: HttpError) {
            self.responses.lock().unwrap().push_back(Err(error));
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn next(&self, request: RecordedRequest) -> Result<HttpResponse, HttpError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(HttpError::Request("no scripted response".into())))
        }
    }

    #[async_trait]
    impl HttpClient for FakeHttpClient {
        async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
            self.next(RecordedRequest {
                method: "GET",
                url: url.to_string(),
                headers: Vec::new(),
                body: None,
            })
        }

        async fn post_json(
            &self,
            url: &str,
            headers: &[(&str, &str)],
            body: &serde_json::Value,
        ) -> Result<HttpResponse, HttpError> {
            self.next(RecordedRequest {
                method: "POST",
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: Some(body.clone()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_uses_configured_timeout() {
        let client = ReqwestHttpClient::from_settings(&FirmwareSettings::default()).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(10));

        let settings = FirmwareSettings {
            http_timeout_secs: 3,
            ..Default::default()
        };
        let client = ReqwestHttpClient::from_settings(&settings).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_non_success_status_is_error() {
        let ok = HttpResponse {
            status: 204,
            body: String::new(),
        };
        assert_eq!(ok.into_success_body(), Ok(String::new()));

        let unavailable = HttpResponse {
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(unavailable.into_success_body(), Err(HttpError::Status(503)));
    }
}

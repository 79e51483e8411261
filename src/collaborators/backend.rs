//! # Line backend.
//!
//! [`Backend`] is the line's business server: it tells the supervisor how many
//! codes each pack must carry and whether the line runs in `auto` mode, and it
//! receives the code pairs of decided packs.
//!
//! ## Payload contract
//! ```text
//! GET /api/v1_0/get_mode                  → {"work_mode": "auto"}
//! GET /api/v1_0/current_batch             → {"params": {"multipacks_after_pintset": 2}}
//! PUT /api/v1_0/new_pack_after_pintset    ← {"qr": "...", "barcode": "..."}   (once per pair)
//! ```
//! [`HttpBackend`] (feature `http`) implements the contract with `reqwest`.

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::packs::{CodePair, WorkMode};

pub const WORK_MODE_PATH: &str = "/api/v1_0/get_mode";
pub const CURRENT_BATCH_PATH: &str = "/api/v1_0/current_batch";
pub const NEW_PACK_PATH: &str = "/api/v1_0/new_pack_after_pintset";

/// Business backend of the line.
///
/// Calls are made from spawned tasks; implementations should bound their own latency.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Current line work mode.
    async fn work_mode(&self) -> Result<WorkMode, CollaboratorError>;

    /// Number of QR/barcode pairs every pack of the current batch carries.
    async fn expected_codes_count(&self) -> Result<usize, CollaboratorError>;

    /// Reports one pair of a decided pack.
    async fn send_codepair(&self, pair: &CodePair) -> Result<(), CollaboratorError>;
}

#[cfg(feature = "http")]
pub use http::HttpBackend;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde::Deserialize;
    use serde::de::DeserializeOwned;

    use super::{Backend, CURRENT_BATCH_PATH, NEW_PACK_PATH, WORK_MODE_PATH};
    use crate::error::CollaboratorError;
    use crate::packs::{CodePair, WorkMode};

    #[derive(Debug, Deserialize)]
    struct ModeReply {
        work_mode: String,
    }

    #[derive(Debug, Deserialize)]
    struct BatchReply {
        params: BatchParams,
    }

    #[derive(Debug, Deserialize)]
    struct BatchParams {
        multipacks_after_pintset: i64,
    }

    /// `reqwest` implementation of [`Backend`].
    #[derive(Clone, Debug)]
    pub struct HttpBackend {
        base_url: String,
        client: reqwest::Client,
    }

    impl HttpBackend {
        /// Per-request timeout used by [`HttpBackend::new`].
        pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

        pub fn new(base_url: &str) -> Result<Self, CollaboratorError> {
            Self::with_timeout(base_url, Self::DEFAULT_TIMEOUT)
        }

        pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, CollaboratorError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| CollaboratorError::Request {
                    endpoint: "client",
                    message: e.to_string(),
                })?;
            Ok(Self {
                base_url: base_url.trim_end_matches('/').to_string(),
                client,
            })
        }

        async fn get_json<T: DeserializeOwned>(
            &self,
            endpoint: &'static str,
        ) -> Result<T, CollaboratorError> {
            let resp = self
                .client
                .get(format!("{}{endpoint}", self.base_url))
                .send()
                .await
                .map_err(|e| request_error(endpoint, e))?;
            let resp = check_status(endpoint, resp)?;
            resp.json().await.map_err(|e| CollaboratorError::Payload {
                endpoint,
                message: e.to_string(),
            })
        }
    }

    #[async_trait]
    impl Backend for HttpBackend {
        async fn work_mode(&self) -> Result<WorkMode, CollaboratorError> {
            let reply: ModeReply = self.get_json(WORK_MODE_PATH).await?;
            Ok(WorkMode::from(reply.work_mode.as_str()))
        }

        async fn expected_codes_count(&self) -> Result<usize, CollaboratorError> {
            let reply: BatchReply = self.get_json(CURRENT_BATCH_PATH).await?;
            usize::try_from(reply.params.multipacks_after_pintset).map_err(|_| {
                CollaboratorError::Payload {
                    endpoint: CURRENT_BATCH_PATH,
                    message: format!(
                        "negative multipacks_after_pintset: {}",
                        reply.params.multipacks_after_pintset
                    ),
                }
            })
        }

        async fn send_codepair(&self, pair: &CodePair) -> Result<(), CollaboratorError> {
            let resp = self
                .client
                .put(format!("{}{NEW_PACK_PATH}", self.base_url))
                .json(pair)
                .send()
                .await
                .map_err(|e| request_error(NEW_PACK_PATH, e))?;
            check_status(NEW_PACK_PATH, resp).map(|_| ())
        }
    }

    fn request_error(endpoint: &'static str, e: reqwest::Error) -> CollaboratorError {
        CollaboratorError::Request {
            endpoint,
            message: e.to_string(),
        }
    }

    fn check_status(
        endpoint: &'static str,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, CollaboratorError> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            Err(CollaboratorError::Status {
                endpoint,
                status: status.as_u16(),
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn replies_decode_from_backend_json() {
            let mode: ModeReply = serde_json::from_str(r#"{"work_mode":"manual","extra":1}"#).unwrap();
            assert_eq!(WorkMode::from(mode.work_mode.as_str()), WorkMode::Manual);

            let batch: BatchReply =
                serde_json::from_str(r#"{"params":{"multipacks_after_pintset":3}}"#).unwrap();
            assert_eq!(batch.params.multipacks_after_pintset, 3);
        }

        #[test]
        fn base_url_loses_trailing_slash() {
            let b = HttpBackend::new("http://line.local:8000/").unwrap();
            assert_eq!(b.base_url, "http://line.local:8000");
        }

        #[tokio::test]
        async fn unreachable_backend_is_a_request_error() {
            let b = HttpBackend::with_timeout("http://127.0.0.1:9", Duration::from_millis(200))
                .unwrap();
            let err = b.expected_codes_count().await.unwrap_err();
            assert_eq!(err.as_label(), "collaborator_request");
        }
    }
}

use std::{future::Future, time::Duration};

use delivery_core::{
    ChatMessage, DeliveryError, DeliveryErrorCategory, DeliveryTuning, SendAck, SendRequest,
    SnapshotPayload, classify_http_status,
};
use url::Url;

use crate::{DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_STREAM_HOLD_TIMEOUT_MS};

/// Classified result of one settled stream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamReply {
    /// Status 200 with a parsed message body.
    Delivered(ChatMessage),
    /// Status 502: the server closed an idle hold.
    IdleTimeout,
    /// Any other status.
    Failed {
        /// The offending status code.
        status: u16,
    },
}

/// Transport seam between the retrieval drivers and the wire.
///
/// The drivers only ever hold one request in flight per strategy; a
/// transport implementation does not need to serialize calls itself.
/// Tests script this trait; [`HttpChatClient`] is the production
/// implementation.
pub trait ChatTransport: Send + Sync {
    /// Fetch the full current message set from the snapshot endpoint.
    fn fetch_snapshot(
        &self,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, DeliveryError>> + Send;

    /// Issue one stream request and classify the settled response.
    fn poll_stream(&self) -> impl Future<Output = Result<StreamReply, DeliveryError>> + Send;

    /// Post a new message and return the server's acknowledgment.
    fn post_message(
        &self,
        request: &SendRequest,
    ) -> impl Future<Output = Result<SendAck, DeliveryError>> + Send;
}

/// Connection settings for [`HttpChatClient`].
#[derive(Debug, Clone)]
pub struct HttpChatConfig {
    /// Server base URL; endpoint paths are resolved against its host root.
    pub base_url: Url,
    /// Client-side timeout for snapshot and send requests.
    pub request_timeout: Duration,
    /// Client-side ceiling on a held stream request.
    pub stream_hold_timeout: Duration,
}

impl HttpChatConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            stream_hold_timeout: Duration::from_millis(DEFAULT_STREAM_HOLD_TIMEOUT_MS),
        }
    }

    /// Apply optional tuning overrides on top of the defaults.
    pub fn with_tuning(base_url: Url, tuning: &DeliveryTuning) -> Self {
        let mut config = Self::new(base_url);
        if let Some(ms) = tuning.request_timeout_ms {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = tuning.stream_hold_timeout_ms {
            config.stream_hold_timeout = Duration::from_millis(ms);
        }
        config
    }
}

/// `reqwest`-backed transport speaking the chat wire protocol:
/// `GET /poll` (snapshot), `GET /msgs` (stream), `POST /poll` (send).
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    http: reqwest::Client,
    snapshot_url: Url,
    stream_url: Url,
    send_url: Url,
    request_timeout: Duration,
    stream_hold_timeout: Duration,
}

impl HttpChatClient {
    pub fn new(config: HttpChatConfig) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder().build().map_err(|err| {
            DeliveryError::new(
                DeliveryErrorCategory::Config,
                "client_build_error",
                err.to_string(),
            )
        })?;

        let snapshot_url = join_endpoint(&config.base_url, "/poll")?;
        let stream_url = join_endpoint(&config.base_url, "/msgs")?;
        let send_url = snapshot_url.clone();

        Ok(Self {
            http,
            snapshot_url,
            stream_url,
            send_url,
            request_timeout: config.request_timeout,
            stream_hold_timeout: config.stream_hold_timeout,
        })
    }
}

impl ChatTransport for HttpChatClient {
    async fn fetch_snapshot(&self) -> Result<Vec<ChatMessage>, DeliveryError> {
        let response = self
            .http
            .get(self.snapshot_url.clone())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(DeliveryError::new(
                classify_http_status(status),
                "snapshot_status",
                format!("snapshot endpoint answered status {status}"),
            ));
        }

        let payload: SnapshotPayload = response.json().await.map_err(map_body_error)?;
        Ok(payload.msg)
    }

    async fn poll_stream(&self) -> Result<StreamReply, DeliveryError> {
        let response = self
            .http
            .get(self.stream_url.clone())
            .timeout(self.stream_hold_timeout)
            .send()
            .await
            .map_err(map_request_error)?;

        match response.status().as_u16() {
            200 => {
                let message: ChatMessage = response.json().await.map_err(map_body_error)?;
                Ok(StreamReply::Delivered(message))
            }
            502 => Ok(StreamReply::IdleTimeout),
            status => Ok(StreamReply::Failed { status }),
        }
    }

    async fn post_message(&self, request: &SendRequest) -> Result<SendAck, DeliveryError> {
        let response = self
            .http
            .post(self.send_url.clone())
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(DeliveryError::new(
                classify_http_status(status),
                "send_rejected",
                format!("send endpoint answered status {status}"),
            ));
        }

        let ack: SendAck = response.json().await.map_err(map_body_error)?;
        Ok(ack)
    }
}

fn join_endpoint(base: &Url, path: &str) -> Result<Url, DeliveryError> {
    base.join(path).map_err(|err| {
        DeliveryError::new(
            DeliveryErrorCategory::Config,
            "invalid_endpoint",
            format!("cannot resolve '{path}' against '{base}': {err}"),
        )
    })
}

fn map_request_error(err: reqwest::Error) -> DeliveryError {
    let code = if err.is_timeout() {
        "request_timeout"
    } else {
        "transport_error"
    };
    DeliveryError::new(DeliveryErrorCategory::Network, code, err.to_string())
}

fn map_body_error(err: reqwest::Error) -> DeliveryError {
    DeliveryError::new(
        DeliveryErrorCategory::Serialization,
        "malformed_body",
        err.to_string(),
    )
}

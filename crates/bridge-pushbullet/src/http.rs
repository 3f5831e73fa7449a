use std::time::Duration;

use bridge_core::{
    BridgeError, BridgeErrorCategory, NotificationSource, PollBatch, PushItem,
    classify_http_status,
};
use reqwest::{Client, Response, header::CONTENT_TYPE};
use tracing::debug;

const ACCESS_TOKEN_HEADER: &str = "Access-Token";

/// REST client for the `/pushes` endpoint.
#[derive(Clone)]
pub struct PushApiClient {
    http: Client,
    api_base: String,
    access_token: String,
}

impl std::fmt::Debug for PushApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushApiClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl PushApiClient {
    pub fn new(
        api_base: &str,
        access_token: impl Into<String>,
        request_timeout: Option<Duration>,
    ) -> Result<Self, BridgeError> {
        let mut builder = Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(map_client_build_error)?;

        Ok(Self {
            http,
            api_base: normalize_base_url(api_base),
            access_token: access_token.into(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn pushes_url(&self) -> String {
        format!("{}/pushes", self.api_base)
    }
}

impl NotificationSource for PushApiClient {
    async fn fetch_pushes(&self, modified_after: f64) -> Result<PollBatch, BridgeError> {
        debug!(modified_after, "polling pushes");
        let response = self
            .http
            .get(self.pushes_url())
            .query(&[("modified_after", modified_after.to_string())])
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .send()
            .await
            .map_err(|err| map_request_error("GET", err))?;

        let body = read_success_body(response).await?;
        PollBatch::decode(&body).map_err(|err| BridgeError::decode("poll response", &err))
    }

    async fn post_push(&self, push: &PushItem) -> Result<String, BridgeError> {
        let payload = serde_json::to_string(push).map_err(|err| {
            BridgeError::new(
                BridgeErrorCategory::Internal,
                "encode_error",
                format!("failed to encode push: {err}"),
            )
        })?;

        let response = self
            .http
            .post(self.pushes_url())
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|err| map_request_error("POST", err))?;

        read_success_body(response).await
    }
}

async fn read_success_body(response: Response) -> Result<String, BridgeError> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|err| map_request_error("reading response of", err))?;

    match classify_http_status(status) {
        None => Ok(body),
        Some(_) => Err(BridgeError::http_status(status, &body)),
    }
}

fn normalize_base_url(base: &str) -> String {
    base.trim().trim_end_matches('/').to_owned()
}

fn map_request_error(method: &str, err: reqwest::Error) -> BridgeError {
    if err.is_builder() {
        return BridgeError::new(
            BridgeErrorCategory::Config,
            "request_build_error",
            format!("{method} failed: {err}"),
        );
    }

    let code = if err.is_timeout() {
        "request_timeout"
    } else if err.is_connect() {
        "connect_failed"
    } else {
        "request_failed"
    };
    BridgeError::new(
        BridgeErrorCategory::Transport,
        code,
        format!("{method} failed: {err}"),
    )
}

fn map_client_build_error(err: reqwest::Error) -> BridgeError {
    BridgeError::new(
        BridgeErrorCategory::Config,
        "client_build_error",
        err.to_string(),
    )
}

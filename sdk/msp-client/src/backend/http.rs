//! [`BackendIndexGateway`] implementation over the backend's REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use shs_core::types::{BucketId, FileKey};

use super::models::{
    BucketInfo, FileInfo, HealthStatus, MspInfo, NonceRequest, NonceResponse, PaymentStreamInfo,
    TokenResponse, UserProfile, ValueProp, VerifyRequest, VerifyResponse,
};
use super::session::Session;
use super::BackendIndexGateway;
use crate::config::MspConfig;
use crate::error::{Error, Result};

const LOG_TARGET: &str = "shs::backend::http";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP client for a single MSP backend.
#[derive(Debug, Clone)]
pub struct HttpBackendGateway {
    client: Client,
    base_url: String,
}

impl HttpBackendGateway {
    pub fn new(config: &MspConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Backend(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder, session: &Session) -> Result<RequestBuilder> {
        if !session.is_valid() {
            return Err(Error::Unauthorized("session has been invalidated".to_string()));
        }
        Ok(builder.header(reqwest::header::AUTHORIZATION, session.bearer()))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Backend(format!("request failed: {e}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(target: LOG_TARGET, %status, body, "backend returned an error");
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(body),
            StatusCode::NOT_FOUND => Error::NotFound(body),
            _ => Error::Backend(format!("{status}: {body}")),
        })
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let response = self.send(self.client.get(self.url(path))).await?;
        decode(response).await
    }

    async fn get_json_authed<R: DeserializeOwned>(
        &self,
        path: &str,
        session: &Session,
    ) -> Result<R> {
        let builder = self.authed(self.client.get(self.url(path)), session)?;
        let response = self.send(builder).await?;
        decode(response).await
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let response = self.send(self.client.post(self.url(path)).json(body)).await?;
        decode(response).await
    }
}

async fn decode<R: DeserializeOwned>(response: Response) -> Result<R> {
    response
        .json()
        .await
        .map_err(|e| Error::Backend(format!("invalid response body: {e}")))
}

#[async_trait]
impl BackendIndexGateway for HttpBackendGateway {
    async fn info(&self) -> Result<MspInfo> {
        self.get_json("/info").await
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.get_json("/health").await
    }

    async fn value_propositions(&self) -> Result<Vec<ValueProp>> {
        self.get_json("/value-props").await
    }

    async fn request_nonce(&self, request: &NonceRequest) -> Result<NonceResponse> {
        self.post_json("/auth/nonce", request).await
    }

    async fn verify_signature(&self, request: &VerifyRequest) -> Result<VerifyResponse> {
        self.post_json("/auth/verify", request).await
    }

    async fn refresh_token(&self, session: &Session) -> Result<TokenResponse> {
        let builder = self.authed(self.client.post(self.url("/auth/refresh")), session)?;
        let response = self.send(builder).await?;
        decode(response).await
    }

    async fn profile(&self, session: &Session) -> Result<UserProfile> {
        self.get_json_authed("/auth/profile", session).await
    }

    async fn logout(&self, session: &Session) -> Result<()> {
        let builder = self.authed(self.client.post(self.url("/auth/logout")), session)?;
        self.send(builder).await?;
        Ok(())
    }

    async fn bucket(&self, session: &Session, bucket_id: &BucketId) -> Result<BucketInfo> {
        self.get_json_authed(&format!("/buckets/{bucket_id}"), session)
            .await
    }

    async fn bucket_files(
        &self,
        session: &Session,
        bucket_id: &BucketId,
    ) -> Result<Vec<FileInfo>> {
        self.get_json_authed(&format!("/buckets/{bucket_id}/files"), session)
            .await
    }

    async fn file_info(
        &self,
        session: &Session,
        bucket_id: &BucketId,
        file_key: &FileKey,
    ) -> Result<Option<FileInfo>> {
        // a 404 here means "not indexed yet", which callers poll on
        match self
            .get_json_authed(&format!("/buckets/{bucket_id}/files/{file_key}/info"), session)
            .await
        {
            Ok(info) => Ok(Some(info)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn payment_streams(&self, session: &Session) -> Result<Vec<PaymentStreamInfo>> {
        self.get_json_authed("/payment-streams", session).await
    }
}

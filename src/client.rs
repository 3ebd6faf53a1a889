//! HTTP client for the admin entry endpoints.
//!
//! One method per endpoint, each issuing exactly one request. What to do
//! with the answer is the overlay's business; this module only moves JSON.

use crate::csrf::CSRF_HEADER;
use crate::models::{
    AdminIdentity, BulkActionRequest, EntryId, EntryUpdate, Envelope, ExampleRequest,
    FlagRequest, TranslationRequest,
};
use crate::url_validator::EndpointError;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with {0}")]
    Status(StatusCode),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("invalid endpoint path: {0}")]
    Path(#[from] url::ParseError),
    #[error("invalid header value for {0}")]
    Header(&'static str),
}

#[derive(Debug, Clone)]
pub struct EntryClient {
    http: reqwest::Client,
    base: Url,
    csrf_token: Option<String>,
}

impl EntryClient {
    /// `base` must already be validated; endpoint paths are joined below it.
    pub fn new(
        base: Url,
        timeout: Option<Duration>,
        session_cookie: Option<&str>,
    ) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = session_cookie {
            let value = HeaderValue::from_str(cookie).map_err(|_| ClientError::Header("Cookie"))?;
            headers.insert(COOKIE, value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base,
            csrf_token: None,
        })
    }

    pub fn with_csrf_token(mut self, token: Option<String>) -> Self {
        self.csrf_token = token;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    // ------------------------------------------------------------------------
    // Endpoints
    // ------------------------------------------------------------------------

    /// The boundary call. Anything but a 2xx JSON answer is an error.
    pub async fn admin_check(&self) -> Result<AdminIdentity, ClientError> {
        let url = self.endpoint("admin-check/")?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        decode(response).await
    }

    pub async fn get_entry(&self, id: &EntryId) -> Result<Envelope, ClientError> {
        let url = self.entry_endpoint("get-entry", id)?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        decode(response).await
    }

    pub async fn quick_edit(&self, id: &EntryId, update: &EntryUpdate) -> Result<Envelope, ClientError> {
        let url = self.entry_endpoint("quick-edit", id)?;
        self.send(self.post(url)?.json(update)).await
    }

    pub async fn flag(&self, id: &EntryId, flag_type: &str) -> Result<Envelope, ClientError> {
        let url = self.entry_endpoint("flag", id)?;
        let body = FlagRequest {
            flag_type: flag_type.to_string(),
        };
        self.send(self.post(url)?.json(&body)).await
    }

    pub async fn delete(&self, id: &EntryId) -> Result<Envelope, ClientError> {
        let url = self.entry_endpoint("delete", id)?;
        self.send(self.post(url)?).await
    }

    pub async fn add_translation(
        &self,
        id: &EntryId,
        request: &TranslationRequest,
    ) -> Result<Envelope, ClientError> {
        let url = self.entry_endpoint("add-translation", id)?;
        self.send(self.post(url)?.json(request)).await
    }

    pub async fn add_example(&self, id: &EntryId, request: &ExampleRequest) -> Result<Envelope, ClientError> {
        let url = self.entry_endpoint("add-example", id)?;
        self.send(self.post(url)?.json(request)).await
    }

    pub async fn bulk_action(&self, request: &BulkActionRequest) -> Result<Envelope, ClientError> {
        let url = self.endpoint("bulk-action/")?;
        self.send(self.post(url)?.json(request)).await
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    fn entry_endpoint(&self, action: &str, id: &EntryId) -> Result<Url, ClientError> {
        self.endpoint(&format!("{}/{}/", action, id.path_segment()))
    }

    fn post(&self, url: Url) -> Result<RequestBuilder, ClientError> {
        let mut request = self.http.post(url);
        if let Some(token) = &self.csrf_token {
            let value = HeaderValue::from_str(token).map_err(|_| ClientError::Header(CSRF_HEADER))?;
            request = request.header(CSRF_HEADER, value);
        }
        Ok(request)
    }

    /// Mutating endpoints answer with an envelope even on 4xx/5xx, so the
    /// body is decoded first and the status only matters when it is not JSON.
    async fn send(&self, request: RequestBuilder) -> Result<Envelope, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        match serde_json::from_slice::<Envelope>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(ClientError::Status(status)),
            Err(e) => Err(ClientError::Decode(e)),
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, Result};

// ─── RawResponse ──────────────────────────────────────────────────────────────

/// Successful response body plus the headers the multipart decoder needs.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Parse(e.to_string()))
    }
}

// ─── HttpClient ───────────────────────────────────────────────────────────────

/// Thin wrapper around `reqwest::Client`: base-URL joining and the coarse
/// success-or-error status handling the annotation endpoints need. One
/// request per user action, no retries.
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("labelscope/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, selector: &str) -> String {
        format!("{}/{}", self.base_url, selector.trim_start_matches('/'))
    }

    pub async fn get_raw(&self, selector: &str) -> Result<RawResponse> {
        let url = self.url(selector);
        tracing::debug!(%url, "GET");
        let resp = self.client.get(&url).send().await?;
        Self::finish(url, resp).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, selector: &str) -> Result<T> {
        self.get_raw(selector).await?.json()
    }

    /// POST with `application/x-www-form-urlencoded` fields.
    pub async fn post_form(&self, selector: &str, fields: &[(&str, String)]) -> Result<RawResponse> {
        let url = self.url(selector);
        tracing::debug!(%url, "POST (form)");
        let resp = self.client.post(&url).form(fields).send().await?;
        Self::finish(url, resp).await
    }

    pub async fn post_json<B: Serialize>(&self, selector: &str, body: &B) -> Result<RawResponse> {
        let url = self.url(selector);
        tracing::debug!(%url, "POST (json)");
        let resp = self.client.post(&url).json(body).send().await?;
        Self::finish(url, resp).await
    }

    /// PUT one file as a `multipart/form-data` upload.
    pub async fn put_file(
        &self,
        selector: &str,
        field: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<RawResponse> {
        let url = self.url(selector);
        tracing::debug!(%url, filename, "PUT (multipart)");

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        let resp = self.client.put(&url).multipart(form).send().await?;
        Self::finish(url, resp).await
    }

    pub async fn delete_raw(&self, selector: &str) -> Result<RawResponse> {
        let url = self.url(selector);
        tracing::debug!(%url, "DELETE");
        let resp = self.client.delete(&url).send().await?;
        Self::finish(url, resp).await
    }

    async fn finish(url: String, resp: reqwest::Response) -> Result<RawResponse> {
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();
        let body = resp.bytes().await?.to_vec();

        if !status.is_success() {
            return Err(ClientError::Api {
                endpoint: url,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(RawResponse {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder, StatusCode};

use super::{encode_key_path, validate_key, BlobStore, StorageError};

/// Bucket-style object store over plain HTTP: HEAD / PUT / GET on `{base}/{key}`.
pub struct HttpBlobStore {
    client: Client,
    base: String,
    token: Option<String>,
}

impl HttpBlobStore {
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    fn url_for(&self, key: &str) -> Result<String, StorageError> {
        validate_key(key)?;
        Ok(format!("{}/{}", self.base, encode_key_path(key)))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }
}

fn http_err(key: &str) -> impl FnOnce(reqwest::Error) -> StorageError + '_ {
    move |source| StorageError::Http {
        key: key.to_string(),
        source,
    }
}

fn unexpected(key: &str, status: StatusCode) -> StorageError {
    StorageError::UnexpectedStatus {
        key: key.to_string(),
        status: status.as_u16(),
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let url = self.url_for(key)?;
        let resp = self
            .authorize(self.client.head(&url))
            .send()
            .await
            .map_err(http_err(key))?;
        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(unexpected(key, other)),
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let url = self.url_for(key)?;
        let resp = self
            .authorize(self.client.put(&url))
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(http_err(key))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(unexpected(key, resp.status()))
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let url = self.url_for(key)?;
        let resp = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(http_err(key))?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let bytes = resp.bytes().await.map_err(http_err(key))?;
                Ok(Some(bytes.to_vec()))
            }
            other => Err(unexpected(key, other)),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

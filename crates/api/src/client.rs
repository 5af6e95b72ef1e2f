//! File management client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use crate::config::ServerConfig;
use crate::types::{FileEntry, RootPathReply, StorageReply, sort_entries};
use crate::{ApiError, endpoints};

/// Client for the file-server management routes.
pub struct ApiClient {
    http: reqwest::Client,
    config: ServerConfig,
}

impl ApiClient {
    /// Creates a client; the bearer token (if any) is installed as a
    /// default header.
    pub fn new(config: ServerConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.token() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    ApiError::Configuration("token contains invalid header characters".into())
                })?,
            );
        }
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Performs one request, returning the raw success body.
    async fn request(
        &self,
        method: Method,
        route: &str,
        params: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> Result<Vec<u8>, ApiError> {
        let url = self.config.url(route);
        let mut req = self.http.request(method, &url).query(params);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    /// Lists a directory, folders first.
    ///
    /// The server answers JSON `null` for an empty directory; that is a
    /// valid empty listing, not an error.
    pub async fn list_dir(&self, dir: &str) -> Result<Vec<FileEntry>, ApiError> {
        let body = self
            .request(Method::GET, endpoints::VIEW_CONTENT, &[("dir", dir)], None)
            .await?;
        let entries: Option<Vec<FileEntry>> = serde_json::from_slice(&body)?;
        let mut entries = entries.unwrap_or_default();
        sort_entries(&mut entries);
        debug!(dir, count = entries.len(), "listed directory");
        Ok(entries)
    }

    /// Creates a directory at the given server path.
    pub async fn create_directory(&self, path: &str) -> Result<(), ApiError> {
        self.request(
            Method::POST,
            endpoints::CREATE_DIRECTORY,
            &[("path", path)],
            None,
        )
        .await?;
        Ok(())
    }

    /// Creates a text file with the given content.
    pub async fn create_file(&self, path: &str, content: &str) -> Result<(), ApiError> {
        self.request(
            Method::POST,
            endpoints::CREATE_FILE,
            &[],
            Some(serde_json::json!({ "path": path, "content": content })),
        )
        .await?;
        Ok(())
    }

    /// Deletes a file or directory.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request(Method::POST, endpoints::DELETE, &[("path", path)], None)
            .await?;
        Ok(())
    }

    /// Returns the server's root browse path.
    pub async fn root_path(&self) -> Result<String, ApiError> {
        let body = self
            .request(Method::GET, endpoints::ROOT_PATH, &[], None)
            .await?;
        let reply: RootPathReply = serde_json::from_slice(&body)?;
        Ok(reply.root_path)
    }

    /// Returns storage usage for the server's mount.
    pub async fn storage(&self) -> Result<StorageReply, ApiError> {
        let body = self
            .request(Method::GET, endpoints::STORAGE, &[], None)
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Builds a direct download URL for `path`.
    ///
    /// The token rides as a query parameter so the URL can be handed to
    /// a platform downloader that cannot set headers.
    pub fn download_url(&self, path: &str) -> String {
        let encoded = utf8_percent_encode(path, NON_ALPHANUMERIC);
        let mut url = format!("{}?path={}", self.config.url(endpoints::DOWNLOAD), encoded);
        if let Some(token) = self.config.token() {
            url.push_str("&token=");
            url.push_str(token);
        }
        url
    }
}

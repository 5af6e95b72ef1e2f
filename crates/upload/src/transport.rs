//! Upload transport seam.
//!
//! The session and queue talk to the server exclusively through
//! [`UploadTransport`], so the transfer logic can be exercised against
//! mocks. [`HttpTransport`] is the production implementation over
//! `reqwest`.

use std::future::Future;
use std::io;
use std::pin::Pin;

use futures::Stream;
use reqwest::header::{AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use skiff_api::{ApiClient, endpoints};
use skiff_transfer::ChunkSpec;

use crate::error::UploadError;
use crate::types::{ReplyBody, UploadOutcome};

/// Header carrying the original client-side file name alongside the
/// multipart form, for servers that sanitize form file names.
const ORIGINAL_FILENAME_HEADER: &str = "X-Original-Filename";

/// Streaming request body: ordered byte slabs, or the I/O error that
/// ended the stream.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, io::Error>> + Send + 'static>>;

/// Boxed future returned by [`UploadTransport`] methods, keeping the
/// trait dyn-compatible.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, UploadError>> + Send + 'a>>;

/// Status and body of a transport reply, success or not.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body into an [`UploadOutcome`]: JSON when the server
    /// said so, text otherwise, empty when there is nothing.
    pub fn into_outcome(self) -> UploadOutcome {
        let body = if self.body.is_empty() {
            ReplyBody::Empty
        } else if self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
        {
            match serde_json::from_slice(&self.body) {
                Ok(value) => ReplyBody::Json(value),
                Err(_) => ReplyBody::Text(String::from_utf8_lossy(&self.body).into_owned()),
            }
        } else {
            ReplyBody::Text(String::from_utf8_lossy(&self.body).into_owned())
        };
        UploadOutcome {
            status: self.status,
            body,
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Server operations the upload paths need.
///
/// Methods return replies (not errors) for non-2xx statuses so the
/// session decides which taxonomy entry applies; only connection-level
/// failures surface as errors here.
pub trait UploadTransport: Send + Sync {
    /// Single-shot multipart upload of the whole file into `dir`.
    fn upload_multipart<'a>(
        &'a self,
        dir: &'a str,
        file_name: &'a str,
        mime: &'a str,
        body: BodyStream,
        total: u64,
    ) -> TransportFuture<'a, HttpReply>;

    /// Announces an incoming chunked upload. Best-effort server-side.
    fn chunk_start<'a>(&'a self, file_name: &'a str) -> TransportFuture<'a, HttpReply>;

    /// Sends one chunk with its byte range.
    fn upload_chunk<'a>(
        &'a self,
        file_name: &'a str,
        spec: ChunkSpec,
        total: u64,
        data: Vec<u8>,
    ) -> TransportFuture<'a, HttpReply>;

    /// Asks the server to assemble the received chunks into `dir`.
    fn chunk_complete<'a>(&'a self, file_name: &'a str, dir: &'a str)
    -> TransportFuture<'a, HttpReply>;

    /// Re-lists `dir` so cached listings reflect the finished batch.
    fn refresh_dir<'a>(&'a self, dir: &'a str) -> TransportFuture<'a, ()>;
}

/// `reqwest`-backed transport sharing the server config of an
/// [`ApiClient`].
pub struct HttpTransport {
    http: reqwest::Client,
    api: ApiClient,
}

impl HttpTransport {
    pub fn new(api: ApiClient) -> Result<Self, UploadError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = api.config().token() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    UploadError::Configuration("token contains invalid header characters".into())
                })?,
            );
        }
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self { http, api })
    }

    async fn reply_of(resp: reqwest::Response) -> Result<HttpReply, UploadError> {
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?.to_vec();
        Ok(HttpReply {
            status,
            content_type,
            body,
        })
    }
}

impl UploadTransport for HttpTransport {
    fn upload_multipart<'a>(
        &'a self,
        dir: &'a str,
        file_name: &'a str,
        mime: &'a str,
        body: BodyStream,
        total: u64,
    ) -> TransportFuture<'a, HttpReply> {
        Box::pin(async move {
            let part = reqwest::multipart::Part::stream_with_length(
                reqwest::Body::wrap_stream(body),
                total,
            )
            .file_name(file_name.to_string())
            .mime_str(mime)?;
            let form = reqwest::multipart::Form::new().part("file", part);

            let resp = self
                .http
                .post(self.api.config().url(endpoints::UPLOAD))
                .query(&[("dir", dir)])
                .header(ORIGINAL_FILENAME_HEADER, file_name)
                .multipart(form)
                .send()
                .await?;
            Self::reply_of(resp).await
        })
    }

    fn chunk_start<'a>(&'a self, file_name: &'a str) -> TransportFuture<'a, HttpReply> {
        Box::pin(async move {
            let resp = self
                .http
                .post(self.api.config().url(endpoints::UPLOAD_CHUNK_START))
                .query(&[("filename", file_name)])
                .send()
                .await?;
            Self::reply_of(resp).await
        })
    }

    fn upload_chunk<'a>(
        &'a self,
        file_name: &'a str,
        spec: ChunkSpec,
        total: u64,
        data: Vec<u8>,
    ) -> TransportFuture<'a, HttpReply> {
        Box::pin(async move {
            // Inclusive end, HTTP range style.
            let range = format!("bytes {}-{}/{}", spec.start, spec.end.saturating_sub(1), total);
            let index = spec.index.to_string();
            let resp = self
                .http
                .post(self.api.config().url(endpoints::UPLOAD_CHUNK))
                .query(&[("filename", file_name), ("chunk_index", index.as_str())])
                .header(CONTENT_RANGE, range)
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(data)
                .send()
                .await?;
            Self::reply_of(resp).await
        })
    }

    fn chunk_complete<'a>(
        &'a self,
        file_name: &'a str,
        dir: &'a str,
    ) -> TransportFuture<'a, HttpReply> {
        Box::pin(async move {
            let resp = self
                .http
                .post(self.api.config().url(endpoints::UPLOAD_CHUNK_COMPLETE))
                .query(&[("filename", file_name), ("dir", dir)])
                .send()
                .await?;
            Self::reply_of(resp).await
        })
    }

    fn refresh_dir<'a>(&'a self, dir: &'a str) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            self.api.list_dir(dir).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_api::ServerConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot server capturing the full request (headers and body) and
    /// answering 200 with a JSON body.
    async fn capture_server() -> (
        String,
        tokio::task::JoinHandle<()>,
        tokio::sync::oneshot::Receiver<String>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let (req_tx, req_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut captured = Vec::new();
                let mut buf = vec![0u8; 8192];
                // Read until the headers are in, then until Content-Length
                // bytes of body have arrived.
                loop {
                    let n = stream.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    captured.extend_from_slice(&buf[..n]);
                    let text = String::from_utf8_lossy(&captured);
                    if let Some(head_end) = text.find("\r\n\r\n") {
                        let content_length = text
                            .lines()
                            .find_map(|l| l.strip_prefix("content-length: "))
                            .and_then(|v| v.trim().parse::<usize>().ok())
                            .unwrap_or(0);
                        if captured.len() >= head_end + 4 + content_length {
                            break;
                        }
                    }
                }
                let _ = req_tx.send(String::from_utf8_lossy(&captured).into_owned());
                let body = r#"{"ok":true}"#;
                let resp = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, handle, req_rx)
    }

    fn transport_for(url: &str) -> HttpTransport {
        let config = ServerConfig::new(url, Some("tok-1".into())).unwrap();
        HttpTransport::new(ApiClient::new(config).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn upload_chunk_sends_range_and_index() {
        let (url, handle, req) = capture_server().await;
        let transport = transport_for(&url);

        let spec = ChunkSpec {
            index: 2,
            start: 20,
            end: 30,
        };
        let reply = transport
            .upload_chunk("a.bin", spec, 95, vec![7u8; 10])
            .await
            .unwrap();
        assert!(reply.is_success());

        let req = req.await.unwrap();
        assert!(
            req.starts_with("POST /files/upload/chunk?filename=a.bin&chunk_index=2"),
            "{req}"
        );
        assert!(req.contains("content-range: bytes 20-29/95"), "{req}");
        assert!(req.contains("authorization: Bearer tok-1"), "{req}");

        handle.abort();
    }

    #[tokio::test]
    async fn chunk_complete_carries_dir() {
        let (url, handle, req) = capture_server().await;
        let transport = transport_for(&url);

        transport.chunk_complete("a.bin", "/srv/in").await.unwrap();
        let req = req.await.unwrap();
        assert!(
            req.starts_with("POST /files/upload/chunk/complete?filename=a.bin&dir=%2Fsrv%2Fin"),
            "{req}"
        );

        handle.abort();
    }

    #[tokio::test]
    async fn chunk_start_hits_start_route() {
        let (url, handle, req) = capture_server().await;
        let transport = transport_for(&url);

        transport.chunk_start("a.bin").await.unwrap();
        let req = req.await.unwrap();
        assert!(req.starts_with("POST /files/upload/chunk/start?filename=a.bin"), "{req}");

        handle.abort();
    }

    #[test]
    fn reply_parses_json_outcome() {
        let reply = HttpReply {
            status: 200,
            content_type: Some("application/json".into()),
            body: br#"{"ok":true}"#.to_vec(),
        };
        let outcome = reply.into_outcome();
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.body, ReplyBody::Json(serde_json::json!({"ok": true})));
    }

    #[test]
    fn reply_falls_back_to_text() {
        let reply = HttpReply {
            status: 200,
            content_type: Some("text/plain".into()),
            body: b"done".to_vec(),
        };
        assert_eq!(reply.into_outcome().body, ReplyBody::Text("done".into()));
    }

    #[test]
    fn empty_reply_body() {
        let reply = HttpReply {
            status: 204,
            content_type: None,
            body: Vec::new(),
        };
        assert_eq!(reply.into_outcome().body, ReplyBody::Empty);
    }
}

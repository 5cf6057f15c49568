//! HTTP client shared by every fetch of a run.

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, Response};
use tracing::{debug, instrument};
use url::Url;

use super::error::FetchError;
use crate::config::HttpSettings;
use crate::user_agent;

/// One `reqwest` client (connection pool and cookie store) plus the
/// per-request timeouts of a run.
///
/// Cloning is cheap and shares the pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    settings: HttpSettings,
}

impl HttpClient {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Build`] when the TLS backend cannot initialize.
    pub fn new(settings: HttpSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .gzip(true)
            .cookie_store(true)
            .build()
            .map_err(|source| FetchError::Build { source })?;
        Ok(Self { client, settings })
    }

    /// Fetches an HTML page as text.
    ///
    /// # Errors
    ///
    /// Any network, timeout, status or body error.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url, self.settings.page_timeout).await?;
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::body(url, e))?;
        debug!(chars = body.len(), "page fetched");
        Ok(body)
    }

    /// Downloads a document, refusing bodies larger than `max_bytes`.
    ///
    /// A declared `Content-Length` above the cap is rejected before any body
    /// byte is read. Without the header, streaming stops as soon as the
    /// received total passes the cap.
    ///
    /// # Errors
    ///
    /// [`FetchError::TooLarge`] for oversized bodies, otherwise any network,
    /// timeout, status or body error.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_document(&self, url: &str, max_bytes: u64) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url, self.settings.attachment_timeout).await?;

        let declared = response.content_length();
        if let Some(length) = declared
            && length > max_bytes
        {
            debug!(length, max_bytes, "declared size exceeds cap");
            return Err(FetchError::too_large(url, max_bytes, length));
        }

        let mut body = Vec::with_capacity(declared.map_or(0, |n| usize::try_from(n).unwrap_or(0)));
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::body(url, e))?;
            body.extend_from_slice(&chunk);
            let received = body.len() as u64;
            if received > max_bytes {
                debug!(received, max_bytes, "streamed size exceeds cap");
                return Err(FetchError::too_large(url, max_bytes, received));
            }
        }

        debug!(bytes = body.len(), "document fetched");
        Ok(body)
    }

    async fn get(&self, url: &str, timeout: std::time::Duration) -> Result<Response, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .header(USER_AGENT, user_agent::random_browser_user_agent())
            .header(ACCEPT, user_agent::ACCEPT)
            .header(ACCEPT_LANGUAGE, user_agent::random_accept_language())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;

    fn client() -> HttpClient {
        HttpClient::new(HttpSettings::default()).unwrap()
    }

    /// Serves `body` once with chunked transfer encoding and no Content-Length.
    async fn serve_chunked_once(body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;

            let mut response =
                b"HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nTransfer-Encoding: chunked\r\n\r\n"
                    .to_vec();
            for chunk in body.chunks(1024) {
                response.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
                response.extend_from_slice(chunk);
                response.extend_from_slice(b"\r\n");
            }
            response.extend_from_slice(b"0\r\n\r\n");
            // The client may hang up once the cap is hit.
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/annexe.pdf")
    }

    #[tokio::test]
    async fn test_fetch_page_sends_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/appels-doffres/"))
            .and(header_exists("accept-language"))
            .and(|request: &Request| {
                request
                    .headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|ua| user_agent::BROWSER_USER_AGENTS.contains(&ua))
            })
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let body = client()
            .fetch_page(&format!("{}/appels-doffres/", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_page_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client().fetch_page(&format!("{}/missing/", server.uri())).await;
        assert!(
            matches!(result, Err(FetchError::HttpStatus { status: 404, .. })),
            "{result:?}"
        );
    }

    #[tokio::test]
    async fn test_fetch_page_rejects_invalid_url() {
        let result = client().fetch_page("not a url").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_fetch_document_within_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tdr.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 body".to_vec()))
            .mount(&server)
            .await;

        let bytes = client()
            .fetch_document(&format!("{}/tdr.pdf", server.uri()), 1024)
            .await
            .unwrap();
        assert_eq!(bytes, b"%PDF-1.4 body");
    }

    #[tokio::test]
    async fn test_fetch_document_rejects_declared_oversize() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 4096]))
            .mount(&server)
            .await;

        let result = client()
            .fetch_document(&format!("{}/big.pdf", server.uri()), 1024)
            .await;
        assert!(
            matches!(
                result,
                Err(FetchError::TooLarge {
                    limit_bytes: 1024,
                    actual_bytes: 4096,
                    ..
                })
            ),
            "{result:?}"
        );
    }

    #[tokio::test]
    async fn test_fetch_document_caps_undeclared_length() {
        let url = serve_chunked_once(vec![b'x'; 8 * 1024]).await;

        let result = client().fetch_document(&url, 2048).await;

        match result {
            Err(FetchError::TooLarge {
                limit_bytes,
                actual_bytes,
                ..
            }) => {
                assert_eq!(limit_bytes, 2048);
                assert!(actual_bytes > 2048 && actual_bytes <= 8 * 1024, "{actual_bytes}");
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_document_accepts_small_chunked_body() {
        let url = serve_chunked_once(vec![b'y'; 1500]).await;
        let bytes = client().fetch_document(&url, 2048).await.unwrap();
        assert_eq!(bytes.len(), 1500);
    }

    #[tokio::test]
    async fn test_fetch_document_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let settings = HttpSettings {
            attachment_timeout: Duration::from_millis(200),
            ..HttpSettings::default()
        };
        let client = HttpClient::new(settings).unwrap();
        let result = client
            .fetch_document(&format!("{}/slow.pdf", server.uri()), 1024)
            .await;
        assert!(matches!(result, Err(FetchError::Timeout { .. })), "{result:?}");
    }
}

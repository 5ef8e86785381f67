// ABOUTME: Bounded fetcher for admitted URLs: one GET, hard timeout, no redirects, HTML only.
// ABOUTME: Also handles charset decoding of the response body.

use bytes::Bytes;
use tracing::debug;
use url::Url;

use crate::error::{ErrorCode, IngestError};

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// A successfully fetched HTML page.
///
/// Only produced for a 2xx response that was not a redirect and that
/// declared a `text/html` content type.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,
}

impl FetchedDocument {
    /// Decode the body to text, using the content-type charset or detection.
    pub fn html(&self) -> String {
        decode_body(&self.body, Some(&self.content_type))
    }
}

/// Build the HTTP client used for fetching target pages.
///
/// Redirects are never followed; the whole request, body included, is
/// bounded by `timeout`.
pub fn build_fetch_client(
    user_agent: &str,
    timeout: std::time::Duration,
    resolve_overrides: &[(String, std::net::SocketAddr)],
) -> reqwest::Client {
    let mut builder = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(user_agent)
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .deflate(true);
    for (host, addr) in resolve_overrides {
        builder = builder.resolve(host, *addr);
    }
    builder.build().expect("failed to build HTTP client")
}

/// Fetch an admitted URL.
pub async fn fetch(client: &reqwest::Client, url: &Url) -> Result<FetchedDocument, IngestError> {
    let response = client.get(url.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            IngestError::timeout(url.as_str(), Some(anyhow::anyhow!("request timed out: {}", e)))
        } else {
            IngestError::new(
                ErrorCode::ConnectionFailed,
                url.as_str(),
                "Fetch",
                Some(anyhow::anyhow!("request failed: {}", e)),
            )
        }
    })?;

    let status = response.status();
    if status.is_redirection() {
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        debug!(url = %url, status = status.as_u16(), %location, "refusing redirect");
        return Err(IngestError::new(
            ErrorCode::RedirectNotAllowed,
            url.as_str(),
            "Fetch",
            Some(anyhow::anyhow!("HTTP status {} redirect", status.as_u16())),
        ));
    }
    if !status.is_success() {
        return Err(IngestError::http_status(url.as_str(), status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    if !content_type.contains("text/html") {
        return Err(IngestError::new(
            ErrorCode::UnsupportedContentType,
            url.as_str(),
            "Fetch",
            Some(anyhow::anyhow!("content type {:?} is not text/html", content_type)),
        ));
    }

    if let Some(len) = response.content_length() {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(too_large(url));
        }
    }

    let body = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            IngestError::timeout(url.as_str(), Some(anyhow::anyhow!("body read timed out: {}", e)))
        } else {
            IngestError::new(
                ErrorCode::ConnectionFailed,
                url.as_str(),
                "Fetch",
                Some(anyhow::anyhow!("failed to read body: {}", e)),
            )
        }
    })?;

    if body.len() > MAX_CONTENT_LENGTH {
        return Err(too_large(url));
    }

    debug!(url = %url, status = status.as_u16(), bytes = body.len(), "fetched");
    Ok(FetchedDocument {
        status: status.as_u16(),
        content_type,
        body,
    })
}

fn too_large(url: &Url) -> IngestError {
    IngestError::new(
        ErrorCode::ContentTooLarge,
        url.as_str(),
        "Fetch",
        Some(anyhow::anyhow!("content too large")),
    )
}

/// Decode body bytes to a String using charset from content-type header or detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(charset) = content_type.and_then(extract_charset) {
        if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
            let (decoded, _, _) = encoding.decode(body);
            return decoded.into_owned();
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    lower.split(';').find_map(|part| {
        part.trim()
            .strip_prefix("charset=")
            .map(|c| c.trim_matches('"').trim_matches('\'').to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn test_client(timeout: Duration) -> reqwest::Client {
        build_fetch_client("test-agent", timeout, &[])
    }

    fn url_of(server: &MockServer, path: &str) -> Url {
        Url::parse(&server.url(path)).unwrap()
    }

    #[tokio::test]
    async fn fetches_html_with_user_agent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/page").header("user-agent", "test-agent");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<html><body>hello</body></html>");
        });

        let doc = fetch(&test_client(Duration::from_secs(5)), &url_of(&server, "/page"))
            .await
            .expect("fetch should succeed");
        mock.assert();
        assert_eq!(doc.status, 200);
        assert_eq!(doc.content_type, "text/html; charset=utf-8");
        assert_eq!(doc.html(), "<html><body>hello</body></html>");
    }

    #[tokio::test]
    async fn redirect_is_rejected_and_not_followed() {
        let server = MockServer::start();
        let target = server.mock(|when, then| {
            when.method(GET).path("/target");
            then.status(200)
                .header("content-type", "text/html")
                .body("<html></html>");
        });
        let redirect = server.mock(|when, then| {
            when.method(GET).path("/moved");
            then.status(301).header("Location", server.url("/target"));
        });

        let err = fetch(&test_client(Duration::from_secs(5)), &url_of(&server, "/moved"))
            .await
            .expect_err("redirect should be rejected");
        redirect.assert();
        assert_eq!(target.hits(), 0);
        assert!(err.is_redirect());
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404)
                .header("content-type", "text/html")
                .body("not found");
        });

        let err = fetch(&test_client(Duration::from_secs(5)), &url_of(&server, "/missing"))
            .await
            .expect_err("404 should fail");
        assert_eq!(err.code, ErrorCode::HttpError(404));
    }

    #[tokio::test]
    async fn status_is_checked_before_content_type() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/err");
            then.status(500)
                .header("content-type", "application/json")
                .body("{}");
        });

        let err = fetch(&test_client(Duration::from_secs(5)), &url_of(&server, "/err"))
            .await
            .expect_err("500 should fail");
        assert_eq!(err.code, ErrorCode::HttpError(500));
    }

    #[tokio::test]
    async fn non_html_content_type_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/doc.pdf");
            then.status(200)
                .header("content-type", "application/pdf")
                .body("%PDF-1.4");
        });

        let err = fetch(&test_client(Duration::from_secs(5)), &url_of(&server, "/doc.pdf"))
            .await
            .expect_err("pdf should be rejected");
        assert_eq!(err.code, ErrorCode::UnsupportedContentType);
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .header("content-type", "text/html")
                .delay(Duration::from_secs(2))
                .body("<html></html>");
        });

        let err = fetch(&test_client(Duration::from_millis(200)), &url_of(&server, "/slow"))
            .await
            .expect_err("should time out");
        assert!(err.is_timeout(), "expected timeout, got {:?}", err);
    }

    #[tokio::test]
    async fn refused_connection_is_connection_failed() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();
        let err = fetch(&test_client(Duration::from_secs(5)), &url)
            .await
            .expect_err("nothing listens on a closed port");
        assert_eq!(err.code, ErrorCode::ConnectionFailed);
    }

    #[test]
    fn decodes_declared_and_detected_charsets() {
        assert_eq!(
            decode_body("hello".as_bytes(), Some("text/html; charset=utf-8")),
            "hello"
        );
        let latin1: &[u8] = &[0x63, 0x61, 0x66, 0xe9];
        assert_eq!(decode_body(latin1, Some("text/html; charset=ISO-8859-1")), "café");
    }

    #[test]
    fn extracts_charset_parameter() {
        assert_eq!(
            extract_charset("text/html; charset=\"UTF-8\""),
            Some("utf-8".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }
}

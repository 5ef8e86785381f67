// ABOUTME: Error types for the ingestion pipeline including the ErrorCode enum and IngestError struct.
// ABOUTME: Every stage failure carries a code that maps to a stable, user-readable message.

use std::fmt;

/// Error codes for every terminal failure the pipeline can report.
///
/// Admission codes come first, then fetch codes, then synthesizer codes.
/// Image resolution has no code: it never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidFormat,
    UnsupportedScheme,
    PrivateOrLocalTarget,
    UnresolvableHost,
    Timeout,
    RedirectNotAllowed,
    HttpError(u16),
    UnsupportedContentType,
    ConnectionFailed,
    ContentTooLarge,
    EmptyResponse,
    MalformedResponse,
    SynthesisUnavailable,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::InvalidFormat => write!(f, "invalid URL format"),
            ErrorCode::UnsupportedScheme => write!(f, "unsupported scheme"),
            ErrorCode::PrivateOrLocalTarget => write!(f, "private or local target"),
            ErrorCode::UnresolvableHost => write!(f, "unresolvable host"),
            ErrorCode::Timeout => write!(f, "timeout"),
            ErrorCode::RedirectNotAllowed => write!(f, "redirect not allowed"),
            ErrorCode::HttpError(status) => write!(f, "HTTP status {}", status),
            ErrorCode::UnsupportedContentType => write!(f, "unsupported content type"),
            ErrorCode::ConnectionFailed => write!(f, "connection failed"),
            ErrorCode::ContentTooLarge => write!(f, "content too large"),
            ErrorCode::EmptyResponse => write!(f, "empty synthesizer response"),
            ErrorCode::MalformedResponse => write!(f, "malformed synthesizer response"),
            ErrorCode::SynthesisUnavailable => write!(f, "synthesizer unavailable"),
        }
    }
}

/// Message shown for every synthesizer failure; the caller is invited to retry manually.
pub const EXTRACTION_FAILED_MESSAGE: &str =
    "Failed to extract data from URL. Please try again or enter manually.";

/// The main error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub struct IngestError {
    pub code: ErrorCode,
    pub url: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ingest: {} {}: {}", self.op, self.url, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl IngestError {
    /// Create an error with an explicit code.
    pub fn new(
        code: ErrorCode,
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            url: url.into(),
            op: op.into(),
            source,
        }
    }

    /// Create an InvalidFormat error.
    pub fn invalid_format(url: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::InvalidFormat, url, "Admit", source)
    }

    /// Create a PrivateOrLocalTarget error.
    pub fn private_target(url: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::PrivateOrLocalTarget, url, "Admit", source)
    }

    /// Create a Timeout error.
    pub fn timeout(url: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Timeout, url, "Fetch", source)
    }

    /// Create an HttpError for a non-2xx, non-3xx status.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::new(ErrorCode::HttpError(status), url, "Fetch", None)
    }

    /// Create a synthesizer error with the given code.
    pub fn synthesis(
        code: ErrorCode,
        url: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(code, url, "Synthesize", source)
    }

    /// Stable, user-readable message for the admin UI.
    pub fn user_message(&self) -> String {
        match self.code {
            ErrorCode::InvalidFormat => "Please enter a valid URL".to_string(),
            ErrorCode::UnsupportedScheme => "Only http and https URLs are supported".to_string(),
            ErrorCode::PrivateOrLocalTarget => {
                "URLs pointing to private or local networks are not allowed".to_string()
            }
            ErrorCode::UnresolvableHost => {
                "The website's address could not be resolved".to_string()
            }
            ErrorCode::Timeout => "The website took too long to respond".to_string(),
            ErrorCode::RedirectNotAllowed => {
                "The URL redirects elsewhere; please enter the final address".to_string()
            }
            ErrorCode::HttpError(status) => {
                format!("The website responded with HTTP status {}", status)
            }
            ErrorCode::UnsupportedContentType => {
                "The URL does not point to an HTML page".to_string()
            }
            ErrorCode::ConnectionFailed => "The website could not be reached".to_string(),
            ErrorCode::ContentTooLarge => "The page is too large to import".to_string(),
            ErrorCode::EmptyResponse
            | ErrorCode::MalformedResponse
            | ErrorCode::SynthesisUnavailable => EXTRACTION_FAILED_MESSAGE.to_string(),
        }
    }

    /// HTTP status a route layer should answer with.
    ///
    /// Admission rejections are user-correctable (400); fetch failures are
    /// upstream problems with the target site (422, or 504 for timeouts);
    /// synthesizer failures are upstream service problems (502).
    pub fn status_hint(&self) -> u16 {
        if self.is_admission() {
            400
        } else if self.is_timeout() {
            504
        } else if self.is_fetch() {
            422
        } else {
            502
        }
    }

    /// Returns true for rejections raised before any request is sent.
    pub fn is_admission(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidFormat
                | ErrorCode::UnsupportedScheme
                | ErrorCode::PrivateOrLocalTarget
                | ErrorCode::UnresolvableHost
        )
    }

    /// Returns true for rejections raised while fetching the target page.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::Timeout
                | ErrorCode::RedirectNotAllowed
                | ErrorCode::HttpError(_)
                | ErrorCode::UnsupportedContentType
                | ErrorCode::ConnectionFailed
                | ErrorCode::ContentTooLarge
        )
    }

    /// Returns true for failures of the business-data synthesizer.
    pub fn is_synthesis(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::EmptyResponse | ErrorCode::MalformedResponse | ErrorCode::SynthesisUnavailable
        )
    }

    /// Returns true if this is a Timeout error.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::Timeout
    }

    /// Returns true if the target was private, loopback, or link-local.
    pub fn is_private_target(&self) -> bool {
        self.code == ErrorCode::PrivateOrLocalTarget
    }

    /// Returns true if the target answered with a redirect.
    pub fn is_redirect(&self) -> bool {
        self.code == ErrorCode::RedirectNotAllowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_op_url_code_and_source() {
        let err = IngestError::new(
            ErrorCode::HttpError(404),
            "https://example.com",
            "Fetch",
            Some(anyhow::anyhow!("not found")),
        );
        assert_eq!(
            err.to_string(),
            "ingest: Fetch https://example.com: HTTP status 404: not found"
        );
    }

    #[test]
    fn each_stage_maps_to_its_group() {
        assert!(IngestError::invalid_format("x", None).is_admission());
        assert!(IngestError::http_status("x", 500).is_fetch());
        assert!(IngestError::synthesis(ErrorCode::EmptyResponse, "x", None).is_synthesis());
        assert!(!IngestError::timeout("x", None).is_admission());
    }

    #[test]
    fn user_messages_are_distinct_for_admission_and_fetch() {
        let codes = [
            ErrorCode::InvalidFormat,
            ErrorCode::UnsupportedScheme,
            ErrorCode::PrivateOrLocalTarget,
            ErrorCode::UnresolvableHost,
            ErrorCode::Timeout,
            ErrorCode::RedirectNotAllowed,
            ErrorCode::HttpError(503),
            ErrorCode::UnsupportedContentType,
            ErrorCode::ConnectionFailed,
            ErrorCode::ContentTooLarge,
        ];
        let mut messages: Vec<String> = codes
            .iter()
            .map(|c| IngestError::new(*c, "u", "op", None).user_message())
            .collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), codes.len());
    }

    #[test]
    fn synthesis_errors_share_retry_message() {
        for code in [
            ErrorCode::EmptyResponse,
            ErrorCode::MalformedResponse,
            ErrorCode::SynthesisUnavailable,
        ] {
            let err = IngestError::synthesis(code, "u", None);
            assert_eq!(err.user_message(), EXTRACTION_FAILED_MESSAGE);
            assert_eq!(err.status_hint(), 502);
        }
    }

    #[test]
    fn http_error_message_names_status() {
        let err = IngestError::http_status("u", 404);
        assert_eq!(err.user_message(), "The website responded with HTTP status 404");
        assert_eq!(err.status_hint(), 422);
        assert_eq!(IngestError::timeout("u", None).status_hint(), 504);
        assert_eq!(IngestError::private_target("u", None).status_hint(), 400);
    }
}

// ABOUTME: Configuration options for the ingestion pipeline and the ClientBuilder that consumes them.
// ABOUTME: Options can be assembled fluently or read from the environment for API keys and service URLs.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::admission::Resolve;
use crate::client::Client;
use crate::image::ImageConfig;
use crate::synth::SynthesizerConfig;

/// Overall timeout for fetching a target page.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for calls to the completion, photo-search and image services.
pub const DEFAULT_SERVICE_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_USER_AGENT: &str = "PlatformIngest/1.0 (+metadata import)";

/// Configuration options for the pipeline client.
#[derive(Debug, Clone)]
pub struct Options {
    pub timeout: Duration,
    pub service_timeout: Duration,
    pub user_agent: String,
    pub allow_private_networks: bool,
    /// Client used for target pages. Must not follow redirects.
    pub http_client: Option<reqwest::Client>,
    /// Client used for the completion and image services.
    pub service_client: Option<reqwest::Client>,
    pub resolver: Option<Arc<dyn Resolve>>,
    /// Fixed addresses for hosts when building the fetch client.
    pub resolve_overrides: Vec<(String, SocketAddr)>,
    pub synthesizer: SynthesizerConfig,
    pub images: ImageConfig,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            service_timeout: DEFAULT_SERVICE_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allow_private_networks: false,
            http_client: None,
            service_client: None,
            resolver: None,
            resolve_overrides: Vec::new(),
            synthesizer: SynthesizerConfig::default(),
            images: ImageConfig::default(),
        }
    }
}

impl Options {
    /// Defaults plus service settings from the environment.
    ///
    /// Reads `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL`,
    /// `UNSPLASH_ACCESS_KEY` and `UNSPLASH_BASE_URL`. The OpenAI key is used
    /// for both completions and image generation.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut opts = Self::default();

        let openai_key = get("OPENAI_API_KEY");
        opts.synthesizer.api_key = openai_key.clone();
        opts.images.generation_api_key = openai_key;
        if let Some(base) = get("OPENAI_BASE_URL") {
            opts.synthesizer.base_url = base.clone();
            opts.images.generation_base_url = base;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            opts.synthesizer.model = model;
        }
        opts.images.photo_search_key = get("UNSPLASH_ACCESS_KEY");
        if let Some(base) = get("UNSPLASH_BASE_URL") {
            opts.images.photo_search_base_url = base;
        }
        opts
    }
}

/// Builder for constructing Client instances with custom configuration.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    opts: Options,
}

impl ClientBuilder {
    /// Create a new ClientBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: Options::default(),
        }
    }

    /// Create a ClientBuilder with service settings read from the environment.
    pub fn from_env() -> Self {
        Self {
            opts: Options::from_env(),
        }
    }

    /// Set the page fetch timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the timeout for external service calls.
    pub fn service_timeout(mut self, timeout: Duration) -> Self {
        self.opts.service_timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Allow or disallow requests to private networks.
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.opts.allow_private_networks = allow;
        self
    }

    /// Use a custom HTTP client for target pages.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Use a custom HTTP client for external services.
    pub fn service_client(mut self, client: reqwest::Client) -> Self {
        self.opts.service_client = Some(client);
        self
    }

    /// Use a custom resolver for admission checks.
    pub fn resolver(mut self, resolver: impl Resolve + 'static) -> Self {
        self.opts.resolver = Some(Arc::new(resolver));
        self
    }

    /// Connect to a fixed address whenever the fetch client sees `host`.
    pub fn resolve_override(mut self, host: impl Into<String>, addr: SocketAddr) -> Self {
        self.opts.resolve_overrides.push((host.into(), addr));
        self
    }

    /// Set the completion service configuration.
    pub fn synthesizer(mut self, config: SynthesizerConfig) -> Self {
        self.opts.synthesizer = config;
        self
    }

    /// Set the image service configuration.
    pub fn images(mut self, config: ImageConfig) -> Self {
        self.opts.images = config;
        self
    }

    /// Build the Client with the configured options.
    pub fn build(self) -> Client {
        Client::new(self.opts)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_pipeline_bounds() {
        let opts = Options::default();
        assert_eq!(opts.timeout, Duration::from_secs(10));
        assert!(!opts.allow_private_networks);
        assert!(opts.synthesizer.api_key.is_none());
        assert_eq!(opts.synthesizer.model, "gpt-4o");
    }

    #[test]
    fn reads_service_settings_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://llm.internal/v1"),
            ("UNSPLASH_ACCESS_KEY", "  "),
        ]
        .into_iter()
        .collect();
        let opts = Options::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(opts.synthesizer.api_key.as_deref(), Some("sk-test"));
        assert_eq!(opts.synthesizer.base_url, "http://llm.internal/v1");
        assert_eq!(opts.images.generation_api_key.as_deref(), Some("sk-test"));
        assert_eq!(opts.images.generation_base_url, "http://llm.internal/v1");
        assert!(opts.images.photo_search_key.is_none(), "blank keys are ignored");
    }

    #[test]
    fn builder_sets_options() {
        let builder = ClientBuilder::new()
            .timeout(Duration::from_secs(3))
            .user_agent("custom")
            .allow_private_networks(true)
            .resolve_override("a.example", "127.0.0.1:8080".parse().unwrap());
        assert_eq!(builder.opts.timeout, Duration::from_secs(3));
        assert_eq!(builder.opts.user_agent, "custom");
        assert!(builder.opts.allow_private_networks);
        assert_eq!(builder.opts.resolve_overrides.len(), 1);
    }
}

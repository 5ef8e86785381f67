// ABOUTME: The pipeline Client that runs admission, fetch, extraction, synthesis and image resolution.
// ABOUTME: HTTP clients are built once per Client and shared by every request it serves.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use url::Url;

use crate::admission::{admit, Resolve, SystemResolver};
use crate::error::IngestError;
use crate::extract::{extract_with_base, ExtractedMetadata};
use crate::fetch::{build_fetch_client, fetch};
use crate::image::{ImageQuery, ImageResolver};
use crate::options::{ClientBuilder, Options};
use crate::result::{ExtractRequest, LogoRequest, LogoResponse, PlatformDraft};
use crate::synth::Synthesizer;

/// The platform import client.
#[derive(Debug)]
pub struct Client {
    opts: Options,
    fetch_client: reqwest::Client,
    resolver: Arc<dyn Resolve>,
    synthesizer: Synthesizer,
    images: ImageResolver,
}

impl Client {
    /// Create a new ClientBuilder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new Client with the given options.
    pub fn new(opts: Options) -> Self {
        let fetch_client = opts.http_client.clone().unwrap_or_else(|| {
            build_fetch_client(&opts.user_agent, opts.timeout, &opts.resolve_overrides)
        });

        let service_client = opts.service_client.clone().unwrap_or_else(|| {
            reqwest::Client::builder()
                .user_agent(&opts.user_agent)
                .timeout(opts.service_timeout)
                .build()
                .expect("failed to build HTTP client")
        });

        let resolver = opts
            .resolver
            .clone()
            .unwrap_or_else(|| Arc::new(SystemResolver));
        let synthesizer = Synthesizer::new(service_client.clone(), opts.synthesizer.clone());
        let images = ImageResolver::from_config(&service_client, &opts.images);

        Self {
            opts,
            fetch_client,
            resolver,
            synthesizer,
            images,
        }
    }

    /// Run only the admission gate on a raw URL.
    pub async fn admit(&self, raw: &str) -> Result<Url, IngestError> {
        admit(raw, self.resolver.as_ref(), self.opts.allow_private_networks).await
    }

    /// Fetch an admitted page and extract its metadata.
    pub async fn fetch_metadata(&self, url: &Url) -> Result<ExtractedMetadata, IngestError> {
        let document = fetch(&self.fetch_client, url).await?;
        Ok(extract_with_base(&document.html(), url))
    }

    /// Import a platform from a URL with the default sort order.
    pub async fn extract_from_url(&self, raw: &str) -> Result<PlatformDraft, IngestError> {
        self.extract(&ExtractRequest::new(raw)).await
    }

    /// Import a platform from a URL.
    ///
    /// The returned draft's `link` is the request URL exactly as given.
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub async fn extract(&self, request: &ExtractRequest) -> Result<PlatformDraft, IngestError> {
        let url = self.admit(&request.url).await?;
        let meta = self.fetch_metadata(&url).await?;
        debug!(
            title = %meta.title,
            has_image = !meta.image.is_empty(),
            body_chars = meta.body_text.chars().count(),
            "extracted metadata"
        );

        let profile = self.synthesizer.synthesize(&url, &meta).await?;
        let logo = self
            .images
            .resolve(&ImageQuery {
                page_image: meta.image,
                category: profile.category.clone(),
                name: profile.name.clone(),
            })
            .await;

        info!(name = %profile.name, category = %profile.category, "platform extracted");
        Ok(PlatformDraft::new(
            profile,
            request.url.clone(),
            logo,
            request.sort_order.unwrap_or(0),
        ))
    }

    /// Pick an image for a category without fetching any page. Never fails.
    #[instrument(skip(self, request), fields(category = %request.category))]
    pub async fn generate_logo(&self, request: &LogoRequest) -> LogoResponse {
        let logo = self
            .images
            .resolve(&ImageQuery {
                page_image: String::new(),
                category: request.category.clone(),
                name: request.name.clone().unwrap_or_default(),
            })
            .await;
        LogoResponse { logo }
    }
}

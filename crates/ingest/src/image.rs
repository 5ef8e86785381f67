// ABOUTME: Image resolver that walks an ordered chain of image sources until one yields a URL.
// ABOUTME: Sources: page og:image, photo search, image generation, curated category map, generic default.

use std::fmt;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_PHOTO_SEARCH_BASE_URL: &str = "https://api.unsplash.com";
pub const DEFAULT_GENERATION_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GENERATION_MODEL: &str = "dall-e-3";

/// Last-resort image when every source comes up empty.
pub const DEFAULT_IMAGE_URL: &str = "https://images.unsplash.com/photo-1497366216548-37526070297c?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200";

/// Curated category keywords and their representative images, checked in order.
const CATEGORY_IMAGES: &[(&str, &str)] = &[
    ("project management", "https://images.unsplash.com/photo-1551434678-e076c223a692?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
    ("financial analytics", "https://images.unsplash.com/photo-1551288049-bebda4e38f71?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
    ("customer service", "https://images.unsplash.com/photo-1516321318423-f06f85e504b3?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
    ("marketing automation", "https://images.unsplash.com/photo-1460925895917-afdab827c52f?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
    ("human resources", "https://images.unsplash.com/photo-1552664730-d307ca884978?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
    ("e-commerce", "https://images.unsplash.com/photo-1556742049-0cfed4f6a45d?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
    ("ecommerce", "https://images.unsplash.com/photo-1556742049-0cfed4f6a45d?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
    ("retail", "https://images.unsplash.com/photo-1556742049-0cfed4f6a45d?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
    ("finance", "https://images.unsplash.com/photo-1551288049-bebda4e38f71?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
    ("analytics", "https://images.unsplash.com/photo-1551288049-bebda4e38f71?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
    ("marketing", "https://images.unsplash.com/photo-1460925895917-afdab827c52f?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
    ("support", "https://images.unsplash.com/photo-1516321318423-f06f85e504b3?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
    ("recruiting", "https://images.unsplash.com/photo-1552664730-d307ca884978?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
    ("collaboration", "https://images.unsplash.com/photo-1551434678-e076c223a692?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=200"),
];

/// What the resolver knows about the platform it needs an image for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageQuery {
    /// og:image or twitter:image from the page, possibly empty.
    pub page_image: String,
    pub category: String,
    pub name: String,
}

/// One tier of the fallback chain.
///
/// `Ok(None)` and `Err` both mean "try the next source"; errors are logged.
#[async_trait]
pub trait ImageSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn find(&self, query: &ImageQuery) -> anyhow::Result<Option<String>>;
}

/// Settings for the remote image services.
#[derive(Clone)]
pub struct ImageConfig {
    pub photo_search_key: Option<String>,
    pub photo_search_base_url: String,
    pub generation_api_key: Option<String>,
    pub generation_base_url: String,
    pub generation_model: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            photo_search_key: None,
            photo_search_base_url: DEFAULT_PHOTO_SEARCH_BASE_URL.to_string(),
            generation_api_key: None,
            generation_base_url: DEFAULT_GENERATION_BASE_URL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
        }
    }
}

impl fmt::Debug for ImageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageConfig")
            .field("photo_search_key", &self.photo_search_key.as_ref().map(|_| "<redacted>"))
            .field("photo_search_base_url", &self.photo_search_base_url)
            .field("generation_api_key", &self.generation_api_key.as_ref().map(|_| "<redacted>"))
            .field("generation_base_url", &self.generation_base_url)
            .field("generation_model", &self.generation_model)
            .finish()
    }
}

/// The image the page itself declares.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageImage;

#[async_trait]
impl ImageSource for PageImage {
    fn name(&self) -> &'static str {
        "page"
    }

    async fn find(&self, query: &ImageQuery) -> anyhow::Result<Option<String>> {
        Ok(non_empty(&query.page_image))
    }
}

#[derive(Debug, Default, Deserialize)]
struct PhotoSearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: Option<PhotoUrls>,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: Option<String>,
    small: Option<String>,
}

/// Keyword photo search, authenticated with a client id.
#[derive(Debug, Clone)]
pub struct PhotoSearch {
    http: reqwest::Client,
    access_key: String,
    base_url: String,
}

impl PhotoSearch {
    pub fn new(http: reqwest::Client, access_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            access_key: access_key.into(),
            base_url: base_url.into(),
        }
    }

    fn search_terms(query: &ImageQuery) -> String {
        let mut terms: Vec<&str> = Vec::new();
        for part in [query.category.trim(), query.name.trim()] {
            if !part.is_empty() {
                terms.push(part);
            }
        }
        terms.push("business");
        terms.push("professional");
        terms.join(" ")
    }
}

#[async_trait]
impl ImageSource for PhotoSearch {
    fn name(&self) -> &'static str {
        "photo-search"
    }

    async fn find(&self, query: &ImageQuery) -> anyhow::Result<Option<String>> {
        let endpoint = format!("{}/search/photos", self.base_url.trim_end_matches('/'));
        let response: PhotoSearchResponse = self
            .http
            .get(&endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("Client-ID {}", self.access_key))
            .query(&[
                ("query", Self::search_terms(query).as_str()),
                ("per_page", "10"),
                ("orientation", "landscape"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let candidates: Vec<String> = response
            .results
            .into_iter()
            .filter_map(|photo| photo.urls)
            .filter_map(|urls| non_empty_opt(urls.regular).or_else(|| non_empty_opt(urls.small)))
            .collect();
        Ok(candidates.choose(&mut rand::thread_rng()).cloned())
    }
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: String,
    n: u8,
    size: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

/// Image generation, used when no photo-search key is configured.
#[derive(Debug, Clone)]
pub struct ImageGeneration {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ImageGeneration {
    pub fn new(
        http: reqwest::Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    fn prompt(query: &ImageQuery) -> String {
        let category = non_empty(&query.category).unwrap_or_else(|| "business software".to_string());
        match non_empty(&query.name) {
            Some(name) => format!(
                "A clean, modern, professional illustration representing {}, a {} platform. No text.",
                name, category
            ),
            None => format!(
                "A clean, modern, professional illustration representing a {} platform. No text.",
                category
            ),
        }
    }
}

#[async_trait]
impl ImageSource for ImageGeneration {
    fn name(&self) -> &'static str {
        "image-generation"
    }

    async fn find(&self, query: &ImageQuery) -> anyhow::Result<Option<String>> {
        let endpoint = format!("{}/images/generations", self.base_url.trim_end_matches('/'));
        let request = ImageGenerationRequest {
            model: &self.model,
            prompt: Self::prompt(query),
            n: 1,
            size: "1024x1024",
        };
        let response: ImageGenerationResponse = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .data
            .into_iter()
            .next()
            .and_then(|image| non_empty_opt(image.url)))
    }
}

/// Shortest category that may match as a fragment of a longer keyword.
const MIN_FRAGMENT_CHARS: usize = 3;

/// Curated category-to-image table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryMap;

impl CategoryMap {
    /// Exact keyword match first, then substring match in either direction.
    ///
    /// A category shorter than three characters only matches exactly, so
    /// "AI" does not land on "retail".
    pub fn lookup(category: &str) -> Option<&'static str> {
        let key = category.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        let fragment_ok = key.chars().count() >= MIN_FRAGMENT_CHARS;
        CATEGORY_IMAGES
            .iter()
            .find(|(keyword, _)| *keyword == key)
            .or_else(|| {
                CATEGORY_IMAGES.iter().find(|(keyword, _)| {
                    key.contains(keyword) || (fragment_ok && keyword.contains(key.as_str()))
                })
            })
            .map(|(_, url)| *url)
    }
}

#[async_trait]
impl ImageSource for CategoryMap {
    fn name(&self) -> &'static str {
        "category-map"
    }

    async fn find(&self, query: &ImageQuery) -> anyhow::Result<Option<String>> {
        Ok(Self::lookup(&query.category).map(str::to_string))
    }
}

/// Ordered, lazily evaluated chain of image sources.
pub struct ImageResolver {
    sources: Vec<Box<dyn ImageSource>>,
}

impl fmt::Debug for ImageResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("ImageResolver").field("sources", &names).finish()
    }
}

impl ImageResolver {
    pub fn new(sources: Vec<Box<dyn ImageSource>>) -> Self {
        Self { sources }
    }

    /// Standard chain: page image, then photo search if a key is set,
    /// otherwise image generation if its key is set, then the category map.
    pub fn from_config(http: &reqwest::Client, config: &ImageConfig) -> Self {
        let mut sources: Vec<Box<dyn ImageSource>> = vec![Box::new(PageImage)];
        if let Some(key) = config.photo_search_key.as_deref().filter(|k| !k.is_empty()) {
            sources.push(Box::new(PhotoSearch::new(
                http.clone(),
                key,
                config.photo_search_base_url.clone(),
            )));
        } else if let Some(key) = config.generation_api_key.as_deref().filter(|k| !k.is_empty()) {
            sources.push(Box::new(ImageGeneration::new(
                http.clone(),
                key,
                config.generation_base_url.clone(),
                config.generation_model.clone(),
            )));
        }
        sources.push(Box::new(CategoryMap));
        Self::new(sources)
    }

    /// Names of the configured sources, in evaluation order.
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Resolve an image URL. Always returns something.
    pub async fn resolve(&self, query: &ImageQuery) -> String {
        for source in &self.sources {
            match source.find(query).await {
                Ok(Some(url)) if !url.trim().is_empty() => {
                    debug!(source = source.name(), %url, "image resolved");
                    return url;
                }
                Ok(_) => debug!(source = source.name(), "no image"),
                Err(e) => warn!(source = source.name(), error = %e, "image source failed"),
            }
        }
        DEFAULT_IMAGE_URL.to_string()
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn non_empty_opt(s: Option<String>) -> Option<String> {
    s.as_deref().and_then(non_empty)
}

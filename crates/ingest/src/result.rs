// ABOUTME: Records crossing the pipeline boundary: requests in, PlatformDraft and LogoResponse out.
// ABOUTME: Serialized in camelCase to match the platform records stored by the admin layer.

use serde::{Deserialize, Serialize};

/// Structured business data produced by the synthesizer, after field fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub name: String,
    pub description: String,
    pub category: String,
}

/// A platform record ready for review and saving by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformDraft {
    pub name: String,
    pub description: String,
    pub category: String,
    /// The URL exactly as the caller supplied it.
    pub link: String,
    pub logo: String,
    pub is_active: bool,
    pub sort_order: i32,
}

impl PlatformDraft {
    pub fn new(profile: BusinessProfile, link: impl Into<String>, logo: String, sort_order: i32) -> Self {
        Self {
            name: profile.name,
            description: profile.description,
            category: profile.category,
            link: link.into(),
            logo,
            is_active: true,
            sort_order,
        }
    }
}

/// Import-from-URL request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

impl ExtractRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            sort_order: None,
        }
    }
}

/// Image-only request used when an admin wants a logo for a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoRequest {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoResponse {
    pub logo: String,
}

/// Error body a route layer can return alongside [`crate::IngestError::status_hint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl From<&crate::IngestError> for ErrorResponse {
    fn from(err: &crate::IngestError) -> Self {
        Self {
            message: err.user_message(),
        }
    }
}

// ABOUTME: Main library entry point for the platform URL ingestion pipeline.
// ABOUTME: Re-exports the public API: Client, ClientBuilder, PlatformDraft, IngestError, ErrorCode, Options.

//! Platform ingest - import a business platform record from an arbitrary URL.
//!
//! The pipeline admits the URL (rejecting anything that is or resolves to a
//! private network), fetches it without following redirects, extracts page
//! metadata, asks a completion service for a business profile, and picks a
//! representative image through a fallback chain.
//!
//! # Example
//!
//! ```no_run
//! use platform_ingest::{ClientBuilder, IngestError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), IngestError> {
//!     let client = ClientBuilder::from_env().build();
//!     let draft = client.extract_from_url("https://example.com").await?;
//!     println!("{} ({})", draft.name, draft.category);
//!     Ok(())
//! }
//! ```

pub mod address;
pub mod admission;
pub mod client;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod image;
pub mod options;
pub mod result;
pub mod synth;

pub use crate::address::{is_non_routable, is_non_routable_ip};
pub use crate::admission::{Resolve, StaticResolver, SystemResolver};
pub use crate::client::Client;
pub use crate::error::{ErrorCode, IngestError};
pub use crate::extract::{extract, ExtractedMetadata};
pub use crate::image::{ImageConfig, ImageQuery, ImageResolver, ImageSource};
pub use crate::options::{ClientBuilder, Options};
pub use crate::result::{
    BusinessProfile, ErrorResponse, ExtractRequest, LogoRequest, LogoResponse, PlatformDraft,
};
pub use crate::synth::{Synthesizer, SynthesizerConfig};

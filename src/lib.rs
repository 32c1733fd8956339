//! Toggl Wiki Library
//!
//! Renders Toggl Track data inside wiki pages through markup tags: workspace,
//! user, client and project listings, and summary reports either as a nested
//! listing or as an hour total.
//!
//! ## Architecture Overview
//!
//! - [`options`] - Parsing of `name=value` tag tokens, legacy parameter names
//! - [`credentials`] - Workspace id resolution and API token handling
//! - [`gateway`] - Authenticated calls to the resource and reports APIs
//! - [`cache`] - TTL response cache and per-render-batch dictionaries
//! - [`report`] - Typed summary report schema, grouping dimensions and filters
//! - [`reducer`] - Reduction of summary reports to listings and hour totals
//! - [`listings`] - Workspace resource listings
//! - [`tags`] - The markup tag surface handed to the host
//! - [`error`] - Error kinds and user-visible error fragments
//! - [`config`] - Configuration with environment variable support
//! - [`logging`] - Structured logging with JSON and pretty-print formats
//!
//! ## Main Entry Point
//!
//! ```no_run
//! use std::sync::Arc;
//! use toggl_wiki::{Config, Credentials, ReqwestTransport, Tag, TogglExtension};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let extension = TogglExtension::from_config(&config, Arc::new(ReqwestTransport::new()?));
//!
//! let session = extension.session(Credentials::new(config.toggl.api_token.clone()));
//! let output = session
//!     .render(Tag::ReportSummaryHours, &["start_date=2024-01-01", "user_id=42"])
//!     .await;
//! println!("{}", output.text);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod listings;
pub mod logging;
pub mod options;
pub mod reducer;
pub mod report;
pub mod tags;

pub use cache::{BatchCache, CacheKey, TtlCache};
pub use config::Config;
pub use credentials::{CredentialStore, Credentials, InMemoryCredentialStore};
pub use error::{ErrorMessage, MessageLocalizer, TogglError};
pub use gateway::{ApiRequest, ApiResponse, HttpMethod, ReqwestTransport, TogglClient, Transport};
pub use options::{extract_options, OptionValue, QueryOptions, ResolvedParams};
pub use reducer::ReportReducer;
pub use report::{Dimension, Filter, GroupingSelection, SummaryReport};
pub use tags::{RenderSession, Tag, TagOutput, TogglExtension};

//! Markup tags
//!
//! The host wiki registers one parser function per [`Tag`] and hands every
//! invocation's raw argument tokens to a [`RenderSession`]. A session lives
//! for one render batch (typically one page parse) so that tags on the same
//! page share fetched reports and client lists.

use crate::cache::{BatchCache, TtlCache};
use crate::config::Config;
use crate::credentials::{api_key_preference, ApiKeyPreference, Credentials};
use crate::error::{error_fragment, DefaultMessages, MessageLocalizer, Result};
use crate::gateway::{Endpoints, TogglClient, Transport};
use crate::listings::ListingRenderer;
use crate::options::extract_options;
use crate::reducer::ReportReducer;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Workspaces,
    WorkspaceUsers,
    WorkspaceClients,
    WorkspaceProjects,
    ReportSummary,
    ReportSummaryHours,
}

impl Tag {
    pub const ALL: [Tag; 6] = [
        Tag::Workspaces,
        Tag::WorkspaceUsers,
        Tag::WorkspaceClients,
        Tag::WorkspaceProjects,
        Tag::ReportSummary,
        Tag::ReportSummaryHours,
    ];

    /// Parser function name registered with the host.
    pub fn magic_word(self) -> &'static str {
        match self {
            Tag::Workspaces => "toggl-workspaces",
            Tag::WorkspaceUsers => "toggl-workspace-users",
            Tag::WorkspaceClients => "toggl-workspace-clients",
            Tag::WorkspaceProjects => "toggl-workspace-projects",
            Tag::ReportSummary => "toggl-report-summary",
            Tag::ReportSummaryHours => "toggl-report-summary-hours",
        }
    }

    pub fn from_magic_word(word: &str) -> Option<Self> {
        let word = word.trim().trim_start_matches('#').trim_end_matches(':');
        Tag::ALL.into_iter().find(|tag| tag.magic_word() == word)
    }

    /// Listing tags produce finished HTML; report tags produce text the host
    /// keeps parsing as markup.
    pub fn produces_html(self) -> bool {
        !matches!(self, Tag::ReportSummary | Tag::ReportSummaryHours)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.magic_word())
    }
}

/// Result of one tag invocation, with the flags the host needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOutput {
    pub text: String,
    pub is_html: bool,
    pub no_parse: bool,
    /// Page cache lifetime in seconds. Always zero: the data changes
    /// independently of the page source.
    pub cache_expiry: u32,
}

impl TagOutput {
    fn for_tag(tag: Tag, text: String) -> Self {
        let html = tag.produces_html();
        Self {
            text,
            is_html: html,
            no_parse: html,
            cache_expiry: 0,
        }
    }
}

/// Process-wide wiring: transport, endpoints, defaults and the shared TTL
/// cache. Hands out one [`RenderSession`] per render batch.
#[derive(Clone)]
pub struct TogglExtension {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    responses: Arc<TtlCache>,
    default_workspace: Option<String>,
    user_agent: Option<String>,
    localizer: Arc<dyn MessageLocalizer>,
}

impl TogglExtension {
    pub fn new(transport: Arc<dyn Transport>, endpoints: Endpoints, responses: Arc<TtlCache>) -> Self {
        Self {
            transport,
            endpoints,
            responses,
            default_workspace: None,
            user_agent: None,
            localizer: Arc::new(DefaultMessages),
        }
    }

    pub fn from_config(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self::new(
            transport,
            config.toggl.endpoints(),
            Arc::new(TtlCache::new(config.cache.ttl_seconds)),
        )
        .with_default_workspace(config.toggl.default_workspace_id.clone())
        .with_user_agent(config.toggl.user_agent.clone())
    }

    pub fn with_default_workspace(mut self, workspace_id: Option<String>) -> Self {
        self.default_workspace = workspace_id.filter(|id| !id.is_empty());
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_localizer(mut self, localizer: Arc<dyn MessageLocalizer>) -> Self {
        self.localizer = localizer;
        self
    }

    pub fn responses(&self) -> &Arc<TtlCache> {
        &self.responses
    }

    /// Parser functions to register with the host.
    pub fn tags(&self) -> &'static [Tag] {
        &Tag::ALL
    }

    /// User preference to register for storing the API token.
    pub fn preference(&self) -> ApiKeyPreference {
        api_key_preference()
    }

    /// Start a render batch for a caller.
    pub fn session(&self, credentials: Credentials) -> RenderSession {
        let client = Arc::new(TogglClient::new(
            Arc::clone(&self.transport),
            self.endpoints.clone(),
            credentials,
            self.user_agent.clone(),
        ));
        let batch = Arc::new(BatchCache::new());
        RenderSession {
            listings: ListingRenderer::new(
                Arc::clone(&client),
                Arc::clone(&self.responses),
                Arc::clone(&batch),
                self.default_workspace.clone(),
            ),
            reports: ReportReducer::new(
                client,
                Arc::clone(&self.responses),
                Arc::clone(&batch),
                self.default_workspace.clone(),
            ),
            batch,
            localizer: Arc::clone(&self.localizer),
        }
    }
}

/// Renders tags for one batch; report and client lookups are shared between
/// all tags rendered through the same session.
pub struct RenderSession {
    batch: Arc<BatchCache>,
    listings: ListingRenderer,
    reports: ReportReducer,
    localizer: Arc<dyn MessageLocalizer>,
}

impl RenderSession {
    pub fn batch(&self) -> &BatchCache {
        &self.batch
    }

    /// Render a tag. Failures become an error fragment in the output.
    pub async fn render<S: AsRef<str>>(&self, tag: Tag, tokens: &[S]) -> TagOutput {
        let text = match self.try_render(tag, tokens).await {
            Ok(text) => text,
            Err(e) => {
                debug!(tag = %tag, error = %e, "Tag rendered as error");
                error_fragment(&e.message(), self.localizer.as_ref())
            }
        };
        TagOutput::for_tag(tag, text)
    }

    pub async fn try_render<S: AsRef<str>>(&self, tag: Tag, tokens: &[S]) -> Result<String> {
        let options = extract_options(tokens);
        let span = info_span!("render_tag", tag = %tag, batch = %self.batch.id());
        async {
            match tag {
                Tag::Workspaces => self.listings.workspaces().await,
                Tag::WorkspaceUsers => self.listings.users(&options).await,
                Tag::WorkspaceClients => self.listings.clients(&options).await,
                Tag::WorkspaceProjects => self.listings.projects(&options).await,
                Tag::ReportSummary => self.reports.listing(&options).await,
                Tag::ReportSummaryHours => self.reports.hours(&options).await.map(|hours| hours.to_string()),
            }
        }
        .instrument(span)
        .await
    }
}

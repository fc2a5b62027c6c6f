//! Pluggable listing-page strategies
//!
//! A strategy knows how to enumerate the listing pages of one source, how to
//! obtain each page's content, and how to turn that content into records. The
//! orchestrator drives any strategy through this interface.

use crate::fetch::RequestCounter;
use crate::scraper::record::CoinRecord;
use crate::state::CancellationToken;
use crate::Result;
use async_trait::async_trait;

/// One unit of pagination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    /// Zero-based position in the run
    pub index: usize,
    /// URL or label identifying the page
    pub location: String,
}

impl PageDescriptor {
    pub fn new(index: usize, location: impl Into<String>) -> Self {
        Self {
            index,
            location: location.into(),
        }
    }
}

/// Per-run handles passed to every strategy call
pub struct ScrapeContext<'a> {
    /// Shared cancellation signal
    pub cancel: &'a CancellationToken,
    /// Counts every network round trip attributable to the run
    pub counter: &'a dyn RequestCounter,
}

/// Capability set of a listing source
#[async_trait]
pub trait ScrapeStrategy: Send {
    /// Short label used in logs
    fn name(&self) -> &str;

    /// Produces the initial listing pages
    ///
    /// May perform network work (for example, loading the first page).
    /// An error here ends the run with no records.
    async fn enumerate_pages(&mut self, ctx: &ScrapeContext<'_>) -> Result<Vec<PageDescriptor>>;

    /// Obtains the content of one page
    ///
    /// `Ok(None)` means "no data for this page" and is not an error.
    async fn fetch_page(
        &mut self,
        page: &PageDescriptor,
        ctx: &ScrapeContext<'_>,
    ) -> Result<Option<String>>;

    /// Extracts records from one page's content, preserving row order
    fn extract(&self, content: &str) -> Vec<CoinRecord>;

    /// Moves to the page after `current`, if the source paginates in place
    ///
    /// Called only once every enumerated page has been processed. An error
    /// abandons further pagination but keeps collected records.
    async fn advance(
        &mut self,
        _current: &PageDescriptor,
        _ctx: &ScrapeContext<'_>,
    ) -> Result<Option<PageDescriptor>> {
        Ok(None)
    }

    /// Releases any session held by the strategy
    ///
    /// Called on every exit path of a run.
    async fn close(&mut self) {}
}

//! Browser-driven paginated-table strategy
//!
//! The listing page is rendered by a headless Chromium. Each logical page is
//! revealed by scrolling until the document height stops growing, extracted
//! with [`TableParser`], then replaced in place by clicking the next-page
//! control. The browser session is owned by the strategy and released by
//! [`ScrapeStrategy::close`].

use crate::config::{HttpConfig, ScraperConfig};
use crate::scraper::record::CoinRecord;
use crate::scraper::strategy::{PageDescriptor, ScrapeContext, ScrapeStrategy};
use crate::scraper::table::{TableParser, TableSelectors};
use crate::state::CancellationToken;
use crate::{PulseError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Selector that must be present before a page counts as loaded
const TABLE_READY_SELECTOR: &str = "table.cmc-table";

/// Next-page control on the listing
const NEXT_PAGE_SELECTOR: &str = "div.hide_for_narrow li.next > a";

/// Interval between checks while waiting for the table
const TABLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Settings for the browser-driven strategy
#[derive(Debug, Clone)]
pub struct TableStrategyConfig {
    pub listing_url: String,
    pub max_pages: usize,
    pub user_agent: String,
    pub scroll_step_px: u32,
    pub scroll_settle: Duration,
    pub max_scroll_attempts: u32,
    pub table_wait: Duration,
}

impl TableStrategyConfig {
    pub fn from_config(scraper: &ScraperConfig, http: &HttpConfig) -> Self {
        Self {
            listing_url: scraper.listing_url.clone(),
            max_pages: scraper.max_pages,
            user_agent: http.user_agent.clone(),
            scroll_step_px: scraper.scroll_step_px,
            scroll_settle: Duration::from_millis(scraper.scroll_settle_ms),
            max_scroll_attempts: scraper.max_scroll_attempts,
            table_wait: Duration::from_secs(scraper.table_wait_secs),
        }
    }
}

struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
}

/// Paginated-table strategy backed by a headless browser
pub struct TableStrategy {
    config: TableStrategyConfig,
    parser: TableParser,
    session: Option<BrowserSession>,
}

impl TableStrategy {
    pub fn new(config: TableStrategyConfig) -> Result<Self> {
        Self::with_selectors(config, &TableSelectors::default())
    }

    pub fn with_selectors(config: TableStrategyConfig, selectors: &TableSelectors) -> Result<Self> {
        Ok(Self {
            config,
            parser: TableParser::new(selectors)?,
            session: None,
        })
    }

    fn page(&self) -> Result<&Page> {
        self.session
            .as_ref()
            .map(|session| &session.page)
            .ok_or_else(|| PulseError::Browser("browser session not started".to_string()))
    }

    async fn launch(&self) -> Result<BrowserSession> {
        let browser_config = BrowserConfig::builder()
            .no_sandbox()
            .arg(format!("--user-agent={}", self.config.user_agent))
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--mute-audio")
            .build()
            .map_err(|e| PulseError::Browser(format!("Failed to create browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {}", e);
                }
            }
            tracing::debug!("Browser handler task ended");
        });

        let page = match browser.new_page(self.config.listing_url.as_str()).await {
            Ok(page) => page,
            Err(e) => {
                let mut browser = browser;
                let _ = browser.close().await;
                handler.abort();
                return Err(e.into());
            }
        };

        Ok(BrowserSession {
            browser,
            handler,
            page,
        })
    }

    /// Waits until the coin table is attached to the document
    async fn wait_for_table(&self, cancel: &CancellationToken) -> Result<()> {
        let page = self.page()?;
        let deadline = Instant::now() + self.config.table_wait;

        loop {
            if page.find_element(TABLE_READY_SELECTOR).await.is_ok() {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(PulseError::Browser(format!(
                    "coin table did not appear within {:?}",
                    self.config.table_wait
                )));
            }

            if !cancel.sleep(TABLE_POLL_INTERVAL).await {
                return Err(PulseError::Browser("cancelled while waiting for table".to_string()));
            }
        }
    }

    async fn document_height(&self) -> Result<i64> {
        let height = self
            .page()?
            .evaluate("document.body.scrollHeight")
            .await?
            .into_value::<i64>()
            .map_err(|e| PulseError::Browser(format!("Unexpected scroll height: {}", e)))?;
        Ok(height)
    }

    /// Scrolls until the document height stabilizes or the attempt budget runs out
    async fn scroll_to_bottom(&self, cancel: &CancellationToken) -> Result<()> {
        let scroll = format!("window.scrollBy(0, {})", self.config.scroll_step_px);
        let mut last_height = self.document_height().await?;

        for attempt in 0..self.config.max_scroll_attempts {
            self.page()?.evaluate(scroll.as_str()).await?;

            if !cancel.sleep(self.config.scroll_settle).await {
                break;
            }

            let new_height = self.document_height().await?;
            if new_height == last_height {
                tracing::debug!("Document height settled at {} after {} scrolls", new_height, attempt + 1);
                break;
            }
            last_height = new_height;
        }

        Ok(())
    }
}

#[async_trait]
impl ScrapeStrategy for TableStrategy {
    fn name(&self) -> &str {
        "HTML"
    }

    async fn enumerate_pages(&mut self, ctx: &ScrapeContext<'_>) -> Result<Vec<PageDescriptor>> {
        tracing::info!("Launching browser for {}", self.config.listing_url);
        let session = self.launch().await?;
        self.session = Some(session);

        self.page()?.wait_for_navigation().await?;
        ctx.counter.increment();
        self.wait_for_table(ctx.cancel).await?;

        Ok(vec![PageDescriptor::new(0, self.config.listing_url.clone())])
    }

    async fn fetch_page(
        &mut self,
        page: &PageDescriptor,
        ctx: &ScrapeContext<'_>,
    ) -> Result<Option<String>> {
        self.scroll_to_bottom(ctx.cancel).await?;
        let content = self.page()?.content().await?;
        tracing::debug!("Captured {} bytes from listing page {}", content.len(), page.index);
        Ok(Some(content))
    }

    fn extract(&self, content: &str) -> Vec<CoinRecord> {
        self.parser.parse(content)
    }

    async fn advance(
        &mut self,
        current: &PageDescriptor,
        ctx: &ScrapeContext<'_>,
    ) -> Result<Option<PageDescriptor>> {
        let next = current.index + 1;
        if next >= self.config.max_pages {
            return Ok(None);
        }

        let button = match self.page()?.find_element(NEXT_PAGE_SELECTOR).await {
            Ok(button) => button,
            Err(_) => {
                tracing::warn!("Could not find or click next button on page {}", next);
                return Err(PulseError::PaginationControlMissing { page: next });
            }
        };

        button.click().await?;
        ctx.counter.increment();

        self.wait_for_table(ctx.cancel).await?;
        ctx.cancel.sleep(self.config.scroll_settle).await;

        let location = self
            .page()?
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| format!("{}#page-{}", self.config.listing_url, next + 1));

        Ok(Some(PageDescriptor::new(next, location)))
    }

    async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.browser.close().await {
                tracing::warn!("Failed to close browser: {}", e);
            }
            let _ = session.browser.wait().await;
            session.handler.abort();
            tracing::debug!("Browser session closed");
        }
    }
}

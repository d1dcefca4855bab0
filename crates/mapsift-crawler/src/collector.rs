use crate::browser::Browser;
use crate::config::CollectorConfig;
use crate::error::{CrawlError, Result};
use crate::record::CrawlTarget;
use crate::selectors::Selectors;

/// Runs a search and scrolls the lazily-loaded result feed to gather the
/// detail-view URLs it exposes.
#[derive(Debug, Clone)]
pub struct ResultCollector {
    config: CollectorConfig,
    selectors: Selectors,
    search_url: String,
    place_url_prefix: String,
}

impl ResultCollector {
    pub fn new(
        config: CollectorConfig,
        selectors: Selectors,
        search_url: impl Into<String>,
        place_url_prefix: impl Into<String>,
    ) -> Self {
        Self {
            config,
            selectors,
            search_url: search_url.into(),
            place_url_prefix: place_url_prefix.into(),
        }
    }

    pub fn collect<B>(&self, browser: &mut B, target: &CrawlTarget) -> Result<Vec<String>>
    where
        B: Browser + ?Sized,
    {
        log::info!("Searching {:?}", target.query());
        browser.open(&self.search_url).map_err(CrawlError::Browser)?;
        let ready = crate::browser::poll(
            browser,
            self.config.search_timeout(),
            self.config.search_poll(),
            |b| Ok((b.count(&self.selectors.search_bar)? > 0).then_some(())),
        )
        .map_err(CrawlError::Browser)?;
        if ready.is_none() {
            log::warn!("Search bar did not show up, typing anyway");
        }
        browser
            .type_text(&self.selectors.search_bar, &format!("{}\n", target.query()))
            .map_err(CrawlError::Browser)?;

        self.scroll_feed(browser);

        let urls = self.place_urls(browser)?;
        if urls.is_empty() {
            browser.refresh().ok();
            return Err(CrawlError::NoResults {
                category: target.category().to_string(),
                location: target.location().to_string(),
            });
        }
        log::info!("Collected {} identifiers for {:?}", urls.len(), target.query());
        Ok(urls)
    }

    /// Brings every second entry into view so the feed keeps loading.
    ///
    /// Stops after `scroll_budget` ticks, or earlier once the last loaded
    /// entry has been reached and the feed stayed flat for `idle_polls` ticks.
    fn scroll_feed<B>(&self, browser: &mut B)
    where
        B: Browser + ?Sized,
    {
        let mut index = 0;
        let mut loaded = 0;
        let mut idle = 0;
        for tick in 0..self.config.scroll_budget {
            let grew = match browser.count(&self.selectors.result_items) {
                Ok(n) if n > loaded => {
                    loaded = n;
                    true
                }
                Ok(_) => false,
                Err(e) => {
                    log::debug!("Counting feed entries failed: {e}");
                    false
                }
            };
            // Walking through already loaded entries counts as progress
            if grew || index < loaded {
                idle = 0;
            } else {
                idle += 1;
            }
            if let Some(limit) = self.config.idle_polls {
                if idle >= limit {
                    log::debug!("Feed idle after {tick} ticks with {loaded} entries");
                    break;
                }
            }

            if index < loaded {
                match browser.scroll_into_view(&self.selectors.result_items, index) {
                    Ok(()) => index += 2,
                    Err(e) => log::debug!("Scroll iteration failed: {e}"),
                }
            } else {
                log::debug!("Entry {index} not loaded yet");
            }
            browser.wait(self.config.scroll_pause());
        }
    }

    fn place_urls<B>(&self, browser: &mut B) -> Result<Vec<String>>
    where
        B: Browser + ?Sized,
    {
        let hrefs = browser
            .attributes(&self.selectors.result_links, "href")
            .map_err(CrawlError::Browser)?;
        Ok(hrefs
            .into_iter()
            .flatten()
            .filter(|href| href.starts_with(&self.place_url_prefix))
            .collect())
    }
}

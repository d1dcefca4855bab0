use crate::browser::Browser;
use crate::config::ExtractorConfig;
use crate::error::{CrawlError, Result};
use crate::links::LinkResolver;
use crate::record::{normalize_review_count, or_sentinel, PlaceRecord, SENTINEL};
use crate::selectors::Selectors;

/// Extracts one listing's detail view into a [`PlaceRecord`].
#[derive(Debug, Clone)]
pub struct DetailExtractor {
    config: ExtractorConfig,
    selectors: Selectors,
    resolver: LinkResolver,
}

impl DetailExtractor {
    pub fn new(config: ExtractorConfig, selectors: Selectors, resolver: LinkResolver) -> Self {
        Self {
            config,
            selectors,
            resolver,
        }
    }

    pub fn extract<B>(
        &self,
        browser: &mut B,
        identifier: &str,
        business_category: &str,
    ) -> Result<PlaceRecord>
    where
        B: Browser + ?Sized,
    {
        browser.open(identifier).map_err(CrawlError::Browser)?;
        browser.wait(self.config.settle());

        let mut name = self.field(browser, &self.selectors.place_name);
        if name == SENTINEL {
            log::debug!("Name missing on {identifier}, reloading once");
            browser.open(identifier).map_err(CrawlError::Browser)?;
            browser.wait(self.config.recovery_wait());
            self.scroll_pane(browser, self.config.nudge_px);
            name = self.field(browser, &self.selectors.place_name);
        }

        let place_type = self.field(browser, &self.selectors.place_type);
        let address = self.field(browser, &self.selectors.place_address);

        // Contact fields only render once the pane has been scrolled down
        self.scroll_pane(browser, self.config.deep_scroll_px);
        let website = self.field(browser, &self.selectors.place_website);
        let phone = self.field(browser, &self.selectors.place_phone);
        let review_stars = self.field(browser, &self.selectors.review_stars);
        let review_count = self.field(browser, &self.selectors.review_count);
        let plus_code = self.field(browser, &self.selectors.place_plus_code);
        let review_count = normalize_review_count(&review_count, &review_stars);

        let links = self.resolver.resolve(browser);
        let other_links = links.joined_other();

        let record = PlaceRecord {
            name,
            address,
            instagram: links.instagram,
            facebook: links.facebook,
            website,
            plus_code,
            source_url: identifier.to_string(),
            other_links,
            phone,
            business_category: business_category.to_string(),
            place_type,
            review_stars,
            review_count,
        };
        Ok(record.sanitize())
    }

    /// Text of `locator`, or the sentinel when it is missing or erroring.
    fn field<B>(&self, browser: &mut B, locator: &str) -> String
    where
        B: Browser + ?Sized,
    {
        match browser.text(locator, self.config.field_timeout()) {
            Ok(text) => or_sentinel(text.map(|t| t.trim().to_string())),
            Err(e) => {
                log::debug!("Field {locator} failed: {e}");
                SENTINEL.to_string()
            }
        }
    }

    fn scroll_pane<B>(&self, browser: &mut B, delta: i64)
    where
        B: Browser + ?Sized,
    {
        match browser.scroll_by(&self.selectors.detail_pane, delta) {
            Ok(()) => browser.wait(self.config.pane_pause()),
            Err(e) => log::debug!("Scroll operation failed: {e}"),
        }
    }
}

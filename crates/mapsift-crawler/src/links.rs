//! Outbound link resolution.
//!
//! The detail view lists a listing's social and web links inside an embedded
//! frame. Entries carry no URL attribute: clicking one opens the destination
//! in a new tab, so each entry is opened, its address read, and the tab
//! closed again.

use crate::browser::{poll, Browser};
use crate::config::LinksConfig;
use crate::record::SocialLinks;
use crate::selectors::Selectors;

/// Where the browser's focus currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Top-level document of the detail tab
    OnDetailTab,
    /// A tab opened by clicking an entry
    OnEntryTab,
    /// Inside the overlay frame of the detail tab
    InOverlayFrame,
}

/// Moves focus between the detail tab, its overlay frame and entry tabs,
/// keeping track of where it is.
struct FocusTracker<'a, B: ?Sized> {
    browser: &'a mut B,
    frame: &'a str,
    focus: Focus,
}

impl<'a, B> FocusTracker<'a, B>
where
    B: Browser + ?Sized,
{
    fn new(browser: &'a mut B, frame: &'a str) -> Self {
        Self {
            browser,
            frame,
            focus: Focus::OnDetailTab,
        }
    }

    fn enter_frame(&mut self) -> anyhow::Result<()> {
        match self.focus {
            Focus::InOverlayFrame => Ok(()),
            Focus::OnEntryTab => anyhow::bail!("Cannot enter overlay from an entry tab"),
            Focus::OnDetailTab => {
                self.browser.switch_to_frame(self.frame)?;
                self.focus = Focus::InOverlayFrame;
                Ok(())
            }
        }
    }

    fn to_newest_tab(&mut self) -> anyhow::Result<()> {
        // Focus is unknown until the switch succeeds
        self.focus = Focus::OnEntryTab;
        self.browser.switch_to_newest_tab()
    }

    /// Closes the entry tab and re-enters the overlay on the detail tab.
    fn back_from_entry(&mut self) -> anyhow::Result<()> {
        debug_assert_eq!(self.focus, Focus::OnEntryTab);
        self.browser.close_current_tab()?;
        self.browser.switch_to_tab(0)?;
        self.focus = Focus::OnDetailTab;
        self.enter_frame()
    }

    /// Returns to the overlay frame of the detail tab from any state,
    /// closing every stray tab on the way.
    fn recover(&mut self) -> anyhow::Result<()> {
        self.focus = Focus::OnEntryTab;
        while self.browser.tab_count()? > 1 {
            self.browser.switch_to_newest_tab()?;
            self.browser.close_current_tab()?;
        }
        self.browser.switch_to_tab(0)?;
        self.browser.switch_to_default_content()?;
        self.focus = Focus::OnDetailTab;
        self.enter_frame()
    }

    /// Leaves the overlay, back to the detail tab's document.
    fn release(mut self) -> anyhow::Result<()> {
        if self.focus != Focus::InOverlayFrame {
            self.recover()?;
        }
        self.browser.switch_to_default_content()?;
        self.focus = Focus::OnDetailTab;
        Ok(())
    }
}

/// Opens every overlay entry in turn and sorts the destinations into
/// [`SocialLinks`] slots.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    config: LinksConfig,
    selectors: Selectors,
}

impl LinkResolver {
    pub fn new(config: LinksConfig, selectors: Selectors) -> Self {
        Self { config, selectors }
    }

    /// Resolves links on the open detail view, best-effort: any failure of the
    /// procedure as a whole yields what was resolved so far.
    pub fn resolve<B>(&self, browser: &mut B) -> SocialLinks
    where
        B: Browser + ?Sized,
    {
        self.render_overlay(browser);

        let mut links = SocialLinks::default();
        let mut tracker = FocusTracker::new(browser, &self.selectors.overlay_frame);
        if let Err(e) = tracker.enter_frame() {
            log::debug!("Overlay frame not found: {e}");
            tracker.browser.switch_to_default_content().ok();
            return links;
        }

        let entries = match tracker.browser.count(&self.selectors.overlay_entries) {
            Ok(n) => n,
            Err(e) => {
                log::debug!("Couldn't list overlay entries: {e}");
                0
            }
        };
        log::debug!("Found {entries} overlay entries");

        for index in 0..entries {
            match self.open_entry(&mut tracker, index) {
                Ok(url) => {
                    let slot = links.absorb(url);
                    log::debug!("Entry {index} classified as {slot:?}");
                }
                Err(e) => {
                    log::warn!("Skipping overlay entry {index}: {e}");
                    if let Err(e) = tracker.recover() {
                        log::error!("Couldn't restore focus after entry {index}: {e}");
                        break;
                    }
                }
            }
        }

        if let Err(e) = tracker.release() {
            log::error!("Couldn't leave overlay frame: {e}");
        }
        links
    }

    /// Scrolls the detail pane step by step so every overlay entry renders.
    fn render_overlay<B>(&self, browser: &mut B)
    where
        B: Browser + ?Sized,
    {
        let pane = &self.selectors.detail_pane;
        for _ in 0..self.config.overlay_scrolls {
            if let Err(e) = browser.scroll_by(pane, self.config.overlay_step_px) {
                log::debug!("Overlay scroll failed: {e}");
                break;
            }
            browser.wait(self.config.overlay_pause());
        }
    }

    fn open_entry<B>(&self, tracker: &mut FocusTracker<'_, B>, index: usize) -> anyhow::Result<String>
    where
        B: Browser + ?Sized,
    {
        let before = tracker.browser.tab_count()?;
        tracker
            .browser
            .click(&self.selectors.overlay_entries, index)?;
        let opened = poll(
            &mut *tracker.browser,
            self.config.tab_timeout(),
            self.config.tab_poll(),
            |b| Ok((b.tab_count()? > before).then_some(())),
        )?;
        if opened.is_none() {
            anyhow::bail!("Entry {index} opened no tab");
        }

        tracker.to_newest_tab()?;
        let url = tracker.browser.current_url()?;
        tracker.back_from_entry()?;
        Ok(url)
    }
}

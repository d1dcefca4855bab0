#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, bail};
use mapsift_crawler::{Browser, Proxy, Selectors, SessionFactory, TabularStore};
use serde_json::Value;

pub const SEARCH_URL: &str = "https://www.google.com/maps";
pub const LANDING_URL: &str = "https://www.google.com/";

pub fn place_url(slug: &str) -> String {
    format!("https://www.google.com/maps/place/{slug}")
}

#[derive(Debug, Clone, Default)]
pub struct FakePlace {
    pub fields: HashMap<String, String>,
    /// Destinations of the overlay entries, in order
    pub links: Vec<String>,
    pub has_overlay: bool,
    /// The name only renders from the second load on
    pub slow_name: bool,
}

impl FakePlace {
    pub fn named(name: &str) -> Self {
        let sel = Selectors::default();
        let mut place = Self::default();
        place.fields.insert(sel.place_name, name.to_string());
        place
    }

    pub fn with(mut self, locator: &str, value: &str) -> Self {
        self.fields.insert(locator.to_string(), value.to_string());
        self
    }

    pub fn with_links(mut self, links: &[&str]) -> Self {
        self.has_overlay = true;
        self.links = links.iter().map(|l| l.to_string()).collect();
        self
    }
}

/// A scripted map site shared by every browser a factory launches.
#[derive(Debug, Default)]
pub struct Site {
    pub selectors: Selectors,
    pub results: Vec<String>,
    pub places: HashMap<String, FakePlace>,
    /// URLs whose navigation fails
    pub broken: HashSet<String>,
    /// Entry destinations whose click fails
    pub unclickable: HashSet<String>,
    /// Entry destinations whose tab opens but cannot be read
    pub unreadable: HashSet<String>,
    pub fail_launches: usize,
    /// Successful launches after which every launch fails
    pub launch_limit: Option<usize>,

    pub events: Vec<String>,
    pub typed: Vec<String>,
    pub proxies: Vec<Option<String>>,
    pub launches: usize,
    pub quits: usize,
    pub live: usize,
    pub max_live: usize,
    pub feed_polls: usize,
    pub scrolls: usize,
}

pub type SharedSite = Rc<RefCell<Site>>;

pub fn site() -> SharedSite {
    Rc::new(RefCell::new(Site::default()))
}

pub struct FakeBrowser {
    site: SharedSite,
    tabs: Vec<String>,
    current: usize,
    in_frame: bool,
    loads: HashMap<String, usize>,
}

impl FakeBrowser {
    pub fn new(site: SharedSite) -> Self {
        Self {
            site,
            tabs: vec!["about:blank".to_string()],
            current: 0,
            in_frame: false,
            loads: HashMap::new(),
        }
    }

    pub fn tabs(&self) -> &[String] {
        &self.tabs
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    fn detail_place(&self) -> Option<FakePlace> {
        self.site.borrow().places.get(&self.tabs[0]).cloned()
    }
}

impl Browser for FakeBrowser {
    fn open(&mut self, url: &str) -> anyhow::Result<()> {
        let mut site = self.site.borrow_mut();
        site.events.push(url.to_string());
        if site.broken.contains(url) {
            bail!("net::ERR_CONNECTION_RESET at {url}");
        }
        self.tabs[self.current] = url.to_string();
        self.in_frame = false;
        *self.loads.entry(url.to_string()).or_default() += 1;
        Ok(())
    }

    fn refresh(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn find_element(&mut self, locator: &str, _timeout: Duration) -> anyhow::Result<bool> {
        Ok(self.count(locator)? > 0)
    }

    fn count(&mut self, locator: &str) -> anyhow::Result<usize> {
        let sel = self.site.borrow().selectors.clone();
        if self.in_frame {
            if locator == sel.overlay_entries {
                return Ok(self.detail_place().map(|p| p.links.len()).unwrap_or(0));
            }
            return Ok(0);
        }
        if locator == sel.search_bar {
            return Ok(1);
        }
        if locator == sel.result_items {
            let mut site = self.site.borrow_mut();
            site.feed_polls += 1;
            return Ok(site.results.len());
        }
        let url = &self.tabs[self.current];
        let found = self
            .site
            .borrow()
            .places
            .get(url)
            .map(|p| p.fields.contains_key(locator))
            .unwrap_or(false);
        Ok(found as usize)
    }

    fn text(&mut self, locator: &str, _timeout: Duration) -> anyhow::Result<Option<String>> {
        if self.in_frame {
            return Ok(None);
        }
        let url = self.tabs[self.current].clone();
        let site = self.site.borrow();
        let place = match site.places.get(&url) {
            Some(place) => place,
            None => return Ok(None),
        };
        if locator == site.selectors.place_name
            && place.slow_name
            && self.loads.get(&url).copied().unwrap_or(0) < 2
        {
            return Ok(None);
        }
        Ok(place.fields.get(locator).cloned())
    }

    fn attributes(&mut self, locator: &str, name: &str) -> anyhow::Result<Vec<Option<String>>> {
        let site = self.site.borrow();
        if locator == site.selectors.result_links && name == "href" {
            return Ok(site.results.iter().cloned().map(Some).collect());
        }
        Ok(vec![])
    }

    fn type_text(&mut self, _locator: &str, text: &str) -> anyhow::Result<()> {
        self.site.borrow_mut().typed.push(text.to_string());
        Ok(())
    }

    fn click(&mut self, locator: &str, index: usize) -> anyhow::Result<()> {
        let sel = self.site.borrow().selectors.clone();
        if !self.in_frame || locator != sel.overlay_entries {
            bail!("{locator}[{index}] is not clickable here");
        }
        let place = self.detail_place().ok_or_else(|| anyhow!("No place"))?;
        let dest = place
            .links
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow!("No entry {index}"))?;
        if self.site.borrow().unclickable.contains(&dest) {
            bail!("Entry {index} is obscured");
        }
        self.tabs.push(dest);
        Ok(())
    }

    fn execute_script(&mut self, _script: &str, _args: &[Value]) -> anyhow::Result<Value> {
        self.site.borrow_mut().scrolls += 1;
        Ok(Value::Null)
    }

    fn switch_to_frame(&mut self, locator: &str) -> anyhow::Result<()> {
        let sel = self.site.borrow().selectors.clone();
        let has_overlay = self.detail_place().map(|p| p.has_overlay).unwrap_or(false);
        if self.current != 0 || locator != sel.overlay_frame || !has_overlay {
            bail!("No frame {locator}");
        }
        self.in_frame = true;
        Ok(())
    }

    fn switch_to_default_content(&mut self) -> anyhow::Result<()> {
        self.in_frame = false;
        Ok(())
    }

    fn tab_count(&mut self) -> anyhow::Result<usize> {
        Ok(self.tabs.len())
    }

    fn switch_to_newest_tab(&mut self) -> anyhow::Result<()> {
        self.current = self.tabs.len() - 1;
        self.in_frame = false;
        Ok(())
    }

    fn switch_to_tab(&mut self, index: usize) -> anyhow::Result<()> {
        if index >= self.tabs.len() {
            bail!("No tab {index}");
        }
        self.current = index;
        self.in_frame = false;
        Ok(())
    }

    fn current_url(&mut self) -> anyhow::Result<String> {
        let url = self.tabs[self.current].clone();
        if self.site.borrow().unreadable.contains(&url) {
            bail!("Tab crashed");
        }
        Ok(url)
    }

    fn close_current_tab(&mut self) -> anyhow::Result<()> {
        if self.tabs.len() == 1 {
            bail!("Refusing to close the last tab");
        }
        self.tabs.remove(self.current);
        self.current = 0;
        self.in_frame = false;
        Ok(())
    }

    fn wait(&mut self, _duration: Duration) {}

    fn quit(&mut self) -> anyhow::Result<()> {
        let mut site = self.site.borrow_mut();
        site.quits += 1;
        site.live -= 1;
        site.events.push("quit".to_string());
        Ok(())
    }
}

pub struct FakeFactory {
    pub site: SharedSite,
}

impl SessionFactory for FakeFactory {
    type Session = FakeBrowser;

    fn launch(&mut self, proxy: Option<&Proxy>) -> anyhow::Result<FakeBrowser> {
        let mut site = self.site.borrow_mut();
        if site.fail_launches > 0 {
            site.fail_launches -= 1;
            bail!("Chrome failed to start");
        }
        if site.launch_limit.map_or(false, |limit| site.launches >= limit) {
            bail!("Proxy refused the connection");
        }
        site.launches += 1;
        site.live += 1;
        site.max_live = site.max_live.max(site.live);
        site.proxies.push(proxy.map(|p| p.as_str().to_string()));
        site.events.push("launch".to_string());
        drop(site);
        Ok(FakeBrowser::new(self.site.clone()))
    }
}

/// In-memory sheets keyed by title.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub sheets: BTreeMap<String, Vec<Vec<String>>>,
    /// Number of upcoming appends to reject
    pub fail_appends: usize,
    pub append_calls: usize,
}

impl TabularStore for MemoryStore {
    fn create_spreadsheet(&mut self, _title: &str) -> anyhow::Result<String> {
        Ok("memory".to_string())
    }

    fn create_sheet(&mut self, _spreadsheet_id: &str, title: &str) -> anyhow::Result<i64> {
        self.sheets.entry(title.to_string()).or_default();
        let index = self.sheets.keys().position(|k| k == title).unwrap_or(0);
        Ok(index as i64)
    }

    fn increase_row_capacity(&mut self, _: &str, _: &str, _: usize) -> anyhow::Result<()> {
        Ok(())
    }

    fn write_headers(&mut self, headers: &[String], _: &str, title: &str) -> anyhow::Result<()> {
        let rows = self.sheets.entry(title.to_string()).or_default();
        if rows.is_empty() {
            rows.push(headers.to_vec());
        } else {
            rows[0] = headers.to_vec();
        }
        Ok(())
    }

    fn append_row(
        &mut self,
        headers: &[String],
        row: &[String],
        _: &str,
        title: &str,
    ) -> anyhow::Result<()> {
        self.append_calls += 1;
        if self.fail_appends > 0 {
            self.fail_appends -= 1;
            bail!("429 Too Many Requests");
        }
        let rows = self
            .sheets
            .get_mut(title)
            .ok_or_else(|| anyhow!("Unable to parse range: {title}"))?;
        if rows.is_empty() {
            rows.push(headers.to_vec());
        }
        rows.push(row.to_vec());
        Ok(())
    }

    fn read_values(&mut self, _: &str, title: &str, _: Option<&str>) -> anyhow::Result<Vec<Vec<String>>> {
        Ok(self.sheets.get(title).cloned().unwrap_or_default())
    }
}

/// Default settings without any pause, checkpoints under `dir`.
pub fn quiet_config(dir: &std::path::Path) -> mapsift_crawler::CrawlerConfig {
    let mut conf = mapsift_crawler::CrawlerConfig::default().without_pauses();
    conf.checkpoint_dir = dir.to_path_buf();
    conf.collector.idle_polls = Some(3);
    conf.collector.scroll_budget = 50;
    conf
}

/// Publishes `count` places named `Place {i}` as search results.
pub fn publish_places(site: &SharedSite, count: usize) -> Vec<String> {
    let mut site = site.borrow_mut();
    let urls: Vec<_> = (0..count).map(|i| place_url(&format!("p{i}"))).collect();
    for (i, url) in urls.iter().enumerate() {
        site.results.push(url.clone());
        site.places
            .insert(url.clone(), FakePlace::named(&format!("Place {i}")));
    }
    urls
}

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

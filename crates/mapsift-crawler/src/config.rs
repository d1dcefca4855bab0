use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_search_url")]
    pub search_url: String,

    #[serde(default = "default_landing_url")]
    pub landing_url: String,

    #[serde(default = "default_place_url_prefix")]
    pub place_url_prefix: String,

    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,

    #[serde(default)]
    pub mode: CrawlMode,

    #[serde(default = "default_on_target_error")]
    pub on_target_error: OnError,

    #[serde(default = "default_rotate_every")]
    pub rotate_every: usize,

    #[serde(default = "default_sheet_rows")]
    pub sheet_rows: usize,

    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub links: LinksConfig,

    #[serde(default)]
    pub sink: SinkConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            landing_url: default_landing_url(),
            place_url_prefix: default_place_url_prefix(),
            checkpoint_dir: default_checkpoint_dir(),
            mode: CrawlMode::default(),
            on_target_error: default_on_target_error(),
            rotate_every: default_rotate_every(),
            sheet_rows: default_sheet_rows(),
            collector: CollectorConfig::default(),
            extractor: ExtractorConfig::default(),
            links: LinksConfig::default(),
            sink: SinkConfig::default(),
        }
    }
}

fn default_search_url() -> String {
    String::from("https://www.google.com/maps")
}

fn default_landing_url() -> String {
    String::from("https://www.google.com/")
}

fn default_place_url_prefix() -> String {
    String::from("https://www.google.com/maps/place")
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("session")
}

fn default_on_target_error() -> OnError {
    OnError::SkipAndLog
}

fn default_rotate_every() -> usize {
    10
}

fn default_sheet_rows() -> usize {
    10_000
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CrawlMode {
    /// Collect identifiers, checkpoint them, then extract
    #[default]
    Full,
    /// Only collect and checkpoint identifiers
    CollectOnly,
    /// Only extract from a previously saved checkpoint
    ExtractOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OnError {
    Fail,
    SkipAndLog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorConfig {
    /// Safety ceiling on scroll ticks
    #[serde(default = "default_scroll_budget")]
    pub scroll_budget: usize,

    /// Stop once the feed has not grown for this many consecutive ticks
    #[serde(default = "default_idle_polls")]
    pub idle_polls: Option<usize>,

    #[serde(default = "default_scroll_pause_ms")]
    pub scroll_pause_ms: u64,

    #[serde(default = "default_search_poll_ms")]
    pub search_poll_ms: u64,

    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            scroll_budget: default_scroll_budget(),
            idle_polls: default_idle_polls(),
            scroll_pause_ms: default_scroll_pause_ms(),
            search_poll_ms: default_search_poll_ms(),
            search_timeout_ms: default_search_timeout_ms(),
        }
    }
}

impl CollectorConfig {
    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    pub fn search_poll(&self) -> Duration {
        Duration::from_millis(self.search_poll_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }
}

fn default_scroll_budget() -> usize {
    200
}

fn default_idle_polls() -> Option<usize> {
    Some(15)
}

fn default_scroll_pause_ms() -> u64 {
    1_000
}

fn default_search_poll_ms() -> u64 {
    2_000
}

fn default_search_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractorConfig {
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default = "default_field_timeout_ms")]
    pub field_timeout_ms: u64,

    #[serde(default = "default_recovery_wait_ms")]
    pub recovery_wait_ms: u64,

    #[serde(default = "default_nudge_px")]
    pub nudge_px: i64,

    #[serde(default = "default_deep_scroll_px")]
    pub deep_scroll_px: i64,

    #[serde(default = "default_pane_pause_ms")]
    pub pane_pause_ms: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            field_timeout_ms: default_field_timeout_ms(),
            recovery_wait_ms: default_recovery_wait_ms(),
            nudge_px: default_nudge_px(),
            deep_scroll_px: default_deep_scroll_px(),
            pane_pause_ms: default_pane_pause_ms(),
        }
    }
}

impl ExtractorConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn field_timeout(&self) -> Duration {
        Duration::from_millis(self.field_timeout_ms)
    }

    pub fn recovery_wait(&self) -> Duration {
        Duration::from_millis(self.recovery_wait_ms)
    }

    pub fn pane_pause(&self) -> Duration {
        Duration::from_millis(self.pane_pause_ms)
    }
}

fn default_settle_ms() -> u64 {
    2_000
}

fn default_field_timeout_ms() -> u64 {
    3_000
}

fn default_recovery_wait_ms() -> u64 {
    10_000
}

fn default_nudge_px() -> i64 {
    200
}

fn default_deep_scroll_px() -> i64 {
    1_000
}

fn default_pane_pause_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinksConfig {
    #[serde(default = "default_overlay_scrolls")]
    pub overlay_scrolls: usize,

    #[serde(default = "default_overlay_step_px")]
    pub overlay_step_px: i64,

    #[serde(default = "default_overlay_pause_ms")]
    pub overlay_pause_ms: u64,

    #[serde(default = "default_tab_timeout_ms")]
    pub tab_timeout_ms: u64,

    #[serde(default = "default_tab_poll_ms")]
    pub tab_poll_ms: u64,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            overlay_scrolls: default_overlay_scrolls(),
            overlay_step_px: default_overlay_step_px(),
            overlay_pause_ms: default_overlay_pause_ms(),
            tab_timeout_ms: default_tab_timeout_ms(),
            tab_poll_ms: default_tab_poll_ms(),
        }
    }
}

impl LinksConfig {
    pub fn overlay_pause(&self) -> Duration {
        Duration::from_millis(self.overlay_pause_ms)
    }

    pub fn tab_timeout(&self) -> Duration {
        Duration::from_millis(self.tab_timeout_ms)
    }

    pub fn tab_poll(&self) -> Duration {
        Duration::from_millis(self.tab_poll_ms)
    }
}

fn default_overlay_scrolls() -> usize {
    8
}

fn default_overlay_step_px() -> i64 {
    300
}

fn default_overlay_pause_ms() -> u64 {
    500
}

fn default_tab_timeout_ms() -> u64 {
    5_000
}

fn default_tab_poll_ms() -> u64 {
    250
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkConfig {
    #[serde(default = "default_write_attempts")]
    pub write_attempts: usize,

    #[serde(default = "default_write_backoff_ms")]
    pub write_backoff_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            write_attempts: default_write_attempts(),
            write_backoff_ms: default_write_backoff_ms(),
        }
    }
}

impl SinkConfig {
    pub fn write_backoff(&self) -> Duration {
        Duration::from_millis(self.write_backoff_ms)
    }
}

fn default_write_attempts() -> usize {
    2
}

fn default_write_backoff_ms() -> u64 {
    1_000
}

impl CrawlerConfig {
    /// Zeroes every pause and timeout, for driving a scripted browser.
    pub fn without_pauses(mut self) -> Self {
        self.collector.scroll_pause_ms = 0;
        self.collector.search_poll_ms = 0;
        self.collector.search_timeout_ms = 0;
        self.extractor.settle_ms = 0;
        self.extractor.field_timeout_ms = 0;
        self.extractor.recovery_wait_ms = 0;
        self.extractor.pane_pause_ms = 0;
        self.links.overlay_pause_ms = 0;
        self.links.tab_timeout_ms = 0;
        self.links.tab_poll_ms = 0;
        self.sink.write_backoff_ms = 0;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_like_json_keeps_defaults() {
        let conf: CrawlerConfig = serde_json::from_str(
            r#"{"rotateEvery": 5, "collector": {"idlePolls": null}, "onTargetError": "Fail"}"#,
        )
        .unwrap();
        assert_eq!(conf.rotate_every, 5);
        assert_eq!(conf.collector.idle_polls, None);
        assert_eq!(conf.collector.scroll_budget, 200);
        assert_eq!(conf.on_target_error, OnError::Fail);
        assert_eq!(conf.sink.write_attempts, 2);
        assert_eq!(conf.mode, CrawlMode::Full);
    }
}

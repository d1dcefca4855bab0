//! Map-search listing crawler.
//!
//! [`CrawlDriver`] walks (category, location) targets: it runs the search
//! and scrolls the result feed ([`ResultCollector`]), checkpoints the
//! collected detail URLs ([`CheckpointStore`]), extracts each listing
//! ([`DetailExtractor`], [`LinkResolver`]) and appends it to a tabular store
//! ([`WriteBackSink`]). The browser and the store are traits, see
//! [`Browser`], [`SessionFactory`] and [`TabularStore`].

mod browser;
mod checkpoint;
mod collector;
mod config;
mod driver;
mod error;
mod extractor;
mod links;
mod record;
mod selectors;
mod session;
mod sink;

pub use browser::{poll, Browser, Proxy, SessionFactory};
pub use checkpoint::CheckpointStore;
pub use collector::ResultCollector;
pub use config::{
    CollectorConfig, CrawlMode, CrawlerConfig, ExtractorConfig, LinksConfig, OnError, SinkConfig,
};
pub use driver::{CrawlDriver, CrawlStats};
pub use error::{CrawlError, Result};
pub use extractor::DetailExtractor;
pub use links::{Focus, LinkResolver};
pub use record::{
    normalize_review_count, or_sentinel, CrawlTarget, LinkSlot, PlaceRecord, SocialLinks,
    DEFAULT_HEADERS, FIELD_COUNT, SENTINEL,
};
pub use selectors::Selectors;
pub use session::{ProxyPool, SessionManager};
pub use sink::{TabularStore, WriteBackSink};

pub use anyhow;

use std::collections::HashSet;
use std::fmt;

use crate::browser::SessionFactory;
use crate::checkpoint::CheckpointStore;
use crate::collector::ResultCollector;
use crate::config::{CrawlMode, CrawlerConfig, OnError};
use crate::error::Result;
use crate::extractor::DetailExtractor;
use crate::links::LinkResolver;
use crate::record::CrawlTarget;
use crate::selectors::Selectors;
use crate::session::{ProxyPool, SessionManager};
use crate::sink::{TabularStore, WriteBackSink};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub targets_done: usize,
    pub targets_failed: usize,
    pub identifiers: usize,
    pub items_failed: usize,
    pub records_written: usize,
    pub records_dropped: usize,
    pub rotations: usize,
}

impl fmt::Display for CrawlStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "targets {} ok / {} failed, identifiers {}, items failed {}, \
             records {} written / {} dropped, rotations {}",
            self.targets_done,
            self.targets_failed,
            self.identifiers,
            self.items_failed,
            self.records_written,
            self.records_dropped,
            self.rotations
        )
    }
}

/// Sequences collection, extraction and write-back over crawl targets.
pub struct CrawlDriver<F, S>
where
    F: SessionFactory,
{
    config: CrawlerConfig,
    sessions: SessionManager<F>,
    collector: ResultCollector,
    extractor: DetailExtractor,
    checkpoints: CheckpointStore,
    sink: WriteBackSink<S>,
    prepared: HashSet<String>,
    stats: CrawlStats,
}

impl<F, S> CrawlDriver<F, S>
where
    F: SessionFactory,
    S: TabularStore,
{
    pub fn new(
        config: CrawlerConfig,
        selectors: Selectors,
        factory: F,
        proxies: ProxyPool,
        sink: WriteBackSink<S>,
    ) -> Self {
        let sessions = SessionManager::new(factory, proxies, config.landing_url.clone());
        let collector = ResultCollector::new(
            config.collector.clone(),
            selectors.clone(),
            config.search_url.clone(),
            config.place_url_prefix.clone(),
        );
        let resolver = LinkResolver::new(config.links.clone(), selectors.clone());
        let extractor = DetailExtractor::new(config.extractor.clone(), selectors, resolver);
        let checkpoints = CheckpointStore::new(config.checkpoint_dir.clone());
        Self {
            config,
            sessions,
            collector,
            extractor,
            checkpoints,
            sink,
            prepared: HashSet::new(),
            stats: CrawlStats::default(),
        }
    }

    /// Crawls `targets` in order, resetting the browser between targets.
    ///
    /// A failing target is logged and skipped under [`OnError::SkipAndLog`];
    /// fatal errors always end the run.
    pub fn run(&mut self, targets: &[CrawlTarget]) -> Result<CrawlStats> {
        for (n, target) in targets.iter().enumerate() {
            log::info!("Processing {} ({})", target.query(), target.batch_key());
            match self.run_target(target) {
                Ok(()) => self.stats.targets_done += 1,
                Err(e) => {
                    self.stats.targets_failed += 1;
                    if e.is_fatal() || self.config.on_target_error == OnError::Fail {
                        log::error!("Aborting run on {}: {e}", target.query());
                        self.finish();
                        return Err(e);
                    }
                    log::error!("Error during {}: {e}", target.query());
                }
            }
            if n + 1 < targets.len() {
                if let Err(e) = self.sessions.reset() {
                    self.finish();
                    return Err(e);
                }
            }
        }
        self.finish();
        log::info!("Crawl finished: {}", self.stats);
        Ok(self.stats)
    }

    pub fn run_target(&mut self, target: &CrawlTarget) -> Result<()> {
        let batch_key = target.batch_key();
        if self.config.mode != CrawlMode::CollectOnly && !self.prepared.contains(batch_key) {
            self.sink.prepare_sheet(batch_key, self.config.sheet_rows)?;
            self.prepared.insert(batch_key.to_string());
        }

        let urls = match self.config.mode {
            CrawlMode::ExtractOnly => self.checkpoints.load(batch_key)?,
            CrawlMode::Full | CrawlMode::CollectOnly => {
                let browser = self.sessions.current()?;
                let urls = self.collector.collect(browser, target)?;
                self.checkpoints.save(batch_key, &urls)?;
                if self.config.mode == CrawlMode::CollectOnly {
                    self.stats.identifiers += urls.len();
                    return Ok(());
                }
                self.checkpoints.load(batch_key)?
            }
        };
        self.stats.identifiers += urls.len();
        self.extract_batch(target, &urls)
    }

    /// Extracts and writes every identifier; a failing item never stops the
    /// batch, a session that cannot be rebuilt does.
    fn extract_batch(&mut self, target: &CrawlTarget, urls: &[String]) -> Result<()> {
        let rotate_every = self.config.rotate_every;
        for (index, url) in urls.iter().enumerate() {
            if rotate_every > 0 && (index + 1) % rotate_every == 0 {
                self.sessions.rotate()?;
            }

            let browser = self.sessions.current()?;
            match self.extractor.extract(browser, url, target.category()) {
                Ok(record) => {
                    self.sink.write(record, target.batch_key());
                }
                Err(e) => {
                    self.stats.items_failed += 1;
                    log::error!("Error processing place {index} ({url}): {e}");
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.sessions.shutdown();
        self.sync_stats();
    }

    fn sync_stats(&mut self) {
        self.stats.records_written = self.sink.written();
        self.stats.records_dropped = self.sink.dropped();
        self.stats.rotations = self.sessions.rotations();
    }

    pub fn stats(&mut self) -> CrawlStats {
        self.sync_stats();
        self.stats
    }

    pub fn sink(&self) -> &WriteBackSink<S> {
        &self.sink
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }
}

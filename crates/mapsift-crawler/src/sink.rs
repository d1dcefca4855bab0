use std::thread;

use crate::config::SinkConfig;
use crate::error::{CrawlError, Result};
use crate::record::{PlaceRecord, DEFAULT_HEADERS, FIELD_COUNT};

/// Remote spreadsheet-like storage, addressed by spreadsheet id and sheet title.
pub trait TabularStore {
    fn create_spreadsheet(&mut self, title: &str) -> anyhow::Result<String>;

    /// Id of the sheet titled `title`, adding it first if missing.
    fn create_sheet(&mut self, spreadsheet_id: &str, title: &str) -> anyhow::Result<i64>;

    fn increase_row_capacity(
        &mut self,
        spreadsheet_id: &str,
        title: &str,
        row_count: usize,
    ) -> anyhow::Result<()>;

    fn write_headers(
        &mut self,
        headers: &[String],
        spreadsheet_id: &str,
        title: &str,
    ) -> anyhow::Result<()>;

    /// Appends `row` after the last used row, writing `headers` first when
    /// the sheet is still empty.
    fn append_row(
        &mut self,
        headers: &[String],
        row: &[String],
        spreadsheet_id: &str,
        title: &str,
    ) -> anyhow::Result<()>;

    fn read_values(
        &mut self,
        spreadsheet_id: &str,
        title: &str,
        range: Option<&str>,
    ) -> anyhow::Result<Vec<Vec<String>>>;
}

impl<T> TabularStore for Box<T>
where
    T: TabularStore + ?Sized,
{
    fn create_spreadsheet(&mut self, title: &str) -> anyhow::Result<String> {
        (**self).create_spreadsheet(title)
    }

    fn create_sheet(&mut self, spreadsheet_id: &str, title: &str) -> anyhow::Result<i64> {
        (**self).create_sheet(spreadsheet_id, title)
    }

    fn increase_row_capacity(
        &mut self,
        spreadsheet_id: &str,
        title: &str,
        row_count: usize,
    ) -> anyhow::Result<()> {
        (**self).increase_row_capacity(spreadsheet_id, title, row_count)
    }

    fn write_headers(
        &mut self,
        headers: &[String],
        spreadsheet_id: &str,
        title: &str,
    ) -> anyhow::Result<()> {
        (**self).write_headers(headers, spreadsheet_id, title)
    }

    fn append_row(
        &mut self,
        headers: &[String],
        row: &[String],
        spreadsheet_id: &str,
        title: &str,
    ) -> anyhow::Result<()> {
        (**self).append_row(headers, row, spreadsheet_id, title)
    }

    fn read_values(
        &mut self,
        spreadsheet_id: &str,
        title: &str,
        range: Option<&str>,
    ) -> anyhow::Result<Vec<Vec<String>>> {
        (**self).read_values(spreadsheet_id, title, range)
    }
}

/// Appends sanitized records to a spreadsheet, one sheet per batch.
pub struct WriteBackSink<S> {
    store: S,
    config: SinkConfig,
    spreadsheet_id: String,
    headers: Vec<String>,
    written: usize,
    dropped: usize,
}

impl<S> WriteBackSink<S>
where
    S: TabularStore,
{
    /// Fails when `headers` does not name exactly one column per record field.
    pub fn new(
        store: S,
        config: SinkConfig,
        spreadsheet_id: impl Into<String>,
        headers: Vec<String>,
    ) -> Result<Self> {
        if headers.len() != FIELD_COUNT {
            return Err(CrawlError::InvalidHeaders {
                expected: FIELD_COUNT,
                got: headers.len(),
            });
        }
        Ok(Self {
            store,
            config,
            spreadsheet_id: spreadsheet_id.into(),
            headers,
            written: 0,
            dropped: 0,
        })
    }

    pub fn default_headers() -> Vec<String> {
        DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect()
    }

    /// Makes sure the batch's sheet exists, is large enough and has headers.
    pub fn prepare_sheet(&mut self, batch_key: &str, rows: usize) -> Result<()> {
        let sheet_id = self
            .store
            .create_sheet(&self.spreadsheet_id, batch_key)
            .map_err(CrawlError::Store)?;
        log::info!("Using sheet {batch_key} ({sheet_id})");
        if let Err(e) = self
            .store
            .increase_row_capacity(&self.spreadsheet_id, batch_key, rows)
        {
            log::warn!("Couldn't grow sheet {batch_key} to {rows} rows: {e}");
        }
        self.store
            .write_headers(&self.headers, &self.spreadsheet_id, batch_key)
            .map_err(CrawlError::Store)
    }

    /// Writes one record, retrying once; a record that still fails is
    /// dropped and counted, never re-queued.
    ///
    /// Returns whether the record made it to the store.
    pub fn write(&mut self, record: PlaceRecord, batch_key: &str) -> bool {
        let row = record.sanitize().into_row();
        let attempts = self.config.write_attempts.max(1);
        for attempt in 1..=attempts {
            match self
                .store
                .append_row(&self.headers, &row, &self.spreadsheet_id, batch_key)
            {
                Ok(()) => {
                    self.written += 1;
                    return true;
                }
                Err(e) if attempt == attempts => {
                    log::error!("Failed to write data after {attempts} attempts: {e}");
                }
                Err(e) => {
                    log::warn!("Write attempt {attempt} to {batch_key} failed: {e}");
                    thread::sleep(self.config.write_backoff());
                }
            }
        }
        self.dropped += 1;
        false
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

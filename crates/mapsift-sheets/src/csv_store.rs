use std::path::{Path, PathBuf};

use anyhow::Context;
use mapsift_crawler::TabularStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CsvWriterConfig {
    #[serde(default = "default_csv_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub escape: Option<char>,
    #[serde(default = "default_csv_terminator")]
    pub terminator: CsvTerminator,
}

impl Default for CsvWriterConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            escape: None,
            terminator: CsvTerminator::Any('\n'),
        }
    }
}

fn default_csv_delimiter() -> char {
    CsvWriterConfig::default().delimiter
}

fn default_csv_terminator() -> CsvTerminator {
    CsvWriterConfig::default().terminator
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum CsvTerminator {
    CRLF,
    Any(char),
}

impl From<CsvTerminator> for csv::Terminator {
    fn from(source: CsvTerminator) -> Self {
        match source {
            CsvTerminator::CRLF => Self::CRLF,
            CsvTerminator::Any(c) => Self::Any(c as u8),
        }
    }
}

impl From<&CsvWriterConfig> for csv::WriterBuilder {
    fn from(c: &CsvWriterConfig) -> Self {
        let mut builder = csv::WriterBuilder::new();
        builder.delimiter(c.delimiter as u8);
        builder.terminator(c.terminator.into());
        // Rows may be narrower than the header when written by hand
        builder.flexible(true);
        match c.escape {
            Some(escape) => {
                builder.double_quote(false);
                builder.escape(escape as u8);
            }
            None => {
                builder.double_quote(true);
            }
        }
        builder
    }
}

impl From<&CsvWriterConfig> for csv::ReaderBuilder {
    fn from(c: &CsvWriterConfig) -> Self {
        let mut builder = csv::ReaderBuilder::new();
        builder.has_headers(false);
        builder.flexible(true);
        builder.delimiter(c.delimiter as u8);
        builder.terminator(c.terminator.into());
        if let Some(escape) = c.escape {
            builder.double_quote(false);
            builder.escape(Some(escape as u8));
        }
        builder
    }
}

/// Local stand-in for a spreadsheet service.
///
/// A spreadsheet is a directory under `root` and each of its sheets a
/// `<title>.csv` file in it.
#[derive(Debug, Clone)]
pub struct CsvStore {
    root: PathBuf,
    config: CsvWriterConfig,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>, config: CsvWriterConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn sheet_path(&self, spreadsheet_id: &str, title: &str) -> PathBuf {
        self.root.join(spreadsheet_id).join(format!("{title}.csv"))
    }

    fn read_rows(&self, path: &Path) -> anyhow::Result<Vec<Vec<String>>> {
        if !path.exists() {
            return Ok(vec![]);
        }
        let file = fs_err::File::open(path)?;
        let mut rdr = csv::ReaderBuilder::from(&self.config).from_reader(file);
        let mut rows = vec![];
        for record in rdr.records() {
            let record = record.with_context(|| format!("Bad CSV in {}", path.display()))?;
            rows.push(record.iter().map(String::from).collect());
        }
        Ok(rows)
    }

    fn write_rows(&self, path: &Path, rows: &[Vec<String>], append: bool) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }
        let file = fs_err::OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        let mut wtr = csv::WriterBuilder::from(&self.config).from_writer(file);
        for row in rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl TabularStore for CsvStore {
    fn create_spreadsheet(&mut self, title: &str) -> anyhow::Result<String> {
        fs_err::create_dir_all(self.root.join(title))?;
        Ok(title.to_string())
    }

    fn create_sheet(&mut self, spreadsheet_id: &str, title: &str) -> anyhow::Result<i64> {
        let path = self.sheet_path(spreadsheet_id, title);
        if !path.exists() {
            self.write_rows(&path, &[], true)?;
            log::info!("Created {}", path.display());
        }

        let mut titles = vec![];
        for entry in fs_err::read_dir(self.root.join(spreadsheet_id))? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "csv") {
                titles.push(path);
            }
        }
        titles.sort();
        let index = titles.iter().position(|p| *p == path).unwrap_or(0);
        Ok(index as i64)
    }

    fn increase_row_capacity(&mut self, _: &str, title: &str, rows: usize) -> anyhow::Result<()> {
        log::debug!("CSV sheet {title} needs no room for {rows} rows");
        Ok(())
    }

    fn write_headers(
        &mut self,
        headers: &[String],
        spreadsheet_id: &str,
        title: &str,
    ) -> anyhow::Result<()> {
        let path = self.sheet_path(spreadsheet_id, title);
        let mut rows = self.read_rows(&path)?;
        match rows.first_mut() {
            Some(first) => *first = headers.to_vec(),
            None => rows.push(headers.to_vec()),
        }
        self.write_rows(&path, &rows, false)
    }

    fn append_row(
        &mut self,
        headers: &[String],
        row: &[String],
        spreadsheet_id: &str,
        title: &str,
    ) -> anyhow::Result<()> {
        let path = self.sheet_path(spreadsheet_id, title);
        let empty = fs_err::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        if empty {
            self.write_rows(&path, &[headers.to_vec(), row.to_vec()], false)
        } else {
            self.write_rows(&path, &[row.to_vec()], true)
        }
    }

    fn read_values(
        &mut self,
        spreadsheet_id: &str,
        title: &str,
        range: Option<&str>,
    ) -> anyhow::Result<Vec<Vec<String>>> {
        if let Some(range) = range {
            log::warn!("CSV sheets are always read whole, ignoring range {range}");
        }
        let path = self.sheet_path(spreadsheet_id, title);
        if !path.exists() {
            anyhow::bail!("No sheet {title} at {}", path.display());
        }
        self.read_rows(&path)
    }
}

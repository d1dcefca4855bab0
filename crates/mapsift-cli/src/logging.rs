use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use chrono::Local;
use env_logger::{Env, Target};

const DEFAULT_FILTER: &str =
    "mapsift=info,mapsift_crawler=info,mapsift_chrome=warn,mapsift_sheets=info";

/// Writes every log line to stderr and to a daily file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

pub fn init(quiet: bool, log_dir: Option<&Path>) -> anyhow::Result<()> {
    if quiet {
        return Ok(());
    }
    let env = Env::default().default_filter_or(DEFAULT_FILTER);
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(dir) = log_dir {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("scraper_{}.log", Local::now().format("%Y%m%d")));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        builder.target(Target::Pipe(Box::new(Tee { file })));
    }
    builder.try_init()?;
    Ok(())
}

use std::fs::File;
use std::io;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use mapsift_chrome::ChromeFactory;
use mapsift_crawler::{
    CrawlDriver, CrawlMode, CrawlTarget, OnError, Proxy, ProxyPool, TabularStore, WriteBackSink,
};
use mapsift_sheets::{CsvStore, SheetsClient};

mod job;
mod logging;

use job::{batch_key, cross_targets, sheet_targets, JobConfig, StoreConfig};

type DynStore = Box<dyn TabularStore>;

/// Map listing crawler
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    Crawl(CrawlArgs),
    Collect(PassArgs),
    Extract(PassArgs),
    NewSpreadsheet(NewSpreadsheetArgs),
    #[command(hide = true)]
    Completion,
}

#[derive(Debug, clap::Args)]
pub struct JobArgs {
    /// YAML job file
    #[arg(env = "MAPSIFT_CONFIG", long, short)]
    pub config: Option<PathBuf>,
    /// Override the spreadsheet receiving the records
    #[arg(long)]
    pub spreadsheet_id: Option<String>,
    /// Google Sheets OAuth access token
    #[arg(env = "MAPSIFT_SHEETS_TOKEN", long, hide_env_values = true)]
    pub sheets_token: Option<String>,
    /// Write CSV files under this directory instead of Google Sheets
    #[arg(long)]
    pub csv_dir: Option<PathBuf>,
    /// Override where collected URLs are checkpointed
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,
    /// Override how many listings are extracted per browser session
    #[arg(long)]
    pub rotate_every: Option<usize>,
    /// Override what happens when a whole target fails
    #[arg(value_enum, long)]
    pub on_target_error: Option<OnError>,
    /// Proxy server, repeat to rotate through several
    #[arg(long = "proxy")]
    pub proxies: Vec<String>,
    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
    /// Chrome executable to launch
    #[arg(long)]
    pub chrome_path: Option<PathBuf>,
    /// Also append logs to scraper_YYYYMMDD.log in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
    /// When quiet no logs are outputted
    #[arg(long, short)]
    pub quiet: bool,
}

impl TryFrom<&JobArgs> for JobConfig {
    type Error = anyhow::Error;

    fn try_from(args: &JobArgs) -> Result<Self, Self::Error> {
        let mut conf = if let Some(file) = args.config.as_ref().map(File::open) {
            serde_yaml::from_reader(file?)?
        } else {
            JobConfig::default()
        };
        if let Some(spreadsheet_id) = &args.spreadsheet_id {
            conf.spreadsheet_id = Some(spreadsheet_id.clone());
        }
        if let Some(dir) = &args.csv_dir {
            conf.store = StoreConfig::Csv {
                dir: dir.clone(),
                csv: Default::default(),
            };
        }
        if let (Some(token), StoreConfig::Sheets { token: conf_token }) =
            (&args.sheets_token, &mut conf.store)
        {
            *conf_token = Some(token.clone());
        }
        if let Some(dir) = &args.checkpoint_dir {
            conf.crawler.checkpoint_dir = dir.clone();
        }
        if let Some(rotate_every) = args.rotate_every {
            conf.crawler.rotate_every = rotate_every;
        }
        if let Some(on_target_error) = args.on_target_error {
            conf.crawler.on_target_error = on_target_error;
        }
        if !args.proxies.is_empty() {
            conf.proxies = args.proxies.iter().cloned().map(Proxy).collect();
        }
        if args.headed {
            conf.browser.headless = false;
        }
        if let Some(path) = &args.chrome_path {
            conf.browser.chrome_path = Some(path.clone());
        }
        Ok(conf)
    }
}

/// Collect and extract every target of the job
#[derive(Debug, clap::Args)]
pub struct CrawlArgs {
    #[command(flatten)]
    pub job: JobArgs,
    /// Override the job's locations
    #[arg(long)]
    pub location: Vec<String>,
    /// Override the job's categories
    #[arg(long)]
    pub category: Vec<String>,
    /// Read (category, location) rows from this sheet of the spreadsheet
    #[arg(long, conflicts_with_all = ["location", "category"])]
    pub targets_sheet: Option<String>,
    /// Override the crawl mode
    #[arg(value_enum, long)]
    pub mode: Option<CrawlMode>,
}

/// Run a single pass for one category in one location
#[derive(Debug, clap::Args)]
pub struct PassArgs {
    #[command(flatten)]
    pub job: JobArgs,
    #[arg(long)]
    pub location: String,
    #[arg(long)]
    pub category: String,
}

/// Create a spreadsheet and print its id
#[derive(Debug, clap::Args)]
pub struct NewSpreadsheetArgs {
    #[command(flatten)]
    pub job: JobArgs,
    #[arg(long)]
    pub title: String,
}

fn open_store(store: &StoreConfig) -> anyhow::Result<DynStore> {
    Ok(match store {
        StoreConfig::Sheets { token: Some(token) } => Box::new(SheetsClient::new(token)?),
        StoreConfig::Sheets { token: None } => {
            anyhow::bail!("No Google Sheets token, set MAPSIFT_SHEETS_TOKEN or use --csv-dir")
        }
        StoreConfig::Csv { dir, csv } => Box::new(CsvStore::new(dir, csv.clone())),
    })
}

fn run_job(job: JobConfig, targets: &[CrawlTarget]) -> anyhow::Result<()> {
    if targets.is_empty() {
        anyhow::bail!("Nothing to crawl, the job has no location or no category");
    }
    let spreadsheet_id = match (&job.spreadsheet_id, job.crawler.mode) {
        (Some(id), _) => id.clone(),
        (None, CrawlMode::CollectOnly) => String::new(),
        (None, _) => anyhow::bail!("No spreadsheet id, set spreadsheetId or --spreadsheet-id"),
    };
    let headers = job
        .headers
        .clone()
        .unwrap_or_else(WriteBackSink::<DynStore>::default_headers);
    let store = open_store(&job.store)?;
    let sink = WriteBackSink::new(store, job.crawler.sink.clone(), spreadsheet_id, headers)?;
    let mut driver = CrawlDriver::new(
        job.crawler,
        job.selectors,
        ChromeFactory::new(job.browser),
        ProxyPool::new(job.proxies),
        sink,
    );
    let stats = driver.run(targets)?;
    log::info!("{stats}");
    Ok(())
}

pub fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let mut job: JobConfig = (&args.job).try_into()?;
    if let Some(mode) = args.mode {
        job.crawler.mode = mode;
    }
    if !args.location.is_empty() {
        job.locations = args.location;
    }
    if !args.category.is_empty() {
        job.categories = args.category;
    }

    let targets = match &args.targets_sheet {
        Some(sheet) => {
            let spreadsheet_id = job
                .spreadsheet_id
                .as_deref()
                .ok_or_else(|| anyhow!("--targets-sheet needs a spreadsheet id"))?;
            let rows = open_store(&job.store)?.read_values(spreadsheet_id, sheet, None)?;
            sheet_targets(&rows)
        }
        None => cross_targets(&job.locations, &job.categories),
    };
    log::info!("Crawling {} targets", targets.len());
    run_job(job, &targets)
}

pub fn pass(args: PassArgs, mode: CrawlMode) -> anyhow::Result<()> {
    let mut job: JobConfig = (&args.job).try_into()?;
    job.crawler.mode = mode;
    let target = CrawlTarget::new(&args.category, &args.location, batch_key(&args.location));
    run_job(job, &[target])
}

pub fn new_spreadsheet(args: NewSpreadsheetArgs) -> anyhow::Result<()> {
    let job: JobConfig = (&args.job).try_into()?;
    let id = open_store(&job.store)?.create_spreadsheet(&args.title)?;
    println!("{id}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let job = match &args.cmd {
        SubCommand::Crawl(args) => &args.job,
        SubCommand::Collect(args) | SubCommand::Extract(args) => &args.job,
        SubCommand::NewSpreadsheet(args) => &args.job,
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "mapsift", &mut io::stdout());
            return Ok(());
        }
    };
    logging::init(job.quiet, job.log_dir.as_deref())?;

    match args.cmd {
        SubCommand::Crawl(args) => crawl(args),
        SubCommand::Collect(args) => pass(args, CrawlMode::CollectOnly),
        SubCommand::Extract(args) => pass(args, CrawlMode::ExtractOnly),
        SubCommand::NewSpreadsheet(args) => new_spreadsheet(args),
        SubCommand::Completion => Ok(()),
    }
}

//! crm-scrape CLI
//!
//! Caller side of the coordinator: runs one extraction or delete and prints
//! the response, and reviews or exports the stored dataset.

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use crm_scrape::browser::{BrowserLocator, BrowserSession, ConnectionOptions, LaunchOptions};
use crm_scrape::export;
use crm_scrape::{
    Coordinator, Extractor, PageAgent, PageSnapshot, Request, Response, SingleTarget, StaticPage, SyncConfig,
    TargetLocator, View,
};
use std::{path::{Path, PathBuf}, sync::Arc};

#[derive(Parser)]
#[command(name = "crm-scrape")]
#[command(version)]
#[command(about = "Extract, deduplicate and store CRM contacts, deals and tasks", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory holding the stored dataset
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Name of the stored dataset document
    #[arg(long, value_name = "KEY", global = true)]
    storage_key: Option<String>,

    /// JSON selector table replacing the built-in layout
    #[arg(long, value_name = "FILE", global = true)]
    selectors: Option<PathBuf>,

    /// More logging (-v info, -vv debug)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract from the foreground tab of a browser
    Extract(ExtractArgs),

    /// Extract from a saved page
    ExtractHtml {
        /// URL the page was loaded from (decides the view)
        #[arg(long)]
        url: String,

        /// Saved HTML of the page
        #[arg(long, value_name = "FILE")]
        html: PathBuf,
    },

    /// Remove a stored record
    Delete {
        #[arg(long)]
        view: View,

        /// Identity key of the record
        #[arg(long)]
        id: Option<String>,
    },

    /// Print the summary line and the stored records
    Show {
        #[arg(long)]
        view: Option<View>,

        /// Only records containing this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },

    /// Write stored records to disk
    Export {
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        view: Option<View>,

        /// Whole dataset (JSON) or one CSV per non-empty view
        #[arg(long)]
        all: bool,

        #[arg(long, value_enum, default_value = "json")]
        format: Format,

        /// Output file, or directory for `--all --format csv`
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
    },

    /// Print the active selector table as JSON
    Selectors,
}

#[derive(Args)]
struct ExtractArgs {
    /// WebSocket endpoint of a running browser
    #[arg(long, value_name = "URL", conflicts_with = "launch", required_unless_present = "launch")]
    ws_endpoint: Option<String>,

    /// Launch a new browser instead of attaching
    #[arg(long)]
    launch: bool,

    /// Launch in headed mode (default: headless)
    #[arg(long, short = 'H', requires = "launch")]
    headed: bool,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR", requires = "launch")]
    user_data_dir: Option<PathBuf>,

    /// Browser binary (default: autodetect)
    #[arg(long, value_name = "FILE", requires = "launch")]
    chrome_path: Option<PathBuf>,

    /// Launch without the Chrome sandbox (containers running as root)
    #[arg(long, requires = "launch")]
    no_sandbox: bool,

    /// Open this page before extracting
    #[arg(long)]
    url: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = load_config(&cli)?;

    match cli.command {
        Command::Extract(args) => {
            let launched = args.launch;
            let session = Arc::new(open_browser(args).await?);
            let extractor = Arc::new(Extractor::new(config.load_selectors()?)?);
            let locator = BrowserLocator::new(session.clone(), extractor).with_dismiss_after(config.dismiss_after());

            let response = run(&config, Arc::new(locator), Request::ExtractData).await;
            // let the page badge run out before the agent goes away
            tokio::time::sleep(config.dismiss_after()).await;

            // tabs of an attached browser belong to the user
            if launched {
                let session = session.clone();
                if let Err(e) = tokio::task::spawn_blocking(move || session.close()).await? {
                    log::warn!("Failed to close browser tabs: {}", e);
                }
            }
            report(&response)
        }
        Command::ExtractHtml { url, html } => {
            let extractor = Arc::new(Extractor::new(config.load_selectors()?)?);
            let page = Arc::new(StaticPage::new(PageSnapshot::from_file(url, &html)?));
            let channel = PageAgent::new(page, extractor)
                .with_dismiss_after(config.dismiss_after())
                .spawn();

            let response = run(&config, Arc::new(SingleTarget::new(Arc::new(channel))), Request::ExtractData).await;
            report(&response)
        }
        Command::Delete { view, id } => {
            let response = run(&config, Arc::new(SingleTarget::none()), Request::DeleteItem { view, id }).await;
            report(&response)
        }
        Command::Show { view, search } => {
            let dataset = config.open_store().read().await?;
            println!("{}", export::summary_line(&dataset));

            let views = match view {
                Some(view) => vec![view],
                None => View::ALL.to_vec(),
            };
            for view in views {
                let records = export::filter_records(dataset.records(view), search.as_deref().unwrap_or(""));
                println!("\n[{}] {} record(s)", view, records.len());
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
            Ok(())
        }
        Command::Export { view, all, format, out } => {
            let dataset = config.open_store().read().await?;

            match (view, all, format) {
                (Some(view), _, Format::Json) => {
                    write(&out, export::records_json(dataset.records(view))?).await?;
                }
                (Some(view), _, Format::Csv) => {
                    let Some(csv) = export::records_csv(dataset.records(view)) else {
                        bail!("No stored {} to export", view);
                    };
                    write(&out, csv).await?;
                }
                (None, true, Format::Json) => {
                    write(&out, export::dataset_json(&dataset)?).await?;
                }
                (None, true, Format::Csv) => {
                    let written = export::write_csv_bundle(&dataset, &out).await?;
                    if written.is_empty() {
                        bail!("Nothing stored yet");
                    }
                    for path in written {
                        println!("{}", path.display());
                    }
                }
                (None, false, _) => bail!("Pass --view or --all"),
            }
            Ok(())
        }
        Command::Selectors => {
            // compiling catches selectors that would fail at extraction time
            let extractor = Extractor::new(config.load_selectors()?)?;
            println!("{}", extractor.table().to_json()?);
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<SyncConfig> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::from_file(path)?,
        None => SyncConfig::default(),
    };

    if let Some(dir) = &cli.data_dir {
        config = config.data_dir(dir);
    }
    if let Some(key) = &cli.storage_key {
        config = config.storage_key(key);
    }
    if let Some(path) = &cli.selectors {
        config = config.selectors(path);
    }

    Ok(config)
}

async fn open_browser(args: ExtractArgs) -> anyhow::Result<BrowserSession> {
    let session = tokio::task::spawn_blocking(move || -> crm_scrape::Result<BrowserSession> {
        let session = match args.ws_endpoint {
            Some(ws_url) => BrowserSession::connect(ConnectionOptions::new(ws_url))?,
            None => {
                let mut options = LaunchOptions::new().headless(!args.headed).sandbox(!args.no_sandbox);
                if let Some(dir) = args.user_data_dir {
                    options = options.user_data_dir(dir);
                }
                if let Some(path) = args.chrome_path {
                    options = options.chrome_path(path);
                }
                BrowserSession::launch(options)?
            }
        };

        if let Some(url) = args.url {
            session.navigate(&url)?;
        }
        Ok(session)
    })
    .await
    .context("Browser setup task failed")??;

    Ok(session)
}

async fn run(config: &SyncConfig, locator: Arc<dyn TargetLocator>, request: Request) -> Response {
    let coordinator = Coordinator::new(locator, Arc::new(config.open_store()));
    coordinator.handle(request).await
}

fn report(response: &Response) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn write(path: &Path, contents: String) -> anyhow::Result<()> {
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}

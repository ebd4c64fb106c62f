//! Terminal dashboard for scrape-gateway.
//!
//! Pick a method, submit a PDF or URL to a running gateway, show the
//! returned Markdown and optionally save it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use scrape_gateway::client::DEFAULT_GATEWAY_URL;
use scrape_gateway::{ClientError, GatewayClient, PdfVariant, ScrapeMethod};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Embedded extractor, print Markdown
  scrape-dash pdf report.pdf

  # Cloud extractor, save to extracted_data.md
  scrape-dash pdf report.pdf --method enterprise --save

  # Headless browser
  scrape-dash web https://example.com

  # Scraping API, custom output file
  scrape-dash web https://example.com --method scrapingbee -o page.md
"#;

/// Submit PDFs and URLs to a scrape-gateway server.
#[derive(Parser, Debug)]
#[command(
    name = "scrape-dash",
    version,
    about = "Dashboard for the PDF and web scraping gateway",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Gateway base URL.
    #[arg(long, global = true, env = "SCRAPE_GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    server: String,

    /// Write the Markdown to this file.
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Save the Markdown under its default name.
    #[arg(long, global = true)]
    save: bool,

    /// Do not echo the Markdown to stdout.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a PDF.
    Pdf {
        /// PDF file to upload.
        file: PathBuf,

        /// Extraction backend.
        #[arg(long, value_enum, default_value = "opensource")]
        method: PdfMethodArg,
    },
    /// Scrape a web page.
    Web {
        /// Page URL.
        url: String,

        /// Scraping backend.
        #[arg(long, value_enum, default_value = "selenium")]
        method: WebMethodArg,

        /// Scraping API key (overrides the server's key).
        #[arg(long, env = "SCRAPING_BEE_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PdfMethodArg {
    Opensource,
    Enterprise,
}

impl From<PdfMethodArg> for PdfVariant {
    fn from(v: PdfMethodArg) -> Self {
        match v {
            PdfMethodArg::Opensource => PdfVariant::OpenSource,
            PdfMethodArg::Enterprise => PdfVariant::Enterprise,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum WebMethodArg {
    Selenium,
    Scrapingbee,
}

impl From<WebMethodArg> for ScrapeMethod {
    fn from(v: WebMethodArg) -> Self {
        match v {
            WebMethodArg::Selenium => ScrapeMethod::Selenium,
            WebMethodArg::Scrapingbee => ScrapeMethod::ScrapingBee,
        }
    }
}

/// What a finished request hands back to the terminal.
struct Outcome {
    message: String,
    markdown: String,
    image_urls: Vec<String>,
    default_name: &'static str,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "error" })),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // gateway rejections carry the server's detail verbatim
            match e.downcast_ref::<ClientError>() {
                Some(client_err) => eprintln!("{}", red(&format!("Error: {}", client_err))),
                None => eprintln!("{}", red(&format!("Error: {:#}", e))),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let client = GatewayClient::new(&cli.server);
    let outcome = submit(&client, &cli.command).await?;

    eprintln!("{} {}", green("✔"), bold(&outcome.message));
    for (i, url) in outcome.image_urls.iter().enumerate() {
        eprintln!("  {} {}", dim(&format!("image {}", i + 1)), url);
    }

    if !cli.quiet {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(outcome.markdown.as_bytes())
            .context("Failed to write to stdout")?;
        if !outcome.markdown.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    let target = cli
        .output
        .clone()
        .or_else(|| cli.save.then(|| PathBuf::from(outcome.default_name)));
    if let Some(path) = target {
        save(&path, &outcome.markdown).await?;
        eprintln!("{} saved {}", green("✔"), bold(&path.display().to_string()));
    }

    Ok(())
}

async fn submit(client: &GatewayClient, command: &Command) -> Result<Outcome> {
    match command {
        Command::Pdf { file, method } => {
            let bytes = tokio::fs::read(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload.pdf".to_string());

            let spinner = spinner(format!("Extracting {}…", filename));
            let result = client.scrape_pdf((*method).into(), &filename, bytes).await;
            spinner.finish_and_clear();

            let response = result?;
            Ok(Outcome {
                message: response.message,
                markdown: response.markdown_content,
                image_urls: Vec::new(),
                default_name: "extracted_data.md",
            })
        }
        Command::Web {
            url,
            method,
            api_key,
        } => {
            let spinner = spinner(format!("Scraping {}…", url));
            let result = client
                .scrape_web((*method).into(), url, api_key.clone())
                .await;
            spinner.finish_and_clear();

            let response = result?;
            Ok(Outcome {
                message: response.message,
                markdown: response.markdown_content,
                image_urls: response.image_urls,
                default_name: "scraped_content.md",
            })
        }
    }
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

async fn save(path: &Path, markdown: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, markdown)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

//! CLI binary for pdf-harvest.
//!
//! A thin shim over the library crate that maps subcommands and flags to
//! `FetchConfig` / `OutputLayout` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use pdf_harvest::{
    document_file_name, extract_dates, extract_links, extract_links_to_file, extract_text,
    extract_text_to_file, fetch_with_config, process_many, FetchConfig, FetchError, FetchOutcome,
    FetchProgressCallback, HarvestError, OutputLayout, ProgressCallback,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// One download bar per URL, stacked in a [`MultiProgress`] so concurrent
/// fetches in `run` don't overwrite each other.
struct CliDownloadProgress {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl CliDownloadProgress {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        })
    }

    fn take_bar(&self, url: &str) -> Option<ProgressBar> {
        self.bars.lock().unwrap().remove(url)
    }
}

impl FetchProgressCallback for CliDownloadProgress {
    fn on_fetch_start(&self, url: &str, content_length: Option<u64>) {
        let bar = match content_length {
            Some(total) => {
                let bar = self.multi.add(ProgressBar::new(total));
                bar.set_style(
                    ProgressStyle::with_template(
                        "{spinner:.cyan} {prefix:.bold}  \
                         [{bar:32.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▉▊▋▌▍▎▏  ")
                    .tick_strings(TICKS),
                );
                bar
            }
            None => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(
                    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {bytes}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner())
                        .tick_strings(TICKS),
                );
                bar
            }
        };
        bar.set_prefix(document_file_name(url));
        bar.enable_steady_tick(Duration::from_millis(80));
        self.bars.lock().unwrap().insert(url.to_string(), bar);
    }

    fn on_bytes(&self, url: &str, downloaded: u64, _total: Option<u64>) {
        if let Some(bar) = self.bars.lock().unwrap().get(url) {
            bar.set_position(downloaded);
        }
    }

    fn on_fetch_complete(&self, url: &str, bytes: u64) {
        if let Some(bar) = self.take_bar(url) {
            bar.finish_and_clear();
        }
        self.multi
            .println(format!(
                "  {} {}  {}",
                green("✓"),
                document_file_name(url),
                dim(&format!("{bytes} bytes"))
            ))
            .ok();
    }

    fn on_fetch_error(&self, url: &str, error: &str) {
        if let Some(bar) = self.take_bar(url) {
            bar.abandon();
        }
        let first_line = error.lines().next().unwrap_or(error);
        self.multi
            .println(format!("  {} {}  {}", red("✗"), url, red(first_line)))
            .ok();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Download one document
  pdfharvest fetch https://www.rbi.org.in/notification/NT105.pdf -o downloads/NT105.pdf

  # Hyperlinks of a local PDF as JSON
  pdfharvest links downloads/NT105.pdf -o links.json

  # Plain text to stdout
  pdfharvest text downloads/NT105.pdf

  # Dates mentioned in a document, with context
  pdfharvest dates downloads/NT105.pdf --json

  # Fetch and extract everything, four documents at a time
  pdfharvest run --concurrency 4 https://example.com/a.pdf https://example.com/b.pdf

OUTPUT LAYOUT (run):
  <documents-dir>/<name>.pdf
  <output-dir>/<stem>/links.json
  <output-dir>/<stem>/text.txt
  <output-dir>/<stem>/report.json

ENVIRONMENT VARIABLES:
  PDFHARVEST_*            Every flag has a matching variable (see --help)
  RUST_LOG                Overrides -v/-q log filtering
"#;

/// Download PDFs and extract their links, text and dates.
#[derive(Parser, Debug)]
#[command(
    name = "pdfharvest",
    version,
    about = "Download PDFs and extract their links, text and dates",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFHARVEST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFHARVEST_QUIET")]
    quiet: bool,

    /// Disable download progress bars.
    #[arg(long, global = true, env = "PDFHARVEST_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download one PDF to a local file.
    Fetch {
        /// HTTPS URL of the document.
        url: String,

        /// Destination file. Default: <documents-dir>/<last URL segment>.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory used when --output is not given.
        #[arg(long, env = "PDFHARVEST_DOCUMENTS_DIR", default_value = "downloads")]
        documents_dir: PathBuf,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Extract hyperlink annotations from a local PDF as JSON.
    Links {
        /// Path to the PDF.
        pdf: PathBuf,

        /// Write JSON to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract the plain text of a local PDF.
    Text {
        /// Path to the PDF.
        pdf: PathBuf,

        /// Write text to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List dates mentioned in a local PDF, with surrounding context.
    Dates {
        /// Path to the PDF.
        pdf: PathBuf,

        /// Print JSON instead of one line per date.
        #[arg(long)]
        json: bool,
    },

    /// Fetch URLs and write links, text and a report for each.
    Run {
        /// One or more HTTPS URLs.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Directory for downloaded documents.
        #[arg(long, env = "PDFHARVEST_DOCUMENTS_DIR", default_value = "downloads")]
        documents_dir: PathBuf,

        /// Directory for per-document artifacts.
        #[arg(long, env = "PDFHARVEST_OUTPUT_DIR", default_value = "extracted")]
        output_dir: PathBuf,

        /// Documents processed at the same time.
        #[arg(short, long, env = "PDFHARVEST_CONCURRENCY", default_value_t = 4,
              value_parser = clap::value_parser!(u16).range(1..=64))]
        concurrency: u16,

        #[command(flatten)]
        fetch: FetchArgs,
    },
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Whole-request timeout in seconds.
    #[arg(long, env = "PDFHARVEST_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Connection timeout in seconds.
    #[arg(long, env = "PDFHARVEST_CONNECT_TIMEOUT", default_value_t = 30)]
    connect_timeout: u64,

    /// Re-use a document already present at the destination.
    #[arg(long, env = "PDFHARVEST_SKIP_EXISTING")]
    skip_existing: bool,

    /// Accept plain http:// URLs.
    #[arg(long, env = "PDFHARVEST_ALLOW_HTTP")]
    allow_http: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Stage-level INFO logs would interleave with the progress bars, so
    // they are suppressed while bars are shown.
    let downloads = matches!(cli.command, Command::Fetch { .. } | Command::Run { .. });
    let show_progress = downloads && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliDownloadProgress::new() as Arc<dyn FetchProgressCallback>)
    } else {
        None
    };

    match cli.command {
        Command::Fetch {
            ref url,
            ref output,
            ref documents_dir,
            ref fetch,
        } => {
            let dest = output
                .clone()
                .unwrap_or_else(|| documents_dir.join(document_file_name(url)));
            let config = build_config(fetch, progress_cb)?;

            let outcome = fetch_with_config(url, &dest, &config)
                .await
                .map_err(|e| {
                    let hint = flag_hint(&e);
                    anyhow::Error::new(e).context(format!("Failed to fetch {url}{hint}"))
                })?;

            if !cli.quiet {
                match outcome {
                    FetchOutcome::Downloaded { bytes } => eprintln!(
                        "{}  {} bytes  →  {}",
                        green("✔"),
                        bytes,
                        bold(&dest.display().to_string())
                    ),
                    FetchOutcome::AlreadyPresent => eprintln!(
                        "{}  already present  {}",
                        green("✔"),
                        bold(&dest.display().to_string())
                    ),
                }
            }
        }

        Command::Links {
            ref pdf,
            ref output,
        } => {
            if let Some(out) = output {
                let links = extract_links_to_file(pdf, out)
                    .await
                    .with_context(|| format!("Failed to extract links from {:?}", pdf))?;
                if !cli.quiet {
                    eprintln!(
                        "{}  {} links on {} pages  →  {}",
                        green("✔"),
                        links.len(),
                        links.pages().len(),
                        bold(&out.display().to_string())
                    );
                }
            } else {
                let links = extract_links(pdf)
                    .await
                    .with_context(|| format!("Failed to extract links from {:?}", pdf))?;
                let json =
                    serde_json::to_string_pretty(&links).context("Failed to serialise links")?;
                println!("{json}");
            }
        }

        Command::Text {
            ref pdf,
            ref output,
        } => {
            if let Some(out) = output {
                let text = extract_text_to_file(pdf, out)
                    .await
                    .with_context(|| format!("Failed to extract text from {:?}", pdf))?;
                if !cli.quiet {
                    eprintln!(
                        "{}  {} pages, {} chars  →  {}",
                        green("✔"),
                        text.page_count,
                        text.text.chars().count(),
                        bold(&out.display().to_string())
                    );
                }
            } else {
                let text = extract_text(pdf)
                    .await
                    .with_context(|| format!("Failed to extract text from {:?}", pdf))?;
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(text.as_str().as_bytes())
                    .context("Failed to write to stdout")?;
                if !text.as_str().ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
        }

        Command::Dates { ref pdf, json } => {
            let text = extract_text(pdf)
                .await
                .with_context(|| format!("Failed to extract text from {:?}", pdf))?;
            let dates = extract_dates(text.as_str());

            if json {
                let out =
                    serde_json::to_string_pretty(&dates).context("Failed to serialise dates")?;
                println!("{out}");
            } else {
                for d in &dates {
                    println!("{}\t{}", bold(&d.date), dim(&d.context));
                }
                if !cli.quiet && dates.is_empty() {
                    eprintln!("No dates found in {}", pdf.display());
                }
            }
        }

        Command::Run {
            ref urls,
            ref documents_dir,
            ref output_dir,
            concurrency,
            ref fetch,
        } => {
            let started = Instant::now();
            let config = build_config(fetch, progress_cb)?;
            let layout = OutputLayout::new(documents_dir, output_dir);

            let results = process_many(urls, &layout, &config, concurrency as usize).await;

            let mut failed = 0usize;
            for (url, result) in &results {
                match result {
                    Ok(report) => {
                        if !cli.quiet {
                            eprintln!(
                                "{}  {}  {} pages, {} links, {} dates  →  {}",
                                green("✔"),
                                url,
                                report.page_count,
                                report.links.len(),
                                report.important_dates.len(),
                                bold(&layout.artifact_dir(&report.document_path).display().to_string()),
                            );
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        let hint = match e {
                            HarvestError::Fetch(fe) => flag_hint(fe),
                            _ => "",
                        };
                        eprintln!("{}  {}  {}{}", red("✘"), url, red(&e.to_string()), dim(hint));
                    }
                }
            }

            if !cli.quiet {
                eprintln!(
                    "{}/{} documents in {}ms",
                    results.len() - failed,
                    results.len(),
                    started.elapsed().as_millis()
                );
            }
            if failed > 0 {
                anyhow::bail!("{} of {} documents failed", failed, results.len());
            }
        }
    }

    Ok(())
}

/// Point at the flag that addresses a fetch failure, if one does.
fn flag_hint(e: &FetchError) -> &'static str {
    match e {
        FetchError::Timeout { .. } => " (try a larger --timeout)",
        FetchError::InsecureScheme { .. } => " (pass --allow-http to permit plain HTTP)",
        _ => "",
    }
}

/// Map CLI fetch flags to `FetchConfig`.
fn build_config(args: &FetchArgs, progress: Option<ProgressCallback>) -> Result<FetchConfig> {
    let mut builder = FetchConfig::builder()
        .timeout_secs(args.timeout)
        .connect_timeout_secs(args.connect_timeout)
        .skip_existing(args.skip_existing)
        .require_https(!args.allow_http);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

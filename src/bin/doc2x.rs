//! CLI binary for the doc2x library.
//!
//! A thin shim over the library crate: maps flags to a `Client`, runs the
//! upload / parse / convert / download flow and records failures in a
//! tab-separated fail log.

use anyhow::{anyhow, bail, Context as _, Result};
use clap::{CommandFactory, Parser, Subcommand};
use doc2x::config::DEFAULT_BASE_URL;
use doc2x::{
    default_download_name, resolve_api_key, Client, ClientConfig, Context, ConvertFormat,
    ConvertRequest, Doc2xError, FailureLog, FormulaMode, Operation,
};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Parse one PDF, convert to Markdown and download the result
  doc2x parse -f paper.pdf

  # Parse a whole directory, 5 files at a time, keep the JSON pages
  doc2x parse -p ./scans --concurrency 5 --output-dir ./json

  # Parse only, no conversion
  doc2x parse -f paper.pdf --convert=false -o paper.json

  # Convert an already parsed document to docx and download it
  doc2x convert --uid 0192... --to docx --download -o paper.docx

  # Shell completion
  doc2x completion zsh > ~/.zfunc/_doc2x

ENVIRONMENT VARIABLES:
  DOC2X_APIKEY     API key (checked first)
  DOC2X_API_KEY    API key (fallback)
  RUST_LOG         Override log filter (e.g. doc2x=debug)

Failed items are appended to the fail log (default ./fail.log) as
tab-separated lines carrying the server trace-id.
"#;

/// Doc2X API v2 command line client.
#[derive(Parser, Debug)]
#[command(
    name = "doc2x",
    version,
    about = "Doc2X API v2 CLI: parse PDFs, convert and download results",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Doc2X API key (or set DOC2X_APIKEY / DOC2X_API_KEY).
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Base URL of the Doc2X API.
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// HTTP timeout for API requests (e.g. 30s, 500ms, 2m).
    #[arg(long, global = true, value_parser = parse_duration, default_value = "30s")]
    timeout: Duration,

    /// Upper bound on waiting for a long-running task.
    #[arg(long, global = true, value_parser = parse_duration, default_value = "5m")]
    processing_timeout: Duration,

    /// File that failed tasks are appended to. Empty disables it.
    #[arg(long, global = true, default_value = "fail.log")]
    fail_log: PathBuf,

    /// Disable the batch progress bar.
    #[arg(long, global = true)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload and parse a PDF (single file or directory).
    Parse(ParseArgs),
    /// Trigger conversion for a parsed document.
    Convert(ConvertArgs),
    /// Print a shell completion script.
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(clap::Args, Debug)]
struct ParseArgs {
    /// PDF file to upload.
    #[arg(short, long, conflicts_with = "path")]
    file: Option<PathBuf>,

    /// A PDF file or a directory containing PDFs.
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Wait for parsing to finish.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    wait: bool,

    /// Polling interval for the parse status.
    #[arg(long, value_parser = parse_duration, default_value = "3s")]
    interval: Duration,

    /// Save the parse result JSON here (single file).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for per-file result JSON (batch).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Files processed at once when parsing a directory.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..=64))]
    concurrency: u32,

    /// After a successful parse, convert and download.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    convert: bool,

    /// Target format for the automatic conversion.
    #[arg(long, value_enum, default_value = "md")]
    convert_to: FormatArg,

    /// Formula mode for the automatic conversion.
    #[arg(long, value_enum, default_value = "normal")]
    convert_formula_mode: FormulaArg,

    /// Directory for downloaded conversion results.
    #[arg(long, default_value = ".")]
    download_dir: PathBuf,

    /// Output file name (md/tex) without extension.
    #[arg(long)]
    convert_filename: Option<String>,

    /// Merge tables that continue across pages.
    #[arg(long)]
    convert_merge_cross_page_forms: bool,

    /// Download path override (default: <uid><ext> under --download-dir).
    #[arg(long)]
    convert_output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    /// UID of the parsed document.
    #[arg(long)]
    uid: String,

    /// Target format.
    #[arg(long, value_enum, default_value = "md")]
    to: FormatArg,

    /// Formula mode.
    #[arg(long, value_enum, default_value = "normal")]
    formula_mode: FormulaArg,

    /// Output file name (md/tex) without extension.
    #[arg(long)]
    filename: Option<String>,

    /// Merge tables that continue across pages.
    #[arg(long)]
    merge_cross_page_forms: bool,

    /// Wait for the conversion to finish.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    wait: bool,

    /// Polling interval for the conversion status.
    #[arg(long, value_parser = parse_duration, default_value = "3s")]
    interval: Duration,

    /// Download the converted file when ready.
    #[arg(long)]
    download: bool,

    /// Download path (default: <uid><ext>).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Md,
    Tex,
    Docx,
    #[value(name = "md_dollar")]
    MdDollar,
}

impl From<FormatArg> for ConvertFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Md => ConvertFormat::Markdown,
            FormatArg::Tex => ConvertFormat::Tex,
            FormatArg::Docx => ConvertFormat::Docx,
            FormatArg::MdDollar => ConvertFormat::MarkdownDollar,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormulaArg {
    Normal,
    Dollar,
    Latex,
}

impl From<FormulaArg> for FormulaMode {
    fn from(v: FormulaArg) -> Self {
        match v {
            FormulaArg::Normal => FormulaMode::Normal,
            FormulaArg::Dollar => FormulaMode::Dollar,
            FormulaArg::Latex => FormulaMode::Latex,
        }
    }
}

/// Settings shared by every file of a parse run.
struct ParseJob {
    wait: bool,
    interval: Duration,
    output: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    auto: Option<AutoConvert>,
}

struct AutoConvert {
    to: ConvertFormat,
    formula_mode: FormulaMode,
    filename: Option<String>,
    merge_cross_page_forms: bool,
    download_dir: PathBuf,
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::Completion { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "doc2x", &mut io::stdout());
        return Ok(());
    }

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces per-file INFO lines in batch mode.
    let batch = matches!(
        &cli.command,
        Command::Parse(ParseArgs { path: Some(p), .. }) if p.is_dir()
    );
    let show_progress = batch && !cli.quiet && !cli.no_progress && !cli.verbose;
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

    // ── Cancellation ─────────────────────────────────────────────────────
    let ctx = Context::background();
    let on_signal = ctx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("interrupt received, cancelling in-flight work");
        on_signal.cancel();
    });

    let fail_log = FailureLog::new(cli.fail_log.clone());

    match &cli.command {
        Command::Parse(args) => run_parse(&cli, args, &ctx, &fail_log, show_progress).await,
        Command::Convert(args) => run_convert(&cli, args, &ctx, &fail_log).await,
        Command::Completion { .. } => Ok(()),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn build_client(cli: &Cli) -> Result<Client> {
    let api_key = resolve_api_key(cli.api_key.as_deref())?;
    let config = ClientConfig::builder()
        .api_key(api_key)
        .base_url(&cli.base_url)
        .timeout(cli.timeout)
        .processing_timeout(cli.processing_timeout)
        .build()
        .context("Invalid configuration")?;
    Ok(Client::new(config)?)
}

// ── parse ────────────────────────────────────────────────────────────────────

async fn run_parse(
    cli: &Cli,
    args: &ParseArgs,
    ctx: &Context,
    log: &FailureLog,
    show_progress: bool,
) -> Result<()> {
    let input = args
        .file
        .as_ref()
        .or(args.path.as_ref())
        .ok_or_else(|| anyhow!("flag --file or --path is required"));
    let files = input.and_then(|p| collect_input_files(p));
    let files = match files {
        Ok(files) => files,
        Err(err) => {
            let target = args
                .file
                .as_ref()
                .or(args.path.as_ref())
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Err(log_failure(log, &target, "", err));
        }
    };

    let client = build_client(cli).map_err(|e| log_failure(log, "", "", e))?;

    let job = ParseJob {
        wait: args.wait,
        interval: args.interval,
        output: args.output.clone(),
        output_dir: args.output_dir.clone(),
        auto: args.convert.then(|| AutoConvert {
            to: args.convert_to.into(),
            formula_mode: args.convert_formula_mode.into(),
            filename: args.convert_filename.clone(),
            merge_cross_page_forms: args.convert_merge_cross_page_forms,
            download_dir: args.download_dir.clone(),
            output: args.convert_output.clone(),
        }),
    };

    if let [single] = files.as_slice() {
        return handle_parse_file(&client, ctx, &job, log, single).await;
    }
    run_parse_batch(&client, ctx, &job, log, &files, args.concurrency as usize, show_progress).await
}

/// A PDF path, or every `.pdf` directly inside a directory (sorted).
fn collect_input_files(path: &Path) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;

    if meta.is_file() {
        if is_pdf(path) {
            return Ok(vec![path.to_path_buf()]);
        }
        bail!("file is not a pdf: {}", path.display());
    }
    if !meta.is_dir() {
        bail!("path is neither file nor directory: {}", path.display());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path).with_context(|| format!("read dir {}", path.display()))? {
        let entry = entry.with_context(|| format!("read dir {}", path.display()))?;
        let p = entry.path();
        if p.is_file() && is_pdf(&p) {
            files.push(p);
        }
    }
    files.sort();

    if files.is_empty() {
        bail!("no pdf files found in {}", path.display());
    }
    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case("pdf"))
}

async fn run_parse_batch(
    client: &Client,
    ctx: &Context,
    job: &ParseJob,
    log: &FailureLog,
    files: &[PathBuf],
    concurrency: usize,
    show_progress: bool,
) -> Result<()> {
    let bar = if show_progress {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  \
                 ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Parsing");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    } else {
        ProgressBar::hidden()
    };

    let errors: Vec<anyhow::Error> = stream::iter(files)
        .map(|pdf| {
            let bar = bar.clone();
            async move {
                let res = handle_parse_file(client, ctx, job, log, pdf).await;
                let name = file_label(pdf);
                match &res {
                    Ok(()) => bar.println(format!("  {} {name}", green("✓"))),
                    Err(e) => bar.println(format!("  {} {name}  {}", red("✗"), red(&format!("{e:#}")))),
                }
                bar.inc(1);
                res
            }
        })
        .buffer_unordered(concurrency)
        .filter_map(|res| async move { res.err() })
        .collect()
        .await;

    bar.finish_and_clear();

    if let Some(first) = errors.first() {
        bail!(
            "batch completed with {} errors, first: {first:#}",
            errors.len()
        );
    }
    info!(files = files.len(), "batch completed");
    Ok(())
}

async fn handle_parse_file(
    client: &Client,
    ctx: &Context,
    job: &ParseJob,
    log: &FailureLog,
    pdf: &Path,
) -> Result<()> {
    let target = pdf.display().to_string();
    let label = file_label(pdf);

    let data = tokio::fs::read(pdf).await.map_err(|e| {
        log_failure(
            log,
            &target,
            "",
            anyhow::Error::new(e).context(format!("read file {target}")),
        )
    })?;

    let pre = client
        .pre_upload(ctx)
        .await
        .map_err(|e| record(log, &target, "", e))?;
    let pre_trace = pre.trace_id;
    let slot = pre.data.ok_or_else(|| {
        record(
            log,
            &target,
            &pre_trace,
            Doc2xError::MissingData {
                operation: Operation::PreUpload,
                what: "no upload slot returned",
                trace_id: pre_trace.clone(),
            },
        )
    })?;
    info!(file = %label, uid = %slot.uid, trace_id = %pre_trace, "preupload completed");

    client
        .upload_to_presigned_url(ctx, &slot.url, data)
        .await
        .map_err(|e| record(log, &target, &pre_trace, e))?;
    info!(file = %label, trace_id = %pre_trace, "upload success");

    if !job.wait {
        info!(file = %label, uid = %slot.uid, "submitted parse job");
        return Ok(());
    }

    let status = client
        .wait_for_parsing(ctx, &slot.uid, job.interval)
        .await
        .map_err(|e| record(log, &target, &pre_trace, e))?;

    let result = status.data.as_ref().and_then(|d| d.result.as_ref());
    let pages = result.map_or(0, |r| r.pages.len());
    info!(file = %label, uid = %slot.uid, trace_id = %status.trace_id, pages, "parse success");

    let json_target = match &job.output_dir {
        Some(dir) => Some(dir.join(Path::new(&label).with_extension("json"))),
        None => job.output.clone(),
    };
    if let (Some(path), Some(result)) = (json_target, result) {
        write_json(&path, result)
            .await
            .map_err(|e| log_failure(log, &target, &status.trace_id, e))?;
        info!(file = %label, path = %path.display(), "saved parse result");
    }

    if let Some(auto) = &job.auto {
        convert_and_download(client, ctx, log, &slot.uid, auto, job.interval, &label).await?;
    }
    Ok(())
}

async fn convert_and_download(
    client: &Client,
    ctx: &Context,
    log: &FailureLog,
    uid: &str,
    auto: &AutoConvert,
    interval: Duration,
    label: &str,
) -> Result<()> {
    let req = ConvertRequest {
        uid: uid.to_string(),
        to: auto.to,
        formula_mode: Some(auto.formula_mode),
        filename: auto.filename.clone(),
        merge_cross_page_forms: auto.merge_cross_page_forms,
    };
    let resp = client
        .convert_parse(ctx, req)
        .await
        .map_err(|e| record(log, uid, "", e))?;
    info!(file = %label, uid, trace_id = %resp.trace_id, "convert requested");

    let result = client
        .wait_for_conversion(ctx, uid, interval)
        .await
        .map_err(|e| record(log, uid, &resp.trace_id, e))?;
    let url = result.data.map(|d| d.url).unwrap_or_default();
    info!(file = %label, uid, trace_id = %result.trace_id, url = %url, "conversion finished");

    let out = auto
        .output
        .clone()
        .unwrap_or_else(|| auto.download_dir.join(default_download_name(&url, uid)));
    client
        .download_to_path(ctx, &url, &out)
        .await
        .map_err(|e| record(log, uid, &result.trace_id, e))?;
    info!(file = %label, path = %out.display(), "downloaded converted file");
    Ok(())
}

// ── convert ──────────────────────────────────────────────────────────────────

async fn run_convert(cli: &Cli, args: &ConvertArgs, ctx: &Context, log: &FailureLog) -> Result<()> {
    let uid = args.uid.trim();
    if uid.is_empty() {
        return Err(log_failure(log, "", "", anyhow!("flag --uid is required")));
    }
    let client = build_client(cli).map_err(|e| log_failure(log, uid, "", e))?;

    let req = ConvertRequest {
        uid: uid.to_string(),
        to: args.to.into(),
        formula_mode: Some(args.formula_mode.into()),
        filename: args.filename.clone(),
        merge_cross_page_forms: args.merge_cross_page_forms,
    };
    let resp = client
        .convert_parse(ctx, req)
        .await
        .map_err(|e| record(log, uid, "", e))?;
    let status = resp.data.as_ref().map(|d| d.status).unwrap_or_default();
    info!(uid, trace_id = %resp.trace_id, %status, "convert requested");

    if !args.wait {
        return Ok(());
    }

    let result = client
        .wait_for_conversion(ctx, uid, args.interval)
        .await
        .map_err(|e| record(log, uid, &resp.trace_id, e))?;
    let url = result.data.as_ref().map(|d| d.url.clone()).unwrap_or_default();
    info!(uid, trace_id = %result.trace_id, url = %url, "conversion finished");

    if args.download {
        let out = args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_download_name(&url, uid)));
        client
            .download_to_path(ctx, &url, &out)
            .await
            .map_err(|e| record(log, uid, &result.trace_id, e))?;
        if !cli.quiet {
            eprintln!("{} {}", green("✔"), bold(&out.display().to_string()));
        }
    }
    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Append `err` to the fail log, preferring the error's own trace id.
fn record(log: &FailureLog, target: &str, fallback_trace: &str, err: Doc2xError) -> anyhow::Error {
    let trace = err.trace_id().unwrap_or(fallback_trace).to_string();
    log_failure(log, target, &trace, anyhow::Error::new(err))
}

fn log_failure(log: &FailureLog, target: &str, trace_id: &str, err: anyhow::Error) -> anyhow::Error {
    match log.record_with_trace(trace_id, target, &format!("{err:#}")) {
        Ok(()) => err,
        Err(log_err) => anyhow!("{err:#}; also failed to write fail log: {log_err}"),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create output dir {}", dir.display()))?;
    }
    let content = serde_json::to_vec_pretty(value).context("marshal result")?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("write file {}", path.display()))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse `1h`, `5m`, `30s`, `500ms` or combinations like `1m30s`. A bare
/// number is seconds.
fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".into());
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("invalid duration '{s}'"));
        }
        let n: u64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid duration '{s}'"))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let too_large = || format!("duration '{s}' is too large");
        let unit = match &rest[..unit_len] {
            "ms" => Duration::from_millis(n),
            "s" => Duration::from_secs(n),
            "m" => Duration::from_secs(n.checked_mul(60).ok_or_else(too_large)?),
            "h" => Duration::from_secs(n.checked_mul(3600).ok_or_else(too_large)?),
            other => return Err(format!("unknown unit '{other}' in duration '{s}'")),
        };
        total = total.checked_add(unit).ok_or_else(too_large)?;
        rest = &rest[unit_len..];
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc2x::config::{DEFAULT_TIMEOUT, PROCESSING_TIMEOUT};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("3x").is_err());
        assert!(parse_duration("ms").is_err());
        assert_eq!(
            parse_duration("307445734561825861m").unwrap_err(),
            "duration '307445734561825861m' is too large"
        );
        assert!(parse_duration("18446744073709551615s1s").is_err());
        assert_eq!(
            parse_duration("18446744073709551615").unwrap(),
            Duration::from_secs(u64::MAX)
        );
    }

    #[test]
    fn global_defaults_match_library() {
        let cli = Cli::try_parse_from(["doc2x", "convert", "--uid", "u"]).unwrap();
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT);
        assert_eq!(cli.processing_timeout, PROCESSING_TIMEOUT);
        assert_eq!(cli.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn parse_flags_defaults() {
        let cli = Cli::try_parse_from(["doc2x", "parse", "-f", "a.pdf"]).unwrap();
        let Command::Parse(args) = cli.command else {
            panic!("expected parse");
        };
        assert!(args.wait);
        assert!(args.convert);
        assert_eq!(args.concurrency, 3);
        assert_eq!(args.interval, Duration::from_secs(3));
        assert_eq!(ConvertFormat::from(args.convert_to), ConvertFormat::Markdown);
        assert_eq!(cli.fail_log, PathBuf::from("fail.log"));
    }

    #[test]
    fn convert_flags() {
        let cli = Cli::try_parse_from([
            "doc2x", "convert", "--uid", "u1", "--to", "md_dollar", "--formula-mode", "dollar",
            "--wait", "false",
        ])
        .unwrap();
        let Command::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert!(!args.wait);
        assert_eq!(ConvertFormat::from(args.to), ConvertFormat::MarkdownDollar);
        assert_eq!(FormulaMode::from(args.formula_mode), FormulaMode::Dollar);
    }

    #[test]
    fn file_and_path_conflict() {
        assert!(Cli::try_parse_from(["doc2x", "parse", "-f", "a.pdf", "-p", "dir"]).is_err());
    }

    #[test]
    fn collects_pdfs_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PDF", "a.pdf", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let files = collect_input_files(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|p| file_label(p)).collect();
        assert_eq!(names, vec!["a.pdf", "b.PDF"]);

        let single = collect_input_files(&dir.path().join("a.pdf")).unwrap();
        assert_eq!(single.len(), 1);

        let err = collect_input_files(&dir.path().join("notes.txt")).unwrap_err();
        assert!(err.to_string().contains("not a pdf"));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_input_files(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no pdf files found"));
    }

    #[test]
    fn failures_are_logged_with_trace_id() {
        let dir = tempfile::tempdir().unwrap();
        let log = FailureLog::new(dir.path().join("fail.log"));
        let err = Doc2xError::Api {
            operation: Operation::GetStatus,
            code: "bad".into(),
            msg: String::new(),
            trace_id: "srv-1".into(),
        };
        let out = record(&log, "a.pdf", "fallback", err);
        assert!(out.to_string().contains("get status failed"));

        let content = std::fs::read_to_string(dir.path().join("fail.log")).unwrap();
        assert!(content.contains("trace-id=srv-1\ttarget=a.pdf"));
    }
}

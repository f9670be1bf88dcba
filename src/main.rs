//! dirscan - Concurrent directory malware scanner.
//!
//! Usage:
//!   dirscan --directory PATH              Scan every file below PATH
//!   dirscan --directory PATH --verbose    Echo each scanned file
//!   dirscan --help                        Show help
//!
//! The API key is read from `V1_FS_KEY`, or `--api-key` when unset.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use color_eyre::eyre::{Result, WrapErr, eyre};
use tracing_subscriber::EnvFilter;

use dirscan_engine::{
    ClientOptions, CommandBackend, Concurrency, ConfigError, DirectoryScanner, Endpoint,
    RunSummary, ScanConfig, ScanError, ScanLog, TagSet, validate_credentials,
};

/// Environment variable holding the API key. Takes precedence over `--api-key`.
const API_KEY_ENV: &str = "V1_FS_KEY";

#[derive(Parser)]
#[command(
    name = "dirscan",
    version,
    about = "Scan a directory tree for malware",
    long_about = "dirscan walks a directory tree and submits every file to a remote \
                  file-scanning service, logging each verdict and printing a summary.\n\n\
                  The scanning service is reached through a scanner program (see \
                  --scanner-cmd) which receives the file path and prints the JSON verdict."
)]
struct Cli {
    /// API key for the scanning service. Can also use V1_FS_KEY env var
    #[arg(long)]
    api_key: Option<String>,

    /// Service region
    #[arg(long, default_value = "us-east-1")]
    region: String,

    /// Path to directory to scan
    #[arg(short, long)]
    directory: PathBuf,

    /// Log all scans to stdout
    #[arg(short, long)]
    verbose: bool,

    /// Enable predictive machine learning detection
    #[arg(long)]
    pml: bool,

    /// Enable SPN feedback
    #[arg(long)]
    feedback: bool,

    /// Max number of concurrent file scans (-1 or "unlimited" for no limit)
    #[arg(long, default_value = "100", allow_negative_numbers = true)]
    max_workers: Concurrency,

    /// Internal service gateway address
    #[arg(long)]
    internal_address: Option<String>,

    /// Use TLS for the internal service gateway
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    internal_tls: bool,

    /// Up to 8 tags, comma separated (may be repeated)
    #[arg(long)]
    tags: Vec<String>,

    /// Skip files larger than this (e.g., "512MB", "1GB", or "none")
    #[arg(long, default_value = "1GB")]
    max_file_size: String,

    /// Give up on a single scan after this many seconds
    #[arg(long)]
    scan_timeout: Option<u64>,

    /// Scanner program that performs each scan call
    #[arg(long, default_value = "v1fs-scan")]
    scanner_cmd: PathBuf,

    /// Extra argument passed to the scanner program (may be repeated)
    #[arg(long, allow_hyphen_values = true)]
    scanner_arg: Vec<String>,

    /// Directory for the error and scan logs
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    /// Summary output format
    #[arg(long, default_value = "text")]
    summary_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let api_key = resolve_api_key(std::env::var(API_KEY_ENV).ok(), cli.api_key.clone())
        .ok_or_else(|| eyre!("Use {API_KEY_ENV} env var or --api-key parameter"))?;
    let config = build_config(&cli)?;

    let stamp = chrono::Local::now().format("%m-%d-%YT%H-%M").to_string();
    init_logging(&cli.log_dir, &stamp)?;

    let backend = CommandBackend::new(&cli.scanner_cmd, client_options(&cli, api_key))
        .with_args(cli.scanner_arg.iter().cloned());

    if let Err(e) = validate_credentials(&backend).await {
        tracing::error!(error = %e, "credential check failed");
        println!("Bad Credentials. Check API KEY and role permissions");
        std::process::exit(1);
    }

    let scan_log_path = cli.log_dir.join(format!("{stamp}-Scan.log"));
    let log = ScanLog::append_file(&scan_log_path)
        .wrap_err_with(|| format!("Error creating scan log file {}", scan_log_path.display()))?;

    eprintln!(
        "Scanning {} (max workers: {}, size limit: {})...",
        config.root.display(),
        config.concurrency,
        config
            .max_file_size
            .map(format_size)
            .unwrap_or_else(|| "none".to_string())
    );

    let scanner = DirectoryScanner::new(backend, config, log);
    let token = scanner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, stopping scan...");
            token.cancel();
        }
    });

    let summary = scanner.run().await.wrap_err("Scan failed")?;

    match cli.summary_format {
        OutputFormat::Text => print_summary(&summary),
        OutputFormat::Json => {
            let mut json = serde_json::to_value(summary)?;
            json["files_per_second"] = summary.files_per_second().into();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    if scanner.cancellation_token().is_cancelled() {
        eprintln!("Scan was interrupted; totals are partial.");
    }

    Ok(())
}

/// Build the run configuration from flags.
fn build_config(cli: &Cli) -> Result<ScanConfig, ScanError> {
    let tags = TagSet::from_csv(&cli.tags)?;
    let max_file_size = parse_size_limit(&cli.max_file_size)?;

    ScanConfig::builder()
        .root(&cli.directory)
        .concurrency(cli.max_workers)
        .tags(tags)
        .max_file_size(max_file_size)
        .verbose(cli.verbose)
        .scan_timeout(cli.scan_timeout.map(Duration::from_secs))
        .build()
        .map_err(|e| {
            ConfigError::Invalid {
                message: e.to_string(),
            }
            .into()
        })
}

/// Client options for the scanner program.
fn client_options(cli: &Cli, api_key: String) -> ClientOptions {
    let endpoint = match &cli.internal_address {
        Some(address) => Endpoint::Internal {
            address: address.clone(),
            tls: cli.internal_tls,
        },
        None => Endpoint::Region(cli.region.clone()),
    };

    ClientOptions {
        api_key,
        endpoint,
        pml: cli.pml,
        feedback: cli.feedback,
    }
}

/// The environment variable wins over the flag.
fn resolve_api_key(from_env: Option<String>, from_flag: Option<String>) -> Option<String> {
    from_env
        .filter(|k| !k.is_empty())
        .or(from_flag.filter(|k| !k.is_empty()))
}

/// Route `tracing` output to `<stamp>.error.log` in `log_dir`.
fn init_logging(log_dir: &Path, stamp: &str) -> Result<()> {
    let path = log_dir.join(format!("{stamp}.error.log"));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .wrap_err_with(|| format!("Error creating log file {}", path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    Ok(())
}

/// Print the end-of-run summary to the terminal.
fn print_summary(summary: &RunSummary) {
    println!();
    println!("--- Scan Summary ---");
    println!("Total Files Scanned: {}", summary.total_scanned);
    println!("Files with Malware: {}", summary.files_with_malware);
    println!("Files Clean: {}", summary.files_clean);
    println!("Total Scan Time: {:?}", summary.elapsed);
    println!("Scan Rate: {:.1} files/s", summary.files_per_second());
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Parse the size ceiling flag; "none" (or "0") disables it.
fn parse_size_limit(s: &str) -> Result<Option<u64>, ConfigError> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    match parse_size(s)? {
        0 => Ok(None),
        n => Ok(Some(n)),
    }
}

/// Parse a size string (e.g., "1KB", "10MB", "1GB").
fn parse_size(s: &str) -> Result<u64, ConfigError> {
    let upper = s.trim().to_uppercase();
    let invalid = || ConfigError::Invalid {
        message: format!("invalid size '{s}'"),
    };

    let (digits, multiplier) =
        if let Some(n) = upper.strip_suffix("GB").or(upper.strip_suffix('G')) {
            (n, 1024 * 1024 * 1024)
        } else if let Some(n) = upper.strip_suffix("MB").or(upper.strip_suffix('M')) {
            (n, 1024 * 1024)
        } else if let Some(n) = upper.strip_suffix("KB").or(upper.strip_suffix('K')) {
            (n, 1024)
        } else {
            (upper.strip_suffix('B').unwrap_or(&upper), 1)
        };

    let num: f64 = digits.trim().parse().map_err(|_| invalid())?;
    if !num.is_finite() || num.is_sign_negative() {
        return Err(invalid());
    }

    Ok((num * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["dirscan", "--directory", "/srv"]).unwrap();
        assert_eq!(cli.region, "us-east-1");
        assert_eq!(cli.max_workers.max(), Some(100));
        assert!(cli.internal_tls);
        assert!(!cli.verbose);

        let config = build_config(&cli).unwrap();
        assert_eq!(config.max_file_size, Some(1024 * 1024 * 1024));
        assert!(config.tags.is_empty());
    }

    #[test]
    fn test_unlimited_workers() {
        let cli =
            Cli::try_parse_from(["dirscan", "--directory", "/srv", "--max-workers", "-1"]).unwrap();
        assert_eq!(cli.max_workers, Concurrency::Unlimited);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(Cli::try_parse_from(["dirscan", "--directory", "/srv", "--max-workers", "0"]).is_err());
    }

    #[test]
    fn test_directory_required() {
        assert!(Cli::try_parse_from(["dirscan"]).is_err());
    }

    #[test]
    fn test_tags_limit() {
        let cli = Cli::try_parse_from([
            "dirscan",
            "--directory",
            "/srv",
            "--tags",
            "a,b,c,d,e",
            "--tags",
            "f,g,h",
        ])
        .unwrap();
        assert_eq!(build_config(&cli).unwrap().tags.len(), 8);

        let cli = Cli::try_parse_from([
            "dirscan",
            "--directory",
            "/srv",
            "--tags",
            "a,b,c,d,e,f,g,h,i",
        ])
        .unwrap();
        assert!(matches!(
            build_config(&cli),
            Err(ScanError::Config(ConfigError::TooManyTags { count: 9 }))
        ));
    }

    #[test]
    fn test_internal_endpoint() {
        let cli = Cli::try_parse_from([
            "dirscan",
            "--directory",
            "/srv",
            "--internal-address",
            "gw.local:443",
            "--internal-tls",
            "false",
        ])
        .unwrap();
        let options = client_options(&cli, "key".to_string());
        assert_eq!(
            options.endpoint,
            Endpoint::Internal {
                address: "gw.local:443".to_string(),
                tls: false
            }
        );
    }

    #[test]
    fn test_api_key_precedence() {
        assert_eq!(
            resolve_api_key(Some("env".into()), Some("flag".into())),
            Some("env".to_string())
        );
        assert_eq!(
            resolve_api_key(None, Some("flag".into())),
            Some("flag".to_string())
        );
        assert_eq!(resolve_api_key(Some(String::new()), None), None);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1GB").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("512mb").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_size("1.5K").unwrap(), 1536);
        assert_eq!(parse_size("100").unwrap(), 100);
        assert!(parse_size("lots").is_err());
        assert!(parse_size("-5MB").is_err());
        assert!(parse_size("-0").is_err());
        assert!(parse_size("inf").is_err());
        assert!(parse_size("NaN").is_err());
    }

    #[test]
    fn test_parse_size_limit() {
        assert_eq!(parse_size_limit("none").unwrap(), None);
        assert_eq!(parse_size_limit("0").unwrap(), None);
        assert_eq!(parse_size_limit("2MB").unwrap(), Some(2 * 1024 * 1024));
    }

    #[test]
    fn test_negative_size_limit_rejected() {
        let cli = Cli::try_parse_from(["dirscan", "--directory", "/srv", "--max-file-size=-5MB"])
            .unwrap();
        assert!(matches!(
            build_config(&cli),
            Err(ScanError::Config(ConfigError::Invalid { .. }))
        ));
    }
}

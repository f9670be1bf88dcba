//! Seam to the external scanning capability.

use std::ffi::OsStr;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use dirscan_core::{BackendError, ClientOptions, Endpoint, TagSet};

/// Exit status a scanner program uses to report rejected credentials.
pub const AUTH_FAILURE_EXIT_CODE: i32 = 77;

/// Label used for the credential check buffer scan.
const AUTH_CHECK_LABEL: &str = "testAuth";

/// An external scanning capability.
///
/// Both calls return the raw JSON verdict; parsing is left to the engine so
/// that malformed responses can be told apart from transport failures.
pub trait ScanBackend: Send + Sync + 'static {
    /// Scan a file on disk.
    fn scan_file(
        &self,
        path: &Path,
        tags: &TagSet,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// Scan an in-memory buffer under a display label.
    fn scan_buffer(
        &self,
        bytes: &[u8],
        label: &str,
        tags: &TagSet,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;
}

/// Check credentials by scanning an empty buffer.
pub async fn validate_credentials<B: ScanBackend>(backend: &B) -> Result<(), BackendError> {
    backend
        .scan_buffer(&[], AUTH_CHECK_LABEL, &TagSet::empty())
        .await
        .map(|_| ())
}

/// Backend that runs a scanner program once per call.
///
/// The program receives `[args.., target]` where target is the file path,
/// or `-` for buffer scans with the buffer on stdin. Client options and
/// tags are passed through the environment. Stdout carries the verdict
/// JSON; a non-zero exit is a transport error and exit status
/// [`AUTH_FAILURE_EXIT_CODE`] an authentication error.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: PathBuf,
    args: Vec<String>,
    options: ClientOptions,
}

impl CommandBackend {
    /// Create a backend for `program`.
    pub fn new(program: impl Into<PathBuf>, options: ClientOptions) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            options,
        }
    }

    /// Extra arguments placed before the scan target.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The program this backend runs.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, target: &OsStr, tags: &TagSet) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(target)
            .env("V1_FS_KEY", &self.options.api_key)
            .env("V1_FS_PML", flag(self.options.pml))
            .env("V1_FS_FEEDBACK", flag(self.options.feedback))
            .env("V1_FS_TAGS", tags.joined())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match &self.options.endpoint {
            Endpoint::Region(region) => {
                cmd.env("V1_FS_REGION", region);
            }
            Endpoint::Internal { address, tls } => {
                cmd.env("V1_FS_ADDRESS", address).env("V1_FS_TLS", flag(*tls));
            }
        }
        cmd
    }
}

impl ScanBackend for CommandBackend {
    async fn scan_file(&self, path: &Path, tags: &TagSet) -> Result<String, BackendError> {
        let output = self.command(path.as_os_str(), tags).output().await?;
        into_verdict(output)
    }

    async fn scan_buffer(
        &self,
        bytes: &[u8],
        label: &str,
        tags: &TagSet,
    ) -> Result<String, BackendError> {
        let mut cmd = self.command(OsStr::new("-"), tags);
        cmd.env("V1_FS_LABEL", label).stdin(Stdio::piped());

        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(bytes).await?;
            stdin.shutdown().await?;
        }
        let output = child.wait_with_output().await?;
        into_verdict(output)
    }
}

fn into_verdict(output: Output) -> Result<String, BackendError> {
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let message = if stderr.is_empty() {
        format!("scanner exited with {}", output.status)
    } else {
        stderr
    };

    match output.status.code() {
        Some(AUTH_FAILURE_EXIT_CODE) => Err(BackendError::Authentication { message }),
        _ => Err(BackendError::Transport { message }),
    }
}

fn flag(enabled: bool) -> &'static str {
    if enabled { "1" } else { "0" }
}

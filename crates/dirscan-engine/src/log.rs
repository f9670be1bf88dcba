//! Append-only scan log shared by all scan tasks.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::stats::RunSummary;

/// Serialized writer for the per-run scan log.
///
/// Each call writes its complete lines under one lock, so lines from
/// concurrent tasks never interleave. File-backed logs are buffered and
/// flushed by [`ScanLog::write_summary`], [`ScanLog::flush`] or drop.
pub struct ScanLog {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ScanLog {
    /// Log to an arbitrary writer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Open (or create) `path` in append mode.
    pub fn append_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// A log that discards everything.
    pub fn sink() -> Self {
        Self::new(io::sink())
    }

    /// Append one line.
    pub fn append_line(&self, line: &str) -> io::Result<()> {
        self.append_lines(&[line])
    }

    /// Append several lines as one uninterrupted block.
    pub fn append_lines(&self, lines: &[&str]) -> io::Result<()> {
        let mut buf = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            buf.push_str(line.trim_end_matches('\n'));
            buf.push('\n');
        }

        self.lock().write_all(buf.as_bytes())
    }

    /// Flush buffered lines to the underlying writer.
    pub fn flush(&self) -> io::Result<()> {
        self.lock().flush()
    }

    /// Append the end-of-run summary block and flush.
    pub fn write_summary(&self, summary: &RunSummary) -> io::Result<()> {
        self.append_line(&summary.to_string())?;
        self.flush()
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ScanLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanLog").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_append_lines_adds_newlines() {
        let buffer = SharedBuffer::default();
        let log = ScanLog::new(buffer.clone());

        log.append_line("first").unwrap();
        log.append_lines(&["second\n", "third"]).unwrap();

        assert_eq!(buffer.contents(), "first\nsecond\nthird\n");
    }

    #[test]
    fn test_concurrent_lines_do_not_interleave() {
        let buffer = SharedBuffer::default();
        let log = Arc::new(ScanLog::new(buffer.clone()));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let line = format!("thread-{t} line-{i} {}", "x".repeat(64));
                        log.append_line(&line).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = buffer.contents();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 8 * 200);
        for line in lines {
            assert!(line.starts_with("thread-"));
            assert!(line.ends_with(&"x".repeat(64)));
        }
    }

    #[test]
    fn test_append_file_appends() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scan.log");

        ScanLog::append_file(&path).unwrap().append_line("one").unwrap();
        let log = ScanLog::append_file(&path).unwrap();
        log.write_summary(&RunSummary {
            total_scanned: 1,
            files_with_malware: 0,
            files_clean: 1,
            elapsed: Duration::from_secs(1),
        })
        .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("one\nTotal Scan Time: 1s\n"));
        assert!(contents.ends_with("Files Clean: 1\n"));
    }

    #[test]
    fn test_file_log_is_buffered_until_flush() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scan.log");
        let log = ScanLog::append_file(&path).unwrap();

        log.append_lines(&["Scanned: /a, Duration: 1ms", "{}"]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        log.flush().unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Scanned: /a, Duration: 1ms\n{}\n"
        );
    }
}

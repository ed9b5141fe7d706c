use crate::source::record::{AccessLogParser, VisitRecord};
use crate::source::window::ReplayWindow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("log file '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("log file '{}' could not be opened: {}", .path.display(), .source)]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error while reading log: {0}")]
    Io(#[from] std::io::Error),
}

/// Line counters kept while the cursor advances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorStats {
    pub lines_read: u64,
    pub malformed: u64,
    pub outside_window: u64,
    pub matched: u64,
}

/// Forward-only reader over an access log, yielding records inside a window.
///
/// The cursor never seeks backwards; restarting a replay means opening a new
/// cursor. Bytes that are not valid UTF-8 are replaced rather than rejected.
pub struct LogCursor {
    path: PathBuf,
    reader: Box<dyn BufRead + Send>,
    parser: AccessLogParser,
    line_number: u64,
    stats: CursorStats,
    exhausted: bool,
}

impl LogCursor {
    /// Open the log file for reading
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound(path.clone()),
            _ => SourceError::Unreadable {
                path: path.clone(),
                source: e,
            },
        })?;

        debug!(path = %path.display(), "Opened log source");

        Ok(Self::from_reader(path, BufReader::new(file)))
    }

    /// Read log lines from an already open source. `path` is only used for
    /// reporting.
    pub fn from_reader(path: impl Into<PathBuf>, reader: impl BufRead + Send + 'static) -> Self {
        Self {
            path: path.into(),
            reader: Box::new(reader),
            parser: AccessLogParser::new(),
            line_number: 0,
            stats: CursorStats::default(),
            exhausted: false,
        }
    }

    /// Advance to the next record inside `window`.
    ///
    /// Returns `Ok(None)` once the file has no more lines. Lines that do not
    /// parse are skipped.
    pub fn next_matching(
        &mut self,
        window: &ReplayWindow,
    ) -> Result<Option<VisitRecord>, SourceError> {
        if self.exhausted {
            return Ok(None);
        }

        let mut buf = Vec::new();
        loop {
            buf.clear();
            let bytes_read = self.reader.read_until(b'\n', &mut buf)?;

            if bytes_read == 0 {
                self.exhausted = true;
                debug!(
                    path = %self.path.display(),
                    lines_read = self.stats.lines_read,
                    matched = self.stats.matched,
                    malformed = self.stats.malformed,
                    outside_window = self.stats.outside_window,
                    "Log source exhausted"
                );
                return Ok(None);
            }

            self.line_number += 1;
            self.stats.lines_read += 1;

            let line = String::from_utf8_lossy(&buf);
            let text = line.trim_end_matches(&['\n', '\r'][..]);
            let record = match self.parser.parse(text, self.line_number) {
                Ok(record) => record,
                Err(e) => {
                    trace!(line = self.line_number, error = %e, "Skipping malformed line");
                    self.stats.malformed += 1;
                    continue;
                }
            };

            if !window.contains(record.day_of_month(), record.second_of_day()) {
                self.stats.outside_window += 1;
                continue;
            }

            self.stats.matched += 1;
            return Ok(Some(record));
        }
    }

    pub fn stats(&self) -> CursorStats {
        self.stats
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::window::SECONDS_IN_DAY;
    use std::io::{Read, Write};
    use tempfile::NamedTempFile;

    fn log_line(ts: &str, target: &str) -> String {
        format!(r#"192.0.2.1 - - [{ts}] "GET {target} HTTP/1.1" 200 512 "-" "test-agent""#)
    }

    fn any_time() -> ReplayWindow {
        ReplayWindow::new(0, 0, SECONDS_IN_DAY)
    }

    struct FailingReader;

    impl std::io::Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "device went away"))
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = LogCursor::open("/definitely/not/here/access.log");
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_reads_records_in_file_order() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "{}", log_line("04/Dec/2025:10:00:00 +0000", "/a")).unwrap();
        writeln!(temp_file, "{}", log_line("04/Dec/2025:10:00:01 +0000", "/b")).unwrap();
        temp_file.flush().unwrap();

        let mut cursor = LogCursor::open(temp_file.path()).unwrap();

        let first = cursor.next_matching(&any_time()).unwrap().unwrap();
        assert_eq!(first.target, "/a");
        assert_eq!(first.line_number, 1);

        let second = cursor.next_matching(&any_time()).unwrap().unwrap();
        assert_eq!(second.target, "/b");
        assert_eq!(second.line_number, 2);

        assert!(cursor.next_matching(&any_time()).unwrap().is_none());
        assert!(cursor.is_exhausted());
        // stays exhausted
        assert!(cursor.next_matching(&any_time()).unwrap().is_none());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "INVALID LINE").unwrap();
        writeln!(temp_file).unwrap();
        writeln!(temp_file, "{}", log_line("04/Dec/2025:10:00:00 +0000", "/ok")).unwrap();
        temp_file.flush().unwrap();

        let mut cursor = LogCursor::open(temp_file.path()).unwrap();
        let record = cursor.next_matching(&any_time()).unwrap().unwrap();

        assert_eq!(record.target, "/ok");
        assert_eq!(record.line_number, 3);
        assert_eq!(cursor.stats().malformed, 2);
    }

    #[test]
    fn test_window_filters_records() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "{}", log_line("04/Dec/2025:11:59:59 +0000", "/early")).unwrap();
        writeln!(temp_file, "{}", log_line("04/Dec/2025:12:00:00 +0000", "/noon")).unwrap();
        writeln!(temp_file, "{}", log_line("04/Dec/2025:12:01:01 +0000", "/late")).unwrap();
        writeln!(temp_file, "{}", log_line("05/Dec/2025:12:00:30 +0000", "/next-day")).unwrap();
        temp_file.flush().unwrap();

        let window = ReplayWindow::new(4, 43_200, 60);
        let mut cursor = LogCursor::open(temp_file.path()).unwrap();

        let record = cursor.next_matching(&window).unwrap().unwrap();
        assert_eq!(record.target, "/noon");
        assert!(cursor.next_matching(&window).unwrap().is_none());

        let stats = cursor.stats();
        assert_eq!(stats.lines_read, 4);
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.outside_window, 3);
    }

    #[test]
    fn test_empty_file_is_exhausted() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut cursor = LogCursor::open(temp_file.path()).unwrap();

        assert!(cursor.next_matching(&any_time()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_utf8_does_not_stop_reading() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(
                b"192.0.2.1 - - [04/Dec/2025:10:00:00 +0000] \"GET /a HTTP/1.1\" 200 512 \"-\" \"bad\xff\xfeagent\"\n",
            )
            .unwrap();
        temp_file.write_all(b"\xff\xff\xff\n").unwrap();
        writeln!(temp_file, "{}", log_line("04/Dec/2025:10:00:01 +0000", "/b")).unwrap();
        temp_file.flush().unwrap();

        let mut cursor = LogCursor::open(temp_file.path()).unwrap();

        let first = cursor.next_matching(&any_time()).unwrap().unwrap();
        assert_eq!(first.target, "/a");
        assert_eq!(
            first.user_agent.as_deref(),
            Some("bad\u{FFFD}\u{FFFD}agent")
        );

        let second = cursor.next_matching(&any_time()).unwrap().unwrap();
        assert_eq!(second.target, "/b");
        assert_eq!(second.line_number, 3);
        assert_eq!(cursor.stats().malformed, 1);
    }

    #[test]
    fn test_read_error_is_reported() {
        let reader = std::io::Cursor::new(b"not a log line\n".to_vec()).chain(FailingReader);
        let mut cursor = LogCursor::from_reader("broken.log", BufReader::new(reader));

        assert!(matches!(
            cursor.next_matching(&any_time()),
            Err(SourceError::Io(_))
        ));
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            "{}\r\n",
            log_line("04/Dec/2025:10:00:00 +0000", "/windows")
        )
        .unwrap();
        temp_file.flush().unwrap();

        let mut cursor = LogCursor::open(temp_file.path()).unwrap();
        let record = cursor.next_matching(&any_time()).unwrap().unwrap();
        assert_eq!(record.user_agent.as_deref(), Some("test-agent"));
    }
}

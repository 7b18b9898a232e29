//! Replay sources for recorded sensor data
//!
//! ## Supported Formats
//!
//! 1. **Text**: one reading per line, either `value` or `tick,value`.
//!    Blank lines and `#` comments are skipped. Works for files and for a
//!    sensor daemon piping readings into stdin.
//! 2. **Raw**: a dump of accelerometer output registers, two bytes per
//!    reading (low byte first, two's complement), as read over I2C.
//!
//! ```text
//! # tick,value
//! 0,16
//! 1,-24
//! 2,-6010
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use super::{decode_word_2c, SampleStream, SourceError};

/// Statistics for replay sources
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceStats {
    /// Samples produced
    pub samples_read: usize,
    /// Lines (or register pairs) consumed
    pub records_processed: usize,
    /// Records that could not be parsed
    pub parse_errors: usize,
}

/// Text source, one reading per line
pub struct LineSource<R> {
    reader: R,
    line: String,
    skip_lines: usize,
    lines_skipped: usize,
    stats: SourceStats,
}

impl<R: BufRead> LineSource<R> {
    /// Wrap any buffered reader (file, stdin lock, in-memory cursor)
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::with_capacity(32),
            skip_lines: 0,
            lines_skipped: 0,
            stats: SourceStats::default(),
        }
    }

    /// Skip first N lines (for headers without a `#`)
    pub fn with_skip_lines(mut self, lines: usize) -> Self {
        self.skip_lines = lines;
        self
    }

    /// Get statistics
    pub fn stats(&self) -> &SourceStats {
        &self.stats
    }

    fn parse_line(line: &str) -> Result<i32, SourceError<io::Error>> {
        // `tick,value` keeps the last field; plain lines are the value
        let field = line.rsplit(',').next().unwrap_or(line).trim();
        if let Ok(value) = field.parse::<i32>() {
            return Ok(value);
        }

        // Decimal readings are rounded; anything outside i32 is a bad record
        let value = field
            .parse::<f64>()
            .map_err(|_| SourceError::Format("Invalid sample value"))?
            .round();
        if value.is_finite() && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
            Ok(value as i32)
        } else {
            Err(SourceError::Format("Sample value out of range"))
        }
    }
}

impl LineSource<BufReader<File>> {
    /// Open a text recording
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError<io::Error>> {
        let file = File::open(path).map_err(SourceError::Transport)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> SampleStream for LineSource<R> {
    type Error = SourceError<io::Error>;

    fn poll_sample(&mut self) -> nb::Result<i32, Self::Error> {
        loop {
            self.line.clear();
            let read = match self.reader.read_line(&mut self.line) {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Err(nb::Error::WouldBlock)
                }
                Err(e) => return Err(nb::Error::Other(SourceError::Transport(e))),
            };

            if read == 0 {
                return Err(nb::Error::Other(SourceError::EndOfData));
            }

            self.stats.records_processed += 1;

            if self.lines_skipped < self.skip_lines {
                self.lines_skipped += 1;
                continue;
            }

            let trimmed = self.line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            return match Self::parse_line(trimmed) {
                Ok(value) => {
                    self.stats.samples_read += 1;
                    Ok(value)
                }
                Err(e) => {
                    self.stats.parse_errors += 1;
                    Err(nb::Error::Other(e))
                }
            };
        }
    }
}

/// Raw register-dump source, two bytes per reading
pub struct RawSource<R> {
    reader: R,
    stats: SourceStats,
}

impl<R: Read> RawSource<R> {
    /// Wrap any reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            stats: SourceStats::default(),
        }
    }

    /// Get statistics
    pub fn stats(&self) -> &SourceStats {
        &self.stats
    }
}

impl RawSource<BufReader<File>> {
    /// Open a register dump
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError<io::Error>> {
        let file = File::open(path).map_err(SourceError::Transport)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> SampleStream for RawSource<R> {
    type Error = SourceError<io::Error>;

    fn poll_sample(&mut self) -> nb::Result<i32, Self::Error> {
        let mut pair = [0u8; 2];
        match self.reader.read_exact(&mut pair) {
            Ok(()) => {
                self.stats.records_processed += 1;
                self.stats.samples_read += 1;
                Ok(i32::from(decode_word_2c(pair[0], pair[1])))
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(nb::Error::Other(SourceError::EndOfData))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(nb::Error::WouldBlock),
            Err(e) => Err(nb::Error::Other(SourceError::Transport(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{NeutralOnError, SampleSource};
    use std::io::{Cursor, Write};

    #[test]
    fn text_lines_and_csv() {
        let data = "# recorded on the belt clip\n12\n\n3,-2500\n-7.6\n";
        let mut source = LineSource::new(Cursor::new(data));

        assert_eq!(source.poll_sample().ok(), Some(12));
        assert_eq!(source.poll_sample().ok(), Some(-2500));
        assert_eq!(source.poll_sample().ok(), Some(-8));
        assert!(matches!(
            source.poll_sample(),
            Err(nb::Error::Other(SourceError::EndOfData))
        ));
        assert_eq!(source.stats().samples_read, 3);
    }

    #[test]
    fn header_skipped() {
        let data = "tick,value\n0,5\n";
        let mut source = LineSource::new(Cursor::new(data)).with_skip_lines(1);
        assert_eq!(source.poll_sample().ok(), Some(5));
    }

    #[test]
    fn garbage_line_is_neutral() {
        let data = "100\nnot-a-number\n200\n";
        let mut source = NeutralOnError::new(LineSource::new(Cursor::new(data)));

        assert_eq!(source.read_sample(), 100);
        assert_eq!(source.read_sample(), 0);
        assert_eq!(source.read_sample(), 200);
        assert_eq!(source.substitutions(), 1);
        assert_eq!(source.inner().stats().parse_errors, 1);
    }

    #[test]
    fn out_of_range_values_are_parse_errors() {
        let data = "1e12\nNaN\ninf\n-3e9\n2147483647\n";
        let mut source = LineSource::new(Cursor::new(data));

        for _ in 0..4 {
            assert!(matches!(
                source.poll_sample(),
                Err(nb::Error::Other(SourceError::Format(_)))
            ));
        }
        assert_eq!(source.poll_sample().ok(), Some(i32::MAX));
        assert_eq!(source.stats().parse_errors, 4);
        assert_eq!(source.stats().samples_read, 1);
    }

    #[test]
    fn raw_register_pairs() {
        // -2000, 1, then a dangling byte
        let bytes = [0x30, 0xF8, 0x01, 0x00, 0x7F];
        let mut source = RawSource::new(Cursor::new(bytes));

        assert_eq!(source.poll_sample().ok(), Some(-2000));
        assert_eq!(source.poll_sample().ok(), Some(1));
        assert!(matches!(
            source.poll_sample(),
            Err(nb::Error::Other(SourceError::EndOfData))
        ));
    }

    #[test]
    fn from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0\n-6000").unwrap();

        let mut source = LineSource::from_path(file.path()).unwrap();
        assert_eq!(source.poll_sample().ok(), Some(0));
        assert_eq!(source.poll_sample().ok(), Some(-6000));
    }

    #[test]
    fn missing_file_is_transport_error() {
        let result = LineSource::from_path("/nonexistent/vigil/recording.txt");
        assert!(matches!(result, Err(SourceError::Transport(_))));
    }
}

//! Line-delimited JSON with transparent gzip
//!
//! Every non-blank line is one record. A line that fails to decode is
//! reported as [`SourceError::Decode`] and reading continues; an I/O error
//! (truncated or corrupt compressed stream) ends the stream.

use flate2::read::MultiGzDecoder;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::marker::PhantomData;
use std::path::Path;
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Errors from a record source
#[derive(Debug, Error)]
pub enum SourceError {
    /// One malformed line. Skippable.
    #[error("line {line}: {message}")]
    Decode { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SourceError {
    /// True when the stream cannot continue past this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Open a file for line reading, decompressing when it starts with the
/// gzip magic bytes.
pub fn open_lines(path: impl AsRef<Path>) -> io::Result<Box<dyn BufRead + Send>> {
    let mut file = BufReader::new(File::open(path)?);
    let is_gzip = file.fill_buf()?.starts_with(&GZIP_MAGIC);
    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(file))
    }
}

/// Iterator of decoded records over a line-oriented reader.
pub struct JsonLines<R, T> {
    reader: R,
    line: usize,
    read: usize,
    limit: Option<usize>,
    buf: Vec<u8>,
    done: bool,
    _record: PhantomData<fn() -> T>,
}

impl<R: BufRead, T: DeserializeOwned> JsonLines<R, T> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            read: 0,
            limit: None,
            buf: Vec::new(),
            done: false,
            _record: PhantomData,
        }
    }

    /// Stop after this many non-blank lines, decodable or not.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Physical line number of the last line read
    pub fn line(&self) -> usize {
        self.line
    }
}

/// Records read from a file opened with [`open_lines`]
pub type FileLines<T> = JsonLines<Box<dyn BufRead + Send>, T>;

impl<T: DeserializeOwned> FileLines<T> {
    /// Open a possibly-compressed file of records.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(open_lines(path)?))
    }
}

impl<R: BufRead, T: DeserializeOwned> Iterator for JsonLines<R, T> {
    type Item = Result<T, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done || self.limit.is_some_and(|limit| self.read >= limit) {
                return None;
            }

            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(SourceError::Io(e)));
                }
            }
            self.line += 1;

            let trimmed = self.buf.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }
            self.read += 1;

            return Some(serde_json::from_slice(trimmed).map_err(|e| SourceError::Decode {
                line: self.line,
                message: e.to_string(),
            }));
        }
    }
}

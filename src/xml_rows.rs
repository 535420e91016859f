//! Streaming `<row .../>` reader over dump XML, plain or zstd-compressed.
//!
//! The reader is a pull parser over a buffered byte stream: memory stays bounded by
//! one row plus the read buffer regardless of file size. Rows whose markup cannot be
//! parsed are logged, counted, and skipped. A read failure (including a truncated or
//! corrupt zstd frame) is yielded as an error and ends the stream.

use crate::schema::RawRecord;
use crate::util::open_with_backoff;
use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use thiserror::Error;
use zstd::stream::read::Decoder;

/// Element name of one record in the dump.
const ROW_TAG: &[u8] = b"row";

#[derive(Debug, Error)]
pub enum RowError {
    #[error("malformed row near byte {position}: {source}")]
    Malformed {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("read failed near byte {position}: {source}")]
    Io {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// The parser failed twice at the same offset and cannot move past it.
    #[error("parser made no progress past byte {position}")]
    Stalled { position: u64 },
}

/// A `Read` wrapper that counts bytes pulled from the file (compressed bytes for `.zst`).
struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Forward-only iterator of raw row records. Restart by reopening the file.
///
/// Yields `Err` only for failures that end the stream; malformed rows are skipped
/// and show up in [`RowStream::rows_skipped`].
pub struct RowStream<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    label: String,
    counter: Arc<AtomicU64>,
    rows_read: u64,
    rows_skipped: u64,
    last_failure_at: Option<u64>,
    done: bool,
}

/// Open a dump file for row streaming. Paths ending in `.zst` are decompressed on the fly.
pub fn open_rows(path: &Path, read_buf_bytes: usize) -> Result<RowStream<Box<dyn BufRead>>> {
    let file = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let counter = Arc::new(AtomicU64::new(0));
    let counted = CountingReader { inner: file, counter: counter.clone() };
    let cap = read_buf_bytes.max(8 * 1024);

    let is_zst = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("zst"));
    let inner: Box<dyn BufRead> = if is_zst {
        let mut decoder = Decoder::new(counted).with_context(|| format!("zstd init {}", path.display()))?;
        decoder.window_log_max(31)?;
        Box::new(BufReader::with_capacity(cap, decoder))
    } else {
        Box::new(BufReader::with_capacity(cap, counted))
    };

    Ok(RowStream::with_counter(inner, path.display().to_string(), counter))
}

impl<R: BufRead> RowStream<R> {
    /// Stream rows from any buffered reader (in-memory dumps, tests).
    pub fn from_reader(inner: R, label: impl Into<String>) -> Self {
        Self::with_counter(inner, label.into(), Arc::new(AtomicU64::new(0)))
    }

    fn with_counter(inner: R, label: String, counter: Arc<AtomicU64>) -> Self {
        Self {
            reader: Reader::from_reader(inner),
            buf: Vec::with_capacity(16 * 1024),
            label,
            counter,
            rows_read: 0,
            rows_skipped: 0,
            last_failure_at: None,
            done: false,
        }
    }

    /// Rows successfully yielded so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Rows dropped as malformed so far.
    pub fn rows_skipped(&self) -> u64 {
        self.rows_skipped
    }

    /// Bytes consumed from the underlying file (0 for `from_reader` streams).
    pub fn bytes_read(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

fn row_attributes(e: &BytesStart<'_>) -> Result<RawRecord, quick_xml::Error> {
    let mut rec = RawRecord::default();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        rec.insert(key, value);
    }
    Ok(rec)
}

impl<R: BufRead> Iterator for RowStream<R> {
    type Item = Result<RawRecord, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            let parsed = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == ROW_TAG => {
                    row_attributes(&e)
                }
                Ok(Event::Eof) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => continue,
                Err(source @ quick_xml::Error::Io(_)) => {
                    self.done = true;
                    let position = self.reader.buffer_position() as u64;
                    return Some(Err(RowError::Io { position, source }));
                }
                Err(e) => Err(e),
            };
            match parsed {
                Ok(rec) => {
                    self.rows_read += 1;
                    return Some(Ok(rec));
                }
                Err(source) => {
                    let position = self.reader.buffer_position() as u64;
                    if self.last_failure_at == Some(position) {
                        self.done = true;
                        return Some(Err(RowError::Stalled { position }));
                    }
                    self.last_failure_at = Some(position);
                    self.rows_skipped += 1;
                    let err = RowError::Malformed { position, source };
                    tracing::warn!(file = %self.label, error = %err, "skipping malformed row");
                }
            }
        }
        None
    }
}

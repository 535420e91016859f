use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .try_init();
    });
}

// -------- robust open with backoff (Windows-friendly) --------

/// Transient open failures worth retrying (sharing/lock violations, device not ready).
fn is_retriable_io_error(e: &io::Error) -> bool {
    // 5 access denied (AV/share), 32 sharing violation, 33 lock violation,
    // 21 device not ready, 1006 volume externally altered, 1117 device I/O error.
    matches!(e.raw_os_error(), Some(5 | 21 | 32 | 33 | 1006 | 1117))
}

fn with_backoff(tries: usize, delay_ms: u64, what: &str, mut op: impl FnMut() -> io::Result<File>) -> io::Result<File> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match op() {
            Ok(f) => return Ok(f),
            Err(e) if is_retriable_io_error(&e) => {
                tracing::debug!(attempt = i + 1, error = %e, "{what} failed; retrying");
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, format!("{what} failed"))))
}

/// Open a file for reading with retries/backoff for transient errors.
pub fn open_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    with_backoff(tries, delay_ms, "open", || File::open(path))
}

/// Open a file for appending (creating it if needed) with retries/backoff.
pub fn append_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    with_backoff(tries, delay_ms, "open for append", || {
        OpenOptions::new().create(true).append(true).open(path)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn append_creates_then_extends() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("out.txt");
        append_with_backoff(&p, 2, 1).unwrap().write_all(b"a").unwrap();
        append_with_backoff(&p, 2, 1).unwrap().write_all(b"b").unwrap();
        let mut s = String::new();
        open_with_backoff(&p, 2, 1).unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "ab");
    }

    #[test]
    fn missing_file_is_not_retried_forever() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_with_backoff(&dir.path().join("missing"), 3, 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}

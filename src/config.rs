use std::path::{Path, PathBuf};

/// What to do with a row that fails to decode for data reasons (missing or unconvertible field).
/// Schema defects always abort.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BadRecordPolicy {
    /// Drop the row, count it, keep going.
    #[default]
    Skip,
    /// Fail the run on the first bad row.
    Abort,
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    pub data_dir: PathBuf,             // extracted dump: Posts.xml, Comments.xml (or .xml.zst)
    pub out_dir: PathBuf,
    pub output_name: String,           // corpus file inside out_dir, appended to
    pub set_name: String,              // meta.set_name on every corpus line
    pub bad_records: BadRecordPolicy,
    pub parallelism: Option<usize>,    // Some(N) for a dedicated flatten pool, None for rayon default
    pub progress: bool,
    pub progress_label: Option<String>,

    // IO tuning
    pub read_buffer_bytes: usize,
    pub write_buffer_bytes: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            out_dir: PathBuf::from("./corpus"),
            output_name: "text.jsonl".to_string(),
            set_name: "stack_exchange".to_string(),
            bad_records: BadRecordPolicy::Skip,
            parallelism: None,
            progress: true,
            progress_label: None,
            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl ConvertOptions {
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_out_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.out_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }
    pub fn with_set_name(mut self, name: impl Into<String>) -> Self {
        self.set_name = name.into();
        self
    }
    pub fn with_bad_records(mut self, policy: BadRecordPolicy) -> Self {
        self.bad_records = policy;
        self
    }
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }

    /// Full path of the corpus file.
    pub fn output_path(&self) -> PathBuf {
        self.out_dir.join(&self.output_name)
    }
}

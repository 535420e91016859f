mod config;
mod date;
mod paths;
mod progress;
mod util;
mod pipeline;
mod report;

mod xml_rows;
mod schema;
mod model;
mod assemble;
mod text;
mod flatten;
mod ndjson;

pub use crate::config::{BadRecordPolicy, ConvertOptions};
pub use crate::pipeline::{DumpConverter, LoadedDump};
pub use crate::report::{save_reports, RunReport, StreamStats};
pub use crate::paths::{locate_dump, DumpFiles};

// Row streaming and the schema-driven decoder (extension point for new record types).
pub use crate::xml_rows::{open_rows, RowError, RowStream};
pub use crate::schema::{
    decode, decode_record, BoxError, ConvertFn, DecodeError, DecodedRow, FieldDefault, FieldSpec,
    FieldType, FieldValue, RawRecord, Record, RecordSchema,
};
pub use crate::date::parse_iso8601;

// Domain records: decoded and linked forms.
pub use crate::model::{Comment, LinkedAnswer, LinkedQuestion, Post, PostKind};

// Relational assembly and flattening.
pub use crate::assemble::{assemble, group_comments, Assembly, AssemblyStats};
pub use crate::flatten::{flatten, FlatDocument};
pub use crate::text::{fix_encoding, strip_markup};

// Corpus output.
pub use crate::ndjson::{CorpusMeta, CorpusRecord, NdjsonWriter};

pub use crate::util::init_tracing_once;

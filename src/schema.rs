//! Declarative record schemas and the single generic decode routine that interprets them.
//!
//! A record type is described by a static [`RecordSchema`]: an ordered table of
//! [`FieldSpec`]s (rename, default, custom converter, declared type). [`decode`]
//! walks that table over one [`RawRecord`] and yields a [`DecodedRow`]; the
//! [`Record`] trait turns a row into the typed struct. Adding a record type means
//! adding a table and a `from_row`, never touching the parser.

use crate::date::parse_iso8601;
use ahash::AHashMap;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;
use time::PrimitiveDateTime;

/// One `<row>` as read from the dump: attribute name -> unescaped value.
pub type RawRecord = AHashMap<String, String>;

/// Error type custom converters report.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Custom attribute converter.
pub type ConvertFn = fn(&str) -> Result<FieldValue, BoxError>;

/// Decoded value of one field.
#[derive(Clone, Debug)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    Timestamp(PrimitiveDateTime),
    /// Output of a custom converter; read back with [`DecodedRow::custom`].
    Custom(Arc<dyn Any + Send + Sync>),
    Absent,
}

impl FieldValue {
    pub fn custom<T: Any + Send + Sync>(v: T) -> Self {
        Self::Custom(Arc::new(v))
    }
}

/// Declared Rust-side type of a field. The first three have primitive decoding rules;
/// anything else must come with a custom converter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Text,
    Timestamp,
    Other(&'static str),
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Text => "text",
            FieldType::Timestamp => "timestamp",
            FieldType::Other(n) => n,
        }
    }
}

/// Value used when the attribute is absent.
#[derive(Clone, Debug)]
pub enum FieldDefault {
    Value(FieldValue),
    Factory(fn() -> FieldValue),
}

impl FieldDefault {
    fn produce(&self) -> FieldValue {
        match self {
            FieldDefault::Value(v) => v.clone(),
            FieldDefault::Factory(f) => f(),
        }
    }
}

/// Per-field decoding directive.
#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub source_key: Option<&'static str>,
    pub ty: FieldType,
    /// Declared type admits absence (`Option<_>` on the record).
    pub optional: bool,
    pub default: Option<FieldDefault>,
    pub convert: Option<ConvertFn>,
}

impl FieldSpec {
    pub fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, source_key: None, ty, optional: false, default: None, convert: None }
    }
    pub fn int(name: &'static str) -> Self { Self::new(name, FieldType::Integer) }
    pub fn text(name: &'static str) -> Self { Self::new(name, FieldType::Text) }
    pub fn timestamp(name: &'static str) -> Self { Self::new(name, FieldType::Timestamp) }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
    pub fn from_key(mut self, key: &'static str) -> Self {
        self.source_key = Some(key);
        self
    }
    pub fn convert_with(mut self, f: ConvertFn) -> Self {
        self.convert = Some(f);
        self
    }
    pub fn with_default(mut self, v: FieldValue) -> Self {
        self.default = Some(FieldDefault::Value(v));
        self
    }
    pub fn with_default_factory(mut self, f: fn() -> FieldValue) -> Self {
        self.default = Some(FieldDefault::Factory(f));
        self
    }

    /// Attribute name looked up in the raw record.
    #[inline]
    pub fn key(&self) -> &'static str {
        self.source_key.unwrap_or(self.name)
    }

    /// Absence is an error only without a default and without an optional declared type.
    #[inline]
    pub fn required(&self) -> bool {
        self.default.is_none() && !self.optional
    }
}

/// Ordered field table for one record type.
#[derive(Clone, Debug)]
pub struct RecordSchema {
    pub record: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new(record: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self { record, fields }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("missing required field `{field}` (attribute `{key}`)")]
    MissingField { field: &'static str, key: &'static str },

    #[error("cannot convert field `{field}` from {value:?}: {source}")]
    Conversion {
        field: &'static str,
        value: String,
        #[source]
        source: BoxError,
    },

    #[error("no decoding rule for field `{field}` of declared type `{declared}`")]
    UnsupportedType { field: &'static str, declared: &'static str },
}

impl DecodeError {
    /// Schema defects recur on every row; the run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DecodeError::UnsupportedType { .. })
    }

    pub fn field(&self) -> &'static str {
        match self {
            DecodeError::MissingField { field, .. }
            | DecodeError::Conversion { field, .. }
            | DecodeError::UnsupportedType { field, .. } => field,
        }
    }
}

/// Field values of one successfully decoded row, in schema order.
#[derive(Debug)]
pub struct DecodedRow {
    values: Vec<(&'static str, FieldType, FieldValue)>,
}

impl DecodedRow {
    fn take(&mut self, field: &'static str) -> Result<(FieldType, FieldValue), DecodeError> {
        let slot = self
            .values
            .iter_mut()
            .find(|(name, _, _)| *name == field)
            .ok_or(DecodeError::UnsupportedType { field, declared: "<undeclared>" })?;
        Ok((slot.1, std::mem::replace(&mut slot.2, FieldValue::Absent)))
    }

    pub fn opt_int(&mut self, field: &'static str) -> Result<Option<i64>, DecodeError> {
        match self.take(field)? {
            (_, FieldValue::Int(n)) => Ok(Some(n)),
            (_, FieldValue::Absent) => Ok(None),
            (ty, _) => Err(DecodeError::UnsupportedType { field, declared: ty.name() }),
        }
    }

    pub fn int(&mut self, field: &'static str) -> Result<i64, DecodeError> {
        self.opt_int(field)?.ok_or(DecodeError::MissingField { field, key: field })
    }

    pub fn opt_text(&mut self, field: &'static str) -> Result<Option<String>, DecodeError> {
        match self.take(field)? {
            (_, FieldValue::Text(s)) => Ok(Some(s)),
            (_, FieldValue::Absent) => Ok(None),
            (ty, _) => Err(DecodeError::UnsupportedType { field, declared: ty.name() }),
        }
    }

    pub fn text(&mut self, field: &'static str) -> Result<String, DecodeError> {
        self.opt_text(field)?.ok_or(DecodeError::MissingField { field, key: field })
    }

    pub fn opt_timestamp(&mut self, field: &'static str) -> Result<Option<PrimitiveDateTime>, DecodeError> {
        match self.take(field)? {
            (_, FieldValue::Timestamp(t)) => Ok(Some(t)),
            (_, FieldValue::Absent) => Ok(None),
            (ty, _) => Err(DecodeError::UnsupportedType { field, declared: ty.name() }),
        }
    }

    pub fn timestamp(&mut self, field: &'static str) -> Result<PrimitiveDateTime, DecodeError> {
        self.opt_timestamp(field)?.ok_or(DecodeError::MissingField { field, key: field })
    }

    /// Value produced by a custom converter, downcast to `T`.
    pub fn custom<T: Any + Send + Sync + Clone>(&mut self, field: &'static str) -> Result<T, DecodeError> {
        match self.take(field)? {
            (ty, FieldValue::Custom(v)) => v
                .downcast_ref::<T>()
                .cloned()
                .ok_or(DecodeError::UnsupportedType { field, declared: ty.name() }),
            (_, FieldValue::Absent) => Err(DecodeError::MissingField { field, key: field }),
            (ty, _) => Err(DecodeError::UnsupportedType { field, declared: ty.name() }),
        }
    }
}

/// Decode one raw record under `schema`. Either every field decodes or nothing is returned.
pub fn decode(schema: &RecordSchema, raw: &RawRecord) -> Result<DecodedRow, DecodeError> {
    let mut values = Vec::with_capacity(schema.fields.len());
    for spec in &schema.fields {
        let v = decode_field(spec, raw.get(spec.key()).map(String::as_str))?;
        values.push((spec.name, spec.ty, v));
    }
    Ok(DecodedRow { values })
}

fn decode_field(spec: &FieldSpec, raw: Option<&str>) -> Result<FieldValue, DecodeError> {
    let Some(s) = raw else {
        if let Some(d) = &spec.default {
            return Ok(d.produce());
        }
        if spec.optional {
            return Ok(FieldValue::Absent);
        }
        return Err(DecodeError::MissingField { field: spec.name, key: spec.key() });
    };

    let conversion = |source: BoxError| DecodeError::Conversion {
        field: spec.name,
        value: s.to_string(),
        source,
    };

    if let Some(f) = spec.convert {
        return f(s).map_err(conversion);
    }

    match spec.ty {
        FieldType::Integer => s
            .trim()
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|e| conversion(e.into())),
        FieldType::Text => Ok(FieldValue::Text(s.to_string())),
        FieldType::Timestamp => parse_iso8601(s)
            .map(FieldValue::Timestamp)
            .map_err(|e| conversion(e.into())),
        FieldType::Other(declared) => Err(DecodeError::UnsupportedType { field: spec.name, declared }),
    }
}

/// A typed record with a static schema.
pub trait Record: Sized {
    fn schema() -> &'static RecordSchema;
    fn from_row(row: DecodedRow) -> Result<Self, DecodeError>;
}

/// Decode a raw record straight into `R`.
pub fn decode_record<R: Record>(raw: &RawRecord) -> Result<R, DecodeError> {
    let row = decode(R::schema(), raw)?;
    R::from_row(row)
}

#[path = "common/mod.rs"]
mod common;

use common::*;
use std::sync::OnceLock;
use sxcorpus::{
    decode_record, open_rows, BadRecordPolicy, BoxError, DecodeError, DecodedRow, DumpConverter, FieldSpec,
    FieldType, FieldValue, Record, RecordSchema,
};

/// A record type defined outside the crate: a user row with a rename, a default,
/// and a custom converter. No parser changes are needed.
#[derive(Debug, Clone, PartialEq)]
struct User {
    id: i64,
    name: String,
    reputation: i64,
    website: Option<String>,
    badges: Vec<String>,
}

fn split_badges(s: &str) -> Result<FieldValue, BoxError> {
    Ok(FieldValue::custom(s.split('|').filter(|b| !b.is_empty()).map(str::to_string).collect::<Vec<_>>()))
}

impl Record for User {
    fn schema() -> &'static RecordSchema {
        static SCHEMA: OnceLock<RecordSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            RecordSchema::new(
                "User",
                vec![
                    FieldSpec::int("Id"),
                    FieldSpec::text("Name").from_key("DisplayName"),
                    FieldSpec::int("Reputation").with_default(FieldValue::Int(1)),
                    FieldSpec::text("WebsiteUrl").optional(),
                    FieldSpec::new("Badges", FieldType::Other("Vec<String>"))
                        .convert_with(split_badges)
                        .with_default_factory(|| FieldValue::custom(Vec::<String>::new())),
                ],
            )
        })
    }

    fn from_row(mut row: DecodedRow) -> Result<Self, DecodeError> {
        Ok(Self {
            id: row.int("Id")?,
            name: row.text("Name")?,
            reputation: row.int("Reputation")?,
            website: row.opt_text("WebsiteUrl")?,
            badges: row.custom::<Vec<String>>("Badges")?,
        })
    }
}

#[test]
fn new_record_type_decodes_from_a_dump_file() {
    let base = tempfile::tempdir().unwrap().into_path();
    let path = base.join("Users.xml");
    write_table(
        &path,
        "users",
        &[
            row(&[("Id", "1"), ("DisplayName", "Ada"), ("Reputation", "101"), ("Badges", "gold|silver")]),
            row(&[("Id", "2"), ("DisplayName", "Bob"), ("WebsiteUrl", "https://example.org")]),
            row(&[("Id", "x"), ("DisplayName", "Bad")]),
        ],
    );

    let mut users = Vec::new();
    let mut errors = Vec::new();
    for raw in open_rows(&path, 8 * 1024).unwrap() {
        match decode_record::<User>(&raw.unwrap()) {
            Ok(u) => users.push(u),
            Err(e) => errors.push(e),
        }
    }

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].name, "Ada");
    assert_eq!(users[0].badges, vec!["gold", "silver"]);
    assert_eq!(users[1].reputation, 1);
    assert!(users[1].badges.is_empty());
    assert_eq!(users[1].website.as_deref(), Some("https://example.org"));

    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], DecodeError::Conversion { field: "Id", .. }));
}

#[derive(Debug)]
struct Broken;

impl Record for Broken {
    fn schema() -> &'static RecordSchema {
        static SCHEMA: OnceLock<RecordSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| RecordSchema::new("Broken", vec![FieldSpec::new("Geo", FieldType::Other("Point"))]))
    }

    fn from_row(_: DecodedRow) -> Result<Self, DecodeError> {
        Ok(Broken)
    }
}

#[test]
fn schema_without_a_decoding_rule_is_fatal() {
    let raw = [("Geo".to_string(), "1,2".to_string())].into_iter().collect();
    let err = decode_record::<Broken>(&raw).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.to_string(), "no decoding rule for field `Geo` of declared type `Point`");
}

#[test]
fn schema_defect_stops_the_run_even_when_skipping_bad_rows() {
    let base = tempfile::tempdir().unwrap().into_path();
    let path = base.join("Places.xml");
    write_table(&path, "places", &[row(&[("Geo", "1,2")]), row(&[("Geo", "3,4")])]);

    let conv = DumpConverter::new().progress(false);
    assert_eq!(BadRecordPolicy::default(), BadRecordPolicy::Skip);
    let err = conv.decode_file::<Broken>(&path).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("schema cannot decode"), "{msg}");
    assert!(msg.contains("no decoding rule for field `Geo`"), "{msg}");
}

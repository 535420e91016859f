//! Dump record types, their schema tables, and the linked (assembled) forms.

use crate::schema::{BoxError, DecodeError, DecodedRow, FieldSpec, FieldType, FieldValue, Record, RecordSchema};
use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;
use time::PrimitiveDateTime;

/// `PostTypeId` values used by the public data dump.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PostKind {
    Question,
    Answer,
    OrphanedTagWiki,
    TagWikiExcerpt,
    TagWiki,
    ModeratorNomination,
    WikiPlaceholder,
    PrivilegeWiki,
}

impl PostKind {
    pub fn from_type_id(id: i64) -> Option<Self> {
        Some(match id {
            1 => PostKind::Question,
            2 => PostKind::Answer,
            3 => PostKind::OrphanedTagWiki,
            4 => PostKind::TagWikiExcerpt,
            5 => PostKind::TagWiki,
            6 => PostKind::ModeratorNomination,
            7 => PostKind::WikiPlaceholder,
            8 => PostKind::PrivilegeWiki,
            _ => return None,
        })
    }
}

#[derive(Debug, Error)]
#[error("unknown PostTypeId {0}")]
struct UnknownPostKind(i64);

fn post_kind_from_attr(s: &str) -> Result<FieldValue, BoxError> {
    let id: i64 = s.trim().parse()?;
    let kind = PostKind::from_type_id(id).ok_or(UnknownPostKind(id))?;
    Ok(FieldValue::custom(kind))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub score: i64,
    pub text: String,
    pub creation_date: PrimitiveDateTime,
    pub user_id: Option<i64>,
}

impl Record for Comment {
    fn schema() -> &'static RecordSchema {
        static SCHEMA: OnceLock<RecordSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            RecordSchema::new(
                "Comment",
                vec![
                    FieldSpec::int("Id"),
                    FieldSpec::int("PostId"),
                    FieldSpec::int("Score"),
                    FieldSpec::text("Text"),
                    FieldSpec::timestamp("CreationDate"),
                    FieldSpec::int("UserId").optional(),
                ],
            )
        })
    }

    fn from_row(mut row: DecodedRow) -> Result<Self, DecodeError> {
        Ok(Self {
            id: row.int("Id")?,
            post_id: row.int("PostId")?,
            score: row.int("Score")?,
            text: row.text("Text")?,
            creation_date: row.timestamp("CreationDate")?,
            user_id: row.opt_int("UserId")?,
        })
    }
}

/// A post as decoded from `Posts.xml`, before any relation is attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    pub creation_date: PrimitiveDateTime,
    pub deletion_date: Option<PrimitiveDateTime>,
    pub score: i64,
    pub body: String,
    pub title: Option<String>,
    pub owner_user_id: Option<i64>,
    pub view_count: Option<i64>,
    pub accepted_answer_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub kind: PostKind,
    pub tags: String,
}

impl Record for Post {
    fn schema() -> &'static RecordSchema {
        static SCHEMA: OnceLock<RecordSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            RecordSchema::new(
                "Post",
                vec![
                    FieldSpec::int("Id"),
                    FieldSpec::timestamp("CreationDate"),
                    FieldSpec::timestamp("DeletionDate").optional(),
                    FieldSpec::int("Score"),
                    FieldSpec::text("Body"),
                    FieldSpec::text("Title").optional(),
                    FieldSpec::int("OwnerUserId").optional(),
                    FieldSpec::int("ViewCount").optional(),
                    FieldSpec::int("AcceptedAnswerId").optional(),
                    FieldSpec::int("ParentId").optional(),
                    FieldSpec::new("PostType", FieldType::Other("PostKind"))
                        .from_key("PostTypeId")
                        .convert_with(post_kind_from_attr),
                    FieldSpec::text("Tags").with_default(FieldValue::Text(String::new())),
                ],
            )
        })
    }

    fn from_row(mut row: DecodedRow) -> Result<Self, DecodeError> {
        Ok(Self {
            id: row.int("Id")?,
            creation_date: row.timestamp("CreationDate")?,
            deletion_date: row.opt_timestamp("DeletionDate")?,
            score: row.int("Score")?,
            body: row.text("Body")?,
            title: row.opt_text("Title")?,
            owner_user_id: row.opt_int("OwnerUserId")?,
            view_count: row.opt_int("ViewCount")?,
            accepted_answer_id: row.opt_int("AcceptedAnswerId")?,
            parent_id: row.opt_int("ParentId")?,
            kind: row.custom::<PostKind>("PostType")?,
            tags: row.text("Tags")?,
        })
    }
}

/// An answer with its comments attached, highest score first.
#[derive(Clone, Debug)]
pub struct LinkedAnswer {
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// A question with its comments and answers attached, highest score first.
#[derive(Clone, Debug)]
pub struct LinkedQuestion {
    pub post: Post,
    pub comments: Vec<Comment>,
    pub answers: Vec<LinkedAnswer>,
}

impl LinkedQuestion {
    pub fn id(&self) -> i64 {
        self.post.id
    }
}

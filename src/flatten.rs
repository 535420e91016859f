//! Render one assembled question thread as a single flat text document.

use crate::model::LinkedQuestion;
use crate::text::{fix_encoding, strip_markup};

/// Separator placed before every comment and answer.
const ITEM_SEP: &str = " - ";

/// One flattened question thread plus the metadata carried into the corpus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatDocument {
    pub text: String,
    pub score: i64,
    pub question_id: i64,
    pub was_answered: bool,
}

/// Concatenate title, question body, question comments (raw), and answer bodies,
/// each list in its assembled order, then repair the encoding of the whole text.
pub fn flatten(question: &LinkedQuestion) -> FlatDocument {
    let post = &question.post;
    let mut text = String::new();

    if let Some(title) = post.title.as_deref().filter(|t| !t.is_empty()) {
        text.push_str("# ");
        text.push_str(title);
    }

    text.push('\n');
    text.push_str(strip_markup(&post.body).trim());

    for comment in &question.comments {
        text.push_str(ITEM_SEP);
        text.push_str(&comment.text);
    }

    for answer in &question.answers {
        text.push_str(ITEM_SEP);
        text.push_str(strip_markup(&answer.post.body).trim());
    }

    FlatDocument {
        text: fix_encoding(&text),
        score: post.score,
        question_id: post.id,
        was_answered: !question.answers.is_empty(),
    }
}

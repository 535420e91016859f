//! Two-stage relational join: comments under their post, answers under their question.
//!
//! Both inputs are materialized before grouping; this is the one stage that holds a
//! whole dump in memory, because the distribution of owner ids is unknown up front.
//! Everything else streams.

use crate::model::{Comment, LinkedAnswer, LinkedQuestion, Post, PostKind};
use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Relation bookkeeping for one assembly. Orphans are dropped, never raised.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    pub comments_in: u64,
    /// Comments whose post exists (including posts later ignored or orphaned).
    pub comments_attached: u64,
    pub orphan_comments: u64,
    /// Comments attached to wiki/moderation posts, which produce no output.
    pub comments_on_ignored_posts: u64,
    pub questions: u64,
    pub answers_in: u64,
    pub answers_attached: u64,
    pub orphan_answers: u64,
    /// Posts of kinds other than Question/Answer, by kind.
    pub ignored_posts: BTreeMap<PostKind, u64>,
    /// Rows whose id repeated an earlier row of the same stream.
    pub duplicate_comment_ids: u64,
    pub duplicate_post_ids: u64,
}

/// Assembled questions keyed by id, plus what was dropped along the way.
#[derive(Debug, Default)]
pub struct Assembly {
    pub questions: BTreeMap<i64, LinkedQuestion>,
    pub stats: AssemblyStats,
}

/// Keep the first position of each id and the last record seen for it.
fn dedup_by_id<T>(items: impl IntoIterator<Item = T>, id: impl Fn(&T) -> i64, dups: &mut u64) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    let mut pos: AHashMap<i64, usize> = AHashMap::new();
    for item in items {
        match pos.get(&id(&item)) {
            Some(&i) => {
                out[i] = item;
                *dups += 1;
            }
            None => {
                pos.insert(id(&item), out.len());
                out.push(item);
            }
        }
    }
    out
}

/// Partition by key, keeping input order inside each partition, then stable-sort each
/// partition by descending score.
fn group_ranked<T>(
    items: impl IntoIterator<Item = T>,
    key: impl Fn(&T) -> i64,
    score: impl Fn(&T) -> i64,
) -> AHashMap<i64, Vec<T>> {
    let mut groups: AHashMap<i64, Vec<T>> = AHashMap::new();
    for item in items {
        groups.entry(key(&item)).or_default().push(item);
    }
    for v in groups.values_mut() {
        v.sort_by_key(|x| Reverse(score(x)));
    }
    groups
}

/// Group comments by owning post, each group ordered by descending score (stable).
pub fn group_comments(comments: impl IntoIterator<Item = Comment>) -> AHashMap<i64, Vec<Comment>> {
    group_ranked(comments, |c| c.post_id, |c| c.score)
}

/// Join decoded comments and posts into linked questions.
pub fn assemble(
    comments: impl IntoIterator<Item = Comment>,
    posts: impl IntoIterator<Item = Post>,
) -> Assembly {
    let mut stats = AssemblyStats::default();

    let comments = dedup_by_id(comments, |c| c.id, &mut stats.duplicate_comment_ids);
    let posts = dedup_by_id(posts, |p| p.id, &mut stats.duplicate_post_ids);
    stats.comments_in = comments.len() as u64;

    let known_posts: AHashSet<i64> = posts.iter().map(|p| p.id).collect();
    let mut by_post = group_comments(comments);

    for (post_id, group) in &by_post {
        let n = group.len() as u64;
        if known_posts.contains(post_id) {
            stats.comments_attached += n;
        } else {
            stats.orphan_comments += n;
        }
    }

    let mut questions: BTreeMap<i64, LinkedQuestion> = BTreeMap::new();
    let mut answers: Vec<LinkedAnswer> = Vec::new();
    for post in posts {
        let comments = by_post.remove(&post.id).unwrap_or_default();
        match post.kind {
            PostKind::Question => {
                questions.insert(post.id, LinkedQuestion { post, comments, answers: Vec::new() });
            }
            PostKind::Answer => answers.push(LinkedAnswer { post, comments }),
            other => {
                stats.comments_on_ignored_posts += comments.len() as u64;
                *stats.ignored_posts.entry(other).or_insert(0) += 1;
            }
        }
    }
    stats.questions = questions.len() as u64;
    stats.answers_in = answers.len() as u64;

    let (answers, parentless): (Vec<_>, Vec<_>) = answers.into_iter().partition(|a| a.post.parent_id.is_some());
    stats.orphan_answers += parentless.len() as u64;

    let by_question = group_ranked(answers, |a| a.post.parent_id.unwrap_or_default(), |a| a.post.score);
    for (parent_id, group) in by_question {
        match questions.get_mut(&parent_id) {
            Some(q) => {
                stats.answers_attached += group.len() as u64;
                q.answers = group;
            }
            None => {
                tracing::debug!(parent_id, count = group.len(), "dropping orphaned answers");
                stats.orphan_answers += group.len() as u64;
            }
        }
    }

    tracing::info!(
        questions = stats.questions,
        answers = stats.answers_attached,
        orphan_answers = stats.orphan_answers,
        orphan_comments = stats.orphan_comments,
        "assembled questions"
    );

    Assembly { questions, stats }
}

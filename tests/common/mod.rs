#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Escape a value for use inside a double-quoted XML attribute.
pub fn attr_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\n', "&#xA;")
}

/// Render one `<row .../>` line from attribute pairs.
pub fn row(attrs: &[(&str, &str)]) -> String {
    let mut s = String::from("  <row");
    for (k, v) in attrs {
        s.push_str(&format!(" {k}=\"{}\"", attr_escape(v)));
    }
    s.push_str(" />");
    s
}

/// Write a dump table file (`<posts>` / `<comments>` root) with the given rows.
pub fn write_table(path: &Path, root: &str, rows: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    writeln!(f, "<?xml version=\"1.0\" encoding=\"utf-8\"?>").unwrap();
    writeln!(f, "<{root}>").unwrap();
    for r in rows {
        writeln!(f, "{r}").unwrap();
    }
    writeln!(f, "</{root}>").unwrap();
}

/// Same as `write_table` but zstd-compressed, as `<name>.xml.zst`.
pub fn write_table_zst(path: &Path, root: &str, rows: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    writeln!(enc, "<{root}>").unwrap();
    for r in rows {
        writeln!(enc, "{r}").unwrap();
    }
    writeln!(enc, "</{root}>").unwrap();
    enc.finish().unwrap();
}

pub fn question(id: &str, score: &str, title: &str, body: &str) -> String {
    row(&[
        ("Id", id),
        ("PostTypeId", "1"),
        ("CreationDate", "2009-09-28T00:00:00.000"),
        ("Score", score),
        ("ViewCount", "10"),
        ("Body", body),
        ("Title", title),
        ("Tags", "<ag.algebraic-geometry>"),
    ])
}

pub fn answer(id: &str, parent: &str, score: &str, body: &str) -> String {
    row(&[
        ("Id", id),
        ("PostTypeId", "2"),
        ("ParentId", parent),
        ("CreationDate", "2009-09-28T01:00:00.000"),
        ("Score", score),
        ("Body", body),
    ])
}

pub fn comment(id: &str, post: &str, score: &str, text: &str) -> String {
    row(&[
        ("Id", id),
        ("PostId", post),
        ("Score", score),
        ("Text", text),
        ("CreationDate", "2009-09-28T02:00:00.000"),
        ("UserId", "3"),
    ])
}

/// Tiny site dump:
/// - Q1 "T" (score 5) with answers A2 (score 3) and A3 (score 7), comment C1 "nice" on Q1,
///   comment C2 on A2.
/// - Q4 "Unanswered" (score 0) with no relations.
/// - TagWiki post 5 with one comment C3 (ignored kind).
/// - Orphans: comment C4 on post 999, answer A6 whose parent 998 does not exist.
pub fn make_dump_basic() -> PathBuf {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.into_path();

    let posts = vec![
        question("1", "5", "T", "<p>B1</p>"),
        answer("2", "1", "3", "<p>B2</p>"),
        answer("3", "1", "7", "<p>B3 &amp; more</p>"),
        question("4", "0", "Unanswered", "<p>Nobody knows.</p>"),
        row(&[
            ("Id", "5"),
            ("PostTypeId", "5"),
            ("CreationDate", "2009-09-28T00:00:00.000"),
            ("Score", "0"),
            ("Body", "<p>wiki</p>"),
        ]),
        answer("6", "998", "1", "<p>lost</p>"),
    ];
    write_table(&base.join("Posts.xml"), "posts", &posts);

    let comments = vec![
        comment("1", "1", "1", "nice"),
        comment("2", "2", "0", "on an answer"),
        comment("3", "5", "0", "on the wiki"),
        comment("4", "999", "2", "nobody home"),
    ];
    write_table(&base.join("Comments.xml"), "comments", &comments);

    base
}

/// Read corpus JSONL into values (skips empty lines).
pub fn read_jsonl_values(path: &Path) -> Vec<serde_json::Value> {
    let f = File::open(path).unwrap();
    BufReader::new(f)
        .lines()
        .map(|l| l.unwrap())
        .filter(|s| !s.is_empty())
        .map(|s| serde_json::from_str(&s).unwrap())
        .collect()
}

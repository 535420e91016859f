use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Which dump table a file holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpKind {
    Posts,    // Posts.xml[.zst]
    Comments, // Comments.xml[.zst]
}

impl DumpKind {
    pub fn stem(self) -> &'static str {
        match self {
            DumpKind::Posts => "posts",
            DumpKind::Comments => "comments",
        }
    }
}

/// Located input files of one extracted site dump.
#[derive(Clone, Debug)]
pub struct DumpFiles {
    pub posts: PathBuf,
    pub comments: PathBuf,
}

/// Plain XML wins over a compressed copy when both are present.
fn rank(name: &str, kind: DumpKind) -> Option<u8> {
    let lower = name.to_ascii_lowercase();
    let stem = kind.stem();
    if lower == format!("{stem}.xml") {
        Some(0)
    } else if lower == format!("{stem}.xml.zst") {
        Some(1)
    } else {
        None
    }
}

fn find_one(dir: &Path, kind: DumpKind) -> Option<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let r = rank(e.file_name().to_str()?, kind)?;
            Some((r, e.into_path()))
        })
        .min()
        .map(|(_, p)| p)
}

/// Find `Posts.xml` and `Comments.xml` (case-insensitive, optionally `.zst`) in `data_dir`.
pub fn locate_dump(data_dir: &Path) -> Result<DumpFiles> {
    if !data_dir.is_dir() {
        bail!("data dir {} does not exist or is not a directory", data_dir.display());
    }
    let posts = find_one(data_dir, DumpKind::Posts);
    let comments = find_one(data_dir, DumpKind::Comments);
    match (posts, comments) {
        (Some(posts), Some(comments)) => Ok(DumpFiles { posts, comments }),
        (None, _) => bail!("no Posts.xml[.zst] in {}", data_dir.display()),
        (_, None) => bail!("no Comments.xml[.zst] in {}", data_dir.display()),
    }
}

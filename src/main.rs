use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use sxcorpus::{init_tracing_once, save_reports, BadRecordPolicy, DumpConverter};

/// Convert extracted Stack Exchange dumps (Posts.xml + Comments.xml) into a JSONL text corpus.
#[derive(Parser, Debug)]
#[command(name = "sxcorpus", version, about)]
struct Args {
    /// Extracted dump directory; repeat to append several sites to one corpus.
    #[arg(long = "data-dir", required = true)]
    data_dirs: Vec<PathBuf>,

    /// Directory receiving the corpus file.
    #[arg(long)]
    out_dir: PathBuf,

    /// Corpus file name inside --out-dir (appended to if it exists).
    #[arg(long, default_value = "text.jsonl")]
    output_name: String,

    /// `meta.set_name` written on every line.
    #[arg(long, default_value = "stack_exchange")]
    set_name: String,

    /// Fail on the first row with a missing or unconvertible field instead of skipping it.
    #[arg(long)]
    abort_on_bad_record: bool,

    /// Worker threads for flattening (default: all cores).
    #[arg(long)]
    threads: Option<usize>,

    #[arg(long)]
    no_progress: bool,

    /// Write the run reports here as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing_once();

    let policy = if args.abort_on_bad_record { BadRecordPolicy::Abort } else { BadRecordPolicy::Skip };
    let mut base = DumpConverter::new()
        .out_dir(&args.out_dir)
        .output_name(&args.output_name)
        .set_name(&args.set_name)
        .bad_records(policy)
        .progress(!args.no_progress);
    if let Some(n) = args.threads {
        base = base.parallelism(n);
    }

    let mut reports = Vec::with_capacity(args.data_dirs.len());
    for dir in &args.data_dirs {
        tracing::info!(data_dir = %dir.display(), "converting dump");
        let report = base
            .clone()
            .data_dir(dir)
            .progress_label(dir.display().to_string())
            .run()?;
        reports.push(report);
    }

    if let Some(path) = &args.report {
        save_reports(&reports, path)?;
    }

    let docs: u64 = reports.iter().map(|r| r.documents_written).sum();
    println!("Wrote {} documents to {}", docs, args.out_dir.join(&args.output_name).display());
    Ok(())
}

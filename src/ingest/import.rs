use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use crossbeam::channel::bounded;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info};

use crate::database::repo::{ItemId, ItemRepository};
use crate::ingest::upload::Submission;

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub added: Vec<ItemId>,
    /// Manifest position and reason for every entry that was not stored.
    pub failed: Vec<(usize, String)>,
}

/// Read a JSON array of submissions. Relative image paths are taken relative
/// to the manifest's own directory.
pub fn load_manifest(path: &Path) -> Result<Vec<Submission>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {:?}", path))?;
    let mut submissions: Vec<Submission> =
        serde_json::from_str(&raw).with_context(|| format!("Invalid manifest {:?}", path))?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for submission in &mut submissions {
        if let Some(image) = &submission.image {
            if image.is_relative() {
                submission.image = Some(base.join(image));
            }
        }
    }
    Ok(submissions)
}

pub fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    let style = ProgressStyle::with_template("{bar:40} {pos}/{len} items {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// Store every submission, fanning the work out to `workers` threads that
/// share one repository.
pub fn run_import(
    repo: &ItemRepository,
    image_dir: &Path,
    submissions: Vec<Submission>,
    workers: usize,
    progress: &ProgressBar,
) -> ImportSummary {
    let workers = workers.max(1);
    let (job_tx, job_rx) = bounded::<(usize, Submission)>(256);
    let (done_tx, done_rx) = bounded::<(usize, std::result::Result<ItemId, String>)>(256);

    let feeder = thread::spawn(move || {
        for job in submissions.into_iter().enumerate() {
            if job_tx.send(job).is_err() {
                break;
            }
        }
    });

    let mut handles = Vec::with_capacity(workers);
    for i in 0..workers {
        let rx = job_rx.clone();
        let tx = done_tx.clone();
        let repo = repo.clone();
        let image_dir: PathBuf = image_dir.to_path_buf();

        handles.push(thread::spawn(move || {
            for (index, submission) in rx {
                let outcome = submission
                    .submit(&repo, &image_dir)
                    .map_err(|e| e.to_string());
                if tx.send((index, outcome)).is_err() {
                    break;
                }
            }
            debug!("Import worker {} finished", i);
        }));
    }
    // Receivers close once every worker has dropped its sender
    drop(job_rx);
    drop(done_tx);

    let mut summary = ImportSummary::default();
    for (index, outcome) in done_rx {
        match outcome {
            Ok(id) => summary.added.push(id),
            Err(reason) => {
                error!("Manifest entry {} was not stored: {}", index, reason);
                summary.failed.push((index, reason));
            }
        }
        progress.inc(1);
    }

    if feeder.join().is_err() {
        error!("Manifest feeder panicked");
    }
    for h in handles {
        if h.join().is_err() {
            error!("Import worker panicked");
        }
    }

    summary.added.sort_unstable();
    summary.failed.sort_by_key(|(index, _)| *index);
    progress.finish_with_message("done");
    info!(
        "Imported {} items ({} failed)",
        summary.added.len(),
        summary.failed.len()
    );
    summary
}

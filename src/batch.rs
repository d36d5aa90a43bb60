use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::novel::shell::Shell;
use crate::workflow::{self, NotReady, Outcome, RunOptions};

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub rendered: Vec<PathBuf>,
    pub pending: Vec<NotReady>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn print(&self) {
        println!(
            "{} rendered, {} waiting for a rewrite, {} failed.",
            self.rendered.len(),
            self.pending.len(),
            self.failed.len(),
        );
        for not_ready in &self.pending {
            println!("  pending: {not_ready}");
        }
        for (path, reason) in &self.failed {
            println!("  failed:  {}: {reason}", path.display());
        }
    }
}

/// Convert every `main_*.xlsx` in `dir`. A failing workbook is recorded and
/// the rest still run.
pub fn run_batch(dir: &Path, settings: &Settings, shell: &Shell, direct: bool) -> Result<BatchSummary> {
    let workbooks = workflow::find_workbooks(dir)?;
    let mut summary = BatchSummary::default();
    if workbooks.is_empty() {
        warn!(dir = %dir.display(), "no main_*.xlsx workbooks found");
        return Ok(summary);
    }

    let opts = RunOptions {
        direct,
        generic_fallback: false,
        create_placeholder: !direct,
    };

    let pb = ProgressBar::new(workbooks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    for workbook in &workbooks {
        pb.set_message(workflow::Artifacts::new(workbook, &settings.output_dir).title);
        match workflow::convert_workbook(workbook, settings, shell, opts) {
            Ok(Outcome::Rendered(html)) => summary.rendered.push(html),
            Ok(Outcome::NotReady(not_ready)) => {
                info!(waiting_on = %not_ready.path().display(), "not ready");
                summary.pending.push(not_ready);
            }
            Err(e) => {
                error!(workbook = %workbook.display(), "{e:#}");
                summary.failed.push((workbook.clone(), format!("{e:#}")));
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(summary)
}

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::config::Settings;
use crate::novel::{self, shell::Shell};
use crate::script::{self, extractor::ExtractStats};
use crate::workbook;

static DISPLAY_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^main_\d+_(.+)$").unwrap());

const TRANSCRIPT_PREFIX: &str = "ai_input_";
const REWRITE_PREFIX: &str = "novel_output_";
const GENERIC_REWRITE: &str = "novel_output.txt";
const WORKBOOK_PREFIX: &str = "main_";
const WORKBOOK_EXT: &str = "xlsx";

/// Where each artifact of one workbook lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub stem: String,
    pub title: String,
    pub transcript: PathBuf,
    pub rewrite: PathBuf,
    pub generic_rewrite: PathBuf,
    pub html: PathBuf,
}

impl Artifacts {
    pub fn new(workbook: &Path, output_dir: &Path) -> Self {
        let stem = workbook
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Artifacts {
            title: display_title(&stem),
            transcript: output_dir.join(format!("{TRANSCRIPT_PREFIX}{stem}.txt")),
            rewrite: output_dir.join(format!("{REWRITE_PREFIX}{stem}.txt")),
            generic_rewrite: output_dir.join(GENERIC_REWRITE),
            html: output_dir.join(format!("{stem}.html")),
            stem,
        }
    }
}

/// `main_0_暗黒時代・上` → `暗黒時代・上`; other names are used as they are.
pub fn display_title(stem: &str) -> String {
    DISPLAY_TITLE_RE
        .captures(stem)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| stem.to_string())
}

/// Workbook stem behind a transcript or rewrite file name.
pub fn text_file_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.strip_prefix(REWRITE_PREFIX)
        .or_else(|| stem.strip_prefix(TRANSCRIPT_PREFIX))
        .map(str::to_string)
        .unwrap_or(stem)
}

/// Title for a transcript given directly on the command line.
pub fn title_from_text_file(path: &Path) -> String {
    display_title(&text_file_stem(path))
}

/// An artifact the next step needs hasn't been produced yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReady {
    Missing {
        path: PathBuf,
        /// The transcript to rewrite into `path`, when there is one.
        from: Option<PathBuf>,
    },
    Empty {
        path: PathBuf,
    },
}

impl NotReady {
    pub fn path(&self) -> &Path {
        match self {
            NotReady::Missing { path, .. } | NotReady::Empty { path } => path,
        }
    }
}

impl fmt::Display for NotReady {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReady::Missing {
                path,
                from: Some(from),
            } => write!(
                f,
                "{} not found: rewrite {} and save the result there, then run again",
                path.display(),
                from.display()
            ),
            NotReady::Missing { path, from: None } => write!(f, "{} not found", path.display()),
            NotReady::Empty { path } => write!(
                f,
                "{} is empty: paste the rewritten text into it, then run again",
                path.display()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rendered(PathBuf),
    NotReady(NotReady),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Render the extracted transcript itself, skipping the rewrite.
    pub direct: bool,
    /// Fall back to `novel_output.txt` when the per-workbook rewrite is absent.
    pub generic_fallback: bool,
    /// Create an empty rewrite file for the operator to paste into.
    pub create_placeholder: bool,
}

/// Extract a workbook's transcript and write it to `out`.
pub fn extract_to_file(workbook: &Path, out: &Path, settings: &Settings) -> Result<ExtractStats> {
    let sheets = workbook::read_workbook(workbook)?;
    let (text, stats) = script::build_transcript(&sheets, &settings.nickname, settings.branch_display);
    write_artifact(out, &text)?;
    info!(
        workbook = %workbook.display(),
        transcript = %out.display(),
        decisions = stats.decisions,
        chars = text.chars().count(),
        "extracted transcript"
    );
    Ok(stats)
}

/// Render a transcript file (extracted or rewritten) into a document.
pub fn render_file(input: &Path, html: &Path, title: &str, shell: &Shell) -> Result<Outcome> {
    let text = match read_ready(input, None)? {
        Ok(text) => text,
        Err(not_ready) => return Ok(Outcome::NotReady(not_ready)),
    };
    let document = novel::render_document(&text, title, shell);
    write_artifact(html, &document)?;
    info!(input = %input.display(), html = %html.display(), "rendered document");
    Ok(Outcome::Rendered(html.to_path_buf()))
}

/// One workbook through the whole hand-off: extract the transcript unless it
/// already exists, then render either the transcript (`direct`) or its
/// rewrite once that has been supplied.
pub fn convert_workbook(
    workbook: &Path,
    settings: &Settings,
    shell: &Shell,
    opts: RunOptions,
) -> Result<Outcome> {
    let artifacts = Artifacts::new(workbook, &settings.output_dir);
    debug!(
        stem = %artifacts.stem,
        transcript = %artifacts.transcript.display(),
        rewrite = %artifacts.rewrite.display(),
        "artifact paths"
    );

    if artifacts.transcript.exists() {
        info!(transcript = %artifacts.transcript.display(), "transcript exists, skipping extraction");
        if opts.direct {
            return match read_ready(&artifacts.transcript, None)? {
                Ok(text) => render_text(&text, &artifacts, shell),
                Err(not_ready) => Ok(Outcome::NotReady(not_ready)),
            };
        }
    } else {
        extract_to_file(workbook, &artifacts.transcript, settings)
            .with_context(|| format!("extracting {}", workbook.display()))?;
        if opts.direct {
            return render_file(&artifacts.transcript, &artifacts.html, &artifacts.title, shell);
        }
    }

    if opts.create_placeholder && !artifacts.rewrite.exists() {
        write_artifact(&artifacts.rewrite, "")?;
        info!(rewrite = %artifacts.rewrite.display(), "created empty rewrite file");
    }

    let rewrite = if !artifacts.rewrite.exists()
        && opts.generic_fallback
        && artifacts.generic_rewrite.exists()
    {
        &artifacts.generic_rewrite
    } else {
        &artifacts.rewrite
    };

    match read_ready(rewrite, Some(&artifacts.transcript))? {
        Ok(text) => render_text(&text, &artifacts, shell),
        Err(not_ready) => Ok(Outcome::NotReady(not_ready)),
    }
}

fn render_text(text: &str, artifacts: &Artifacts, shell: &Shell) -> Result<Outcome> {
    let document = novel::render_document(text, &artifacts.title, shell);
    write_artifact(&artifacts.html, &document)?;
    info!(html = %artifacts.html.display(), "rendered document");
    Ok(Outcome::Rendered(artifacts.html.clone()))
}

/// Read an artifact the next step depends on. Missing and blank files are
/// "not ready" rather than errors.
fn read_ready(path: &Path, from: Option<&Path>) -> Result<std::result::Result<String, NotReady>> {
    match fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(Err(NotReady::Empty {
            path: path.to_path_buf(),
        })),
        Ok(text) => Ok(Ok(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Err(NotReady::Missing {
            path: path.to_path_buf(),
            from: from.map(Path::to_path_buf),
        })),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

/// `main_*.xlsx` workbooks directly inside `dir`, sorted by name.
pub fn find_workbooks(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let is_workbook = path.is_file()
            && path.extension().is_some_and(|e| e == WORKBOOK_EXT)
            && path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with(WORKBOOK_PREFIX));
        if is_workbook {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

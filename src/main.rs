mod batch;
mod config;
mod error;
mod novel;
mod script;
mod workbook;
mod workflow;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::bail;
use clap::{Parser, Subcommand};

use crate::config::{Overrides, Settings};
use crate::novel::shell::Shell;
use crate::workflow::{Outcome, RunOptions};

#[derive(Parser)]
#[command(name = "sheet2novel", about = "Branching scenario workbooks to vertical-novel HTML")]
struct Cli {
    /// Settings file (default: ./sheet2novel.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Name substituted for {@nickname}
    #[arg(long, global = true)]
    nickname: Option<String>,
    /// Directory for transcripts, rewrites and documents
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the transcript of a workbook
    Extract {
        workbook: PathBuf,
        /// Output file (default: <output_dir>/ai_input_<stem>.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render a transcript or rewrite into a document
    Render {
        input: PathBuf,
        /// Output file (default: <output_dir>/<stem>.html)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Document title (default: derived from the file name)
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Extract, then render once the rewrite is in place
    Convert {
        /// Workbook (default: first main_*.xlsx in the current directory)
        workbook: Option<PathBuf>,
        /// Render the transcript itself, skipping the rewrite
        #[arg(long)]
        direct: bool,
    },
    /// Convert every main_*.xlsx in a directory
    Batch {
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Render the transcripts themselves, skipping the rewrites
        #[arg(long)]
        direct: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let overrides = Overrides {
        nickname: cli.nickname,
        output_dir: cli.output_dir,
    };
    let settings = Settings::load(cli.config.as_deref(), &overrides)?;

    let result = match cli.command {
        Commands::Extract { workbook, output } => {
            let out = output.unwrap_or_else(|| workflow::Artifacts::new(&workbook, &settings.output_dir).transcript);
            let stats = workflow::extract_to_file(&workbook, &out, &settings)?;
            println!(
                "Wrote {} ({} sheets, {} rows, {} skipped, {} decisions).",
                out.display(),
                stats.sheets,
                stats.rows,
                stats.skipped,
                stats.decisions,
            );
            Ok(())
        }
        Commands::Render { input, output, title } => {
            let shell = load_shell(&settings)?;
            let title = title.unwrap_or_else(|| workflow::title_from_text_file(&input));
            let out = output.unwrap_or_else(|| default_html(&input, &settings.output_dir));
            report(workflow::render_file(&input, &out, &title, &shell)?)
        }
        Commands::Convert { workbook, direct } => {
            let shell = load_shell(&settings)?;
            let workbook = match workbook {
                Some(path) => path,
                None => first_workbook(Path::new("."))?,
            };
            let opts = RunOptions {
                direct,
                generic_fallback: true,
                create_placeholder: false,
            };
            report(workflow::convert_workbook(&workbook, &settings, &shell, opts)?)
        }
        Commands::Batch { dir, direct } => {
            let shell = load_shell(&settings)?;
            let summary = batch::run_batch(&dir, &settings, &shell, direct)?;
            summary.print();
            if summary.failed.is_empty() {
                Ok(())
            } else {
                Err(anyhow::anyhow!("{} workbook(s) failed", summary.failed.len()))
            }
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_shell(settings: &Settings) -> anyhow::Result<Shell> {
    match &settings.template {
        Some(path) => Ok(Shell::load(path)?),
        None => Ok(Shell::builtin()),
    }
}

fn first_workbook(dir: &Path) -> anyhow::Result<PathBuf> {
    let found = workflow::find_workbooks(dir)?;
    match found.into_iter().next() {
        Some(path) => Ok(path),
        None => bail!("no main_*.xlsx workbook in {}", dir.display()),
    }
}

fn default_html(input: &Path, output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}.html", workflow::text_file_stem(input)))
}

/// "Not ready" is a normal stop, not a failure.
fn report(outcome: Outcome) -> anyhow::Result<()> {
    match outcome {
        Outcome::Rendered(html) => {
            let html = html.canonicalize().unwrap_or(html);
            println!("Wrote {}", html.display());
        }
        Outcome::NotReady(not_ready) => println!("{not_ready}"),
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn html_name_follows_workbook_stem() {
        assert_eq!(
            default_html(Path::new("output/novel_output_main_0_a.txt"), Path::new("output")),
            PathBuf::from("output/main_0_a.html")
        );
        assert_eq!(
            default_html(Path::new("draft.txt"), Path::new("out")),
            PathBuf::from("out/draft.html")
        );
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(std::time::Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(std::time::Duration::from_secs(75)), "1m 15s");
    }
}

use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_FILE: &str = "sheet2novel";
const ENV_PREFIX: &str = "SHEET2NOVEL";

/// How decision blocks show up in the transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchDisplay {
    /// Choice lists and branch markers are both written inline.
    #[default]
    Inline,
    /// The choice list is left out; branch markers are still written.
    Suppress,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub nickname: String,
    pub branch_display: BranchDisplay,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub template: Option<PathBuf>,
}

/// Values given on the command line; they win over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub nickname: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl Settings {
    /// Defaults, then `sheet2novel.toml` (or `file`), then `SHEET2NOVEL_*`
    /// environment variables, then CLI overrides.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };

        let settings = Config::builder()
            .set_default("nickname", "ドクター")?
            .set_default("branch_display", "inline")?
            .set_default("output_dir", "output")?
            .add_source(file_source)
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .set_override_option("nickname", overrides.nickname.clone())?
            .set_override_option(
                "output_dir",
                overrides
                    .output_dir
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            )?
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let settings = Settings::load(None, &Overrides::default()).unwrap();
        assert_eq!(settings.nickname, "ドクター");
        assert_eq!(settings.branch_display, BranchDisplay::Inline);
        assert_eq!(settings.output_dir, PathBuf::from("output"));
        assert_eq!(settings.template, None);
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("none.toml");
        assert!(Settings::load(Some(&missing), &Overrides::default()).is_err());
    }

    #[test]
    fn file_and_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "nickname = \"テスター\"\nbranch_display = \"suppress\"\ntemplate = \"shell.html\""
        )
        .unwrap();

        let settings = Settings::load(Some(file.path()), &Overrides::default()).unwrap();
        assert_eq!(settings.nickname, "テスター");
        assert_eq!(settings.branch_display, BranchDisplay::Suppress);
        assert_eq!(settings.output_dir, PathBuf::from("output"));
        assert_eq!(settings.template, Some(PathBuf::from("shell.html")));

        let overrides = Overrides {
            nickname: Some("博士".into()),
            output_dir: Some(PathBuf::from("out")),
        };
        let settings = Settings::load(Some(file.path()), &overrides).unwrap();
        assert_eq!(settings.nickname, "博士");
        assert_eq!(settings.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn unknown_branch_display_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "branch_display = \"sideways\"").unwrap();
        assert!(Settings::load(Some(file.path()), &Overrides::default()).is_err());
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use super::render::escape;
use crate::error::{Error, Result};

const BUILTIN: &str = include_str!("../../templates/novel.html");
const TITLE: &str = "{title}";
const PAGES: &str = "{pages}";

/// The document every page fragment is placed into.
#[derive(Debug, Clone)]
pub struct Shell {
    source: String,
}

impl Shell {
    pub fn builtin() -> Self {
        Shell {
            source: BUILTIN.to_string(),
        }
    }

    /// Load a custom shell. It must carry both placeholders; a shell that
    /// doesn't is rejected before anything is rendered.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(source, path.to_path_buf())
    }

    fn parse(source: String, origin: PathBuf) -> Result<Self> {
        for placeholder in [TITLE, PAGES] {
            if !source.contains(placeholder) {
                return Err(Error::Template {
                    path: origin,
                    placeholder,
                });
            }
        }
        Ok(Shell { source })
    }

    /// Fill in the title and the pages. Text inside the pages is never
    /// scanned for placeholders.
    pub fn assemble(&self, title: &str, pages: &[String]) -> String {
        let title = escape(title);
        let (head, tail) = self
            .source
            .split_once(PAGES)
            .unwrap_or((self.source.as_str(), ""));
        let mut out = head.replace(TITLE, &title);
        out.push_str(&pages.join("\n\n"));
        out.push_str(&tail.replace(TITLE, &title));
        out
    }
}

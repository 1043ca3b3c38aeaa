//! Lecture materials for a lesson: PDF slides/readings plus an optional topic list.
//!
//! The PDF text is extracted with `pdf-extract` and embedded in the
//! first-draft prompt, one section per file.
//!
//! ```text
//! data/input/m001_l009/
//! ├── 01-intro.pdf
//! ├── 02-features.pdf
//! └── topics.txt      # at most one .txt file
//! ```

use anyhow::{Context, Result, anyhow, bail};
use glob::{MatchOptions, Pattern};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Placeholder for a PDF whose text layer cannot be read.
pub const UNREADABLE_PDF: &str = "(no extractable text in this file)";

#[derive(Debug, Clone)]
pub struct Materials {
    pub dir: PathBuf,
    /// PDF files sorted by file name
    pub pdfs: Vec<PathBuf>,
    /// The topic list, if the directory has one
    pub topics_file: Option<PathBuf>,
}

impl Materials {
    /// Scan `dir` for materials.
    ///
    /// Fails if the directory is missing, holds no PDF, or holds more than one
    /// `.txt` file (the topic list would be ambiguous).
    pub fn discover(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            bail!("Materials directory not found: {}", dir.display());
        }

        let pdfs = files_with_extension(dir, "pdf")?;
        if pdfs.is_empty() {
            bail!("No PDF materials found in {}", dir.display());
        }

        let mut texts = files_with_extension(dir, "txt")?;
        let topics_file = match texts.len() {
            0 => None,
            1 => texts.pop(),
            _ => {
                let names: Vec<String> = texts.iter().map(|p| file_name(p)).collect();
                bail!(
                    "Found {} .txt files in {} ({}); expected a single topic list",
                    texts.len(),
                    dir.display(),
                    names.join(", ")
                );
            }
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            pdfs,
            topics_file,
        })
    }

    /// Contents of the topic list, or `None` when there is none.
    pub fn topics(&self) -> Result<Option<String>> {
        self.topics_file
            .as_ref()
            .map(|path| {
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read topics file: {}", path.display()))
            })
            .transpose()
    }

    /// Text of every PDF, one section per file headed by its name.
    ///
    /// A file whose text cannot be extracted (scanned slides, a damaged
    /// file) is logged and represented by [`UNREADABLE_PDF`] so the rest of
    /// the lesson still reaches the model.
    pub fn contents(&self) -> String {
        self.pdfs
            .iter()
            .map(|path| {
                let name = file_name(path);
                let text = match extract_pdf_text(path) {
                    Ok(text) if !text.trim().is_empty() => {
                        debug!(file = %name, chars = text.len(), "Extracted PDF text");
                        text.trim().to_string()
                    }
                    Ok(_) => {
                        warn!(file = %name, "PDF has no text layer");
                        UNREADABLE_PDF.to_string()
                    }
                    Err(e) => {
                        warn!(file = %name, error = %e, "Failed to extract PDF text");
                        UNREADABLE_PDF.to_string()
                    }
                };
                format!("### {name}\n\n{text}")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// The PDF parser panics on some malformed inputs; that becomes an error here.
fn extract_pdf_text(path: &Path) -> Result<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text(path))) {
        Ok(result) => result.map_err(|e| anyhow!("{e}")),
        Err(_) => bail!("PDF parser aborted on {}", path.display()),
    }
}

fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(&dir.to_string_lossy()),
        ext
    );
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let mut files: Vec<PathBuf> = glob::glob_with(&pattern, options)
        .context("Failed to read glob pattern")?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

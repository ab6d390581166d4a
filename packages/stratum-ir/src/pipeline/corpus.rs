//! Corpus discovery
//!
//! Walks a directory tree collecting indexable sources. Language detection
//! is by file extension; files that fail to read become diagnostics at
//! build time rather than hard errors here.

use std::path::Path;
use walkdir::WalkDir;

use crate::features::ir_generation::application::FileInput;
use crate::shared::models::Result;

const INDEXABLE_EXTENSIONS: &[&str] = &[
    "py", "pyi", "ts", "tsx", "js", "jsx", "html", "htm", "jinja", "jinja2", "j2",
];

const SKIPPED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    "target",
    "dist",
    "build",
];

/// Collect indexable files under a root, paths relative to it.
pub fn discover_files(root: &Path) -> Result<Vec<FileInput>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.file_name()
                .to_str()
                .map(|name| !SKIPPED_DIRS.contains(&name))
                .unwrap_or(true)
        })
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!("walk error: {}", error);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let extension = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if !INDEXABLE_EXTENSIONS.contains(&extension) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        match std::fs::read_to_string(entry.path()) {
            Ok(source) => files.push(FileInput {
                path: relative,
                source,
            }),
            Err(error) => {
                tracing::warn!("unreadable file {}: {}", relative, error);
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

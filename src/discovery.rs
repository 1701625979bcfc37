//! Discovery Module
//!
//! File system access for hosts that convert a package directory on disk. The engine
//! itself only sees canonical URLs through [`DocumentSource`].

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::graph::DocumentSource;
use crate::url::PackageUrlHandler;

/// Documents read from a package directory. URLs are paths relative to `root`.
#[derive(Debug, Clone)]
pub struct PackageDirectory {
    pub root: PathBuf,
}

impl PackageDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DocumentSource for PackageDirectory {
    fn read(&self, url: &str) -> Option<String> {
        fs::read_to_string(self.root.join(url)).ok()
    }
}

fn to_url(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Every markup document of the package, sorted by URL. These make good roots when a
/// whole package is converted at once.
pub fn discover_documents(root: &Path, handler: &dyn PackageUrlHandler) -> Vec<String> {
    let mut urls = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).into_iter().flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "html") {
            continue;
        }
        if let Some(url) = to_url(root, path) {
            if handler.is_internal_to_package(&url) {
                urls.push(url);
            }
        }
    }

    urls.sort();
    tracing::debug!(root = %root.display(), documents = urls.len(), "discovered documents");
    urls
}

//! URL handling.
//!
//! Documents are identified by canonical, package-relative URLs with forward slashes
//! (`src/foo.html`, `bower_components/polymer/polymer.html`). Mapping legacy URLs onto
//! new package-manager paths is delegated to a [`PackageUrlHandler`].

use indexmap::IndexMap;

/// Capability supplied by the package/manifest layer.
pub trait PackageUrlHandler: Sync {
    /// Whether the document belongs to the package under conversion.
    fn is_internal_to_package(&self, url: &str) -> bool;

    /// Import specifier for `referenced`, as seen from `current`. `None` means no mapping
    /// exists for the referenced package.
    fn resolve_package_url(&self, current: &str, referenced: &str) -> Option<String>;
}

/// Handler for a package whose dependencies live under one directory.
#[derive(Debug, Clone)]
pub struct RelativeUrlHandler {
    pub dependency_dir: String,
    /// Legacy package name -> new package name (e.g. `polymer` -> `@polymer/polymer`)
    pub packages: IndexMap<String, String>,
}

impl Default for RelativeUrlHandler {
    fn default() -> Self {
        Self {
            dependency_dir: "bower_components/".to_string(),
            packages: IndexMap::new(),
        }
    }
}

impl RelativeUrlHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, legacy: &str, renamed: &str) -> Self {
        self.packages.insert(legacy.to_string(), renamed.to_string());
        self
    }
}

impl PackageUrlHandler for RelativeUrlHandler {
    fn is_internal_to_package(&self, url: &str) -> bool {
        !url.starts_with(&self.dependency_dir) && !is_absolute(url)
    }

    fn resolve_package_url(&self, current: &str, referenced: &str) -> Option<String> {
        let target = converted_path(referenced);
        if self.is_internal_to_package(referenced) {
            return Some(relative_specifier(current, &target));
        }
        let rest = target.strip_prefix(&self.dependency_dir)?;
        let (package, path) = rest.split_once('/')?;
        let renamed = self.packages.get(package)?;
        Some(format!("{}/{}", renamed, path))
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with('/') || url.contains("://")
}

/// Path a converted markup document is written to.
pub fn converted_path(url: &str) -> String {
    match url.strip_suffix(".html") {
        Some(stem) => format!("{}.js", stem),
        None => url.to_string(),
    }
}

fn directory_of(url: &str) -> &str {
    match url.rfind('/') {
        Some(i) => &url[..=i],
        None => "",
    }
}

/// Resolve `href` relative to the document at `base`, normalising `.` and `..`.
pub fn resolve_url(base: &str, href: &str) -> String {
    if is_absolute(href) {
        return href.to_string();
    }
    let href = href.split(['?', '#']).next().unwrap_or_default();
    let joined = format!("{}{}", directory_of(base), href);
    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// ES module specifier pointing from the document at `from` to the file at `to`.
pub fn relative_specifier(from: &str, to: &str) -> String {
    let from_dirs: Vec<&str> = directory_of(from)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let to_parts: Vec<&str> = to.split('/').collect();
    let (to_dirs, file) = to_parts.split_at(to_parts.len() - 1);

    let common = from_dirs
        .iter()
        .zip(to_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = String::new();
    let ups = from_dirs.len() - common;
    if ups == 0 {
        out.push_str("./");
    } else {
        for _ in 0..ups {
            out.push_str("../");
        }
    }
    for dir in &to_dirs[common..] {
        out.push_str(dir);
        out.push('/');
    }
    out.push_str(file[0]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        assert_eq!(resolve_url("src/a.html", "b.html"), "src/b.html");
        assert_eq!(resolve_url("src/a.html", "../lib/b.html"), "lib/b.html");
        assert_eq!(resolve_url("a.html", "./x/./y.html?v=1"), "x/y.html");
        assert_eq!(
            resolve_url("src/a.html", "../../b.html"),
            "../b.html",
            "escaping the package root is kept relative"
        );
    }

    #[test]
    fn test_relative_specifier() {
        assert_eq!(relative_specifier("a.html", "b.js"), "./b.js");
        assert_eq!(relative_specifier("src/a.html", "src/lib/b.js"), "./lib/b.js");
        assert_eq!(relative_specifier("src/x/a.html", "src/b.js"), "../b.js");
    }

    #[test]
    fn test_handler_maps_dependencies() {
        let handler = RelativeUrlHandler::new().with_package("polymer", "@polymer/polymer");
        assert!(!handler.is_internal_to_package("bower_components/polymer/polymer.html"));
        assert_eq!(
            handler
                .resolve_package_url("src/a.html", "bower_components/polymer/lib/mixin.html")
                .as_deref(),
            Some("@polymer/polymer/lib/mixin.js")
        );
        assert_eq!(
            handler.resolve_package_url("src/a.html", "bower_components/unknown/x.html"),
            None
        );
        assert_eq!(
            handler.resolve_package_url("src/a.html", "src/b.html").as_deref(),
            Some("./b.js")
        );
    }
}

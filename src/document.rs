//! # Documents
//!
//! A Document is one parsed unit of the legacy package, identified by its canonical URL.
//! It is created once during graph building and mutated in place by every later pass.
//!
//! ## Key Invariants
//!
//! 1. **Ordered Fragments**: script and markup fragments keep their source order; the
//!    synthesized module emits them in that same order.
//! 2. **Maintained Detection**: a markup document whose root element is `<html>` is a
//!    maintained document. Its markup is preserved verbatim.
//! 3. **Script Documents**: a `*.js` document has exactly one script fragment and no
//!    include edges.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    Markup,
    Script,
}

impl DocumentKind {
    pub fn from_url(url: &str) -> Self {
        if url.ends_with(".js") || url.ends_with(".mjs") {
            DocumentKind::Script
        } else {
            DocumentKind::Markup
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IncludeKind {
    /// `<link rel="import" href="...">`
    HtmlImport,
    /// `<script src="...">`
    Script,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Include {
    pub url: String,
    pub kind: IncludeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptFragment {
    pub source: String,
    pub is_module: bool,
}

/// A `<template>` owned by an element container (`<dom-module id="...">`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFragment {
    pub element_id: String,
    /// Inner HTML of the template
    pub content: String,
    /// Serialized container, used when no owning definition exists
    pub outer_html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Fragment {
    Script(ScriptFragment),
    /// `<script src>` whose target is loaded separately (or absorbed later)
    ExternalScript { url: String },
    Template(TemplateFragment),
    /// Styles and any other markup with no script semantics
    Markup { html: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub url: String,
    pub kind: DocumentKind,
    /// Original text, kept for maintained documents
    pub source: String,
    pub includes: Vec<Include>,
    pub fragments: Vec<Fragment>,
    pub maintained: bool,
}

impl Document {
    pub fn script(url: &str, source: &str) -> Self {
        Document {
            url: url.to_string(),
            kind: DocumentKind::Script,
            source: source.to_string(),
            includes: Vec::new(),
            fragments: vec![Fragment::Script(ScriptFragment {
                source: source.to_string(),
                is_module: true,
            })],
            maintained: false,
        }
    }

    /// Script fragments in source order.
    pub fn scripts(&self) -> impl Iterator<Item = &ScriptFragment> {
        self.fragments.iter().filter_map(|f| match f {
            Fragment::Script(s) => Some(s),
            _ => None,
        })
    }

    /// Non-script structural fragments in source order.
    pub fn structural(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments
            .iter()
            .filter(|f| matches!(f, Fragment::Template(_) | Fragment::Markup { .. }))
    }

    /// Script fragments whose bodies the engine rewrites. Maintained documents only
    /// expose their module-typed scripts.
    pub fn convertible_scripts(&self) -> impl Iterator<Item = (usize, &ScriptFragment)> {
        let maintained = self.maintained;
        self.fragments
            .iter()
            .enumerate()
            .filter_map(move |(i, f)| match f {
                Fragment::Script(s) if !maintained || s.is_module => Some((i, s)),
                _ => None,
            })
    }
}

/// Check whether markup is a full page (root element `<html>`), i.e. a maintained document.
pub fn is_page_markup(source: &str) -> bool {
    let trimmed = source.trim_start();
    let lower = trimmed
        .get(..trimmed.len().min(512))
        .unwrap_or(trimmed)
        .to_ascii_lowercase();
    let rest = lower
        .strip_prefix("<!doctype html>")
        .map(str::trim_start)
        .unwrap_or(lower.as_str());
    let rest = skip_comments(rest);
    rest.starts_with("<html")
}

fn skip_comments(mut s: &str) -> &str {
    while let Some(after) = s.strip_prefix("<!--") {
        match after.find("-->") {
            Some(end) => s = after[end + 3..].trim_start(),
            None => return "",
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_markup_detection() {
        assert!(is_page_markup("<!DOCTYPE html>\n<html><body></body></html>"));
        assert!(is_page_markup("  <!-- demo --> <html lang=\"en\">"));
        assert!(!is_page_markup("<link rel=\"import\" href=\"a.html\">"));
        assert!(!is_page_markup("<dom-module id=\"x\"></dom-module>"));
    }

    #[test]
    fn test_convertible_scripts_in_maintained_document() {
        let mut doc = Document::script("index.js", "x();");
        doc.fragments.push(Fragment::Script(ScriptFragment {
            source: "y();".into(),
            is_module: false,
        }));
        doc.maintained = true;
        let indices: Vec<usize> = doc.convertible_scripts().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0]);
    }
}

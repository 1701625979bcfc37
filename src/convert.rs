//! # Conversion Driver
//!
//! Runs the whole pipeline over a package:
//!
//! 1. build the document graph from the roots,
//! 2. flag cyclic edges and order documents dependencies-first,
//! 3. unwrap script wrappers in place,
//! 4. build the namespace registry (sequential, then frozen),
//! 5. synthesize one module per document in parallel.
//!
//! Fatal errors abort before any output exists. Everything else is a diagnostic.

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cycle::{detect_cycles, CycleAnalysis};
use crate::document::{Document, Fragment};
use crate::edit::{apply_edits, Edit};
use crate::error::{
    ConversionError, Diagnostic, Diagnostics, DIAG_PACKAGE_MAPPING_NOT_FOUND,
    DIAG_SCRIPT_PARSE_FAILED, DIAG_UNSUPPORTED_IIFE,
};
use crate::graph::{DocumentGraph, DocumentSource};
use crate::normalize::normalize_script;
use crate::parse::{raw_import_links, raw_scripts};
use crate::registry::NamespaceRegistry;
use crate::relocate::{load_into_document, plan_relocation};
use crate::rewrite::{rewrite_script, DocumentContext};
use crate::settings::ConversionSettings;
use crate::url::{converted_path, relative_specifier, resolve_url, PackageUrlHandler};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "source")]
pub enum OutputFile {
    Source(String),
    /// The document no longer exists after conversion
    Delete,
}

impl OutputFile {
    pub fn source(&self) -> Option<&str> {
        match self {
            OutputFile::Source(s) => Some(s),
            OutputFile::Delete => None,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutput {
    /// Output path -> file, dependencies first
    pub files: IndexMap<String, OutputFile>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ConversionOutput {
    pub fn source(&self, path: &str) -> Option<&str> {
        self.files.get(path).and_then(OutputFile::source)
    }
}

/// Read-only state shared by every per-document job.
struct Shared<'a> {
    graph: &'a DocumentGraph,
    registry: &'a NamespaceRegistry,
    cycles: &'a CycleAnalysis,
    handler: &'a dyn PackageUrlHandler,
    settings: &'a ConversionSettings,
}

/// Convert the package reachable from `roots`.
pub fn convert_package(
    roots: &[String],
    source: &dyn DocumentSource,
    handler: &dyn PackageUrlHandler,
    settings: &ConversionSettings,
) -> Result<ConversionOutput, ConversionError> {
    settings.validate()?;
    let mut diagnostics = Diagnostics::new();

    let mut graph = DocumentGraph::build(roots, source, handler, settings)?;
    let cycles = detect_cycles(&mut graph, &mut diagnostics);
    tracing::debug!(
        documents = graph.documents.len(),
        edges = graph.edges.len(),
        "document graph built"
    );

    normalize_documents(&mut graph, &mut diagnostics);
    let registry = NamespaceRegistry::build(&graph, settings)?;

    let shared = Shared {
        graph: &graph,
        registry: &registry,
        cycles: &cycles,
        handler,
        settings,
    };
    let converted: Vec<(String, String, Diagnostics)> = cycles
        .order
        .par_iter()
        .filter_map(|url| graph.documents.get(url))
        .map(|document| {
            let (path, (text, diags)) = if document.maintained {
                (document.url.clone(), convert_maintained(document, &shared))
            } else {
                (converted_path(&document.url), convert_module(document, &shared))
            };
            tracing::debug!(
                url = %document.url,
                output = %path,
                cyclic = shared.cycles.is_cyclic(&document.url),
                "converted document"
            );
            (path, text, diags)
        })
        .collect();

    let mut output = ConversionOutput::default();
    for (path, text, diags) in converted {
        diagnostics.extend(diags);
        output.files.insert(path, OutputFile::Source(text));
    }
    for script in graph.absorbed.keys() {
        if !output.files.contains_key(script) {
            output.files.insert(script.clone(), OutputFile::Delete);
        }
    }

    tracing::info!(
        files = output.files.len(),
        diagnostics = diagnostics.len(),
        "conversion finished"
    );
    output.diagnostics = diagnostics.into_vec();
    Ok(output)
}

fn normalize_documents(graph: &mut DocumentGraph, diagnostics: &mut Diagnostics) {
    for document in graph.documents.values_mut() {
        let maintained = document.maintained;
        let url = &document.url;
        for fragment in document.fragments.iter_mut() {
            let Fragment::Script(script) = fragment else {
                continue;
            };
            if maintained && !script.is_module {
                continue;
            }
            let (text, unsupported) = normalize_script(&script.source);
            for reason in unsupported {
                diagnostics.push(Diagnostic::info(
                    DIAG_UNSUPPORTED_IIFE,
                    url,
                    format!("script wrapper kept: {}", reason),
                ));
            }
            script.source = text;
        }
    }
}

/// Module specifier for `target` as written in the output of `from`.
fn specifier(
    from: &str,
    target: &str,
    handler: &dyn PackageUrlHandler,
    diagnostics: &mut Diagnostics,
) -> String {
    match handler.resolve_package_url(from, target) {
        Some(spec) => spec,
        None => {
            let fallback = relative_specifier(from, &converted_path(target));
            diagnostics.push(Diagnostic::warning(
                DIAG_PACKAGE_MAPPING_NOT_FOUND,
                from,
                format!("no package mapping for '{}'; using '{}'", target, fallback),
            ));
            fallback
        }
    }
}

fn render_imports(cx: &mut DocumentContext<'_>, handler: &dyn PackageUrlHandler) -> String {
    let url = cx.url;
    let diagnostics = &mut cx.diagnostics;
    cx.imports
        .render(|target| specifier(url, target, handler, diagnostics))
}

fn join_sections(sections: Vec<String>) -> String {
    let sections: Vec<&str> = sections
        .iter()
        .map(|s| s.trim_end())
        .filter(|s| !s.trim().is_empty())
        .collect();
    if sections.is_empty() {
        return String::new();
    }
    format!("{}\n", sections.join("\n\n"))
}

fn convert_module(document: &Document, shared: &Shared<'_>) -> (String, Diagnostics) {
    let mut cx = DocumentContext::new(
        &document.url,
        shared.registry,
        shared.settings,
        shared.cycles,
    );
    for include in &document.includes {
        if !shared.graph.excluded.contains(&include.url) {
            cx.imports.side_effect(&include.url);
        }
    }

    let scripts: Vec<usize> = document.convertible_scripts().map(|(i, _)| i).collect();
    let mut plan = plan_relocation(&document.fragments, &scripts, shared.settings, &mut cx.imports);

    let mut body: Vec<String> = Vec::new();
    let mut markup = String::new();
    for (index, fragment) in document.fragments.iter().enumerate() {
        match fragment {
            Fragment::Script(script) => {
                if !markup.trim().is_empty() {
                    body.push(load_into_document(&markup, &mut cx.imports));
                }
                markup.clear();
                let extra = plan.edits.remove(&index).unwrap_or_default();
                match rewrite_script(&mut cx, index, &script.source, extra) {
                    Ok(text) => body.push(text),
                    Err(message) => {
                        cx.diagnostics.push(Diagnostic::warning(
                            DIAG_SCRIPT_PARSE_FAILED,
                            &document.url,
                            message,
                        ));
                        body.push(script.source.clone());
                    }
                }
            }
            Fragment::Template(template) if !plan.owned.contains(&index) => {
                markup.push_str(&template.outer_html);
            }
            Fragment::Markup { html } => markup.push_str(html),
            Fragment::Template(_) | Fragment::ExternalScript { .. } => {}
        }
    }
    if !markup.trim().is_empty() {
        body.push(load_into_document(&markup, &mut cx.imports));
    }

    let implicit = cx.implicit_declarations().join("\n");
    let imports = render_imports(&mut cx, shared.handler);
    let trailer = cx.trailer.join("\n");

    let mut sections = vec![imports, implicit];
    sections.extend(body);
    sections.push(trailer);
    (join_sections(sections), cx.diagnostics)
}

/// Edit a maintained page in place: import links load the converted modules and inline
/// module scripts are rewritten. Every other byte is preserved.
fn convert_maintained(document: &Document, shared: &Shared<'_>) -> (String, Diagnostics) {
    let url = document.url.as_str();
    let mut diagnostics = Diagnostics::new();
    let mut edits = Vec::new();

    for link in raw_import_links(&document.source) {
        let target = resolve_url(url, &link.href);
        if shared.graph.excluded.contains(&target) {
            continue;
        }
        let spec = specifier(url, &target, shared.handler, &mut diagnostics);
        edits.push(Edit::range(
            link.span.0 as u32,
            link.span.1 as u32,
            format!("<script type=\"module\">import '{}';</script>", spec),
        ));
    }

    let inline = raw_scripts(&document.source)
        .into_iter()
        .filter(|raw| raw.src.is_none());
    for (index, (raw, fragment)) in inline.zip(document.fragments.iter()).enumerate() {
        let Fragment::Script(script) = fragment else {
            continue;
        };
        if !script.is_module {
            continue;
        }
        let mut cx = DocumentContext::new(url, shared.registry, shared.settings, shared.cycles);
        let rewritten = match rewrite_script(&mut cx, index, &script.source, Vec::new()) {
            Ok(text) => text,
            Err(message) => {
                cx.diagnostics
                    .push(Diagnostic::warning(DIAG_SCRIPT_PARSE_FAILED, url, message));
                diagnostics.extend(cx.diagnostics);
                continue;
            }
        };
        let header = render_imports(&mut cx, shared.handler);
        let text = if header.is_empty() {
            rewritten
        } else if rewritten.starts_with('\n') {
            format!("\n{}{}", header, rewritten)
        } else {
            format!("{}\n{}", header, rewritten)
        };
        if text != document.source[raw.span.0..raw.span.1] {
            edits.push(Edit::range(raw.span.0 as u32, raw.span.1 as u32, text));
        }
        diagnostics.extend(cx.diagnostics);
    }

    (apply_edits(&document.source, edits), diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_sections_skips_empty_parts() {
        let joined = join_sections(vec![
            String::new(),
            "import './a.js';".to_string(),
            "  \n".to_string(),
            "foo();\n".to_string(),
        ]);
        assert_eq!(joined, "import './a.js';\n\nfoo();\n");
        assert_eq!(join_sections(vec![String::new()]), "");
    }

    #[test]
    fn test_output_file_serializes_tagged() {
        let json = serde_json::to_string(&OutputFile::Source("x".into())).unwrap();
        assert_eq!(json, r#"{"type":"source","source":"x"}"#);
        let json = serde_json::to_string(&OutputFile::Delete).unwrap();
        assert_eq!(json, r#"{"type":"delete"}"#);
    }
}

//! Document Graph Builder
//!
//! Follows include edges from a set of root URLs and loads the closure of documents that
//! are internal to the package. Documents outside the package (and excluded documents)
//! are recorded as opaque edge targets and never loaded.

use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, VecDeque};

use crate::document::{is_page_markup, Document, DocumentKind, Fragment, IncludeKind};
use crate::error::ConversionError;
use crate::parse::parse_markup;
use crate::settings::ConversionSettings;
use crate::url::PackageUrlHandler;

/// Where document text comes from. File system access lives outside the engine.
pub trait DocumentSource {
    fn read(&self, url: &str) -> Option<String>;
}

impl DocumentSource for HashMap<String, String> {
    fn read(&self, url: &str) -> Option<String> {
        self.get(url).cloned()
    }
}

impl DocumentSource for IndexMap<String, String> {
    fn read(&self, url: &str) -> Option<String> {
        self.get(url).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub kind: IncludeKind,
    /// Set by the cycle detector
    pub cyclic: bool,
}

#[derive(Debug, Default)]
pub struct DocumentGraph {
    pub roots: Vec<String>,
    /// Loaded documents, in discovery order
    pub documents: IndexMap<String, Document>,
    /// Opaque targets outside the package
    pub external: IndexSet<String>,
    /// Targets the settings exclude from conversion
    pub excluded: IndexSet<String>,
    pub edges: Vec<DependencyEdge>,
    /// Script documents inlined into their single includer: script URL -> includer URL
    pub absorbed: IndexMap<String, String>,
}

impl DocumentGraph {
    pub fn build(
        roots: &[String],
        source: &dyn DocumentSource,
        handler: &dyn PackageUrlHandler,
        settings: &ConversionSettings,
    ) -> Result<Self, ConversionError> {
        let mut graph = DocumentGraph::default();
        graph.add_roots(roots, source, handler, settings)?;
        Ok(graph)
    }

    fn is_known(&self, url: &str) -> bool {
        self.documents.contains_key(url)
            || self.external.contains(url)
            || self.excluded.contains(url)
            || self.absorbed.contains_key(url)
    }

    /// Load every document reachable from `roots` that is not already in the graph.
    /// Re-running with known roots is a no-op.
    pub fn add_roots(
        &mut self,
        roots: &[String],
        source: &dyn DocumentSource,
        handler: &dyn PackageUrlHandler,
        settings: &ConversionSettings,
    ) -> Result<(), ConversionError> {
        let mut queue: VecDeque<(String, Option<String>)> = VecDeque::new();
        for root in roots {
            if !self.roots.contains(root) {
                self.roots.push(root.clone());
            }
            queue.push_back((root.clone(), None));
        }

        let mut loaded = Vec::new();
        while let Some((url, from)) = queue.pop_front() {
            if self.is_known(&url) {
                continue;
            }
            if settings.is_excluded(&url) {
                self.excluded.insert(url);
                continue;
            }
            if !handler.is_internal_to_package(&url) {
                self.external.insert(url);
                continue;
            }

            let unresolved = || ConversionError::UnresolvedInclude {
                from: from.clone().unwrap_or_else(|| "<root>".to_string()),
                url: url.clone(),
            };
            let text = source.read(&url).ok_or_else(unresolved)?;
            let document = match DocumentKind::from_url(&url) {
                DocumentKind::Script => Document::script(&url, &text),
                DocumentKind::Markup => {
                    let maintained = settings.maintained.contains(&url) || is_page_markup(&text);
                    parse_markup(&url, &text, maintained).map_err(|_| unresolved())?
                }
            };
            tracing::debug!(
                url = %url,
                includes = document.includes.len(),
                fragments = document.fragments.len(),
                "loaded document"
            );

            for include in &document.includes {
                self.edges.push(DependencyEdge {
                    from: url.clone(),
                    to: include.url.clone(),
                    kind: include.kind,
                    cyclic: false,
                });
                queue.push_back((include.url.clone(), Some(url.clone())));
            }
            loaded.push(url.clone());
            self.documents.insert(url, document);
        }

        for url in loaded {
            self.absorb_script(&url);
        }
        Ok(())
    }

    /// Inline a script document into its only includer, when that includer is converted.
    fn absorb_script(&mut self, url: &str) {
        match self.documents.get(url) {
            Some(doc) if doc.kind == DocumentKind::Script => {}
            _ => return,
        }
        if self.roots.iter().any(|r| r == url) {
            return;
        }
        let includers: IndexSet<&str> = self
            .edges
            .iter()
            .filter(|e| e.to == url)
            .map(|e| e.from.as_str())
            .collect();
        if includers.len() != 1 {
            return;
        }
        let includer = includers[0].to_string();
        let includer_ok = self
            .documents
            .get(&includer)
            .map(|d| !d.maintained && d.kind == DocumentKind::Markup)
            .unwrap_or(false);
        if !includer_ok {
            return;
        }

        let Some(script) = self.documents.shift_remove(url) else {
            return;
        };
        let Some(target) = self.documents.get_mut(&includer) else {
            return;
        };
        if let Some(position) = target
            .fragments
            .iter()
            .position(|f| matches!(f, Fragment::ExternalScript { url: u } if u == url))
        {
            target.fragments.remove(position);
            for (offset, fragment) in script.fragments.into_iter().enumerate() {
                target.fragments.insert(position + offset, fragment);
            }
        }
        target.includes.retain(|i| i.url != url);
        self.edges.retain(|e| !(e.from == includer && e.to == url));
        tracing::debug!(script = %url, into = %includer, "absorbed script document");
        self.absorbed.insert(url.to_string(), includer);
    }

    pub fn is_converted(&self, url: &str) -> bool {
        self.documents.contains_key(url)
    }
}

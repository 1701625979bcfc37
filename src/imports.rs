//! Import Set
//!
//! The imports one synthesized module needs, keyed by source document. Sources keep
//! first-request order, which starts with the document's include edges so side-effect
//! ordering is preserved. Local names handed out here never collide with any other name
//! in the module.

use indexmap::IndexMap;
use std::collections::HashSet;

use crate::scope::unique_name;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceImports {
    /// Export name -> local alias
    pub named: IndexMap<String, String>,
    /// Namespace aliases (`import * as X`)
    pub namespaces: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ImportSet {
    sources: IndexMap<String, SourceImports>,
    taken: HashSet<String>,
}

impl ImportSet {
    pub fn new(taken: HashSet<String>) -> Self {
        ImportSet {
            sources: IndexMap::new(),
            taken,
        }
    }

    /// Import a document for its side effects only (unless something more is requested).
    pub fn side_effect(&mut self, source: &str) {
        self.sources.entry(source.to_string()).or_default();
    }

    /// Local name for `export_name` of `source`, adding the import on first request.
    pub fn named(&mut self, source: &str, export_name: &str) -> String {
        if let Some(local) = self.sources.get(source).and_then(|s| s.named.get(export_name)) {
            return local.clone();
        }
        let local = self.reserve(export_name);
        self.sources
            .entry(source.to_string())
            .or_default()
            .named
            .insert(export_name.to_string(), local.clone());
        local
    }

    /// Namespace alias for `source`, derived from `preferred` on first request.
    pub fn namespace(&mut self, source: &str, preferred: &str) -> String {
        if let Some(alias) = self.sources.get(source).and_then(|s| s.namespaces.first()) {
            return alias.clone();
        }
        let alias = self.reserve(preferred);
        self.sources
            .entry(source.to_string())
            .or_default()
            .namespaces
            .push(alias.clone());
        alias
    }

    /// Namespace import under an exact alias, which the caller already owns.
    pub fn namespace_as(&mut self, source: &str, alias: &str) {
        let imports = self.sources.entry(source.to_string()).or_default();
        if !imports.namespaces.iter().any(|a| a == alias) {
            imports.namespaces.push(alias.to_string());
        }
        self.taken.insert(alias.to_string());
    }

    /// Claim a fresh module-level name.
    pub fn reserve(&mut self, base: &str) -> String {
        let name = unique_name(base, &self.taken);
        self.taken.insert(name.clone());
        name
    }

    /// Import declarations, one per line. `specifier` maps a source document to the
    /// module specifier written in the output.
    pub fn render(&self, mut specifier: impl FnMut(&str) -> String) -> String {
        let mut lines = Vec::new();
        for (source, imports) in &self.sources {
            let spec = specifier(source);
            for alias in &imports.namespaces {
                lines.push(format!("import * as {} from '{}';", alias, spec));
            }
            if !imports.named.is_empty() {
                let names: Vec<String> = imports
                    .named
                    .iter()
                    .map(|(name, local)| {
                        if name == local {
                            name.clone()
                        } else {
                            format!("{} as {}", name, local)
                        }
                    })
                    .collect();
                lines.push(format!("import {{ {} }} from '{}';", names.join(", "), spec));
            } else if imports.namespaces.is_empty() {
                lines.push(format!("import '{}';", spec));
            }
        }
        lines.join("\n")
    }
}

//! Conversion settings.
//!
//! Created once at the start of a run and read-only afterwards. Hosts either build
//! them in code or deserialize them from camelCase JSON.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::ConversionError;

/// A tagged-template helper used to build relocated templates (`html\`...\``).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlTag {
    /// Legacy URL of the document exporting the helper
    pub url: String,
    /// Exported name of the helper
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionSettings {
    /// Namespace roots treated as convertible (e.g. `Polymer`)
    pub namespaces: IndexSet<String>,
    /// Documents left untouched
    pub excludes: IndexSet<String>,
    /// Fully-qualified references rewritten to `undefined` instead of imported
    pub reference_excludes: IndexSet<String>,
    pub add_import_meta: bool,
    /// Extra maintained documents (markup rooted at `<html>` is always maintained)
    pub maintained: IndexSet<String>,
    pub global_object: String,
    pub factory_functions: IndexSet<String>,
    pub html_tag: Option<HtmlTag>,
    /// Members declared by opaque documents outside the package: path -> document URL
    pub external_bindings: IndexMap<String, String>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        let mut factory_functions = IndexSet::new();
        factory_functions.insert("Polymer".to_string());
        Self {
            namespaces: IndexSet::new(),
            excludes: IndexSet::new(),
            reference_excludes: IndexSet::new(),
            add_import_meta: false,
            maintained: IndexSet::new(),
            global_object: "window".to_string(),
            factory_functions,
            html_tag: None,
            external_bindings: IndexMap::new(),
        }
    }
}

impl ConversionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, ConversionError> {
        let settings: ConversionSettings = serde_json::from_str(json)
            .map_err(|e| ConversionError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_namespace(mut self, root: &str) -> Self {
        self.namespaces.insert(root.to_string());
        self
    }

    pub fn with_exclude(mut self, url: &str) -> Self {
        self.excludes.insert(url.to_string());
        self
    }

    pub fn with_reference_exclude(mut self, path: &str) -> Self {
        self.reference_excludes.insert(path.to_string());
        self
    }

    pub fn with_maintained(mut self, url: &str) -> Self {
        self.maintained.insert(url.to_string());
        self
    }

    pub fn with_import_meta(mut self, enabled: bool) -> Self {
        self.add_import_meta = enabled;
        self
    }

    pub fn with_html_tag(mut self, url: &str, name: &str) -> Self {
        self.html_tag = Some(HtmlTag {
            url: url.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_external_binding(mut self, path: &str, url: &str) -> Self {
        self.external_bindings
            .insert(path.to_string(), url.to_string());
        self
    }

    pub fn validate(&self) -> Result<(), ConversionError> {
        for root in &self.namespaces {
            if !is_identifier(root) {
                return Err(ConversionError::InvalidSettings(format!(
                    "namespace root '{}' is not an identifier",
                    root
                )));
            }
        }
        if !is_identifier(&self.global_object) {
            return Err(ConversionError::InvalidSettings(format!(
                "global object '{}' is not an identifier",
                self.global_object
            )));
        }
        for path in self.external_bindings.keys() {
            let root = path.split('.').next().unwrap_or_default();
            if !path.contains('.') || !self.namespaces.contains(root) {
                return Err(ConversionError::InvalidSettings(format!(
                    "external binding '{}' is not a member of a configured namespace",
                    path
                )));
            }
        }
        Ok(())
    }

    pub fn is_namespace_root(&self, name: &str) -> bool {
        self.namespaces.contains(name)
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.excludes.contains(url)
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

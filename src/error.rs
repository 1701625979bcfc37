#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const DIAG_UNRESOLVED_REFERENCE: &str = "UNRESOLVED_REFERENCE";
pub const DIAG_CYCLIC_DEPENDENCY: &str = "CYCLIC_DEPENDENCY";
pub const DIAG_PACKAGE_MAPPING_NOT_FOUND: &str = "PACKAGE_MAPPING_NOT_FOUND";
pub const DIAG_IMPORTED_BINDING_REASSIGNED: &str = "IMPORTED_BINDING_REASSIGNED";
pub const DIAG_SCRIPT_PARSE_FAILED: &str = "SCRIPT_PARSE_FAILED";
pub const DIAG_UNSUPPORTED_IIFE: &str = "UNSUPPORTED_IIFE";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        DIAG_UNRESOLVED_REFERENCE => "The original global reference is preserved unchanged.",
        DIAG_CYCLIC_DEPENDENCY => {
            "References across a cyclic edge are imported for effect but never substituted."
        }
        DIAG_PACKAGE_MAPPING_NOT_FOUND => "The import path is a best-effort relative literal.",
        DIAG_IMPORTED_BINDING_REASSIGNED => {
            "Assignments to bindings owned by another module are left untouched."
        }
        DIAG_SCRIPT_PARSE_FAILED => "Scripts that cannot be parsed are copied verbatim.",
        DIAG_UNSUPPORTED_IIFE => "Wrappers that cannot be unwrapped safely are kept as-is.",
        _ => "Unknown diagnostic.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTICS (recoverable)
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Warning,
    Info,
}

/// A recoverable issue detected during conversion. Every degraded rewrite decision is
/// paired with exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub guarantee: String,
    /// URL of the document the issue was found in
    pub document: String,
}

impl Diagnostic {
    pub fn warning(code: &str, document: &str, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, document, message)
    }

    pub fn info(code: &str, document: &str, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Info, document, message)
    }

    fn new(code: &str, severity: Severity, document: &str, message: impl Into<String>) -> Self {
        Diagnostic {
            code: code.to_string(),
            severity,
            message: message.into(),
            guarantee: get_guarantee(code).to_string(),
            document: document.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.document, self.message)
    }
}

/// Ordered sink for diagnostics; logs each one as it is recorded.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(
            code = %diagnostic.code,
            document = %diagnostic.document,
            "{}",
            diagnostic.message
        );
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONVERSION ERROR (structural / fatal)
// ═══════════════════════════════════════════════════════════════════════════════

/// Structural failures. Any of these aborts the whole run and nothing is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("unresolved include: '{url}' (included from '{from}') could not be loaded")]
    UnresolvedInclude { from: String, url: String },

    #[error("conflicting export: '{path}' is declared by both '{first}' and '{second}'")]
    ConflictingExport {
        path: String,
        first: String,
        second: String,
    },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Flat, host-facing rendering of a fatal error (used by the napi bridge).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct ConversionErrorReport {
    pub code: String,
    pub message: String,
}

impl From<&ConversionError> for ConversionErrorReport {
    fn from(error: &ConversionError) -> Self {
        let code = match error {
            ConversionError::UnresolvedInclude { .. } => "UNRESOLVED_INCLUDE",
            ConversionError::ConflictingExport { .. } => "CONFLICTING_EXPORT",
            ConversionError::InvalidSettings(_) => "INVALID_SETTINGS",
        };
        ConversionErrorReport {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

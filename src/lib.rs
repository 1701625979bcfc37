//! # Modulizer
//!
//! Converts a package of legacy documents, whose scripts communicate through shared
//! global namespace objects, into native ES modules with explicit imports and exports.
//!
//! ## Pipeline
//!
//! 1. **Graph**: follow `<link rel="import">` and `<script src>` edges from the roots.
//! 2. **Cycles**: flag edges that close a cycle; they are imported for effect only.
//! 3. **Registry**: one export binding per namespace member, declared by exactly one
//!    document. Built sequentially and frozen before any rewriting starts.
//! 4. **Rewrite**: per document, in parallel. Declarations become exports, namespace
//!    references become imports, templates move into their element definitions.
//!
//! ## Invariants
//!
//! 1. **No Silent Degradation**: every reference left unchanged is paired with a
//!    diagnostic.
//! 2. **Deterministic Output**: output files follow dependency order; imports follow
//!    include order, then first use.
//! 3. **Idempotence**: converting converted output changes nothing.

mod cycle;
mod discovery;
mod document;
mod edit;
mod error;
mod graph;
mod imports;
mod member;
mod normalize;
mod parse;
mod registry;
mod relocate;
mod rewrite;
mod scope;
mod settings;
mod shape;
mod url;

pub mod bridge;
pub mod convert;

#[cfg(test)]
mod conversion_tests;

pub use convert::{convert_package, ConversionOutput, OutputFile};
pub use discovery::{discover_documents, PackageDirectory};
pub use document::{Document, DocumentKind, Fragment, Include, IncludeKind};
pub use error::{ConversionError, ConversionErrorReport, Diagnostic, Severity};
pub use error::{
    DIAG_CYCLIC_DEPENDENCY, DIAG_IMPORTED_BINDING_REASSIGNED, DIAG_PACKAGE_MAPPING_NOT_FOUND,
    DIAG_SCRIPT_PARSE_FAILED, DIAG_UNRESOLVED_REFERENCE, DIAG_UNSUPPORTED_IIFE,
};
pub use graph::{DocumentGraph, DocumentSource};
pub use registry::{BindingKind, ExportBinding, NamespaceRegistry};
pub use settings::{ConversionSettings, HtmlTag};
pub use url::{converted_path, PackageUrlHandler, RelativeUrlHandler};

#[cfg(feature = "napi")]
pub use bridge::convert_package_native;

//! Node host bridge.
//!
//! One JSON-in, JSON-out entry point. The request names either in-memory `files` or a
//! `packageDir` on disk; without explicit `roots` every markup document of the package
//! directory is converted.

#[cfg(feature = "napi")]
use napi_derive::napi;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::convert::{convert_package, ConversionOutput};
use crate::discovery::{discover_documents, PackageDirectory};
use crate::error::ConversionErrorReport;
use crate::settings::ConversionSettings;
use crate::url::RelativeUrlHandler;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionRequest {
    pub roots: Vec<String>,
    pub files: IndexMap<String, String>,
    pub package_dir: Option<String>,
    pub dependency_dir: Option<String>,
    /// Legacy package name -> new package name
    pub packages: IndexMap<String, String>,
    pub settings: ConversionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum ConversionResponse {
    Ok(ConversionOutput),
    Error(ConversionErrorReport),
}

pub fn handle_request(request: ConversionRequest) -> ConversionResponse {
    let mut handler = RelativeUrlHandler::new();
    if let Some(dir) = request.dependency_dir {
        handler.dependency_dir = dir;
    }
    handler.packages = request.packages;

    let result = match &request.package_dir {
        Some(dir) => {
            let roots = if request.roots.is_empty() {
                discover_documents(Path::new(dir), &handler)
            } else {
                request.roots
            };
            convert_package(&roots, &PackageDirectory::new(dir), &handler, &request.settings)
        }
        None => convert_package(&request.roots, &request.files, &handler, &request.settings),
    };

    match result {
        Ok(output) => ConversionResponse::Ok(output),
        Err(error) => ConversionResponse::Error(ConversionErrorReport::from(&error)),
    }
}

#[cfg(feature = "napi")]
#[napi]
pub fn convert_package_native(request_json: String) -> napi::Result<serde_json::Value> {
    let request: ConversionRequest = serde_json::from_str(&request_json)
        .map_err(|e| napi::Error::from_reason(format!("Invalid request: {}", e)))?;
    serde_json::to_value(handle_request(request))
        .map_err(|e| napi::Error::from_reason(e.to_string()))
}

//! Reading mapping files from disk and classifying what went wrong.

use std::io;
use std::path::{Path, PathBuf};

use super::schema::{SchemaErrors, validate};
use super::types::MappingTable;

/// File name looked up beside the running executable when no path is given.
pub const DEFAULT_MAPPINGS_FILE: &str = "api-mappings.yaml";

/// Envelope for every mapping load failure; `kind()` tells which stage failed.
#[derive(Debug, thiserror::Error)]
#[error("failed to load API mappings from {}: {kind}", .path.display())]
pub struct LoadError {
    path: PathBuf,
    #[source]
    kind: LoadErrorKind,
}

impl LoadError {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> &LoadErrorKind {
        &self.kind
    }

    /// Per-field defects when the document parsed but failed validation.
    pub fn schema_errors(&self) -> Option<&SchemaErrors> {
        match &self.kind {
            LoadErrorKind::Invalid(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadErrorKind {
    #[error("configuration file not found")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("failed to read configuration file: {0}")]
    Read(#[source] io::Error),
    #[error("configuration file is empty")]
    Empty,
    #[error("invalid YAML format: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error(transparent)]
    Invalid(#[from] SchemaErrors),
}

/// `api-mappings.yaml` next to the current executable, or in the working
/// directory if the executable location is unknown.
pub fn default_mappings_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_MAPPINGS_FILE)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MAPPINGS_FILE))
}

/// Load and validate the mapping table at `path` (or the default location).
pub fn load(path: Option<&Path>) -> Result<MappingTable, LoadError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_mappings_path);
    tracing::debug!("loading API mappings from {}", path.display());

    let result = std::fs::read_to_string(&path)
        .map_err(classify_io)
        .and_then(|content| parse_and_validate(&content));
    finish(path, result)
}

/// Validate mapping text that was obtained elsewhere; `origin` only labels errors.
pub fn load_from_str(content: &str, origin: &Path) -> Result<MappingTable, LoadError> {
    finish(origin.to_path_buf(), parse_and_validate(content))
}

fn finish(
    path: PathBuf,
    result: Result<MappingTable, LoadErrorKind>,
) -> Result<MappingTable, LoadError> {
    match result {
        Ok(table) => {
            for (shadowed, by) in table.shadowed_entries() {
                tracing::warn!(
                    "mapping {} (prefix '{}') is unreachable: mapping {} (prefix '{}') matches first",
                    shadowed,
                    table.mappings()[shadowed].proxy_path_prefix,
                    by,
                    table.mappings()[by].proxy_path_prefix
                );
            }
            tracing::info!(
                "loaded {} API mapping(s) from {}",
                table.len(),
                path.display()
            );
            Ok(table)
        }
        Err(kind) => {
            let err = LoadError { path, kind };
            tracing::error!("{}", err);
            Err(err)
        }
    }
}

fn classify_io(err: io::Error) -> LoadErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => LoadErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => LoadErrorKind::PermissionDenied,
        _ => LoadErrorKind::Read(err),
    }
}

fn parse_and_validate(content: &str) -> Result<MappingTable, LoadErrorKind> {
    if content.trim().is_empty() {
        return Err(LoadErrorKind::Empty);
    }
    // YAML is a superset of JSON, so `.json` mapping files parse here too.
    let document: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(LoadErrorKind::Parse)?;
    Ok(validate(&document)?)
}

//! Binding manifests (`natbind.toml`).
//!
//! ```toml
//! [interface]
//! name = "Rpm"
//! signatures = "rpm.ffi"
//!
//! [library]
//! candidates = ["librpm.so.10", "librpm.so.9"]
//! # or: current_process = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use natbind_core::{InterfaceDescription, ParseError};

use crate::resolver::LibrarySpec;

pub const MANIFEST_FILE: &str = "natbind.toml";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("failed to read {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    #[error("invalid manifest: {0}")]
    Toml(String),

    #[error("invalid [library] section: {0}")]
    InvalidLibrary(String),

    #[error("invalid interface name `{0}`")]
    InvalidName(String),

    #[error("{}: {error}", path.display())]
    Signatures { path: PathBuf, error: ParseError },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    interface: RawInterface,
    library: RawLibrary,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInterface {
    name: String,
    signatures: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLibrary {
    #[serde(default)]
    candidates: Vec<String>,
    #[serde(default)]
    current_process: bool,
}

/// A parsed binding manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    name: String,
    /// Signature file, resolved against the manifest's directory.
    signatures: PathBuf,
    library: LibrarySpec,
}

impl Manifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&text, base)
    }

    /// Parse manifest text; relative paths are taken from `base_dir`.
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, ManifestError> {
        let raw: RawManifest = toml::from_str(text).map_err(|e| ManifestError::Toml(e.to_string()))?;

        let name = raw.interface.name.trim().to_string();
        if !natbind_core::plan::is_symbol_name(&name) {
            return Err(ManifestError::InvalidName(raw.interface.name));
        }

        let library = match (raw.library.current_process, raw.library.candidates.is_empty()) {
            (true, true) => LibrarySpec::CurrentProcess,
            (false, false) => LibrarySpec::Candidates(raw.library.candidates),
            (true, false) => {
                return Err(ManifestError::InvalidLibrary(
                    "`candidates` and `current_process` are mutually exclusive".into(),
                ))
            }
            (false, true) => {
                return Err(ManifestError::InvalidLibrary(
                    "expected non-empty `candidates` or `current_process = true`".into(),
                ))
            }
        };

        Ok(Self {
            name,
            signatures: base_dir.join(raw.interface.signatures),
            library,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signatures_path(&self) -> &Path {
        &self.signatures
    }

    pub fn library_spec(&self) -> &LibrarySpec {
        &self.library
    }

    /// Read and parse the signature file.
    pub fn interface(&self) -> Result<InterfaceDescription, ManifestError> {
        InterfaceDescription::from_file(self.name.clone(), &self.signatures).map_err(|error| {
            ManifestError::Signatures {
                path: self.signatures.clone(),
                error,
            }
        })
    }

    /// Rust expression resolving this manifest's library through the
    /// process-wide registry, for generated entry points.
    pub fn resolver_expression(&self) -> String {
        match &self.library {
            LibrarySpec::CurrentProcess => {
                "::natbind_runtime::resolve(&::natbind_runtime::LibrarySpec::CurrentProcess)".to_string()
            }
            LibrarySpec::Candidates(names) => {
                let list: Vec<String> = names.iter().map(|n| format!("{:?}", n)).collect();
                format!(
                    "::natbind_runtime::resolve(&::natbind_runtime::LibrarySpec::candidates([{}]))",
                    list.join(", ")
                )
            }
        }
    }
}

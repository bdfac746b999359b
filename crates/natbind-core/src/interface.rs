//! Interface descriptions: the set of native functions to bind.

use std::fmt;
use std::path::Path;

use crate::parser::{self, ParseError};
use crate::types::TypeSpec;

/// One native function: symbol name, parameter types, return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Native symbol name, also the method name.
    pub name: String,
    pub params: Vec<TypeSpec>,
    pub ret: TypeSpec,
}

impl Signature {
    pub fn new<P, T>(name: impl Into<String>, params: P, ret: impl Into<TypeSpec>) -> Self
    where
        P: IntoIterator<Item = T>,
        T: Into<TypeSpec>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            ret: ret.into(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: (", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// An ordered set of signatures for one native library.
///
/// The order given here is irrelevant to binding: plans always process
/// methods sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescription {
    name: String,
    signatures: Vec<Signature>,
}

impl InterfaceDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signatures: Vec::new(),
        }
    }

    /// Builder-style `push`.
    pub fn with(mut self, sig: Signature) -> Self {
        self.signatures.push(sig);
        self
    }

    pub fn push(&mut self, sig: Signature) {
        self.signatures.push(sig);
    }

    /// Parse `.ffi` signature-file content.
    pub fn parse(name: impl Into<String>, content: &str) -> Result<Self, ParseError> {
        Ok(Self {
            name: name.into(),
            signatures: parser::parse_signatures(content)?,
        })
    }

    /// Read and parse a `.ffi` signature file.
    pub fn from_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ParseError {
            line: 0,
            message: format!("failed to read {}: {}", path.as_ref().display(), e),
        })?;
        Self::parse(name, &content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn get(&self, name: &str) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

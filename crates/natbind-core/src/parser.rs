//! Parser for `.ffi` signature files.
//!
//! # File Format
//!
//! ```text
//! # Comment lines start with #
//!
//! # Function signature: name: (arg_types) -> return_type
//! rpmtsCreate: () -> handle
//! headerGetString: (handle, i32) -> string
//! rpmReadConfigFiles: (string, string) -> i32
//! ```
//!
//! # Types
//!
//! - `i32`, `int`, `int32` - 32-bit signed integer
//! - `i64`, `int64`, `long` - 64-bit signed integer
//! - `string`, `str`, `cstr` - nul-terminated string, nullable
//! - `handle`, `ptr`, `pointer` - opaque native address, nullable
//! - `void` - no return value
//!
//! Type names are not validated here. An unknown name is kept and reported
//! as an unsupported type when the interface is planned.

use std::collections::HashSet;
use std::fmt;

use crate::interface::Signature;
use crate::types::TypeSpec;

/// Error during signature file parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number, 0 when the error is not tied to a line.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: {}", self.line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    fn at(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Parse every signature line in `content`, keeping file order.
pub fn parse_signatures(content: &str) -> Result<Vec<Signature>, ParseError> {
    let mut signatures = Vec::new();
    let mut seen = HashSet::new();

    for (idx, line) in content.lines().enumerate() {
        let line_num = idx + 1;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let sig = parse_signature_line(line, line_num)?;
        if !seen.insert(sig.name.clone()) {
            return Err(ParseError::at(
                line_num,
                format!("duplicate signature for '{}'", sig.name),
            ));
        }
        signatures.push(sig);
    }

    Ok(signatures)
}

/// Parse a single signature line: `name: (arg_types) -> return_type`
fn parse_signature_line(line: &str, line_num: usize) -> Result<Signature, ParseError> {
    let (name, rest) = line
        .split_once(':')
        .ok_or_else(|| ParseError::at(line_num, "expected ':' after function name"))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(ParseError::at(line_num, "function name cannot be empty"));
    }

    let rest = rest.trim();
    let rest = rest
        .strip_prefix('(')
        .ok_or_else(|| ParseError::at(line_num, "expected '(' at start of type signature"))?;
    let (args, rest) = rest
        .split_once(')')
        .ok_or_else(|| ParseError::at(line_num, "unmatched '(' in type signature"))?;
    let ret = rest
        .trim()
        .strip_prefix("->")
        .ok_or_else(|| ParseError::at(line_num, "expected '->' after argument list"))?
        .trim();

    if ret.is_empty() {
        return Err(ParseError::at(line_num, "missing return type"));
    }

    let params = parse_arg_list(args, line_num)?;
    Ok(Signature {
        name: name.to_string(),
        params,
        ret: type_spec(ret),
    })
}

fn parse_arg_list(s: &str, line_num: usize) -> Result<Vec<TypeSpec>, ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }

    s.split(',')
        .enumerate()
        .map(|(i, arg)| {
            let arg = arg.trim();
            if arg.is_empty() {
                Err(ParseError::at(line_num, format!("empty type for argument {}", i)))
            } else {
                Ok(type_spec(arg))
            }
        })
        .collect()
}

fn type_spec(name: &str) -> TypeSpec {
    TypeSpec::Named(name.to_string())
}

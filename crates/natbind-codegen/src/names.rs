//! Identifier handling for generated code.

use std::collections::{BTreeMap, BTreeSet};

use proc_macro2::{Ident, Span};

use crate::GenerateError;

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Cannot be written even as raw identifiers.
const UNWRITABLE: &[&str] = &["_", "crate", "self", "Self", "super"];

/// Associated items every generated binding defines.
const RESERVED_METHODS: &[&str] = &["bind"];
const RESERVED_CONSTS: &[&str] = &["CALL_SHAPES", "METHODS"];

/// Items of the generated entry-point module.
pub(crate) const RESERVED_ENTRY: &[&str] = &["binding", "__init", "__BINDING"];

/// Identifier for a method or field, raw if `name` is a keyword.
pub(crate) fn method_ident(name: &str) -> Result<Ident, GenerateError> {
    if UNWRITABLE.contains(&name)
        || RESERVED_METHODS.contains(&name)
        || RESERVED_CONSTS.contains(&name)
    {
        return Err(GenerateError::Reserved(name.to_string()));
    }
    if KEYWORDS.contains(&name) {
        Ok(Ident::new_raw(name, Span::call_site()))
    } else {
        Ok(Ident::new(name, Span::call_site()))
    }
}

/// Identifier for the generated struct.
pub(crate) fn type_ident(name: &str) -> Result<Ident, GenerateError> {
    if !natbind_core::plan::is_symbol_name(name)
        || UNWRITABLE.contains(&name)
        || KEYWORDS.contains(&name)
    {
        return Err(GenerateError::InvalidName(name.to_string()));
    }
    Ok(Ident::new(name, Span::call_site()))
}

/// Identifier for the entry-point module.
pub(crate) fn module_ident(name: &str) -> Ident {
    let snake = snake_case(name);
    if KEYWORDS.contains(&snake.as_str()) {
        Ident::new_raw(&snake, Span::call_site())
    } else {
        Ident::new(&snake, Span::call_site())
    }
}

/// `MethodId` constant names, one per method, checked for collisions.
///
/// Constants live next to the stubs, so a constant whose name would equal
/// any method name (`ABC` for a method `ABC`) takes an `_ID` suffix.
pub(crate) fn const_idents<'a, I>(names: I) -> Result<Vec<Ident>, GenerateError>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&str> = names.into_iter().collect();
    let methods: BTreeSet<&str> = names.iter().copied().collect();
    let mut taken: BTreeMap<String, String> = RESERVED_CONSTS
        .iter()
        .chain(names.iter())
        .map(|c| (c.to_string(), c.to_string()))
        .collect();

    let mut idents = Vec::with_capacity(names.len());
    for name in names {
        let mut generated = screaming_snake_case(name);
        if methods.contains(generated.as_str()) {
            generated.push_str("_ID");
        }
        if let Some(first) = taken.insert(generated.clone(), name.to_string()) {
            return Err(GenerateError::NameCollision {
                first,
                second: name.to_string(),
                generated,
            });
        }
        idents.push(Ident::new(&generated, Span::call_site()));
    }
    Ok(idents)
}

fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_ascii_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).map_or(false, |n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `rpmtsCreate` -> `RPMTS_CREATE`. Leading underscores are kept.
pub(crate) fn screaming_snake_case(name: &str) -> String {
    let leading = name.len() - name.trim_start_matches('_').len();
    let words: Vec<String> = split_words(name)
        .into_iter()
        .map(|w| w.to_ascii_uppercase())
        .collect();
    format!("{}{}", "_".repeat(leading), words.join("_"))
}

/// `LibC` -> `lib_c`.
pub(crate) fn snake_case(name: &str) -> String {
    let words: Vec<String> = split_words(name)
        .into_iter()
        .map(|w| w.to_ascii_lowercase())
        .collect();
    words.join("_")
}

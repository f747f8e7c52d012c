//! Rust identifier casing and escaping.

use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};

/// Strict and reserved keywords, all editions.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be written as raw identifiers.
const NOT_RAW: &[&str] = &["self", "Self", "super", "crate"];

/// Prelude types a generated type must not shadow.
const PRELUDE_TYPES: &[&str] = &["Option", "Result", "String", "Vec", "Box", "Some", "None", "Ok", "Err"];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Escape a keyword: `r#type`, or `self_` where raw identifiers are not allowed.
pub fn escape(name: &str) -> String {
    if NOT_RAW.contains(&name) {
        format!("{name}_")
    } else if is_keyword(name) {
        format!("r#{name}")
    } else {
        name.to_string()
    }
}

pub fn to_member(name: &str) -> String {
    escape(&name.to_snake_case())
}

pub fn to_type(name: &str) -> String {
    let camel = name.to_upper_camel_case();
    if PRELUDE_TYPES.contains(&camel.as_str()) || NOT_RAW.contains(&camel.as_str()) {
        format!("{camel}_")
    } else {
        escape(&camel)
    }
}

pub fn to_constant(name: &str) -> String {
    escape(&name.to_shouty_snake_case())
}

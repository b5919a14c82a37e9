//! Identifier checks for names interpolated into SQL text.
//!
//! Schema names go into `SET search_path` verbatim, so they must be a plain
//! identifier (`[A-Za-z_][A-Za-z0-9_$]*`) or a double-quoted one.

use crate::error::{DbError, DbResult};

/// Validate a schema name and return it as SQL text.
pub fn schema_ident(name: &str) -> DbResult<String> {
    if name.is_empty() {
        return Err(DbError::validation("Schema name cannot be empty"));
    }
    if name.contains('\0') {
        return Err(DbError::validation(
            "Schema name cannot contain NUL character",
        ));
    }

    if let Some(inner) = name.strip_prefix('"') {
        let Some(inner) = inner.strip_suffix('"') else {
            return Err(DbError::validation("Unclosed quoted identifier"));
        };
        if inner.is_empty() {
            return Err(DbError::validation("Empty quoted identifier"));
        }
        // Inside quotes only doubled quotes are allowed.
        if inner.replace("\"\"", "").contains('"') {
            return Err(DbError::validation(format!(
                "Unescaped quote in identifier: {name}"
            )));
        }
        return Ok(name.to_string());
    }

    let mut chars = name.chars();
    let first = chars.next().unwrap_or_default();
    if !(first == '_' || first.is_ascii_alphabetic()) {
        return Err(DbError::validation(format!(
            "Invalid identifier start character: '{first}'"
        )));
    }
    if let Some(c) = chars.find(|&c| !(c == '_' || c == '$' || c.is_ascii_alphanumeric())) {
        return Err(DbError::validation(format!(
            "Invalid character in identifier: '{c}'"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_quoted() {
        assert_eq!(schema_ident("tenant_1").unwrap(), "tenant_1");
        assert_eq!(schema_ident("_x$").unwrap(), "_x$");
        assert_eq!(schema_ident(r#""My Schema""#).unwrap(), r#""My Schema""#);
        assert_eq!(schema_ident(r#""a""b""#).unwrap(), r#""a""b""#);
    }

    #[test]
    fn rejects_injection_attempts() {
        assert!(schema_ident("public; DROP TABLE users").is_err());
        assert!(schema_ident("1abc").is_err());
        assert!(schema_ident("a.b").is_err());
        assert!(schema_ident("").is_err());
        assert!(schema_ident(r#""open"#).is_err());
        assert!(schema_ident(r#""a"b""#).is_err());
        assert!(schema_ident(r#""""#).is_err());
    }
}

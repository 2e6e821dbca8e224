// src/core/store/identifier.rs

//! Allow-list validation for values spliced into account statements.
//!
//! `CREATE USER`, `GRANT` and `DROP USER` take no placeholders, so every user, host,
//! privilege and password is checked or escaped here before it reaches a statement.

use crate::core::errors::OtuError;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref USER_RE: Regex = Regex::new(r"^[A-Za-z0-9_.@-]{1,80}$").unwrap();
    static ref HOST_RE: Regex = Regex::new(r"^[A-Za-z0-9_.%:/-]{1,60}$").unwrap();
    static ref SCHEMA_RE: Regex = Regex::new(r"^[A-Za-z0-9_]{1,64}$").unwrap();
    static ref LEVEL_RE: Regex = {
        let ident = r"(?:`[A-Za-z0-9_$-]{1,64}`|[A-Za-z0-9_$]{1,64})";
        Regex::new(&format!(r"^(?:\*|\*\.\*|{ident}\.\*|{ident}\.{ident}|{ident})$")).unwrap()
    };
}

/// Static privileges accepted in a `priv_type` property.
const KNOWN_PRIVILEGES: &[&str] = &[
    "ALL",
    "ALL PRIVILEGES",
    "ALTER",
    "ALTER ROUTINE",
    "CREATE",
    "CREATE ROUTINE",
    "CREATE TEMPORARY TABLES",
    "CREATE VIEW",
    "DELETE",
    "DROP",
    "EVENT",
    "EXECUTE",
    "INDEX",
    "INSERT",
    "LOCK TABLES",
    "PROCESS",
    "REFERENCES",
    "RELOAD",
    "REPLICATION CLIENT",
    "REPLICATION SLAVE",
    "SELECT",
    "SHOW DATABASES",
    "SHOW VIEW",
    "TRIGGER",
    "UPDATE",
    "USAGE",
];

fn invalid(kind: &'static str, value: &str) -> OtuError {
    OtuError::InvalidIdentifier {
        kind,
        value: value.to_string(),
    }
}

pub fn validate_user(user: &str) -> Result<&str, OtuError> {
    if USER_RE.is_match(user) {
        Ok(user)
    } else {
        Err(invalid("user", user))
    }
}

pub fn validate_host(host: &str) -> Result<&str, OtuError> {
    if HOST_RE.is_match(host) {
        Ok(host)
    } else {
        Err(invalid("host", host))
    }
}

pub fn validate_schema(schema: &str) -> Result<&str, OtuError> {
    if SCHEMA_RE.is_match(schema) {
        Ok(schema)
    } else {
        Err(invalid("schema", schema))
    }
}

/// Normalizes a comma-separated privilege list (`"select, insert"` -> `"SELECT, INSERT"`),
/// rejecting anything that is not a known static privilege.
pub fn normalize_privilege_type(privilege_type: &str) -> Result<String, OtuError> {
    let mut privileges = Vec::new();
    for part in privilege_type.split(',') {
        let normalized = part
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        if !KNOWN_PRIVILEGES.contains(&normalized.as_str()) {
            return Err(invalid("privilege type", privilege_type));
        }
        privileges.push(normalized);
    }
    Ok(privileges.join(", "))
}

/// Accepts `*`, `*.*`, `db.*`, `db.table` and `table`, with optional backtick quoting.
pub fn validate_privilege_level(level: &str) -> Result<&str, OtuError> {
    if LEVEL_RE.is_match(level) {
        Ok(level)
    } else {
        Err(invalid("privilege level", level))
    }
}

/// Escapes a password for use inside a single-quoted SQL string literal.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("''"),
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders a validated `'user'@'host'` account name.
pub fn account_name(user: &str, host: &str) -> Result<String, OtuError> {
    Ok(format!("'{}'@'{}'", validate_user(user)?, validate_host(host)?))
}

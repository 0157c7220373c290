//! Best-effort classification of SQL text for event naming.
//!
//! Only used to label log events. Statements are never rewritten.

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading verb of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOperation {
    Select,
    Insert,
    Replace,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    Truncate,
    Begin,
    Commit,
    Rollback,
    Set,
    Other,
}

// (keyword, operation); first match wins
const KEYWORDS: &[(&str, SqlOperation)] = &[
    ("SELECT", SqlOperation::Select),
    ("WITH", SqlOperation::Select),
    ("SHOW", SqlOperation::Select),
    ("INSERT", SqlOperation::Insert),
    ("REPLACE", SqlOperation::Replace),
    ("UPDATE", SqlOperation::Update),
    ("DELETE", SqlOperation::Delete),
    ("CREATE", SqlOperation::Create),
    ("DROP", SqlOperation::Drop),
    ("ALTER", SqlOperation::Alter),
    ("TRUNCATE", SqlOperation::Truncate),
    ("BEGIN", SqlOperation::Begin),
    ("START", SqlOperation::Begin),
    ("COMMIT", SqlOperation::Commit),
    ("ROLLBACK", SqlOperation::Rollback),
    ("SET", SqlOperation::Set),
];

impl SqlOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlOperation::Select => "SELECT",
            SqlOperation::Insert => "INSERT",
            SqlOperation::Replace => "REPLACE",
            SqlOperation::Update => "UPDATE",
            SqlOperation::Delete => "DELETE",
            SqlOperation::Create => "CREATE",
            SqlOperation::Drop => "DROP",
            SqlOperation::Alter => "ALTER",
            SqlOperation::Truncate => "TRUNCATE",
            SqlOperation::Begin => "BEGIN",
            SqlOperation::Commit => "COMMIT",
            SqlOperation::Rollback => "ROLLBACK",
            SqlOperation::Set => "SET",
            SqlOperation::Other => "QUERY",
        }
    }

    /// Classify by the first keyword of `sql`.
    pub fn of(sql: &str) -> Self {
        let word = sql
            .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or_default();

        KEYWORDS
            .iter()
            .find(|(kw, _)| kw.eq_ignore_ascii_case(word))
            .map_or(SqlOperation::Other, |(_, op)| *op)
    }
}

impl std::fmt::Display for SqlOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// table name after the clause that introduces it, optionally quoted
static TABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?ix)
        \b(?:
            FROM
          | INTO
          | UPDATE
          | TABLE (?:\s+IF\s+(?:NOT\s+)?EXISTS)?
          | TRUNCATE
        )
        \s+ [`"\[]? (\w+) [`"\]]?"#,
    )
    .expect("table regex is valid")
});

/// Primary table of `sql`, lowercased, when one can be spotted.
pub fn extract_table(sql: &str) -> Option<String> {
    match SqlOperation::of(sql) {
        SqlOperation::Begin
        | SqlOperation::Commit
        | SqlOperation::Rollback
        | SqlOperation::Set
        | SqlOperation::Other => None,
        _ => TABLE_REGEX
            .captures(sql)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase()),
    }
}

/// Operation and table of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSql {
    pub operation: SqlOperation,
    pub table: Option<String>,
}

impl ParsedSql {
    pub fn parse(sql: &str) -> Self {
        Self {
            operation: SqlOperation::of(sql),
            table: extract_table(sql),
        }
    }

    /// `"{OPERATION} {table}"`, or just the operation.
    pub fn summary(&self) -> String {
        match &self.table {
            Some(table) => format!("{} {}", self.operation, table),
            None => self.operation.as_str().to_string(),
        }
    }
}

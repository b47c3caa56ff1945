//! Statement-shape classifiers.
//!
//! All regexes are compiled once in `SqlShapes::new()`. Every
//! classifier returns `Option`/empty on non-matching input.

use regex::Regex;

/// Coarse statement classification for the transaction state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Begin,
    Commit,
    Rollback,
    /// Session flush marker emitted by the capture layer, either a
    /// bare `flush` statement or a `/* flush */` comment.
    Flush,
    Other,
}

/// Normalized join type. `LEFT OUTER`/`RIGHT OUTER` collapse to
/// `Left`/`Right`; a bare `JOIN` is `Inner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Cross => "CROSS",
        }
    }
}

/// A single-row-by-primary-key lookup shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLookup {
    pub table: String,
}

/// One extracted JOIN fragment.
#[derive(Debug, Clone)]
pub struct JoinFragment {
    pub kind: JoinKind,
    pub table: String,
    pub alias: Option<String>,
    /// Byte range of the matched fragment within the statement text.
    pub start: usize,
    pub end: usize,
}

impl JoinFragment {
    /// The verbatim matched substring.
    pub fn span_text<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// Words that can follow a join target but are never an alias.
const NON_ALIAS_WORDS: &[&str] = &[
    "on", "using", "where", "inner", "left", "right", "outer", "cross", "full", "join", "group",
    "order", "limit", "having", "set", "union",
];

/// Compiled shape classifiers.
pub struct SqlShapes {
    begin: Regex,
    commit: Regex,
    rollback: Regex,
    flush: Regex,
    select: Regex,
    key_lookup: Regex,
    join: Regex,
    on_boundary: Regex,
    limit: Vec<Regex>,
    projection_alias: Regex,
}

impl SqlShapes {
    pub fn new() -> Self {
        Self {
            begin: Regex::new(r"(?i)^\s*(?:begin|start\s+transaction)\b").unwrap(),
            commit: Regex::new(r"(?i)^\s*commit\b").unwrap(),
            rollback: Regex::new(r"(?i)^\s*rollback\b").unwrap(),
            flush: Regex::new(r"(?i)^\s*flush\b|/\*\s*flush\s*\*/").unwrap(),
            select: Regex::new(r"(?i)^\s*select\b").unwrap(),
            key_lookup: Regex::new(
                r#"(?is)^\s*select\b.*?\bfrom\s+[`"\[]?(\w+)[`"\]]?.*\bwhere\b.*?(?:\w+\.)?\bid\s*=\s*(?:\?|\$\d+|:\w+)"#,
            )
            .unwrap(),
            join: Regex::new(
                r#"(?i)\b(left\s+outer\s+join|left\s+join|right\s+outer\s+join|right\s+join|inner\s+join|cross\s+join|join)\s+[`"\[]?(\w+)[`"\]]?(?:\s+(?:as\s+)?([A-Za-z_]\w*))?"#,
            )
            .unwrap(),
            on_boundary: Regex::new(
                r"(?i)\b(?:where|group\s+by|order\s+by|limit|having|inner|left|right|cross|join|union)\b",
            )
            .unwrap(),
            limit: vec![
                Regex::new(r"(?i)\blimit\s+(\d+)").unwrap(),
                Regex::new(r"(?i)\bselect\s+(?:distinct\s+)?top\s+(\d+)").unwrap(),
                Regex::new(r"(?i)\bfetch\s+first\s+(\d+)").unwrap(),
                Regex::new(r"(?i)\brownum\s*<=?\s*(\d+)").unwrap(),
            ],
            projection_alias: Regex::new(r"\b([A-Za-z]\w*_)\.").unwrap(),
        }
    }

    /// Classify a statement for the transaction state machine.
    pub fn statement_kind(&self, text: &str) -> StatementKind {
        if self.flush.is_match(text) {
            StatementKind::Flush
        } else if self.begin.is_match(text) {
            StatementKind::Begin
        } else if self.commit.is_match(text) {
            StatementKind::Commit
        } else if self.rollback.is_match(text) {
            StatementKind::Rollback
        } else if self.select.is_match(text) {
            StatementKind::Select
        } else {
            StatementKind::Other
        }
    }

    pub fn is_select(&self, text: &str) -> bool {
        self.select.is_match(text)
    }

    /// Match the "select … from t … where … id = ?" single-row shape.
    pub fn key_lookup(&self, text: &str) -> Option<KeyLookup> {
        self.key_lookup.captures(text).map(|caps| KeyLookup {
            table: caps[1].to_ascii_lowercase(),
        })
    }

    /// Extract every JOIN fragment, in statement order.
    pub fn joins(&self, text: &str) -> Vec<JoinFragment> {
        let mut fragments = Vec::new();
        for caps in self.join.captures_iter(text) {
            let whole = caps.get(0).unwrap();
            let keyword = caps[1].to_ascii_lowercase();
            let kind = if keyword.starts_with("left") {
                JoinKind::Left
            } else if keyword.starts_with("right") {
                JoinKind::Right
            } else if keyword.starts_with("cross") {
                JoinKind::Cross
            } else {
                JoinKind::Inner
            };
            let alias = caps.get(3).map(|m| m.as_str().to_string()).filter(|a| {
                !NON_ALIAS_WORDS.contains(&a.to_ascii_lowercase().as_str())
            });
            // When the alias capture swallowed a clause keyword, the
            // fragment ends at the table name instead.
            let end = match (&alias, caps.get(3)) {
                (Some(_), Some(m)) => m.end(),
                _ => caps.get(2).unwrap().end(),
            };
            fragments.push(JoinFragment {
                kind,
                table: caps[2].to_ascii_lowercase(),
                alias,
                start: whole.start(),
                end,
            });
        }
        fragments
    }

    /// Byte range of the ON-clause text following a join fragment,
    /// ending at the next clause keyword or end of statement.
    fn on_clause_span(&self, text: &str, fragment: &JoinFragment) -> Option<(usize, usize)> {
        let rest = text.get(fragment.end..)?;
        let trimmed = rest.trim_start();
        let lowered = trimmed.get(..2).map(|s| s.to_ascii_lowercase());
        if lowered.as_deref() != Some("on") {
            return None;
        }
        let after_on = &trimmed[2..];
        if !after_on.starts_with([' ', '\t', '\n', '(']) {
            return None;
        }
        let start = fragment.end + (rest.len() - trimmed.len()) + 2;
        let end = match self.on_boundary.find(after_on) {
            Some(m) => start + m.start(),
            None => text.len(),
        };
        Some((start, end))
    }

    /// The ON-clause text immediately following a join fragment, up
    /// to the next clause keyword or end of statement.
    pub fn on_clause_after<'a>(&self, text: &'a str, fragment: &JoinFragment) -> Option<&'a str> {
        let (start, end) = self.on_clause_span(text, fragment)?;
        let clause = text[start..end].trim();
        if clause.is_empty() {
            None
        } else {
            Some(clause)
        }
    }

    /// Whether `alias.` is referenced anywhere outside the join
    /// fragment itself. The fragment's own ON clause belongs to the
    /// fragment and does not count as usage.
    pub fn alias_used_outside_join(&self, text: &str, fragment: &JoinFragment, alias: &str) -> bool {
        let fragment_end = self
            .on_clause_span(text, fragment)
            .map(|(_, end)| end)
            .unwrap_or(fragment.end);
        let mut remainder = String::with_capacity(text.len());
        remainder.push_str(&text[..fragment.start]);
        remainder.push_str(&text[fragment_end..]);
        let needle = format!("{}.", alias.to_ascii_lowercase());
        remainder.to_ascii_lowercase().contains(&needle)
    }

    /// Numeric row limit, when the statement carries one.
    pub fn row_limit(&self, text: &str) -> Option<u64> {
        for re in &self.limit {
            if let Some(caps) = re.captures(text) {
                if let Ok(n) = caps[1].parse() {
                    return Some(n);
                }
            }
        }
        None
    }

    /// Distinct `alias0_.column`-style prefixes in the projection
    /// list, in order of first appearance.
    pub fn projection_alias_prefixes(&self, text: &str) -> Vec<String> {
        let lowered = text.to_ascii_lowercase();
        let select_pos = match lowered.find("select") {
            Some(pos) => pos + "select".len(),
            None => return Vec::new(),
        };
        let from_pos = match lowered[select_pos..].find(" from ") {
            Some(pos) => select_pos + pos,
            None => return Vec::new(),
        };
        let projection = &text[select_pos..from_pos];
        let mut prefixes: Vec<String> = Vec::new();
        for caps in self.projection_alias.captures_iter(projection) {
            let prefix = caps[1].to_ascii_lowercase();
            if !prefixes.contains(&prefix) {
                prefixes.push(prefix);
            }
        }
        prefixes
    }
}

impl Default for SqlShapes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transaction_statements() {
        let shapes = SqlShapes::new();
        assert_eq!(shapes.statement_kind("BEGIN"), StatementKind::Begin);
        assert_eq!(shapes.statement_kind("start transaction"), StatementKind::Begin);
        assert_eq!(shapes.statement_kind("COMMIT;"), StatementKind::Commit);
        assert_eq!(shapes.statement_kind("rollback"), StatementKind::Rollback);
        assert_eq!(shapes.statement_kind("flush"), StatementKind::Flush);
        assert_eq!(shapes.statement_kind("/* flush */ update users set a = 1"), StatementKind::Flush);
        assert_eq!(shapes.statement_kind("select * from users"), StatementKind::Select);
        assert_eq!(shapes.statement_kind("update users set a = 1"), StatementKind::Other);
    }

    #[test]
    fn key_lookup_matches_select_by_id() {
        let shapes = SqlShapes::new();
        let lookup = shapes
            .key_lookup("select u.id, u.name from users u where u.id = ?")
            .unwrap();
        assert_eq!(lookup.table, "users");

        assert!(shapes.key_lookup("select * from orders where id = $1").is_some());
        assert!(shapes.key_lookup("select * from orders where id = :id").is_some());
        // Not a key lookup: no placeholder, range predicate, non-select.
        assert!(shapes.key_lookup("select * from orders where id = 42").is_none());
        assert!(shapes.key_lookup("select * from orders where id > ?").is_none());
        assert!(shapes.key_lookup("delete from orders where id = ?").is_none());
    }

    #[test]
    fn join_kinds_normalize() {
        let shapes = SqlShapes::new();
        let text = "select * from a \
                    left outer join b b1 on b1.a_id = a.id \
                    right join c on c.a_id = a.id \
                    inner join d d1 on d1.a_id = a.id \
                    join e on e.a_id = a.id";
        let joins = shapes.joins(text);
        assert_eq!(joins.len(), 4);
        assert_eq!(joins[0].kind, JoinKind::Left);
        assert_eq!(joins[0].table, "b");
        assert_eq!(joins[0].alias.as_deref(), Some("b1"));
        assert_eq!(joins[0].span_text(text), "left outer join b b1");
        assert_eq!(joins[1].kind, JoinKind::Right);
        assert_eq!(joins[1].alias, None);
        assert_eq!(joins[1].span_text(text), "right join c");
        assert_eq!(joins[2].kind, JoinKind::Inner);
        assert_eq!(joins[3].kind, JoinKind::Inner);
        assert_eq!(joins[3].table, "e");
    }

    #[test]
    fn join_alias_never_captures_clause_keyword() {
        let shapes = SqlShapes::new();
        let joins = shapes.joins("select * from a join b on b.a_id = a.id where a.x = 1");
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].alias, None);
    }

    #[test]
    fn on_clause_stops_at_next_keyword() {
        let shapes = SqlShapes::new();
        let text = "select * from users u left join orders o on o.user_id = u.id where u.active = 1";
        let joins = shapes.joins(text);
        let on = shapes.on_clause_after(text, &joins[0]).unwrap();
        assert_eq!(on, "o.user_id = u.id");

        let text = "select * from users u left join orders o on o.user_id = u.id";
        let joins = shapes.joins(text);
        assert_eq!(shapes.on_clause_after(text, &joins[0]).unwrap(), "o.user_id = u.id");
    }

    #[test]
    fn alias_usage_excludes_the_fragment_and_its_on_clause() {
        let shapes = SqlShapes::new();
        // `o.` only appears inside the fragment's own ON clause.
        let text = "select u.name from users u join orders o on o.user_id = u.id";
        let joins = shapes.joins(text);
        assert!(!shapes.alias_used_outside_join(text, &joins[0], "o"));

        // A reference in WHERE counts as consumption.
        let text = "select u.name from users u join orders o on o.user_id = u.id where o.status = 'x'";
        let joins = shapes.joins(text);
        assert!(shapes.alias_used_outside_join(text, &joins[0], "o"));

        // So does a projected column.
        let text = "select o.total from users u join orders o on o.user_id = u.id";
        let joins = shapes.joins(text);
        assert!(shapes.alias_used_outside_join(text, &joins[0], "o"));
    }

    #[test]
    fn row_limit_recognizes_dialect_variants() {
        let shapes = SqlShapes::new();
        assert_eq!(shapes.row_limit("select * from t limit 25"), Some(25));
        assert_eq!(shapes.row_limit("select top 5 * from t"), Some(5));
        assert_eq!(shapes.row_limit("select * from t fetch first 10 rows only"), Some(10));
        assert_eq!(shapes.row_limit("select * from t where rownum <= 3"), Some(3));
        assert_eq!(shapes.row_limit("select * from t"), None);
    }

    #[test]
    fn projection_prefixes_only_scan_the_select_list() {
        let shapes = SqlShapes::new();
        let text = "select p0_.id, p0_.name, p1_.id from posts p0_ \
                    left join comments p1_ on p1_.post_id = p0_.id limit 1";
        assert_eq!(shapes.projection_alias_prefixes(text), vec!["p0_", "p1_"]);

        let text = "select p0_.id, p0_.name from posts p0_ \
                    left join comments p1_ on p1_.post_id = p0_.id limit 1";
        assert_eq!(shapes.projection_alias_prefixes(text), vec!["p0_"]);
    }
}

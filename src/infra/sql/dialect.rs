use std::fmt::Debug;

use crate::domain::entities::field::ColumnRef;
use crate::domain::entities::filter::FullTextMode;
use crate::domain::entities::predicate::Predicate;

/// SQL spelling of one backend.
///
/// Every literal a dialect writes goes through [`Dialect::quote_value`] and
/// every identifier through [`Dialect::quote_identifier`].
pub trait Dialect: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn quote_identifier(&self, ident: &str) -> String;

    fn quote_value(&self, value: &str) -> String;

    /// `LIMIT`/`OFFSET` tail; `count` of `None` means unbounded.
    fn limit_clause(&self, count: Option<u64>, offset: u64) -> String;

    fn set_contains(&self, column: &str, member: &str) -> String;

    fn full_text(&self, columns: &[String], term: &str, mode: FullTextMode) -> String;

    fn column(&self, column: &ColumnRef) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(&column.alias),
            self.quote_identifier(&column.column)
        )
    }

    fn like(&self, operand: &str, pattern: &str) -> String {
        format!(
            "{operand} LIKE {} ESCAPE {}",
            self.quote_value(pattern),
            self.quote_value("\\")
        )
    }

    fn render_predicate(&self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Compare { column, op, value } => format!(
                "{} {} {}",
                self.column(column),
                op.as_sql(),
                self.quote_value(value)
            ),
            Predicate::Like { column, pattern } => self.like(&self.column(column), pattern),
            Predicate::SetContains { column, member } => {
                self.set_contains(&self.column(column), member)
            }
            Predicate::FullText {
                columns,
                term,
                mode,
            } => {
                let columns = columns
                    .iter()
                    .map(|column| self.column(column))
                    .collect::<Vec<_>>();
                self.full_text(&columns, term, *mode)
            }
            Predicate::Raw(sql) => format!("({sql})"),
        }
    }
}

/// Escapes `LIKE` wildcards so `value` matches literally (escape char `\`).
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TermKind {
    Required,
    Excluded,
    Optional,
}

/// Splits a boolean-mode search string into `+word`, `-word`, `"phrase"` terms.
fn boolean_terms(term: &str) -> Vec<(TermKind, String)> {
    let mut terms = Vec::new();
    let mut chars = term.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = match ch {
            '+' => {
                chars.next();
                TermKind::Required
            }
            '-' => {
                chars.next();
                TermKind::Excluded
            }
            _ => TermKind::Optional,
        };

        let mut word = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            for next in chars.by_ref() {
                if next == '"' {
                    break;
                }
                word.push(next);
            }
        } else {
            while let Some(&next) = chars.peek() {
                if next.is_whitespace() {
                    break;
                }
                word.push(next);
                chars.next();
            }
        }

        let word = word
            .trim_matches(|c: char| matches!(c, '*' | '(' | ')' | '~' | '<' | '>' | '"'))
            .trim()
            .to_string();
        if !word.is_empty() {
            terms.push((kind, word));
        }
    }

    terms
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqliteDialect;

impl SqliteDialect {
    fn haystack(&self, columns: &[String]) -> String {
        let parts = columns
            .iter()
            .map(|column| format!("COALESCE({column}, '')"))
            .collect::<Vec<_>>();
        format!("({})", parts.join(" || ' ' || "))
    }

    fn contains(&self, haystack: &str, word: &str) -> String {
        self.like(haystack, &format!("%{}%", escape_like(word)))
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn quote_value(&self, value: &str) -> String {
        format!("'{}'", value.replace('\0', "").replace('\'', "''"))
    }

    fn limit_clause(&self, count: Option<u64>, offset: u64) -> String {
        match count {
            Some(count) => format!("LIMIT {count} OFFSET {offset}"),
            None if offset > 0 => format!("LIMIT -1 OFFSET {offset}"),
            None => String::new(),
        }
    }

    fn set_contains(&self, column: &str, member: &str) -> String {
        self.like(
            &format!("(',' || COALESCE({column}, '') || ',')"),
            &format!("%,{},%", escape_like(member)),
        )
    }

    /// SQLite has no `MATCH ... AGAINST` on ordinary tables, so matching is
    /// emulated with `LIKE` over the concatenated columns.
    fn full_text(&self, columns: &[String], term: &str, mode: FullTextMode) -> String {
        let haystack = self.haystack(columns);

        match mode {
            FullTextMode::Boolean => {
                let terms = boolean_terms(term);
                let mut clauses = Vec::new();
                let mut optional = Vec::new();
                let mut has_required = false;

                for (kind, word) in &terms {
                    match kind {
                        TermKind::Required => {
                            has_required = true;
                            clauses.push(self.contains(&haystack, word));
                        }
                        TermKind::Excluded => {
                            clauses.push(format!("NOT ({})", self.contains(&haystack, word)));
                        }
                        TermKind::Optional => optional.push(self.contains(&haystack, word)),
                    }
                }

                if !has_required {
                    if optional.is_empty() {
                        // Only exclusions: boolean mode matches nothing.
                        return "1 = 0".to_string();
                    }
                    clauses.push(format!("({})", optional.join(" OR ")));
                }

                format!("({})", clauses.join(" AND "))
            }
            FullTextMode::QueryExpansion => {
                let words = term
                    .split_whitespace()
                    .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
                    .filter(|word| !word.is_empty())
                    .map(|word| self.contains(&haystack, word))
                    .collect::<Vec<_>>();
                if words.is_empty() {
                    return "1 = 0".to_string();
                }
                format!("({})", words.join(" OR "))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn quote_value(&self, value: &str) -> String {
        let mut quoted = String::with_capacity(value.len() + 2);
        quoted.push('\'');
        for ch in value.chars() {
            match ch {
                '\0' => quoted.push_str("\\0"),
                '\n' => quoted.push_str("\\n"),
                '\r' => quoted.push_str("\\r"),
                '\u{1a}' => quoted.push_str("\\Z"),
                '\\' | '\'' | '"' => {
                    quoted.push('\\');
                    quoted.push(ch);
                }
                _ => quoted.push(ch),
            }
        }
        quoted.push('\'');
        quoted
    }

    fn limit_clause(&self, count: Option<u64>, offset: u64) -> String {
        match count {
            Some(count) => format!("LIMIT {offset}, {count}"),
            None if offset > 0 => format!("LIMIT {offset}, {}", u64::MAX),
            None => String::new(),
        }
    }

    fn set_contains(&self, column: &str, member: &str) -> String {
        format!("FIND_IN_SET({}, {column}) > 0", self.quote_value(member))
    }

    fn full_text(&self, columns: &[String], term: &str, mode: FullTextMode) -> String {
        let modifier = match mode {
            FullTextMode::Boolean => "IN BOOLEAN MODE",
            FullTextMode::QueryExpansion => "WITH QUERY EXPANSION",
        };
        format!(
            "MATCH ({}) AGAINST ({} {modifier})",
            columns.join(", "),
            self.quote_value(term)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::predicate::CompareOp;

    fn name_column() -> ColumnRef {
        ColumnRef::new("c", "name")
    }

    #[test]
    fn sqlite_quote_value_doubles_single_quotes() {
        let dialect = SqliteDialect;
        assert_eq!(dialect.quote_value("O'Brien"), "'O''Brien'");
        assert_eq!(
            dialect.quote_value("x' OR '1'='1"),
            "'x'' OR ''1''=''1'"
        );
        assert_eq!(dialect.quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn mysql_quote_value_escapes_backslashes_and_quotes() {
        let dialect = MySqlDialect;
        assert_eq!(dialect.quote_value("it's"), "'it\\'s'");
        assert_eq!(dialect.quote_value("a\\' OR 1=1 -- "), "'a\\\\\\' OR 1=1 -- '");
        assert_eq!(dialect.quote_identifier("na`me"), "`na``me`");
    }

    #[test]
    fn compare_predicate_quotes_operand() {
        let predicate = Predicate::Compare {
            column: name_column(),
            op: CompareOp::Eq,
            value: "Zé's".to_string(),
        };
        assert_eq!(
            SqliteDialect.render_predicate(&predicate),
            "\"c\".\"name\" = 'Zé''s'"
        );
    }

    #[test]
    fn mysql_full_text_uses_native_modes() {
        let predicate = Predicate::FullText {
            columns: vec![name_column(), ColumnRef::new("c", "region")],
            term: "+euro -asia".to_string(),
            mode: FullTextMode::Boolean,
        };
        assert_eq!(
            MySqlDialect.render_predicate(&predicate),
            "MATCH (`c`.`name`, `c`.`region`) AGAINST ('+euro -asia' IN BOOLEAN MODE)"
        );

        let predicate = Predicate::FullText {
            columns: vec![name_column()],
            term: "database".to_string(),
            mode: FullTextMode::QueryExpansion,
        };
        assert_eq!(
            MySqlDialect.render_predicate(&predicate),
            "MATCH (`c`.`name`) AGAINST ('database' WITH QUERY EXPANSION)"
        );
    }

    #[test]
    fn boolean_terms_split_operators_and_phrases() {
        assert_eq!(
            boolean_terms("+apple -\"red fruit\" pear*"),
            vec![
                (TermKind::Required, "apple".to_string()),
                (TermKind::Excluded, "red fruit".to_string()),
                (TermKind::Optional, "pear".to_string()),
            ]
        );
    }

    #[test]
    fn sqlite_boolean_with_only_exclusions_matches_nothing() {
        assert_eq!(
            SqliteDialect.full_text(&["\"c\".\"name\"".to_string()], "-spam", FullTextMode::Boolean),
            "1 = 0"
        );
    }

    #[test]
    fn escape_like_protects_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn limit_clauses_match_backend_syntax() {
        assert_eq!(SqliteDialect.limit_clause(Some(10), 20), "LIMIT 10 OFFSET 20");
        assert_eq!(SqliteDialect.limit_clause(None, 5), "LIMIT -1 OFFSET 5");
        assert_eq!(SqliteDialect.limit_clause(None, 0), "");
        assert_eq!(MySqlDialect.limit_clause(Some(10), 20), "LIMIT 20, 10");
    }
}

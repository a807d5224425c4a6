use crate::domain::entities::field::ColumnRef;
use crate::domain::entities::filter::FullTextMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    /// Splits a leading comparison operator off a raw filter value.
    pub fn split_prefix(raw: &str) -> (CompareOp, &str) {
        let raw = raw.trim();
        for (prefix, op) in [
            (">=", CompareOp::Ge),
            ("<=", CompareOp::Le),
            ("!=", CompareOp::Ne),
            ("<>", CompareOp::Ne),
            (">", CompareOp::Gt),
            ("<", CompareOp::Lt),
            ("=", CompareOp::Eq),
        ] {
            if let Some(rest) = raw.strip_prefix(prefix) {
                return (op, rest.trim());
            }
        }
        (CompareOp::Eq, raw)
    }
}

/// Backend-neutral predicate; literals are quoted only when a dialect renders it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    Compare {
        column: ColumnRef,
        op: CompareOp,
        value: String,
    },
    /// `pattern` uses `%` and `_` wildcards with `\` as escape.
    Like { column: ColumnRef, pattern: String },
    SetContains { column: ColumnRef, member: String },
    FullText {
        columns: Vec<ColumnRef>,
        term: String,
        mode: FullTextMode,
    },
    /// Trusted SQL supplied by the application, never by grid users.
    Raw(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_prefix_prefers_longest_operator() {
        assert_eq!(CompareOp::split_prefix(">= 10"), (CompareOp::Ge, "10"));
        assert_eq!(CompareOp::split_prefix("<>x"), (CompareOp::Ne, "x"));
        assert_eq!(CompareOp::split_prefix("<3"), (CompareOp::Lt, "3"));
        assert_eq!(CompareOp::split_prefix("active"), (CompareOp::Eq, "active"));
    }
}

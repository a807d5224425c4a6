use crate::domain::entities::field::{ColumnInfo, ColumnRef, TypeKind};
use crate::domain::entities::filter::FullTextSearch;
use crate::domain::entities::predicate::{CompareOp, Predicate};
use crate::infra::sql::dialect::escape_like;

/// Builds the predicate for a scalar filter value, or `None` when the value
/// must be ignored (blank, not a legal enum member, not a number for a
/// numeric column).
pub fn scalar_condition(column: &ColumnRef, info: &ColumnInfo, raw: &str) -> Option<Predicate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match info.kind {
        TypeKind::Enum => {
            let member = allowed_member(info, raw)?;
            Some(Predicate::Compare {
                column: column.clone(),
                op: CompareOp::Eq,
                value: member,
            })
        }
        TypeKind::Set => {
            let member = allowed_member(info, raw)?;
            Some(Predicate::SetContains {
                column: column.clone(),
                member,
            })
        }
        _ => {
            let (op, operand) = CompareOp::split_prefix(raw);
            if operand.is_empty() {
                return None;
            }

            if op == CompareOp::Eq && operand.contains('*') {
                let pattern = operand
                    .split('*')
                    .map(escape_like)
                    .collect::<Vec<_>>()
                    .join("%");
                return Some(Predicate::Like {
                    column: column.clone(),
                    pattern,
                });
            }

            if info.kind.is_numeric() && !operand.parse::<f64>().is_ok_and(f64::is_finite) {
                return None;
            }

            Some(Predicate::Compare {
                column: column.clone(),
                op,
                value: operand.to_string(),
            })
        }
    }
}

/// Matches `raw` against the declared members, exactly first, then ignoring case.
fn allowed_member(info: &ColumnInfo, raw: &str) -> Option<String> {
    info.allowed_values
        .iter()
        .find(|member| member.as_str() == raw)
        .or_else(|| {
            info.allowed_values
                .iter()
                .find(|member| member.eq_ignore_ascii_case(raw))
        })
        .cloned()
}

/// Full-text predicate over already-resolved index columns.
pub fn full_text_condition(columns: Vec<ColumnRef>, search: &FullTextSearch) -> Option<Predicate> {
    let has_word = search
        .term
        .split_whitespace()
        .any(|word| word.chars().any(char::is_alphanumeric));
    if columns.is_empty() || !has_word {
        return None;
    }

    Some(Predicate::FullText {
        columns,
        term: search.term.trim().to_string(),
        mode: search.mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::filter::FullTextMode;

    fn column_info(kind: TypeKind, allowed: &[&str]) -> ColumnInfo {
        ColumnInfo {
            name: "status".to_string(),
            declared_type: kind.as_str().to_string(),
            kind,
            not_null: false,
            pk_position: 0,
            allowed_values: allowed.iter().map(|value| value.to_string()).collect(),
        }
    }

    fn status() -> ColumnRef {
        ColumnRef::new("t", "status")
    }

    #[test]
    fn blank_value_builds_nothing() {
        let info = column_info(TypeKind::Varchar, &[]);
        assert_eq!(scalar_condition(&status(), &info, "  "), None);
        assert_eq!(scalar_condition(&status(), &info, ">="), None);
    }

    #[test]
    fn text_value_builds_equality() {
        let info = column_info(TypeKind::Varchar, &[]);
        assert_eq!(
            scalar_condition(&status(), &info, "active"),
            Some(Predicate::Compare {
                column: status(),
                op: CompareOp::Eq,
                value: "active".to_string(),
            })
        );
    }

    #[test]
    fn wildcard_switches_to_pattern_match() {
        let info = column_info(TypeKind::Text, &[]);
        assert_eq!(
            scalar_condition(&status(), &info, "ac*_ve*"),
            Some(Predicate::Like {
                column: status(),
                pattern: "ac%\\_ve%".to_string(),
            })
        );
    }

    #[test]
    fn enum_value_outside_declared_members_is_dropped() {
        let info = column_info(TypeKind::Enum, &["Yes", "No"]);
        assert_eq!(scalar_condition(&status(), &info, "Maybe"), None);
        assert_eq!(
            scalar_condition(&status(), &info, "yes"),
            Some(Predicate::Compare {
                column: status(),
                op: CompareOp::Eq,
                value: "Yes".to_string(),
            })
        );
    }

    #[test]
    fn set_member_builds_membership_predicate() {
        let info = column_info(TypeKind::Set, &["red", "green"]);
        assert_eq!(
            scalar_condition(&status(), &info, "green"),
            Some(Predicate::SetContains {
                column: status(),
                member: "green".to_string(),
            })
        );
        assert_eq!(scalar_condition(&status(), &info, "blue"), None);
    }

    #[test]
    fn numeric_column_rejects_non_numbers() {
        let info = column_info(TypeKind::Int, &[]);
        assert_eq!(scalar_condition(&status(), &info, "ten"), None);
        for non_finite in ["inf", "-infinity", "NaN", "> inf"] {
            assert_eq!(scalar_condition(&status(), &info, non_finite), None, "{non_finite}");
        }
        assert_eq!(
            scalar_condition(&status(), &info, ">= 10"),
            Some(Predicate::Compare {
                column: status(),
                op: CompareOp::Ge,
                value: "10".to_string(),
            })
        );
    }

    #[test]
    fn full_text_needs_a_word() {
        let search = FullTextSearch::new("  + - ", FullTextMode::Boolean);
        assert_eq!(full_text_condition(vec![status()], &search), None);

        let search = FullTextSearch::new(" +lisbon ", FullTextMode::Boolean);
        assert_eq!(
            full_text_condition(vec![status()], &search),
            Some(Predicate::FullText {
                columns: vec![status()],
                term: "+lisbon".to_string(),
                mode: FullTextMode::Boolean,
            })
        );
    }
}

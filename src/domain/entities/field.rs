use std::fmt;

/// Normalized column type, independent of how the backend spells it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Char,
    Varchar,
    Text,
    Int,
    Decimal,
    Float,
    Date,
    DateTime,
    Blob,
    Enum,
    Set,
    Other(String),
}

impl TypeKind {
    /// Classifies a declared column type such as `VARCHAR(20)` or `BIGINT`.
    pub fn classify(declared: &str) -> Self {
        let base = declared
            .split('(')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match base.as_str() {
            "char" | "character" | "nchar" => TypeKind::Char,
            "varchar" | "nvarchar" | "varying character" | "character varying" => {
                TypeKind::Varchar
            }
            "text" | "clob" | "tinytext" | "mediumtext" | "longtext" => TypeKind::Text,
            "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "bigint" => TypeKind::Int,
            "decimal" | "numeric" => TypeKind::Decimal,
            "real" | "float" | "double" | "double precision" => TypeKind::Float,
            "date" => TypeKind::Date,
            "datetime" | "timestamp" => TypeKind::DateTime,
            "blob" => TypeKind::Blob,
            "enum" => TypeKind::Enum,
            "set" => TypeKind::Set,
            _ => TypeKind::Other(base),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TypeKind::Char => "char",
            TypeKind::Varchar => "varchar",
            TypeKind::Text => "text",
            TypeKind::Int => "int",
            TypeKind::Decimal => "decimal",
            TypeKind::Float => "float",
            TypeKind::Date => "date",
            TypeKind::DateTime => "datetime",
            TypeKind::Blob => "blob",
            TypeKind::Enum => "enum",
            TypeKind::Set => "set",
            TypeKind::Other(name) => name,
        }
    }

    pub fn is_enumerable(&self) -> bool {
        matches!(self, TypeKind::Enum | TypeKind::Set)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeKind::Int | TypeKind::Decimal | TypeKind::Float)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub kind: TypeKind,
    pub not_null: bool,
    /// 1-based position inside the primary key, 0 when not part of it.
    pub pk_position: i64,
    /// Allowed members for enum and set columns, in declaration order.
    pub allowed_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// Join condition made of `left = right` field pairs, e.g. `("o.customer_id", "c.id")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Join {
    pub kind: JoinKind,
    pub on: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
    pub join: Option<Join>,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            join: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn inner_join<L, R>(self, on: impl IntoIterator<Item = (L, R)>) -> Self
    where
        L: Into<String>,
        R: Into<String>,
    {
        self.joined(JoinKind::Inner, on)
    }

    pub fn left_join<L, R>(self, on: impl IntoIterator<Item = (L, R)>) -> Self
    where
        L: Into<String>,
        R: Into<String>,
    {
        self.joined(JoinKind::Left, on)
    }

    fn joined<L, R>(mut self, kind: JoinKind, on: impl IntoIterator<Item = (L, R)>) -> Self
    where
        L: Into<String>,
        R: Into<String>,
    {
        self.join = Some(Join {
            kind,
            on: on
                .into_iter()
                .map(|(left, right)| (left.into(), right.into()))
                .collect(),
        });
        self
    }

    /// Alias used inside the query; the table name when none was given.
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A column resolved against the table list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }
}

/// Splits `alias.column` into its parts; bare names have no alias.
pub fn split_field(field: &str) -> (Option<&str>, &str) {
    match field.trim().split_once('.') {
        Some((alias, column)) => (Some(alias.trim()), column.trim()),
        None => (None, field.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_normalizes_declared_types() {
        assert_eq!(TypeKind::classify("VARCHAR(20)"), TypeKind::Varchar);
        assert_eq!(TypeKind::classify("bigint"), TypeKind::Int);
        assert_eq!(TypeKind::classify("CHAR(2)"), TypeKind::Char);
        assert_eq!(TypeKind::classify("ENUM"), TypeKind::Enum);
        assert_eq!(TypeKind::classify("Set"), TypeKind::Set);
        assert_eq!(
            TypeKind::classify("GEOMETRY"),
            TypeKind::Other("geometry".to_string())
        );
        assert_eq!(TypeKind::classify("DATETIME").as_str(), "datetime");
    }

    #[test]
    fn table_alias_defaults_to_name() {
        assert_eq!(TableRef::new("country").alias(), "country");
        assert_eq!(TableRef::new("country").with_alias("c").alias(), "c");
    }

    #[test]
    fn split_field_handles_qualified_names() {
        assert_eq!(split_field("c.name"), (Some("c"), "name"));
        assert_eq!(split_field(" name "), (None, "name"));
    }
}

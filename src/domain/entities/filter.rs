use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FullTextMode {
    Boolean,
    QueryExpansion,
}

impl FromStr for FullTextMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "boolean" => Ok(FullTextMode::Boolean),
            "queryexpansion" | "query_expansion" => Ok(FullTextMode::QueryExpansion),
            other => Err(format!("unknown full-text mode: {other}")),
        }
    }
}

/// Full-text search over one or more indexed columns.
///
/// An empty `indexes` list searches the filtered field's own column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullTextSearch {
    pub term: String,
    pub mode: FullTextMode,
    pub indexes: Vec<String>,
}

impl FullTextSearch {
    pub fn new(term: impl Into<String>, mode: FullTextMode) -> Self {
        Self {
            term: term.into(),
            mode,
            indexes: Vec::new(),
        }
    }

    pub fn with_indexes<I, S>(mut self, indexes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes = indexes.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterValue {
    Empty,
    Scalar(String),
    FullText(FullTextSearch),
}

impl FilterValue {
    /// Normalizes raw user input; blank strings carry no filter.
    pub fn scalar(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.trim().is_empty() {
            FilterValue::Empty
        } else {
            FilterValue::Scalar(raw)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Empty => true,
            FilterValue::Scalar(value) => value.trim().is_empty(),
            FilterValue::FullText(search) => search.term.trim().is_empty(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::scalar(value)
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::scalar(value)
    }
}

impl From<Option<String>> for FilterValue {
    fn from(value: Option<String>) -> Self {
        value.map(FilterValue::scalar).unwrap_or(FilterValue::Empty)
    }
}

impl From<FullTextSearch> for FilterValue {
    fn from(value: FullTextSearch) -> Self {
        FilterValue::FullText(value)
    }
}

pub type FilterSpec = BTreeMap<String, FilterValue>;

/// One entry of a filter dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

impl FilterOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    pub fn same(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_scalar_is_empty() {
        assert_eq!(FilterValue::from("   "), FilterValue::Empty);
        assert_eq!(FilterValue::from(None::<String>), FilterValue::Empty);
        assert!(FilterValue::FullText(FullTextSearch::new(" ", FullTextMode::Boolean)).is_empty());
        assert!(!FilterValue::from("x").is_empty());
    }

    #[test]
    fn full_text_mode_parses_source_spelling() {
        assert_eq!("boolean".parse(), Ok(FullTextMode::Boolean));
        assert_eq!("queryExpansion".parse(), Ok(FullTextMode::QueryExpansion));
        assert!("natural".parse::<FullTextMode>().is_err());
    }
}

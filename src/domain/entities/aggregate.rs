use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggregateFunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Count => "COUNT",
        }
    }
}

impl FromStr for AggregateFunction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUM" => Ok(AggregateFunction::Sum),
            "AVG" => Ok(AggregateFunction::Avg),
            "MIN" => Ok(AggregateFunction::Min),
            "MAX" => Ok(AggregateFunction::Max),
            "COUNT" => Ok(AggregateFunction::Count),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Nested aggregate over one field; `functions[0]` is the outermost call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlExp {
    pub functions: Vec<AggregateFunction>,
    pub value: String,
}

impl SqlExp {
    pub fn new(functions: impl IntoIterator<Item = AggregateFunction>, value: impl Into<String>) -> Self {
        Self {
            functions: functions.into_iter().collect(),
            value: value.into(),
        }
    }

    /// Parses function names as submitted by the grid (`["SUM", "avg"]`).
    pub fn parse<I, S>(functions: I, value: impl Into<String>) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let functions = functions
            .into_iter()
            .map(|name| name.as_ref().parse::<AggregateFunction>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(functions, value))
    }

    /// Renders the nesting around an already-rendered operand.
    pub fn wrap(&self, operand: &str) -> String {
        let mut expression = operand.to_string();
        for function in self.functions.iter().rev() {
            expression = format!("{}({expression})", function.as_sql());
        }
        expression
    }

    pub fn expression(&self) -> String {
        self.wrap(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn functions_nest_in_declaration_order() {
        let exp = SqlExp::parse(["SUM", "AVG"], "Population").expect("functions should parse");
        assert_eq!(exp.expression(), "SUM(AVG(Population))");

        let exp = SqlExp::parse(["avg"], "Population").expect("functions should parse");
        assert_eq!(exp.expression(), "AVG(Population)");
    }

    #[test]
    fn unknown_function_is_rejected() {
        assert_eq!(
            SqlExp::parse(["SUM", "DROP"], "x"),
            Err("DROP".to_string())
        );
    }
}

//! Reads enumerations out of `CREATE TABLE` statements.
//!
//! SQLite has no `ENUM` type, so allowed values are declared with a check
//! constraint: `status TEXT CHECK (status IN ('active', 'archived'))`.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
    Str(String),
    Open,
    Close,
    Comma,
    Other,
}

fn tokenize(sql: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            ',' => tokens.push(Token::Comma),
            '\'' => tokens.push(Token::Str(read_quoted(&mut chars, '\''))),
            '"' => tokens.push(Token::Quoted(read_quoted(&mut chars, '"'))),
            '`' => tokens.push(Token::Quoted(read_quoted(&mut chars, '`'))),
            '[' => {
                let mut ident = String::new();
                for next in chars.by_ref() {
                    if next == ']' {
                        break;
                    }
                    ident.push(next);
                }
                tokens.push(Token::Quoted(ident));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' || next == '$' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            _ => tokens.push(Token::Other),
        }
    }

    tokens
}

/// Reads up to the closing `quote`; a doubled quote is an escaped one.
fn read_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) -> String {
    let mut value = String::new();
    while let Some(ch) = chars.next() {
        if ch == quote {
            if chars.peek() == Some(&quote) {
                value.push(quote);
                chars.next();
                continue;
            }
            break;
        }
        value.push(ch);
    }
    value
}

fn is_keyword(token: &Token, keyword: &str) -> bool {
    matches!(token, Token::Word(word) if word.eq_ignore_ascii_case(keyword))
}

fn names_column(token: &Token, column: &str) -> bool {
    match token {
        Token::Word(word) | Token::Quoted(word) => word.eq_ignore_ascii_case(column),
        _ => false,
    }
}

/// Index of the `Close` matching the `Open` at `open`.
fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0_usize;
    for (idx, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// String list following `<column> IN (` inside `tokens`.
fn in_list(tokens: &[Token], column: &str) -> Option<Vec<String>> {
    for start in 0..tokens.len() {
        let window = &tokens[start..];
        if window.len() < 3
            || !names_column(&window[0], column)
            || !is_keyword(&window[1], "IN")
            || window[2] != Token::Open
        {
            continue;
        }

        let mut values = Vec::new();
        let mut expect_value = true;
        for token in &window[3..] {
            match (token, expect_value) {
                (Token::Str(value), true) => {
                    values.push(value.clone());
                    expect_value = false;
                }
                (Token::Comma, false) => expect_value = true,
                (Token::Close, false) => return Some(values),
                _ => break,
            }
        }
    }
    None
}

/// Allowed values for `column` from the first `CHECK (... column IN ('a', ...) ...)`.
pub fn check_constraint_values(create_sql: &str, column: &str) -> Option<Vec<String>> {
    let tokens = tokenize(create_sql);

    let mut idx = 0;
    while idx + 1 < tokens.len() {
        if is_keyword(&tokens[idx], "CHECK") && tokens[idx + 1] == Token::Open {
            let close = matching_close(&tokens, idx + 1)?;
            if let Some(values) = in_list(&tokens[idx + 2..close], column) {
                return Some(values);
            }
            idx = close;
        }
        idx += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_column_check_list() {
        let sql = "CREATE TABLE country (
            code TEXT PRIMARY KEY,
            continent TEXT NOT NULL CHECK (continent IN ('Asia','Europe','North America')),
            status TEXT CHECK(\"status\" IN ('Yes', 'No', 'It''s complicated'))
        )";

        assert_eq!(
            check_constraint_values(sql, "continent"),
            Some(vec![
                "Asia".to_string(),
                "Europe".to_string(),
                "North America".to_string()
            ])
        );
        assert_eq!(
            check_constraint_values(sql, "status"),
            Some(vec![
                "Yes".to_string(),
                "No".to_string(),
                "It's complicated".to_string()
            ])
        );
        assert_eq!(check_constraint_values(sql, "code"), None);
    }

    #[test]
    fn reads_table_level_check_with_extra_terms() {
        let sql = "CREATE TABLE paint (id INTEGER, colors SET,
            CHECK (colors IS NULL OR colors IN ('red', 'green')))";

        assert_eq!(
            check_constraint_values(sql, "colors"),
            Some(vec!["red".to_string(), "green".to_string()])
        );
    }

    #[test]
    fn ignores_non_literal_lists() {
        let sql = "CREATE TABLE t (a INTEGER CHECK (a IN (1, 2)))";
        assert_eq!(check_constraint_values(sql, "a"), None);
    }
}

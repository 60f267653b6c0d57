use std::collections::BTreeMap;

use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

use crate::types::Dialect;

/// Single-line `--` comments of a script, keyed by the line they start on.
#[derive(Debug, Default, Clone)]
pub struct LineComments {
    by_line: BTreeMap<u64, String>,
}

impl LineComments {
    /// Tokenizes `sql` and keeps the text of every non-empty line comment.
    ///
    /// A script that fails to tokenize yields no comments; the parser reports
    /// the actual error.
    pub fn scan(sql: &str, dialect: Dialect) -> Self {
        let dialect = dialect.to_sqlparser_dialect();
        let Ok(tokens) = Tokenizer::new(dialect.as_ref(), sql).tokenize_with_location() else {
            return Self::default();
        };

        let mut by_line = BTreeMap::new();
        for token in tokens {
            if let Token::Whitespace(Whitespace::SingleLineComment { comment, .. }) = &token.token
            {
                let text = comment.trim();
                if !text.is_empty() {
                    by_line
                        .entry(token.span.start.line)
                        .or_insert_with(|| text.to_string());
                }
            }
        }
        Self { by_line }
    }

    /// Comment starting on `line`, if any.
    pub fn on_line(&self, line: u64) -> Option<&str> {
        if line == 0 {
            return None;
        }
        self.by_line.get(&line).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_keyed_by_line() {
        let sql = "SELECT a, -- first\n  b -- second\nFROM t";
        let comments = LineComments::scan(sql, Dialect::Generic);
        assert_eq!(comments.on_line(1), Some("first"));
        assert_eq!(comments.on_line(2), Some("second"));
        assert_eq!(comments.on_line(3), None);
        assert_eq!(comments.on_line(0), None);
    }

    #[test]
    fn empty_comment_is_skipped() {
        let comments = LineComments::scan("SELECT 1 --\n", Dialect::Generic);
        assert!(comments.is_empty());
    }
}

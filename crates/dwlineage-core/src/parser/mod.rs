//! SQL parsing on top of `sqlparser`, producing [`StatementFacts`].

mod comments;
mod facts;

pub use comments::LineComments;
pub use facts::facts_from_statement;

use crate::error::ParseError;
use crate::types::{Dialect, StatementFacts};
use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Parse SQL using the specified dialect.
pub fn parse_sql_with_dialect(sql: &str, dialect: Dialect) -> Result<Vec<Statement>, ParseError> {
    let sqlparser_dialect = dialect.to_sqlparser_dialect();
    match Parser::parse_sql(sqlparser_dialect.as_ref(), sql) {
        Ok(statements) => Ok(statements),
        Err(primary_err) => {
            // Generic trips over Postgres casts and JSON operators that are
            // common in warehouse scripts.
            if matches!(dialect, Dialect::Generic) && looks_like_postgres_syntax(sql) {
                if let Ok(statements) = Parser::parse_sql(&PostgreSqlDialect {}, sql) {
                    return Ok(statements);
                }
            }
            Err(ParseError::from(primary_err).with_dialect(dialect))
        }
    }
}

fn looks_like_postgres_syntax(sql: &str) -> bool {
    sql.contains("::") || sql.contains("->") || sql.contains("?|") || sql.contains("?&")
}

/// Parses a whole script into per-statement facts, in script order.
///
/// Trailing `-- ...` comments on column definitions and projection items are
/// picked up as column descriptions.
pub fn extract_facts(sql: &str, dialect: Dialect) -> Result<Vec<StatementFacts>, ParseError> {
    if sql.trim().is_empty() {
        return Ok(Vec::new());
    }
    let statements = parse_sql_with_dialect(sql, dialect)?;
    let comments = LineComments::scan(sql, dialect);
    Ok(statements
        .iter()
        .map(|statement| facts_from_statement(statement, &comments))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParsedKind;

    #[test]
    fn parses_multiple_statements() {
        let statements =
            parse_sql_with_dialect("SELECT * FROM a; SELECT * FROM b;", Dialect::Generic).unwrap();
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn invalid_sql_reports_dialect() {
        let err = parse_sql_with_dialect("SELECT * FROM", Dialect::Ansi).unwrap_err();
        assert_eq!(err.dialect, Some(Dialect::Ansi));
    }

    #[test]
    fn generic_falls_back_to_postgres_casts() {
        assert!(parse_sql_with_dialect("SELECT a::int FROM t", Dialect::Generic).is_ok());
    }

    #[test]
    fn blank_script_has_no_facts() {
        assert!(extract_facts("  \n ", Dialect::Generic).unwrap().is_empty());
        assert!(extract_facts("-- nothing here\n", Dialect::Generic)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn facts_follow_script_order() {
        let sql = "CREATE TABLE s.a (x INT); INSERT INTO s.b SELECT x FROM s.a; SELECT 1;";
        let facts = extract_facts(sql, Dialect::Generic).unwrap();
        let kinds: Vec<_> = facts.iter().map(|f| f.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![ParsedKind::CreateTable, ParsedKind::Insert, ParsedKind::Query]
        );
    }
}

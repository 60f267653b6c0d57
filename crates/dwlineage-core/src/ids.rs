//! Deterministic identifiers for catalog rows.
//!
//! Every identifier is built from the upper-cased semantic coordinates of the
//! row it names. Coordinates are escaped so that [`SEPARATOR`] never occurs
//! inside one, and each identifier kind has a fixed number of segments, which
//! makes the mapping from coordinates to identifiers injective.

use std::borrow::Cow;

use crate::types::TableIdentity;

/// Reserved separator between identifier segments.
pub const SEPARATOR: char = '|';

const ESCAPE: char = '%';

/// Normalizes a raw SQL identifier into a coordinate.
///
/// Surrounding whitespace and one layer of identifier quoting (`"x"`, `` `x` ``,
/// `[x]`) are removed, then the value is upper-cased.
pub fn normalize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = strip_quotes(trimmed);
    unquoted.to_uppercase()
}

fn strip_quotes(value: &str) -> &str {
    let pairs = [('"', '"'), ('`', '`'), ('[', ']')];
    for (open, close) in pairs {
        if value.len() >= 2 && value.starts_with(open) && value.ends_with(close) {
            return &value[open.len_utf8()..value.len() - close.len_utf8()];
        }
    }
    value
}

/// Escapes a coordinate so it contains neither the separator nor a bare escape char.
pub fn escape_segment(segment: &str) -> Cow<'_, str> {
    if !segment.contains([SEPARATOR, ESCAPE]) {
        return Cow::Borrowed(segment);
    }
    let mut out = String::with_capacity(segment.len() + 4);
    for ch in segment.chars() {
        match ch {
            ESCAPE => out.push_str("%25"),
            SEPARATOR => out.push_str("%7C"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Reverses [`escape_segment`].
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("%7C", "|").replace("%25", "%")
}

/// Splits an identifier into its unescaped segments.
pub fn split_id(id: &str) -> Vec<String> {
    id.split(SEPARATOR).map(unescape_segment).collect()
}

fn join(segments: &[&str]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(&escape_segment(segment));
    }
    out
}

/// Identifier of a schema: `SCHEMA`.
pub fn schema_id(schema: &str) -> String {
    join(&[schema])
}

/// Identifier of a script: the normalized script name.
pub fn script_id(script_name: &str) -> String {
    join(&[&normalize_name(script_name)])
}

/// Identifier of a script named by a file path; directories and the extension are dropped.
pub fn script_id_from_path(path: &str) -> String {
    let stem = std::path::Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(path);
    script_id(stem)
}

/// Identifier of a table.
///
/// Entity tables render as `SCHEMA|NAME|`, temporary tables as `|NAME|SCRIPT`.
pub fn table_id(identity: &TableIdentity) -> String {
    match identity {
        TableIdentity::Entity { schema, name } => join(&[schema, name, ""]),
        TableIdentity::Temporary { script, name } => join(&["", name, script]),
    }
}

/// Parses a table identifier produced by [`table_id`].
pub fn parse_table_id(id: &str) -> Option<TableIdentity> {
    let segments = split_id(id);
    match segments.as_slice() {
        [schema, name, owner] if owner.is_empty() => Some(TableIdentity::Entity {
            schema: schema.clone(),
            name: name.clone(),
        }),
        [schema, name, owner] if schema.is_empty() => Some(TableIdentity::Temporary {
            script: owner.clone(),
            name: name.clone(),
        }),
        _ => None,
    }
}

/// Whether a table identifier names an entity table.
pub fn is_entity_table_id(id: &str) -> bool {
    parse_table_id(id).is_some_and(|identity| identity.is_entity())
}

/// Identifier of a column: `<table id>|COLUMN`.
pub fn column_id(table_id: &str, column: &str) -> String {
    format!("{table_id}{SEPARATOR}{}", escape_segment(column))
}

/// Splits a column identifier into its table identifier and column name.
pub fn split_column_id(id: &str) -> Option<(&str, String)> {
    let (table, column) = id.rsplit_once(SEPARATOR)?;
    Some((table, unescape_segment(column)))
}

/// Identifier of a statement: `<script id>|<index>`.
pub fn statement_id(script_id: &str, index: u32) -> String {
    format!("{script_id}{SEPARATOR}{index}")
}

/// Identifier of a detail edge: `<statement id>|<source id>|<target id>`.
pub fn detail_edge_id(statement_id: &str, source_id: &str, target_id: &str) -> String {
    format!("{statement_id}{SEPARATOR}{source_id}{SEPARATOR}{target_id}")
}

/// Identifier of a summary edge: `<target id>|<source id>|<script id>`.
pub fn summary_edge_id(target_id: &str, source_id: &str, script_id: &str) -> String {
    format!("{target_id}{SEPARATOR}{source_id}{SEPARATOR}{script_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_quotes_and_uppercases() {
        assert_eq!(normalize_name(" sales "), "SALES");
        assert_eq!(normalize_name("\"Orders\""), "ORDERS");
        assert_eq!(normalize_name("`dim_date`"), "DIM_DATE");
        assert_eq!(normalize_name("[Fact]"), "FACT");
        assert_eq!(normalize_name("\""), "\"");
    }

    #[test]
    fn entity_and_temporary_ids_have_distinct_shapes() {
        let entity = TableIdentity::entity("sales", "orders");
        let temp = TableIdentity::temporary("load_orders", "orders");
        assert_eq!(table_id(&entity), "SALES|ORDERS|");
        assert_eq!(table_id(&temp), "|ORDERS|LOAD_ORDERS");
    }

    #[test]
    fn separator_inside_coordinate_is_escaped() {
        let identity = TableIdentity::Entity {
            schema: "A|B".to_string(),
            name: "C%".to_string(),
        };
        let id = table_id(&identity);
        assert_eq!(id, "A%7CB|C%25|");
        assert_eq!(parse_table_id(&id), Some(identity));
    }

    #[test]
    fn column_and_edge_ids_compose_table_ids() {
        let table = table_id(&TableIdentity::entity("dw", "fact"));
        assert_eq!(column_id(&table, "AMOUNT"), "DW|FACT||AMOUNT");
        let stmt = statement_id("LOAD", 3);
        assert_eq!(stmt, "LOAD|3");
        assert_eq!(detail_edge_id(&stmt, "A||", "B||"), "LOAD|3|A|||B||");
        assert_eq!(summary_edge_id("B||", "A||", "LOAD"), "B|||A|||LOAD");
    }

    #[test]
    fn script_id_uses_normalized_name() {
        assert_eq!(script_id("load_orders"), "LOAD_ORDERS");
        assert_eq!(script_id("a|b"), "A%7CB");
    }

    #[test]
    fn script_id_from_path_drops_directories_and_extension() {
        assert_eq!(script_id_from_path("etl/daily/load_orders.sql"), "LOAD_ORDERS");
        assert_eq!(script_id_from_path("load_orders"), "LOAD_ORDERS");
        assert_eq!(script_id_from_path(""), "");
    }

    #[test]
    fn column_id_splits_back_into_table_and_name() {
        let table = table_id(&TableIdentity::temporary("job", "vt"));
        let column = column_id(&table, "A|B");
        assert_eq!(split_column_id(&column), Some((table.as_str(), "A|B".to_string())));
        assert!(!is_entity_table_id(&table));
        assert!(is_entity_table_id("|LOOKUP|"));
    }

    #[test]
    fn malformed_table_id_is_rejected() {
        assert_eq!(parse_table_id("ONLY|TWO"), None);
        assert_eq!(parse_table_id("A|B|C"), None);
    }
}

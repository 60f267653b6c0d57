//! Conversion of `sqlparser` statements into [`StatementFacts`].

use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;

use sqlparser::ast::{
    Assignment, AssignmentTarget, ColumnDef, ColumnOption, CreateTable, Expr, Insert, MergeAction,
    MergeClause, MergeInsertKind, ObjectName, ObjectNamePart, Query, Select, SelectItem, SetExpr,
    Spanned, Statement, TableConstraint, TableFactor, TableObject, TableWithJoins,
    UpdateTableFromKind, Visit, Visitor,
};

use super::comments::LineComments;
use crate::ids::normalize_name;
use crate::types::{ColumnFacts, ColumnMapping, ParsedKind, SourceColumn, StatementFacts, TableRef};

/// Builds the facts for one parsed statement.
pub fn facts_from_statement(statement: &Statement, comments: &LineComments) -> StatementFacts {
    let mut facts = match statement {
        Statement::CreateTable(create) => create_table_facts(create, comments),
        Statement::CreateView {
            name,
            query,
            temporary,
            ..
        } => create_view_facts(name, query, *temporary, comments),
        Statement::Insert(insert) => insert_facts(insert, comments),
        Statement::Update {
            table,
            assignments,
            from,
            ..
        } => update_facts(table, assignments, from.as_ref()),
        Statement::Merge {
            table,
            source,
            clauses,
            ..
        } => merge_facts(table, source, clauses),
        Statement::Query(_) => StatementFacts::new(ParsedKind::Query),
        other => StatementFacts::new(ParsedKind::Other(leading_keywords(other))),
    };

    if facts.kind.is_write() {
        facts.sources = collect_sources(statement, facts.target.as_ref());
    }
    facts.text = statement.to_string();
    facts
}

fn leading_keywords(statement: &Statement) -> String {
    let text = statement.to_string();
    let mut words = text.split_whitespace().map(str::to_uppercase);
    match words.next() {
        Some(first) if matches!(first.as_str(), "CREATE" | "ALTER" | "DROP") => {
            match words.next() {
                Some(second) => format!("{first} {second}"),
                None => first,
            }
        }
        Some(first) => first,
        None => String::new(),
    }
}

fn object_name_part_value(part: &ObjectNamePart) -> String {
    part.as_ident()
        .map(|ident| ident.value.clone())
        .unwrap_or_else(|| part.to_string())
}

fn table_ref(name: &ObjectName) -> TableRef {
    let parts: Vec<String> = name.0.iter().map(object_name_part_value).collect();
    match parts.split_last() {
        Some((last, [])) => TableRef::new(None, last),
        Some((last, rest)) => TableRef::new(Some(&rest.join(".")), last),
        None => TableRef::new(None, ""),
    }
}

fn last_part(name: &ObjectName) -> String {
    name.0.last().map(object_name_part_value).unwrap_or_default()
}

fn ref_key(table: &TableRef) -> (Option<String>, String) {
    (
        table.schema.as_deref().map(normalize_name),
        normalize_name(&table.name),
    )
}

fn create_table_facts(create: &CreateTable, comments: &LineComments) -> StatementFacts {
    let mut facts = StatementFacts::new(ParsedKind::CreateTable);
    facts.target = Some(table_ref(&create.name));
    facts.temporary = create.temporary;

    let mut primary_keys = BTreeSet::new();
    let mut foreign_keys = BTreeSet::new();
    for constraint in &create.constraints {
        match constraint {
            TableConstraint::PrimaryKey { columns, .. } => {
                primary_keys.extend(
                    columns
                        .iter()
                        .map(|c| normalize_name(&c.column.expr.to_string())),
                );
            }
            TableConstraint::ForeignKey { columns, .. } => {
                foreign_keys.extend(columns.iter().map(|c| normalize_name(&c.value)));
            }
            _ => {}
        }
    }

    facts.columns = create
        .columns
        .iter()
        .map(|def| column_from_def(def, &primary_keys, &foreign_keys, comments))
        .collect();

    if let Some(query) = &create.query {
        if let Some(projection) = ProjectionFacts::from_query(query, comments) {
            if facts.columns.is_empty() {
                facts.columns = projection.output_columns();
                facts.column_mappings = projection.mappings_onto(&projection.names);
            } else {
                let targets: Vec<Option<String>> = facts
                    .columns
                    .iter()
                    .map(|c| Some(c.name.clone()))
                    .collect();
                facts.column_mappings = projection.mappings_onto(&targets);
            }
        }
    }
    facts
}

fn column_from_def(
    def: &ColumnDef,
    primary_keys: &BTreeSet<String>,
    foreign_keys: &BTreeSet<String>,
    comments: &LineComments,
) -> ColumnFacts {
    let mut column = ColumnFacts::named(def.name.value.clone()).with_type(def.data_type.to_string());
    for option in &def.options {
        match &option.option {
            ColumnOption::NotNull => column.nullable = false,
            ColumnOption::Null => column.nullable = true,
            ColumnOption::Default(expr) => column.default_value = Some(expr.to_string()),
            ColumnOption::Unique { is_primary, .. } if *is_primary => {
                column = column.primary_key();
            }
            ColumnOption::ForeignKey { .. } => column.foreign_key = true,
            ColumnOption::Comment(text) => column.description = Some(text.clone()),
            _ => {}
        }
    }

    let key = normalize_name(&def.name.value);
    if primary_keys.contains(&key) {
        column = column.primary_key();
    }
    if foreign_keys.contains(&key) {
        column.foreign_key = true;
    }
    if column.description.is_none() {
        column.description = comments.on_line(def.span().end.line).map(str::to_string);
    }
    column
}

fn create_view_facts(
    name: &ObjectName,
    query: &Query,
    temporary: bool,
    comments: &LineComments,
) -> StatementFacts {
    let mut facts = StatementFacts::new(ParsedKind::CreateView);
    facts.target = Some(table_ref(name));
    facts.temporary = temporary;
    if let Some(projection) = ProjectionFacts::from_query(query, comments) {
        facts.columns = projection.output_columns();
        facts.column_mappings = projection.mappings_onto(&projection.names);
    }
    facts
}

fn insert_facts(insert: &Insert, comments: &LineComments) -> StatementFacts {
    let mut facts = StatementFacts::new(ParsedKind::Insert);
    if let TableObject::TableName(name) = &insert.table {
        facts.target = Some(table_ref(name));
    }

    let listed: Vec<String> = insert.columns.iter().map(|c| c.to_string()).collect();
    let projection = insert
        .source
        .as_ref()
        .and_then(|query| ProjectionFacts::from_query(query, comments));

    match projection {
        // matched by position; the select list names none of the target's columns
        Some(projection) if listed.is_empty() => {
            facts.positional_sources = projection.sources;
        }
        Some(projection) if projection.names.len() == listed.len() => {
            facts.columns = listed
                .iter()
                .zip(&projection.descriptions)
                .map(|(name, description)| {
                    let mut column = ColumnFacts::named(name.clone());
                    column.description = description.clone();
                    column
                })
                .collect();
            let targets: Vec<Option<String>> = listed.iter().cloned().map(Some).collect();
            facts.column_mappings = projection.mappings_onto(&targets);
        }
        _ => {
            facts.columns = listed.into_iter().map(ColumnFacts::named).collect();
        }
    }
    facts
}

fn update_facts(
    table: &TableWithJoins,
    assignments: &[Assignment],
    from: Option<&UpdateTableFromKind>,
) -> StatementFacts {
    let mut facts = StatementFacts::new(ParsedKind::Update);
    if let TableFactor::Table { name, .. } = &table.relation {
        facts.target = Some(table_ref(name));
    }

    let mut factors: Vec<&TableFactor> = vec![&table.relation];
    factors.extend(table.joins.iter().map(|j| &j.relation));
    if let Some(UpdateTableFromKind::BeforeSet(tables) | UpdateTableFromKind::AfterSet(tables)) =
        from
    {
        for twj in tables {
            factors.push(&twj.relation);
            factors.extend(twj.joins.iter().map(|j| &j.relation));
        }
    }
    let scope = RelationScope::from_factors(&factors, &BTreeSet::new());
    assignment_facts(&mut facts, assignments, &scope);
    facts
}

fn merge_facts(target: &TableFactor, source: &TableFactor, clauses: &[MergeClause]) -> StatementFacts {
    let mut facts = StatementFacts::new(ParsedKind::Merge);
    if let TableFactor::Table { name, .. } = target {
        facts.target = Some(table_ref(name));
    }
    let scope = RelationScope::from_factors(&[target, source], &BTreeSet::new());

    for clause in clauses {
        match &clause.action {
            MergeAction::Update { assignments, .. } => {
                assignment_facts(&mut facts, assignments, &scope);
            }
            MergeAction::Insert(insert) => {
                let names: Vec<String> = insert.columns.iter().map(|c| c.to_string()).collect();
                for name in &names {
                    push_column(&mut facts, name);
                }
                if let MergeInsertKind::Values(values) = &insert.kind {
                    if let Some(row) = values.rows.first() {
                        for (name, expr) in names.iter().zip(row) {
                            push_mapping(&mut facts, name, scope.columns_in(expr));
                        }
                    }
                }
            }
            _ => {}
        }
    }
    facts
}

fn assignment_facts(facts: &mut StatementFacts, assignments: &[Assignment], scope: &RelationScope) {
    for assignment in assignments {
        let targets: Vec<String> = match &assignment.target {
            AssignmentTarget::ColumnName(name) => vec![last_part(name)],
            AssignmentTarget::Tuple(names) => names.iter().map(last_part).collect(),
        };
        let sources = scope.columns_in(&assignment.value);
        for target in targets {
            push_column(facts, &target);
            push_mapping(facts, &target, sources.clone());
        }
    }
}

fn push_column(facts: &mut StatementFacts, name: &str) {
    let key = normalize_name(name);
    if !facts.columns.iter().any(|c| normalize_name(&c.name) == key) {
        facts.columns.push(ColumnFacts::named(name));
    }
}

fn push_mapping(facts: &mut StatementFacts, target: &str, sources: Vec<SourceColumn>) {
    if !sources.is_empty() {
        facts.column_mappings.push(ColumnMapping {
            target: target.to_string(),
            sources,
        });
    }
}

/// Output columns of a query, by position.
struct ProjectionFacts {
    names: Vec<Option<String>>,
    descriptions: Vec<Option<String>>,
    sources: Vec<Vec<SourceColumn>>,
}

impl ProjectionFacts {
    /// `None` when the output shape is unknown (wildcards, VALUES, …).
    fn from_query(query: &Query, comments: &LineComments) -> Option<Self> {
        let ctes: BTreeSet<String> = query
            .with
            .iter()
            .flat_map(|with| &with.cte_tables)
            .map(|cte| normalize_name(&cte.alias.name.value))
            .collect();

        let mut selects = Vec::new();
        collect_selects(&query.body, &mut selects);
        let (first, rest) = selects.split_first()?;

        let mut projection = Self::from_select(first, &ctes, comments)?;
        for select in rest {
            let branch = Self::from_select(select, &ctes, comments)?;
            for (slot, extra) in projection.sources.iter_mut().zip(branch.sources) {
                for column in extra {
                    if !slot.contains(&column) {
                        slot.push(column);
                    }
                }
            }
        }
        Some(projection)
    }

    fn from_select(select: &Select, ctes: &BTreeSet<String>, comments: &LineComments) -> Option<Self> {
        let mut factors = Vec::new();
        for twj in &select.from {
            factors.push(&twj.relation);
            factors.extend(twj.joins.iter().map(|j| &j.relation));
        }
        let scope = RelationScope::from_factors(&factors, ctes);

        let mut projection = Self {
            names: Vec::new(),
            descriptions: Vec::new(),
            sources: Vec::new(),
        };
        for item in &select.projection {
            let (name, expr) = match item {
                SelectItem::UnnamedExpr(expr) => (output_name(expr), expr),
                SelectItem::ExprWithAlias { expr, alias } => (Some(alias.value.clone()), expr),
                _ => return None,
            };
            projection.names.push(name);
            projection
                .descriptions
                .push(comments.on_line(item.span().end.line).map(str::to_string));
            projection.sources.push(scope.columns_in(expr));
        }
        Some(projection)
    }

    fn output_columns(&self) -> Vec<ColumnFacts> {
        self.names
            .iter()
            .zip(&self.descriptions)
            .filter_map(|(name, description)| {
                let mut column = ColumnFacts::named(name.clone()?);
                column.description = description.clone();
                Some(column)
            })
            .collect()
    }

    fn mappings_onto(&self, targets: &[Option<String>]) -> Vec<ColumnMapping> {
        targets
            .iter()
            .zip(&self.sources)
            .filter_map(|(target, sources)| {
                let target = target.clone()?;
                (!sources.is_empty()).then(|| ColumnMapping {
                    target,
                    sources: sources.clone(),
                })
            })
            .collect()
    }
}

fn collect_selects<'a>(body: &'a SetExpr, out: &mut Vec<&'a Select>) {
    match body {
        SetExpr::Select(select) => out.push(select),
        SetExpr::Query(query) => collect_selects(&query.body, out),
        SetExpr::SetOperation { left, right, .. } => {
            collect_selects(left, out);
            collect_selects(right, out);
        }
        _ => {}
    }
}

fn output_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.clone()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|ident| ident.value.clone()),
        _ => None,
    }
}

/// Tables visible to column references of one query level.
struct RelationScope {
    by_qualifier: BTreeMap<String, TableRef>,
    single: Option<TableRef>,
}

impl RelationScope {
    fn from_factors(factors: &[&TableFactor], ctes: &BTreeSet<String>) -> Self {
        let mut by_qualifier = BTreeMap::new();
        let mut tables = Vec::new();
        let mut opaque = false;
        for factor in factors {
            match factor {
                TableFactor::Table { name, alias, .. } => {
                    let table = table_ref(name);
                    if !table.is_qualified() && ctes.contains(&normalize_name(&table.name)) {
                        opaque = true;
                        continue;
                    }
                    by_qualifier.insert(normalize_name(&table.name), table.clone());
                    if let Some(alias) = alias {
                        by_qualifier.insert(normalize_name(&alias.name.value), table.clone());
                    }
                    tables.push(table);
                }
                _ => opaque = true,
            }
        }
        let single = match tables.as_slice() {
            [only] if !opaque => Some(only.clone()),
            _ => None,
        };
        Self {
            by_qualifier,
            single,
        }
    }

    fn resolve(&self, qualifier: Option<&str>) -> Option<&TableRef> {
        match qualifier {
            Some(q) => self.by_qualifier.get(&normalize_name(q)),
            None => self.single.as_ref(),
        }
    }

    /// Source columns referenced anywhere in `expr`.
    fn columns_in(&self, expr: &Expr) -> Vec<SourceColumn> {
        let mut collector = ColumnCollector {
            scope: self,
            found: Vec::new(),
        };
        let _ = expr.visit(&mut collector);
        collector.found
    }
}

struct ColumnCollector<'a> {
    scope: &'a RelationScope,
    found: Vec<SourceColumn>,
}

impl ColumnCollector<'_> {
    fn record(&mut self, qualifier: Option<&str>, column: &str) {
        if let Some(table) = self.scope.resolve(qualifier) {
            let source = SourceColumn {
                table: table.clone(),
                column: column.to_string(),
            };
            if !self.found.contains(&source) {
                self.found.push(source);
            }
        }
    }
}

impl Visitor for ColumnCollector<'_> {
    type Break = ();

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        match expr {
            Expr::Identifier(ident) => self.record(None, &ident.value),
            Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
                let column = &parts[parts.len() - 1].value;
                let qualifier = &parts[parts.len() - 2].value;
                self.record(Some(qualifier), column);
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

/// Every relation read by a statement, minus CTE names and its own target.
fn collect_sources(statement: &Statement, target: Option<&TableRef>) -> Vec<TableRef> {
    let mut collector = RelationCollector::default();
    let _ = statement.visit(&mut collector);

    let target_key = target.map(ref_key);
    let mut seen = BTreeSet::new();
    let mut sources = Vec::new();
    for relation in collector.relations {
        if !relation.is_qualified() && collector.ctes.contains(&normalize_name(&relation.name)) {
            continue;
        }
        let key = ref_key(&relation);
        if Some(&key) == target_key.as_ref() {
            continue;
        }
        if seen.insert(key) {
            sources.push(relation);
        }
    }
    sources
}

#[derive(Default)]
struct RelationCollector {
    relations: Vec<TableRef>,
    ctes: BTreeSet<String>,
}

impl Visitor for RelationCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.ctes.insert(normalize_name(&cte.alias.name.value));
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        if let TableFactor::Table { name, .. } = factor {
            self.relations.push(table_ref(name));
        }
        ControlFlow::Continue(())
    }
}

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::descriptor::{AggregateFunction, QueryDescriptor, SelectItem, SortDirection};
use super::operator::{Operator, parse_condition_key};
use super::whitelist::{EntitySpec, FieldKind, FieldSpec, OwnerScope, Whitelist};
use crate::db::DbHandle;
use crate::errors::{Clause, CopilotError, QueryError};

/// Hard ceiling on `limit`.
pub const MAX_LIMIT: i64 = 1000;

/// Default ceiling on the number of values in one `_in` condition.
pub const DEFAULT_MAX_IN_VALUES: usize = 100;

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// What a result column holds, used to shape the JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Field(FieldKind),
    Aggregate(AggregateFunction, Option<FieldKind>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    pub key: String,
    pub kind: OutputKind,
}

/// A validated, parameterized read query ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub entity: &'static str,
    pub sql: String,
    pub params: Vec<BindValue>,
    pub columns: Vec<OutputColumn>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryEcho {
    pub entity: String,
    pub select: Vec<String>,
    pub filters: Map<String, Value>,
}

/// Response body of a widget query.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryEnvelope {
    pub data: Vec<Map<String, Value>>,
    pub count: usize,
    pub query: QueryEcho,
}

impl QueryEnvelope {
    pub fn new(descriptor: QueryDescriptor, data: Vec<Map<String, Value>>) -> Self {
        Self {
            count: data.len(),
            data,
            query: QueryEcho {
                entity: descriptor.from,
                select: descriptor.select,
                filters: descriptor.conditions,
            },
        }
    }
}

/// Translates widget descriptors into owner-scoped SQL.
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    whitelist: Whitelist,
    max_in_values: usize,
}

impl Default for QueryTranslator {
    fn default() -> Self {
        Self::new(Whitelist::default(), DEFAULT_MAX_IN_VALUES)
    }
}

impl QueryTranslator {
    pub fn new(whitelist: Whitelist, max_in_values: usize) -> Self {
        Self {
            whitelist,
            max_in_values,
        }
    }

    /// Validate `descriptor` and build its SQL. Never touches storage.
    pub fn compile(
        &self,
        descriptor: &QueryDescriptor,
        owner_id: i64,
    ) -> Result<CompiledQuery, QueryError> {
        let entity = self.resolve_entity(&descriptor.from)?;
        let selection = self.build_select(entity, &descriptor.select)?;

        let mut params = vec![BindValue::Integer(owner_id)];
        let mut predicates = vec![scope_predicate(entity.scope)];
        for (key, value) in &descriptor.conditions {
            predicates.push(self.build_condition(entity, key, value, &mut params)?);
        }

        let order_by = build_order_by(entity, &descriptor.order_by)?;
        let (limit, offset) = validate_window(descriptor.limit, descriptor.offset)?;

        let mut sql = format!(
            "SELECT {} FROM {} e WHERE {}",
            selection.expressions.join(", "),
            entity.table,
            predicates.join(" AND ")
        );
        if !selection.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&selection.group_by.join(", "));
        }
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by.join(", "));
        }
        match (limit, offset) {
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ?");
                params.push(BindValue::Integer(limit));
                if let Some(offset) = offset {
                    sql.push_str(" OFFSET ?");
                    params.push(BindValue::Integer(offset));
                }
            }
            (None, Some(offset)) => {
                // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
                sql.push_str(" LIMIT -1 OFFSET ?");
                params.push(BindValue::Integer(offset));
            }
            (None, None) => {}
        }

        Ok(CompiledQuery {
            entity: entity.name,
            sql,
            params,
            columns: selection.columns,
        })
    }

    /// Compile and run `descriptor` for `owner_id`.
    pub async fn execute(
        &self,
        db: &DbHandle,
        descriptor: QueryDescriptor,
        owner_id: i64,
    ) -> Result<QueryEnvelope, CopilotError> {
        let compiled = self.compile(&descriptor, owner_id).inspect_err(|e| {
            warn!(entity = %descriptor.from, error = %e, "Rejected widget query");
        })?;
        debug!(
            entity = compiled.entity,
            sql = %compiled.sql,
            params = compiled.params.len(),
            "Executing widget query"
        );
        let rows = db
            .call(move |db| db.run_select(&compiled))
            .await
            .map_err(CopilotError::Storage)?;
        Ok(QueryEnvelope::new(descriptor, rows))
    }

    fn resolve_entity(&self, name: &str) -> Result<&'static EntitySpec, QueryError> {
        self.whitelist
            .entity(name)
            .ok_or_else(|| QueryError::UnknownEntity {
                entity: name.to_string(),
                allowed: self.whitelist.names().join(", "),
            })
    }

    fn build_select(
        &self,
        entity: &EntitySpec,
        select: &[String],
    ) -> Result<Selection, QueryError> {
        if select.is_empty() {
            return Err(QueryError::EmptySelect);
        }

        let mut selection = Selection::default();
        let mut has_aggregate = false;
        let mut plain: Vec<&FieldSpec> = Vec::new();

        for raw in select {
            match SelectItem::parse(raw) {
                SelectItem::Wildcard => {
                    for field in entity.fields {
                        selection.push_field(field);
                        plain.push(field);
                    }
                }
                SelectItem::Field(name) => {
                    let field = lookup(entity, &name, Clause::Select)?;
                    selection.push_field(field);
                    plain.push(field);
                }
                SelectItem::UnknownFunction(function) => {
                    return Err(QueryError::AggregateNotAllowed { function });
                }
                SelectItem::Aggregate { function, field } => {
                    let item = SelectItem::Aggregate {
                        function,
                        field: field.clone(),
                    };
                    if field == "*" {
                        if function != AggregateFunction::Count {
                            return Err(not_allowed(entity, "*", Clause::Select));
                        }
                        selection.push(
                            "COUNT(*)".to_string(),
                            item.output_key(),
                            OutputKind::Aggregate(function, None),
                        );
                    } else {
                        let spec = lookup(entity, &field, Clause::Select)?;
                        selection.push(
                            format!("{}(e.{})", function.as_str(), spec.column),
                            item.output_key(),
                            OutputKind::Aggregate(function, Some(spec.kind)),
                        );
                    }
                    has_aggregate = true;
                }
            }
        }

        if has_aggregate {
            for field in plain {
                let column = format!("e.{}", field.column);
                if !selection.group_by.contains(&column) {
                    selection.group_by.push(column);
                }
            }
        }

        Ok(selection)
    }

    fn build_condition(
        &self,
        entity: &EntitySpec,
        key: &str,
        value: &Value,
        params: &mut Vec<BindValue>,
    ) -> Result<String, QueryError> {
        let (name, operator) = parse_condition_key(key);
        let field = lookup(entity, name, Clause::Where)?;
        let column = format!("e.{}", field.column);

        match operator {
            Operator::In => {
                let Value::Array(items) = value else {
                    return Err(QueryError::InValueNotArray {
                        key: key.to_string(),
                    });
                };
                if items.len() > self.max_in_values {
                    return Err(QueryError::TooManyInValues {
                        key: key.to_string(),
                        count: items.len(),
                        max: self.max_in_values,
                    });
                }
                if items.is_empty() {
                    return Ok("1 = 0".to_string());
                }
                for item in items {
                    if item.is_null() {
                        return Err(invalid(key, "IN values cannot be null"));
                    }
                    params.push(scalar(key, item)?);
                }
                let placeholders = vec!["?"; items.len()].join(", ");
                Ok(format!("{} IN ({})", column, placeholders))
            }
            Operator::Like => {
                let needle = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return Err(invalid(key, "LIKE expects a string")),
                };
                params.push(BindValue::Text(format!("%{}%", needle)));
                Ok(format!("{} LIKE ?", column))
            }
            Operator::Eq | Operator::Neq if value.is_null() => {
                let test = if operator == Operator::Eq {
                    "IS NULL"
                } else {
                    "IS NOT NULL"
                };
                Ok(format!("{} {}", column, test))
            }
            _ => {
                if value.is_null() {
                    return Err(invalid(key, "null is only allowed with eq or neq"));
                }
                params.push(scalar(key, value)?);
                Ok(format!("{} {} ?", column, operator.sql()))
            }
        }
    }
}

#[derive(Debug, Default)]
struct Selection {
    expressions: Vec<String>,
    columns: Vec<OutputColumn>,
    group_by: Vec<String>,
}

impl Selection {
    fn push(&mut self, expression: String, key: String, kind: OutputKind) {
        if self.columns.iter().any(|c| c.key == key) {
            return;
        }
        self.expressions.push(expression);
        self.columns.push(OutputColumn { key, kind });
    }

    fn push_field(&mut self, field: &FieldSpec) {
        self.push(
            format!("e.{}", field.column),
            field.name.to_string(),
            OutputKind::Field(field.kind),
        );
    }
}

fn scope_predicate(scope: OwnerScope) -> String {
    match scope {
        OwnerScope::Column(column) => format!("e.{} = ?", column),
        OwnerScope::Parent {
            column,
            table,
            owner_column,
        } => format!(
            "e.{} IN (SELECT id FROM {} WHERE {} = ?)",
            column, table, owner_column
        ),
        OwnerScope::SelfRow => "e.id = ?".to_string(),
    }
}

fn build_order_by(
    entity: &EntitySpec,
    order_by: &Map<String, Value>,
) -> Result<Vec<String>, QueryError> {
    let mut parts = Vec::with_capacity(order_by.len());
    for (name, direction) in order_by {
        let field = lookup(entity, name, Clause::OrderBy)?;
        let direction = match direction {
            Value::String(s) => s
                .parse::<SortDirection>()
                .map_err(|direction| QueryError::InvalidSortDirection { direction })?,
            other => {
                return Err(QueryError::InvalidSortDirection {
                    direction: other.to_string(),
                });
            }
        };
        parts.push(format!("e.{} {}", field.column, direction.as_str()));
    }
    Ok(parts)
}

fn validate_window(
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<(Option<i64>, Option<i64>), QueryError> {
    if let Some(limit) = limit {
        if limit <= 0 || limit > MAX_LIMIT {
            return Err(QueryError::LimitOutOfRange {
                limit,
                max: MAX_LIMIT,
            });
        }
    }
    if let Some(offset) = offset {
        if offset < 0 {
            return Err(QueryError::NegativeOffset { offset });
        }
    }
    Ok((limit, offset))
}

fn lookup<'e>(
    entity: &'e EntitySpec,
    name: &str,
    clause: Clause,
) -> Result<&'e FieldSpec, QueryError> {
    entity
        .field(name)
        .ok_or_else(|| not_allowed(entity, name, clause))
}

fn not_allowed(entity: &EntitySpec, name: &str, clause: Clause) -> QueryError {
    QueryError::FieldNotAllowed {
        field: name.to_string(),
        entity: entity.name.to_string(),
        clause,
        allowed: entity.field_names().join(", "),
    }
}

fn invalid(key: &str, message: &str) -> QueryError {
    QueryError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn scalar(key: &str, value: &Value) -> Result<BindValue, QueryError> {
    match value {
        Value::Null => Ok(BindValue::Null),
        Value::Bool(b) => Ok(BindValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(BindValue::Integer(i)),
            None => n
                .as_f64()
                .map(BindValue::Real)
                .ok_or_else(|| invalid(key, "number out of range")),
        },
        Value::String(s) => Ok(BindValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(invalid(key, "expected a scalar value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(value: Value) -> QueryDescriptor {
        serde_json::from_value(value).unwrap()
    }

    fn compile(value: Value) -> Result<CompiledQuery, QueryError> {
        QueryTranslator::default().compile(&descriptor(value), 7)
    }

    #[test]
    fn test_unknown_entity_rejected() {
        let err = compile(json!({"from": "Order"})).unwrap_err();
        match err {
            QueryError::UnknownEntity { entity, allowed } => {
                assert_eq!(entity, "Order");
                assert!(allowed.contains("Product"));
            }
            other => panic!("Expected UnknownEntity, got {:?}", other),
        }
    }

    #[test]
    fn test_entity_checked_before_fields() {
        let err = compile(json!({"from": "Nope", "select": ["password"], "limit": 0})).unwrap_err();
        assert!(matches!(err, QueryError::UnknownEntity { .. }));
    }

    #[test]
    fn test_simple_select_is_owner_scoped() {
        let q = compile(json!({"select": ["id"], "from": "Product", "where": {"status": "active"}}))
            .unwrap();
        assert_eq!(
            q.sql,
            "SELECT e.id FROM product e WHERE e.user_id = ? AND e.status = ?"
        );
        assert_eq!(
            q.params,
            vec![BindValue::Integer(7), BindValue::Text("active".into())]
        );
        assert_eq!(q.columns.len(), 1);
        assert_eq!(q.columns[0].key, "id");
    }

    #[test]
    fn test_wildcard_expands_to_whitelisted_fields() {
        let q = compile(json!({"from": "SalesChannel"})).unwrap();
        assert_eq!(
            q.sql,
            "SELECT e.id, e.name, e.created_at, e.updated_at FROM sales_channel e WHERE e.user_id = ?"
        );
        let keys: Vec<&str> = q.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["id", "name", "createdAt", "updatedAt"]);
    }

    #[test]
    fn test_parent_and_self_scopes() {
        let q = compile(json!({"select": ["id"], "from": "SalesProduct"})).unwrap();
        assert!(q.sql.contains("e.sale_id IN (SELECT id FROM sale WHERE user_id = ?)"));

        let q = compile(json!({"select": ["email"], "from": "User"})).unwrap();
        assert_eq!(q.sql, "SELECT e.email FROM app_user e WHERE e.id = ?");
    }

    #[test]
    fn test_disallowed_fields_rejected_in_each_clause() {
        let err = compile(json!({"select": ["password"], "from": "User"})).unwrap_err();
        assert!(matches!(
            err,
            QueryError::FieldNotAllowed { clause: Clause::Select, .. }
        ));

        let err = compile(json!({"from": "User", "where": {"password_like": "a"}})).unwrap_err();
        assert!(matches!(
            err,
            QueryError::FieldNotAllowed { clause: Clause::Where, ref field, ref allowed, .. }
                if field == "password" && allowed.contains("email") && !allowed.contains("password")
        ));

        let err = compile(json!({"from": "Sale", "orderBy": {"user_id": "ASC"}})).unwrap_err();
        assert!(matches!(
            err,
            QueryError::FieldNotAllowed { clause: Clause::OrderBy, .. }
        ));
    }

    #[test]
    fn test_storage_column_names_are_not_accepted() {
        let err = compile(json!({"select": ["created_at"], "from": "Sale"})).unwrap_err();
        assert!(matches!(err, QueryError::FieldNotAllowed { .. }));
    }

    #[test]
    fn test_injection_attempts_in_identifiers_rejected() {
        let err = compile(json!({"select": ["id; DROP TABLE sale"], "from": "Sale"})).unwrap_err();
        assert!(matches!(err, QueryError::FieldNotAllowed { .. }));

        let err = compile(json!({"select": ["COUNT(id) FROM app_user --"], "from": "Sale"}))
            .unwrap_err();
        assert!(matches!(err, QueryError::FieldNotAllowed { .. }));
    }

    #[test]
    fn test_user_values_are_never_interpolated() {
        let payload = "x' OR '1'='1";
        let q = compile(json!({"from": "Product", "where": {"name": payload, "name_like": payload}}))
            .unwrap();
        assert!(!q.sql.contains(payload));
        assert!(q.params.contains(&BindValue::Text(payload.into())));
        assert!(q.params.contains(&BindValue::Text(format!("%{}%", payload))));
    }

    #[test]
    fn test_aggregates_allowed_and_normalized() {
        let q = compile(json!({"select": ["count(id)", "SUM(price)"], "from": "Sale"})).unwrap();
        assert_eq!(
            q.sql,
            "SELECT COUNT(e.id), SUM(e.price) FROM sale e WHERE e.user_id = ?"
        );
        let keys: Vec<&str> = q.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["COUNT(id)", "SUM(price)"]);
    }

    #[test]
    fn test_count_star_only() {
        let q = compile(json!({"select": ["COUNT(*)"], "from": "Client"})).unwrap();
        assert!(q.sql.starts_with("SELECT COUNT(*) FROM client e"));

        let err = compile(json!({"select": ["SUM(*)"], "from": "Client"})).unwrap_err();
        assert!(matches!(err, QueryError::FieldNotAllowed { .. }));
    }

    #[test]
    fn test_unknown_aggregate_function_rejected() {
        let err = compile(json!({"select": ["GROUP_CONCAT(name)"], "from": "Client"})).unwrap_err();
        assert_eq!(
            err,
            QueryError::AggregateNotAllowed {
                function: "GROUP_CONCAT".into()
            }
        );
    }

    #[test]
    fn test_aggregate_argument_must_be_whitelisted() {
        let err = compile(json!({"select": ["MAX(password)"], "from": "User"})).unwrap_err();
        assert!(matches!(err, QueryError::FieldNotAllowed { ref field, .. } if field == "password"));
    }

    #[test]
    fn test_mixed_aggregate_groups_by_plain_fields() {
        let q = compile(json!({"select": ["name", "SUM(price)"], "from": "Sale"})).unwrap();
        assert!(q.sql.ends_with("GROUP BY e.name"));
    }

    #[test]
    fn test_empty_select_rejected() {
        let err = compile(json!({"select": [], "from": "Sale"})).unwrap_err();
        assert_eq!(err, QueryError::EmptySelect);
    }

    #[test]
    fn test_comparison_operators() {
        let q = compile(json!({
            "select": ["id"],
            "from": "Product",
            "where": {"price_gte": 10, "price_lt": 99.5, "status_neq": "archived"}
        }))
        .unwrap();
        assert!(q.sql.ends_with("AND e.price >= ? AND e.price < ? AND e.status != ?"));
        assert_eq!(
            &q.params[1..],
            &[
                BindValue::Integer(10),
                BindValue::Real(99.5),
                BindValue::Text("archived".into())
            ]
        );
    }

    #[test]
    fn test_like_wraps_value() {
        let q = compile(json!({"select": ["id"], "from": "Product", "where": {"name_like": "mug"}}))
            .unwrap();
        assert!(q.sql.ends_with("e.name LIKE ?"));
        assert_eq!(q.params[1], BindValue::Text("%mug%".into()));
    }

    #[test]
    fn test_in_requires_array() {
        let err = compile(json!({"from": "Product", "where": {"status_in": "active"}})).unwrap_err();
        assert_eq!(
            err,
            QueryError::InValueNotArray {
                key: "status_in".into()
            }
        );
    }

    #[test]
    fn test_in_binds_one_placeholder_per_value() {
        let q = compile(json!({
            "select": ["id"],
            "from": "Product",
            "where": {"status_in": ["active", "draft", "sold"]}
        }))
        .unwrap();
        assert!(q.sql.ends_with("e.status IN (?, ?, ?)"));
        assert_eq!(q.params.len(), 4);
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let q = compile(json!({"select": ["id"], "from": "Product", "where": {"id_in": []}})).unwrap();
        assert!(q.sql.ends_with("AND 1 = 0"));
        assert_eq!(q.params.len(), 1);
    }

    #[test]
    fn test_in_value_cap() {
        let translator = QueryTranslator::new(Whitelist::default(), 3);
        let d = descriptor(json!({"from": "Product", "where": {"id_in": [1, 2, 3, 4]}}));
        let err = translator.compile(&d, 1).unwrap_err();
        assert_eq!(
            err,
            QueryError::TooManyInValues {
                key: "id_in".into(),
                count: 4,
                max: 3
            }
        );
    }

    #[test]
    fn test_non_scalar_values_rejected() {
        let err = compile(json!({"from": "Product", "where": {"status": ["a"]}})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidValue { .. }));

        let err = compile(json!({"from": "Product", "where": {"status": {"$ne": 1}}})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidValue { .. }));

        let err = compile(json!({"from": "Product", "where": {"id_in": [[1]]}})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidValue { .. }));
    }

    #[test]
    fn test_null_equality_becomes_is_null() {
        let q = compile(json!({"select": ["id"], "from": "Product", "where": {"imageName": null, "status_neq": null}}))
            .unwrap();
        assert!(q.sql.ends_with("e.image_name IS NULL AND e.status IS NOT NULL"));
        assert_eq!(q.params.len(), 1);

        let err = compile(json!({"from": "Product", "where": {"price_gt": null}})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidValue { .. }));
    }

    #[test]
    fn test_bool_values_bind_as_integers() {
        let q = compile(json!({"select": ["id"], "from": "Product", "where": {"isArchived": false}}))
            .unwrap();
        assert_eq!(q.params[1], BindValue::Integer(0));
    }

    #[test]
    fn test_order_by_direction() {
        let q = compile(json!({"select": ["id"], "from": "Product", "orderBy": {"price": "desc", "name": "ASC"}}))
            .unwrap();
        assert!(q.sql.ends_with("ORDER BY e.price DESC, e.name ASC"));

        let err = compile(json!({"from": "Product", "orderBy": {"price": "RANDOM()"}})).unwrap_err();
        assert_eq!(
            err,
            QueryError::InvalidSortDirection {
                direction: "RANDOM()".into()
            }
        );

        let err = compile(json!({"from": "Product", "orderBy": {"price": 1}})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidSortDirection { .. }));
    }

    #[test]
    fn test_limit_bounds() {
        for bad in [0, -1, 1001] {
            let err = compile(json!({"from": "Product", "limit": bad})).unwrap_err();
            assert_eq!(
                err,
                QueryError::LimitOutOfRange {
                    limit: bad,
                    max: MAX_LIMIT
                }
            );
        }
        let q = compile(json!({"select": ["id"], "from": "Product", "limit": 1000})).unwrap();
        assert!(q.sql.ends_with("LIMIT ?"));
        assert_eq!(q.params.last(), Some(&BindValue::Integer(1000)));
    }

    #[test]
    fn test_offset() {
        let q = compile(json!({"select": ["id"], "from": "Product", "limit": 5, "offset": 10}))
            .unwrap();
        assert!(q.sql.ends_with("LIMIT ? OFFSET ?"));

        let q = compile(json!({"select": ["id"], "from": "Product", "offset": 10})).unwrap();
        assert!(q.sql.ends_with("LIMIT -1 OFFSET ?"));

        let err = compile(json!({"from": "Product", "offset": -1})).unwrap_err();
        assert_eq!(err, QueryError::NegativeOffset { offset: -1 });
    }

    #[test]
    fn test_validation_order_where_before_order_by_before_limit() {
        let err = compile(json!({
            "from": "Product",
            "where": {"secret": 1},
            "orderBy": {"other": "ASC"},
            "limit": 0
        }))
        .unwrap_err();
        assert!(matches!(err, QueryError::FieldNotAllowed { clause: Clause::Where, .. }));

        let err = compile(json!({"from": "Product", "orderBy": {"other": "ASC"}, "limit": 0}))
            .unwrap_err();
        assert!(matches!(err, QueryError::FieldNotAllowed { clause: Clause::OrderBy, .. }));
    }

    #[test]
    fn test_envelope_echoes_descriptor() {
        let d = descriptor(json!({"select": ["id"], "from": "Product", "where": {"status": "active"}}));
        let mut row = Map::new();
        row.insert("id".into(), json!(1));
        let env = QueryEnvelope::new(d, vec![row]);
        assert_eq!(env.count, 1);
        let body = serde_json::to_value(&env).unwrap();
        assert_eq!(body["query"]["entity"], "Product");
        assert_eq!(body["query"]["select"], json!(["id"]));
        assert_eq!(body["query"]["filters"], json!({"status": "active"}));
        assert_eq!(body["data"][0]["id"], 1);
    }
}

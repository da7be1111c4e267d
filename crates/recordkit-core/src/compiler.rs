//! The condition compiler.
//!
//! Turns a record type's [`Schema`], a caller [`Condition`] and a set of
//! options into one composed [`Query`]. Nothing passed in is mutated and
//! nothing is executed.

use recordkit_query::{Query, Schema};
use tracing::trace;

use crate::{
    condition::{apply_filter, Condition},
    error::{Error, Result},
    options::{AllowList, OptionsBag, QueryOptions},
};

/// Compiles `condition` plus text options restricted to `allowed`.
///
/// # Errors
///
/// - [`Error::InvalidOption`] if `options` holds a key outside `allowed`. This
///   is checked before any value is parsed or applied.
/// - [`Error::InvalidOptionValue`] for a malformed value or an unknown
///   association in `preload`.
pub fn compile(
    schema: &Schema,
    condition: &Condition,
    options: &OptionsBag,
    allowed: &AllowList,
) -> Result<Query> {
    let options = options.to_query_options(allowed)?;
    compile_with(schema, condition, &options)
}

/// Compiles `condition` plus already-typed options.
///
/// Filters apply left to right. Options apply in the order order_by, limit,
/// preload, offset, so equal inputs always produce equal queries.
///
/// Preloads resolve against `schema`, so they are rejected with
/// [`Error::InvalidOptionValue`] when a prebuilt query targets another table.
pub fn compile_with(schema: &Schema, condition: &Condition, options: &QueryOptions) -> Result<Query> {
    let mut query = match condition {
        Condition::Empty => schema.query(),
        Condition::Filters(filters) => filters
            .iter()
            .cloned()
            .fold(schema.query(), |query, (field, value)| {
                apply_filter(query, field, value)
            }),
        Condition::Prebuilt(query) => query.clone(),
    };

    for order in &options.order_by {
        query = query.with_order(&order.field, order.direction);
    }

    if let Some(limit) = options.limit {
        query = query.with_limit(limit);
    }

    if !options.preload.is_empty() && query.table() != schema.table() {
        return Err(Error::InvalidOptionValue {
            key: "preload".into(),
            reason: format!(
                "associations of `{}` cannot be preloaded on a query over `{}`",
                schema.table(),
                query.table()
            ),
        });
    }

    for name in &options.preload {
        let association = schema
            .association(name)
            .ok_or_else(|| Error::InvalidOptionValue {
                key: "preload".into(),
                reason: format!("`{}` has no association named `{}`", schema.table(), name),
            })?;
        query = query.with_preload(association.clone());
    }

    if let Some(offset) = options.offset {
        query = query.with_offset(offset);
    }

    trace!(table = query.table(), predicates = query.predicates().len(), "compiled query");
    Ok(query)
}

#[cfg(test)]
mod tests {
    use recordkit_query::{
        define_entity, Association, Direction, Expression as _, OrderClause, Predicate, Value,
    };

    use super::*;
    use crate::condition::FilterValue;

    define_entity!(
        users {
            table: "users",
            primary_key: ID,
            columns: {
                ID: i64 => "id",
                NAME: String => "name",
                AGE: Option<i64> => "age"
            }
        }
    );

    fn schema() -> Schema {
        users::schema().with_association(Association::has_many("posts", "posts", "user_id"))
    }

    #[test]
    fn test_filters_keep_caller_order() {
        let condition = Condition::Empty.equals("a", 1).equals("b", 2);
        let query = compile_with(&schema(), &condition, &QueryOptions::default()).unwrap();

        let fields: Vec<_> = query
            .predicates()
            .iter()
            .filter_map(Predicate::field)
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(fields, vec!["a", "b"]);
        assert_eq!(
            query.to_select_sql().0,
            "SELECT * FROM \"users\" WHERE \"a\" = ? AND \"b\" = ?"
        );
    }

    #[test]
    fn test_filter_value_kinds() {
        let condition = Condition::Filters(vec![
            (users::ID.into(), FilterValue::Set(vec![Value::Integer(1), Value::Integer(2)])),
            (users::AGE.into(), FilterValue::Null),
            (users::NAME.into(), FilterValue::Scalar(Value::Text("ada".into()))),
        ]);
        let (sql, params) = compile_with(&schema(), &condition, &QueryOptions::default())
            .unwrap()
            .to_select_sql();

        assert_eq!(
            sql,
            "SELECT * FROM \"users\" WHERE \"id\" IN (?, ?) AND \"age\" IS NULL AND \"name\" = ?"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_prebuilt_replaces_base() {
        let prebuilt = Query::from_table("active_users").filter(users::AGE.gt(18));
        let bag = OptionsBag::new().with("limit", "5");

        let query = compile(
            &schema(),
            &Condition::Prebuilt(prebuilt.clone()),
            &bag,
            &AllowList::FILTER,
        )
        .unwrap();

        assert_eq!(query.table(), "active_users");
        assert_eq!(query.predicates(), prebuilt.predicates());
        assert_eq!(query.limit(), Some(5));
    }

    #[test]
    fn test_empty_condition_uses_base() {
        let query = compile_with(&schema(), &Condition::Empty, &QueryOptions::default()).unwrap();
        assert_eq!(query, schema().query());
    }

    #[test]
    fn test_invalid_option_fails_fast() {
        let bag = OptionsBag::new()
            .with("order_by", "name")
            .with("limit", "2");

        let err = compile(&schema(), &Condition::Empty, &bag, &AllowList::ALL).unwrap_err();
        assert!(matches!(err, Error::InvalidOption { ref key, .. } if key == "limit"));
    }

    #[test]
    fn test_options_applied_in_fixed_order() {
        let bag = OptionsBag::new()
            .with("offset", "40")
            .with("preload", "posts")
            .with("limit", "20")
            .with("order_by", "name:desc");

        let first = compile(&schema(), &Condition::Empty, &bag, &AllowList::FILTER).unwrap();
        let second = compile(&schema(), &Condition::Empty, &bag, &AllowList::FILTER).unwrap();
        assert_eq!(first, second);

        assert_eq!(first.orders(), &[OrderClause::desc("name")]);
        assert_eq!(first.preloads()[0].name, "posts");
        assert_eq!(
            first.to_select_sql().0,
            "SELECT * FROM \"users\" ORDER BY \"name\" DESC LIMIT 20 OFFSET 40"
        );
    }

    #[test]
    fn test_unknown_preload() {
        let options = QueryOptions {
            preload: vec!["comments".into()],
            ..Default::default()
        };
        let err = compile_with(&schema(), &Condition::Empty, &options).unwrap_err();
        assert!(matches!(err, Error::InvalidOptionValue { ref key, .. } if key == "preload"));
    }

    #[test]
    fn test_preload_on_foreign_prebuilt_table() {
        let options = QueryOptions {
            preload: vec!["posts".into()],
            ..Default::default()
        };

        let foreign = Condition::Prebuilt(Query::from_table("active_users"));
        let err = compile_with(&schema(), &foreign, &options).unwrap_err();
        assert!(matches!(err, Error::InvalidOptionValue { ref key, .. } if key == "preload"));

        let own = Condition::Prebuilt(schema().query().filter(users::AGE.gt(18)));
        let query = compile_with(&schema(), &own, &options).unwrap();
        assert_eq!(query.preloads()[0].name, "posts");
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let condition = Condition::Empty.equals("name", "ada".to_string());
        let options = QueryOptions {
            order_by: vec![OrderClause {
                field: users::ID.into(),
                direction: Direction::Asc,
            }],
            ..Default::default()
        };
        let before = (condition.clone(), options.clone());

        let _ = compile_with(&schema(), &condition, &options).unwrap();
        assert_eq!((condition, options), before);
    }
}

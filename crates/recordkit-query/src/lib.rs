pub mod expr;
pub mod macros;
pub mod query;
pub mod schema;
pub mod traits;

pub use expr::{Col, CmpOp, Field, LogicalOp, Predicate};
pub use query::*;
pub use rusqlite::types::Value;
pub use schema::{Association, AssociationKind, Schema, SchemaError};
pub use traits::Expression;

#[cfg(test)]
mod tests {
    use super::*;

    define_entity!(
        packages {
            table: "packages",
            primary_key: ID,
            columns: {
                ID: i64 => "id",
                NAME: String => "name",
                VERSION: String => "version",
                DOWNLOADS: i64 => "downloads",
                DESCRIPTION: Option<String> => "description"
            }
        }
    );

    #[test]
    fn test_select_renders_filters_in_order() {
        let (sql, params) = packages::schema()
            .query()
            .with_equality_filter(packages::NAME, "ripgrep".to_string())
            .with_equality_filter(packages::VERSION, "1.0.0".to_string())
            .to_select_sql();

        assert_eq!(
            sql,
            "SELECT * FROM \"packages\" WHERE \"name\" = ? AND \"version\" = ?"
        );
        assert_eq!(
            params,
            vec![Value::Text("ripgrep".into()), Value::Text("1.0.0".into())]
        );
    }

    #[test]
    fn test_membership_and_null_filters() {
        let (sql, params) = Query::from_table("packages")
            .with_membership_filter("id", [1, 2, 3])
            .with_null_filter("description")
            .to_select_sql();

        assert_eq!(
            sql,
            "SELECT * FROM \"packages\" WHERE \"id\" IN (?, ?, ?) AND \"description\" IS NULL"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_empty_membership_never_matches() {
        let (sql, params) = Query::from_table("packages")
            .with_membership_filter("id", Vec::<i64>::new())
            .to_select_sql();

        assert_eq!(sql, "SELECT * FROM \"packages\" WHERE 1 = 0");
        assert!(params.is_empty());
    }

    #[test]
    fn test_order_limit_offset() {
        let (sql, _) = Query::from_table("packages")
            .with_order(packages::DOWNLOADS, Direction::Desc)
            .with_order(packages::ID, Direction::Asc)
            .page(3, 20)
            .to_select_sql();

        assert_eq!(
            sql,
            "SELECT * FROM \"packages\" ORDER BY \"downloads\" DESC, \"id\" ASC LIMIT 20 OFFSET 40"
        );
    }

    #[test]
    fn test_offset_without_limit() {
        let query = Query::from_table("packages").with_offset(5);
        assert_eq!(query.to_select_sql().0, "SELECT * FROM \"packages\" LIMIT -1 OFFSET 5");

        let (sql, _) = query.with_limit(3).without_paging().to_select_sql();
        assert_eq!(sql, "SELECT * FROM \"packages\"");
    }

    #[test]
    fn test_paging_stays_in_sqlite_range() {
        let query = Query::from_table("packages").page(u64::MAX, 20);
        assert_eq!(query.offset(), Some(u64::MAX));
        assert_eq!(
            query.to_select_sql().0,
            format!("SELECT * FROM \"packages\" LIMIT 20 OFFSET {}", i64::MAX)
        );

        let (sql, _) = Query::from_table("packages").with_limit(u64::MAX).to_select_sql();
        assert_eq!(sql, format!("SELECT * FROM \"packages\" LIMIT {}", i64::MAX));
    }

    #[test]
    fn test_aggregate_ignores_order_and_paging() {
        let query = Query::from_table("packages")
            .filter(packages::DOWNLOADS.gt(10))
            .with_order("id", Direction::Asc)
            .with_limit(1);

        let (count, _) = query.to_count_sql();
        assert_eq!(
            count,
            "SELECT COUNT(*) FROM \"packages\" WHERE \"downloads\" > ?"
        );

        let field = Field::from(packages::DOWNLOADS);
        let (sum, params) = query.to_aggregate_sql(Aggregate::Sum, Some(&field));
        assert_eq!(
            sum,
            "SELECT SUM(\"downloads\") FROM \"packages\" WHERE \"downloads\" > ?"
        );
        assert_eq!(params, vec![Value::Integer(10)]);
    }

    #[test]
    fn test_logical_and_like() {
        let (sql, params) = Query::from_table("packages")
            .filter(packages::NAME.ilike("rust").or(packages::DESCRIPTION.null()))
            .to_select_sql();

        assert_eq!(
            sql,
            "SELECT * FROM \"packages\" WHERE (LOWER(\"name\") LIKE LOWER(?) OR \"description\" IS NULL)"
        );
        assert_eq!(params, vec![Value::Text("%rust%".into())]);
    }

    #[test]
    fn test_preload_is_deduplicated() {
        let maintainers = Association::has_many("maintainers", "maintainers", "package_id");
        let query = Query::from_table("packages")
            .with_preload(maintainers.clone())
            .with_preload(maintainers.clone());
        assert_eq!(query.preloads(), &[maintainers]);
    }

    #[test]
    fn test_builders_do_not_touch_the_original() {
        let base = Query::from_table("packages");
        let narrowed = base.clone().with_equality_filter("name", "ripgrep".to_string());

        assert!(base.predicates().is_empty());
        assert_eq!(narrowed.predicates().len(), 1);
        assert_ne!(base, narrowed);
    }

    #[test]
    fn test_insert_update_delete_statements() {
        let (sql, params) = InsertQuery::into("packages")
            .set(packages::NAME, "ripgrep".to_string())
            .set(packages::DOWNLOADS, 100)
            .build();
        assert_eq!(
            sql,
            "INSERT INTO \"packages\" (\"name\", \"downloads\") VALUES (?, ?) RETURNING *"
        );
        assert_eq!(params.len(), 2);

        let query = Query::from_table("packages").with_equality_filter("id", 7);
        let (sql, params) = UpdateQuery::from_query(&query)
            .set("version", "2.0.0".to_string())
            .returning_all()
            .build();
        assert_eq!(
            sql,
            "UPDATE \"packages\" SET \"version\" = ? WHERE \"id\" = ? RETURNING *"
        );
        assert_eq!(
            params,
            vec![Value::Text("2.0.0".into()), Value::Integer(7)]
        );

        let (sql, _) = query.to_delete_sql();
        assert_eq!(sql, "DELETE FROM \"packages\" WHERE \"id\" = ?");

        let (sql, params) = query.to_update_sql([("downloads", 1)]);
        assert_eq!(
            sql,
            "UPDATE \"packages\" SET \"downloads\" = ? WHERE \"id\" = ?"
        );
        assert_eq!(params, vec![Value::Integer(1), Value::Integer(7)]);

        let (sql, _) = DeleteQuery::from_table("packages").returning_all().build();
        assert_eq!(sql, "DELETE FROM \"packages\" RETURNING *");
    }

    #[test]
    fn test_identifiers_are_quoted() {
        let (sql, _) = Query::from_table("odd\"table")
            .with_null_filter("we\"ird")
            .to_select_sql();
        assert_eq!(
            sql,
            "SELECT * FROM \"odd\"\"table\" WHERE \"we\"\"ird\" IS NULL"
        );
    }

    #[test]
    fn test_schema_primary_key() {
        assert_eq!(packages::schema().primary_key_field().unwrap().name(), "id");
        assert_eq!(packages::schema().fields().len(), 5);

        let missing = Schema::new("logs").with_field("line");
        assert!(matches!(
            missing.primary_key_field(),
            Err(SchemaError::MissingPrimaryKey(_))
        ));

        let composite = Schema::new("pairs")
            .with_primary_key("a")
            .with_primary_key("b");
        assert!(matches!(
            composite.primary_key_field(),
            Err(SchemaError::CompositePrimaryKey { .. })
        ));
    }
}

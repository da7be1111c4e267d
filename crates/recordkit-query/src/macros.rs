//! Macros for defining entity schemas.
//!
//! The [`define_entity!`] macro generates column constants for a table,
//! tying database column names to Rust types, plus a matching [`Schema`](crate::Schema).

/// Defines a module with typed column constants for a database table.
///
/// # Syntax
///
/// ```ignore
/// define_entity!(
///     users {
///         table: "users",
///         primary_key: ID,
///         columns: {
///             ID: i64 => "id",
///             NAME: String => "name"
///         }
///     }
/// );
/// ```
///
/// This expands to:
///
/// ```ignore
/// pub mod users {
///     pub const TABLE: &str = "users";
///     pub const ID: recordkit_query::Col<i64> = recordkit_query::Col::new("id");
///     pub const NAME: recordkit_query::Col<String> = recordkit_query::Col::new("name");
///
///     pub fn schema() -> recordkit_query::Schema { /* ... */ }
/// }
/// ```
///
/// # Usage
///
/// ```rust
/// use recordkit_query::{define_entity, traits::Expression as _};
///
/// define_entity!(
///     users {
///         table: "users",
///         primary_key: ID,
///         columns: {
///             ID: i64 => "id",
///             NAME: String => "name"
///         }
///     }
/// );
///
/// let query = users::schema().query().filter(users::NAME.eq("ada".to_string()));
/// assert_eq!(query.table(), "users");
/// assert_eq!(users::schema().primary_key_field().unwrap().name(), "id");
/// ```
#[macro_export]
macro_rules! define_entity {
    (
        $entity:ident {
            table: $table:literal,
            primary_key: $pk:ident,
            columns: {
                $($col_name:ident: $col_type:ty => $db_col:literal),* $(,)?
            }
        }
    ) => {
        pub mod $entity {
            #[allow(unused_imports)]
            use super::*;
            use $crate::expr::column::Col;

            pub const TABLE: &str = $table;

            $(
                pub const $col_name: Col<$col_type> = Col::new($db_col);
            )*

            pub fn schema() -> $crate::Schema {
                $crate::Schema::new(TABLE)
                    $(.with_field($col_name))*
                    .with_primary_key($pk)
            }
        }
    };
}

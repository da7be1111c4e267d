//! Query options accepted by the record helpers.
//!
//! In-process callers use the typed structs ([`AllOptions`], [`FilterOptions`],
//! [`FindOptions`], [`BatchOptions`]); each lists only the options its call
//! site accepts and converts into the canonical [`QueryOptions`]. Options that
//! arrive as text (the CLI, config files) go through [`OptionsBag`], which is
//! checked against an [`AllowList`] before anything is parsed.

use std::fmt;

use recordkit_query::{Direction, Field, OrderClause};

use crate::error::{Error, Result};

/// The options the condition compiler applies, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub order_by: Vec<OrderClause>,
    pub limit: Option<u64>,
    /// Association names, resolved against the record type's schema.
    pub preload: Vec<String>,
    pub offset: Option<u64>,
}

/// Options for fetching every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllOptions {
    pub order_by: Vec<OrderClause>,
    pub preload: Vec<String>,
    pub offset: Option<u64>,
}

/// Options for a filtered fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub limit: Option<u64>,
    pub order_by: Vec<OrderClause>,
    pub offset: Option<u64>,
    pub preload: Vec<String>,
}

/// Options for a single-record lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub limit: Option<u64>,
    pub preload: Vec<String>,
}

/// Options for cursor iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size: usize,
    /// Inclusive lower bound on the primary key.
    pub start: i64,
    /// Inclusive upper bound on the primary key.
    pub finish: Option<i64>,
    pub preload: Vec<String>,
}

pub const DEFAULT_BATCH_SIZE: usize = 1000;

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            start: 0,
            finish: None,
            preload: vec![],
        }
    }
}

impl AllOptions {
    pub fn order_by(mut self, field: impl Into<Field>, direction: Direction) -> Self {
        self.order_by.push(order(field, direction));
        self
    }

    pub fn preload(mut self, association: impl Into<String>) -> Self {
        self.preload.push(association.into());
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl FilterOptions {
    pub fn order_by(mut self, field: impl Into<Field>, direction: Direction) -> Self {
        self.order_by.push(order(field, direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn preload(mut self, association: impl Into<String>) -> Self {
        self.preload.push(association.into());
        self
    }
}

impl FindOptions {
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn preload(mut self, association: impl Into<String>) -> Self {
        self.preload.push(association.into());
        self
    }
}

impl BatchOptions {
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn start(mut self, start: i64) -> Self {
        self.start = start;
        self
    }

    pub fn finish(mut self, finish: i64) -> Self {
        self.finish = Some(finish);
        self
    }

    pub fn preload(mut self, association: impl Into<String>) -> Self {
        self.preload.push(association.into());
        self
    }

    /// Reads batch options from text, accepting only [`AllowList::BATCH`] keys.
    pub fn from_bag(bag: &OptionsBag) -> Result<Self> {
        bag.check(&AllowList::BATCH)?;

        let mut options = BatchOptions::default();
        for (key, value) in bag.iter() {
            match key {
                "batch_size" => options.batch_size = parse_number(key, value)?,
                "start" => options.start = parse_number(key, value)?,
                "finish" => options.finish = Some(parse_number(key, value)?),
                "preload" => options.preload.extend(split_list(value)),
                _ => {}
            }
        }
        Ok(options)
    }
}

fn order(field: impl Into<Field>, direction: Direction) -> OrderClause {
    OrderClause {
        field: field.into(),
        direction,
    }
}

impl From<AllOptions> for QueryOptions {
    fn from(options: AllOptions) -> Self {
        Self {
            order_by: options.order_by,
            limit: None,
            preload: options.preload,
            offset: options.offset,
        }
    }
}

impl From<FilterOptions> for QueryOptions {
    fn from(options: FilterOptions) -> Self {
        Self {
            order_by: options.order_by,
            limit: options.limit,
            preload: options.preload,
            offset: options.offset,
        }
    }
}

impl From<FindOptions> for QueryOptions {
    fn from(options: FindOptions) -> Self {
        Self {
            limit: options.limit,
            preload: options.preload,
            ..Default::default()
        }
    }
}

impl From<&BatchOptions> for QueryOptions {
    fn from(options: &BatchOptions) -> Self {
        Self {
            preload: options.preload.clone(),
            ..Default::default()
        }
    }
}

/// The option keys a call site accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowList {
    name: &'static str,
    keys: &'static [&'static str],
}

impl AllowList {
    pub const ALL: AllowList = AllowList {
        name: "all",
        keys: &["order_by", "preload", "offset"],
    };
    pub const FILTER: AllowList = AllowList {
        name: "filter",
        keys: &["limit", "order_by", "offset", "preload"],
    };
    pub const FIND: AllowList = AllowList {
        name: "find_by",
        keys: &["limit", "preload"],
    };
    pub const BATCH: AllowList = AllowList {
        name: "batches",
        keys: &["batch_size", "start", "finish", "preload"],
    };

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn keys(&self) -> &'static [&'static str] {
        self.keys
    }

    pub fn allows(&self, key: &str) -> bool {
        self.keys.contains(&key)
    }
}

impl fmt::Display for AllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keys.join(", "))
    }
}

/// Options keyed by name, as they arrive from text.
///
/// Values keep their insertion order. `order_by` and `preload` accumulate
/// across repeated keys and comma-separated items; for the other keys the last
/// value wins.
///
/// ```rust
/// use recordkit_core::options::{AllowList, OptionsBag};
///
/// let bag: OptionsBag = ["order_by=age:desc", "limit=5"]
///     .into_iter()
///     .map(OptionsBag::parse_pair)
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// let options = bag.to_query_options(&AllowList::FILTER).unwrap();
/// assert_eq!(options.limit, Some(5));
/// assert!(bag.to_query_options(&AllowList::ALL).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsBag(Vec<(String, String)>);

impl OptionsBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    /// Splits `key=value`.
    pub fn parse_pair(pair: &str) -> Result<(String, String)> {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(Error::InvalidOptionValue {
                key: pair.to_string(),
                reason: "expected `key=value`".into(),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fails on the first key `allowed` does not list.
    pub fn check(&self, allowed: &AllowList) -> Result<()> {
        match self.0.iter().find(|(key, _)| !allowed.allows(key)) {
            Some((key, _)) => Err(Error::InvalidOption {
                key: key.clone(),
                allowed: allowed.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Validates every key against `allowed`, then parses the values.
    ///
    /// Keys that configure something other than the composed query (such as
    /// `batch_size`) are accepted when allowed and otherwise ignored here.
    pub fn to_query_options(&self, allowed: &AllowList) -> Result<QueryOptions> {
        self.check(allowed)?;

        let mut options = QueryOptions::default();
        for (key, value) in self.iter() {
            match key {
                "order_by" => {
                    for item in split_list(value) {
                        options.order_by.push(parse_order(&item)?);
                    }
                }
                "limit" => options.limit = Some(parse_bound(key, value)?),
                "offset" => options.offset = Some(parse_bound(key, value)?),
                "preload" => options.preload.extend(split_list(value)),
                _ => {}
            }
        }
        Ok(options)
    }
}

impl FromIterator<(String, String)> for OptionsBag {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    value.parse().map_err(|err: T::Err| Error::InvalidOptionValue {
        key: key.to_string(),
        reason: format!("`{}`: {}", value, err),
    })
}

/// A LIMIT or OFFSET value; SQLite caps both at `i64::MAX`.
fn parse_bound(key: &str, value: &str) -> Result<u64> {
    let bound: u64 = parse_number(key, value)?;
    if bound > i64::MAX as u64 {
        return Err(Error::InvalidOptionValue {
            key: key.to_string(),
            reason: format!("`{}` exceeds {}", value, i64::MAX),
        });
    }
    Ok(bound)
}

/// `field`, `field:asc` or `field:desc`.
fn parse_order(item: &str) -> Result<OrderClause> {
    let (field, direction) = match item.split_once(':') {
        Some((field, direction)) => (field.trim(), direction.trim()),
        None => (item, "asc"),
    };

    let direction = match direction.to_ascii_lowercase().as_str() {
        "asc" => Direction::Asc,
        "desc" => Direction::Desc,
        other => {
            return Err(Error::InvalidOptionValue {
                key: "order_by".into(),
                reason: format!("unknown direction `{}`", other),
            })
        }
    };

    if field.is_empty() {
        return Err(Error::InvalidOptionValue {
            key: "order_by".into(),
            reason: "missing field name".into(),
        });
    }

    Ok(order(field, direction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_rejected_before_parsing() {
        let bag = OptionsBag::new()
            .with("limit", "not-a-number")
            .with("ordr_by", "name");

        let err = bag.to_query_options(&AllowList::FILTER).unwrap_err();
        assert!(matches!(err, Error::InvalidOption { ref key, .. } if key == "ordr_by"));
    }

    #[test]
    fn test_key_valid_elsewhere_is_still_rejected() {
        let bag = OptionsBag::new().with("limit", "1");
        let err = bag.to_query_options(&AllowList::ALL).unwrap_err();
        assert!(matches!(err, Error::InvalidOption { ref key, .. } if key == "limit"));
    }

    #[test]
    fn test_parses_values() {
        let bag = OptionsBag::new()
            .with("order_by", "age:DESC, name")
            .with("preload", "posts,comments")
            .with("limit", "10")
            .with("offset", "20");

        let options = bag.to_query_options(&AllowList::FILTER).unwrap();
        assert_eq!(
            options.order_by,
            vec![OrderClause::desc("age"), OrderClause::asc("name")]
        );
        assert_eq!(options.preload, vec!["posts", "comments"]);
        assert_eq!(options.limit, Some(10));
        assert_eq!(options.offset, Some(20));
    }

    #[test]
    fn test_malformed_value() {
        let bag = OptionsBag::new().with("order_by", "age:sideways");
        assert!(matches!(
            bag.to_query_options(&AllowList::ALL),
            Err(Error::InvalidOptionValue { .. })
        ));

        let bag = OptionsBag::new().with("limit", u64::MAX.to_string());
        assert!(matches!(
            bag.to_query_options(&AllowList::FILTER),
            Err(Error::InvalidOptionValue { ref key, .. }) if key == "limit"
        ));

        let bag = OptionsBag::new().with("offset", (i64::MAX as u64 + 1).to_string());
        assert!(matches!(
            bag.to_query_options(&AllowList::FILTER),
            Err(Error::InvalidOptionValue { ref key, .. }) if key == "offset"
        ));

        assert!(OptionsBag::parse_pair("=5").is_err());
        assert_eq!(
            OptionsBag::parse_pair(" limit = 5").unwrap(),
            ("limit".to_string(), "5".to_string())
        );
    }

    #[test]
    fn test_batch_options_from_bag() {
        let bag = OptionsBag::new()
            .with("batch_size", "250")
            .with("start", "10")
            .with("finish", "900");

        let options = BatchOptions::from_bag(&bag).unwrap();
        assert_eq!(options.batch_size, 250);
        assert_eq!(options.start, 10);
        assert_eq!(options.finish, Some(900));

        let bag = OptionsBag::new().with("order_by", "id");
        assert!(matches!(
            BatchOptions::from_bag(&bag),
            Err(Error::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_typed_options_convert() {
        let options: QueryOptions = FindOptions::default().limit(1).preload("posts").into();
        assert_eq!(options.limit, Some(1));
        assert!(options.order_by.is_empty());

        let options: QueryOptions = AllOptions::default().offset(3).into();
        assert_eq!(options.limit, None);
        assert_eq!(options.offset, Some(3));
    }
}

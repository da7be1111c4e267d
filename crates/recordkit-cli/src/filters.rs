use recordkit_core::{Condition, OptionsBag};
use recordkit_db::helpers::parse_value;
use recordkit_query::Value;

use crate::{
    cli::FilterArgs,
    error::{CliError, CliResult},
};

fn split_pair<'a>(arg: &str, pair: &'a str) -> CliResult<(&'a str, &'a str)> {
    match pair.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => Ok((field.trim(), value)),
        _ => Err(CliError::InvalidArgument {
            arg: arg.to_string(),
            reason: format!("expected FIELD=VALUE, got `{pair}`"),
        }),
    }
}

impl FilterArgs {
    /// Filters in the order `--eq`, `--in`, `--null`. `--eq FIELD=null`
    /// matches NULL.
    pub fn to_condition(&self) -> CliResult<Condition> {
        let mut condition = Condition::Empty;

        for pair in &self.eq {
            let (field, raw) = split_pair("--eq", pair)?;
            condition = match parse_value(raw) {
                Value::Null => condition.is_null(field),
                value => condition.equals(field, value),
            };
        }

        for pair in &self.any_of {
            let (field, raw) = split_pair("--in", pair)?;
            let values = raw
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(parse_value);
            condition = condition.any_of(field, values);
        }

        for field in &self.null {
            condition = condition.is_null(field.as_str());
        }

        Ok(condition)
    }
}

pub fn options_bag(pairs: &[String]) -> CliResult<OptionsBag> {
    Ok(pairs
        .iter()
        .map(|pair| OptionsBag::parse_pair(pair))
        .collect::<recordkit_core::Result<OptionsBag>>()?)
}

use std::io::Write;

use recordkit_config::config::Config;
use recordkit_core::{BatchOptions, Condition, FilterOptions, Model};
use recordkit_db::{helpers::value_to_json, DynamicRecord, SqliteRepository};
use recordkit_query::{Aggregate, Field};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    cli::Commands,
    error::{CliError, CliResult},
    filters::options_bag,
};

type TableModel = Model<DynamicRecord, SqliteRepository>;

/// Runs commands against one open database.
pub struct Session {
    repo: SqliteRepository,
    config: Config,
}

fn write_line<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_records<W: Write>(out: &mut W, records: &[DynamicRecord]) -> CliResult<()> {
    records.iter().try_for_each(|record| write_line(out, record))
}

impl Session {
    pub fn new(repo: SqliteRepository, config: Config) -> Self {
        Self { repo, config }
    }

    fn model(&self, table: &str) -> CliResult<TableModel> {
        let schema = self.repo.introspect(table)?;
        Ok(Model::with_schema(self.repo.clone(), schema))
    }

    pub fn run<W: Write>(&self, command: Commands, out: &mut W) -> CliResult<()> {
        match command {
            Commands::Config => {
                write!(out, "{}", self.config.to_toml()?)?;
            }
            Commands::Find { table, ids } => {
                let model = self.model(&table)?;
                match ids.as_slice() {
                    [id] => write_line(out, &model.find(*id)?)?,
                    ids => write_records(out, &model.find_many(ids)?)?,
                }
            }
            Commands::Fetch { table, ids } => {
                let model = self.model(&table)?;
                let records = match ids.as_slice() {
                    [id] => model.fetch(*id)?.into_iter().collect(),
                    ids => model.fetch_many(ids)?,
                };
                if records.len() < ids.len() {
                    info!("{} of {} ids not found", ids.len() - records.len(), ids.len());
                }
                write_records(out, &records)?;
            }
            Commands::Where {
                table,
                filters,
                options,
            } => {
                let model = self.model(&table)?;
                let records = model.filter_with(&filters.to_condition()?, &options_bag(&options)?)?;
                write_records(out, &records)?;
            }
            Commands::Count { table, filters } => {
                let count = self.model(&table)?.count(&filters.to_condition()?)?;
                write_line(out, &json!({ "count": count }))?;
            }
            Commands::First { table, filters, n } => {
                let records = self.model(&table)?.first_n(&filters.to_condition()?, n)?;
                write_records(out, &records)?;
            }
            Commands::Last { table, filters, n } => {
                let records = self.model(&table)?.last_n(&filters.to_condition()?, n)?;
                write_records(out, &records)?;
            }
            Commands::Page {
                table,
                filters,
                page,
                per_page,
            } => {
                let per_page = per_page.unwrap_or_else(|| self.config.get_per_page());
                let page = self.model(&table)?.paginate(
                    &filters.to_condition()?,
                    page,
                    per_page,
                    FilterOptions::default(),
                )?;
                write_line(out, &page)?;
            }
            Commands::Scan {
                table,
                filters,
                batch_size,
                start,
                finish,
                summary,
            } => {
                let mut options = BatchOptions::default()
                    .batch_size(batch_size.unwrap_or_else(|| self.config.get_batch_size()))
                    .start(start);
                if let Some(finish) = finish {
                    options = options.finish(finish);
                }
                let model = self.model(&table)?;
                let condition = filters.to_condition()?;
                if summary {
                    self.scan_summary(&model, &condition, options, out)?;
                } else {
                    model.find_each(&condition, options, |record| write_line(out, &record))?;
                }
            }
            Commands::Aggregate {
                table,
                function,
                field,
                filters,
            } => {
                let function = Aggregate::from(function);
                let value = self.model(&table)?.aggregate(
                    &filters.to_condition()?,
                    function,
                    Some(&Field::new(field)),
                )?;
                let mut result = serde_json::Map::new();
                result.insert(
                    function.as_sql().to_lowercase(),
                    value.as_ref().map(value_to_json).unwrap_or_default(),
                );
                write_line(out, &result)?;
            }
            Commands::DeleteWhere {
                table,
                filters,
                yes,
            } => {
                if !yes {
                    return Err(CliError::ConfirmationRequired);
                }
                let condition = filters.to_condition()?;
                if condition == Condition::Empty {
                    warn!("deleting every record in `{table}`");
                }
                let deleted = self.model(&table)?.delete_all(&condition)?;
                write_line(out, &json!({ "deleted": deleted }))?;
            }
        }

        Ok(())
    }

    fn scan_summary<W: Write>(
        &self,
        model: &TableModel,
        condition: &Condition,
        options: BatchOptions,
        out: &mut W,
    ) -> CliResult<()> {
        let key = model
            .schema()
            .primary_key_field()
            .map_err(recordkit_core::Error::from)?
            .name()
            .to_string();
        let key_of = |record: Option<&DynamicRecord>| {
            record
                .and_then(|r| r.get(&key))
                .map(value_to_json)
                .unwrap_or_default()
        };

        let mut batches = 0usize;
        let mut rows = 0usize;
        model.find_in_batches(condition, options, |batch| {
            batches += 1;
            rows += batch.len();
            write_line(
                out,
                &json!({
                    "batch": batches,
                    "rows": batch.len(),
                    "first": key_of(batch.first()),
                    "last": key_of(batch.last()),
                }),
            )
        })?;

        info!("scanned {rows} rows in {batches} batches");
        Ok(())
    }
}

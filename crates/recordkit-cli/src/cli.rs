use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};
use recordkit_query::Aggregate;

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output logs as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to the SQLite database
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub db: Option<String>,

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Column constraints shared by the filtering commands.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct FilterArgs {
    /// Match rows where FIELD equals VALUE
    #[arg(long = "eq", value_name = "FIELD=VALUE")]
    pub eq: Vec<String>,

    /// Match rows where FIELD is one of the comma-separated VALUES
    #[arg(long = "in", value_name = "FIELD=A,B,..")]
    pub any_of: Vec<String>,

    /// Match rows where FIELD is NULL
    #[arg(long = "null", value_name = "FIELD")]
    pub null: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the resolved configuration
    Config,

    /// Find records by primary key, failing if any is missing
    #[command(arg_required_else_help = true)]
    Find {
        table: String,

        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Fetch records by primary key, skipping missing ones
    #[command(arg_required_else_help = true)]
    Fetch {
        table: String,

        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// List records matching filters
    #[command(arg_required_else_help = true)]
    Where {
        table: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Query option such as order_by=name:desc, limit=10, offset=20, preload=posts
        #[arg(long = "option", short = 'o', value_name = "KEY=VALUE")]
        options: Vec<String>,
    },

    /// Count records matching filters
    #[command(arg_required_else_help = true)]
    Count {
        table: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Records with the lowest primary keys
    #[command(arg_required_else_help = true)]
    First {
        table: String,

        #[command(flatten)]
        filters: FilterArgs,

        #[arg(short, default_value_t = 1)]
        n: u64,
    },

    /// Records with the highest primary keys
    #[command(arg_required_else_help = true)]
    Last {
        table: String,

        #[command(flatten)]
        filters: FilterArgs,

        #[arg(short, default_value_t = 1)]
        n: u64,
    },

    /// Print one page of records matching filters
    #[command(arg_required_else_help = true)]
    Page {
        table: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: u64,

        /// Records per page [default: from config]
        #[arg(long)]
        per_page: Option<u64>,
    },

    /// Walk every matching record in primary key order
    #[command(arg_required_else_help = true)]
    Scan {
        table: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Rows per batch [default: from config]
        #[arg(long)]
        batch_size: Option<usize>,

        /// Inclusive lower primary key bound
        #[arg(long, default_value_t = 0)]
        start: i64,

        /// Inclusive upper primary key bound
        #[arg(long)]
        finish: Option<i64>,

        /// Print one line per batch instead of every record
        #[arg(long)]
        summary: bool,
    },

    /// Compute an aggregate over a column
    #[command(arg_required_else_help = true)]
    Aggregate {
        table: String,

        function: AggregateFn,

        field: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Delete every record matching filters
    #[command(arg_required_else_help = true)]
    DeleteWhere {
        table: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AggregateFn {
    Sum,
    Avg,
    Min,
    Max,
}

impl From<AggregateFn> for Aggregate {
    fn from(value: AggregateFn) -> Self {
        match value {
            AggregateFn::Sum => Aggregate::Sum,
            AggregateFn::Avg => Aggregate::Avg,
            AggregateFn::Min => Aggregate::Min,
            AggregateFn::Max => Aggregate::Max,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_where() {
        let args = Args::parse_from([
            "recordkit", "--db", "app.db", "where", "users", "--eq", "name=ada", "--in", "id=1,2",
            "--null", "bio", "-o", "limit=5",
        ]);

        assert_eq!(args.db.as_deref(), Some("app.db"));
        let Commands::Where { table, filters, options } = args.command else {
            panic!("expected where");
        };
        assert_eq!(table, "users");
        assert_eq!(filters.eq, vec!["name=ada"]);
        assert_eq!(filters.any_of, vec!["id=1,2"]);
        assert_eq!(filters.null, vec!["bio"]);
        assert_eq!(options, vec!["limit=5"]);
    }

    #[test]
    fn test_parse_scan_defaults() {
        let args = Args::parse_from(["recordkit", "scan", "users", "--summary"]);
        let Commands::Scan { batch_size, start, finish, summary, .. } = args.command else {
            panic!("expected scan");
        };
        assert_eq!(batch_size, None);
        assert_eq!(start, 0);
        assert_eq!(finish, None);
        assert!(summary);
    }
}

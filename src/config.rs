//! Command line and environment configuration.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};

use crate::{
    report::Report,
    sql::{DataSource, QueryDefinition, queries},
};

const DEFAULT_TITLE: &str = "ImmunoSys – An Influenza Vaccine Tracking System";

#[derive(Parser, Debug)]
#[command(name = "immunoreport", version)]
#[command(about = "Run a set of analytical SQL queries and render them as an HTML report")]
pub struct Cli {
    /// SQLite database path or `file:` URI
    #[arg(long, env = "IMMUNOREPORT_DATABASE")]
    pub database: String,

    /// SQL script to run before the report queries (for seeding `:memory:`)
    #[arg(long, env = "IMMUNOREPORT_INIT_SQL")]
    pub init_sql: Option<PathBuf>,

    /// TOML file of `[[query]]` definitions; the built-in ImmunoSys set when omitted
    #[arg(long, env = "IMMUNOREPORT_QUERIES")]
    pub queries: Option<PathBuf>,

    /// Time limit for running all queries, in seconds
    #[arg(long, env = "IMMUNOREPORT_TIMEOUT_SECS", default_value_t = 5)]
    pub timeout_secs: u64,

    /// Page title
    #[arg(long, default_value = DEFAULT_TITLE)]
    pub title: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the report over HTTP
    Serve {
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },
    /// Render the report once
    Render {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse query set {path}: {source}")]
    ParseQueries {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("query set {0} defines no queries")]
    NoQueries(PathBuf),
}

impl Cli {
    /// Build the report described by these options.
    pub fn report(&self) -> Result<Report, Error> {
        let definitions = match &self.queries {
            Some(path) => load_queries(path)?,
            None => queries::immunosys(),
        };
        let init_sql = self.init_sql.as_deref().map(read).transpose()?;

        let mut source = DataSource::new(self.database.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(init_sql) = init_sql {
            source = source.with_init_sql(init_sql);
        }

        Ok(Report {
            title: self.title.clone(),
            definitions,
            source,
        })
    }
}

fn read(path: &std::path::Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a query set from a TOML file.
pub fn load_queries(path: &std::path::Path) -> Result<Vec<QueryDefinition>, Error> {
    let content = read(path)?;
    let definitions = queries::parse(&content).map_err(|source| Error::ParseQueries {
        path: path.to_path_buf(),
        source,
    })?;

    if definitions.is_empty() {
        return Err(Error::NoQueries(path.to_path_buf()));
    }
    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("immunoreport").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["--database", "immunosys.db", "render"]);
        assert_eq!(cli.timeout_secs, 5);
        assert_eq!(cli.title, DEFAULT_TITLE);
        assert!(matches!(cli.command, Command::Render { output: None }));

        let report = cli.report().expect("report");
        assert_eq!(report.definitions, queries::immunosys());
        assert_eq!(report.source.database, "immunosys.db");
        assert_eq!(report.source.init_sql, None);
        assert_eq!(report.source.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_serve_port() {
        let cli = parse(&["--database", ":memory:", "serve", "--port", "8080"]);
        assert!(matches!(cli.command, Command::Serve { port: 8080 }));
    }

    #[test]
    fn test_custom_queries_and_init_sql() {
        let mut queries_file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            queries_file,
            "[[query]]\ndescription = \"Everyone\"\nquery = \"SELECT * FROM Patients\""
        )
        .expect("write queries");
        let mut init_file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(init_file, "CREATE TABLE Patients (Name TEXT);").expect("write init");

        let cli = parse(&[
            "--database",
            ":memory:",
            "--queries",
            queries_file.path().to_str().expect("utf-8 path"),
            "--init-sql",
            init_file.path().to_str().expect("utf-8 path"),
            "--timeout-secs",
            "1",
            "render",
        ]);
        let report = cli.report().expect("report");
        assert_eq!(report.definitions.len(), 1);
        assert_eq!(report.definitions[0].description, "Everyone");
        assert_eq!(
            report.source.init_sql.as_deref(),
            Some("CREATE TABLE Patients (Name TEXT);\n")
        );
        assert_eq!(report.source.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_empty_query_set() {
        let queries_file = tempfile::NamedTempFile::new().expect("tempfile");
        let result = load_queries(queries_file.path());
        assert!(matches!(result, Err(Error::NoQueries(_))));
    }

    #[test]
    fn test_missing_query_file() {
        let result = load_queries(std::path::Path::new("/nonexistent/queries.toml"));
        assert!(matches!(result, Err(Error::Read { .. })));
    }

    #[test]
    fn test_malformed_query_file() {
        let mut queries_file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(queries_file, "[[query]]\ndescription = 1").expect("write queries");
        let result = load_queries(queries_file.path());
        assert!(matches!(result, Err(Error::ParseQueries { .. })));
    }
}

mod commands;

use clap::{Parser, Subcommand};
use commands::{parse_key_value, summarize_har, test_attributes, CliError};
use gtmetrix::prelude::*;
use serde_json::Value;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "gtmetrix")]
#[command(about = "Run GTmetrix performance tests and inspect their reports")]
struct Cli {
    /// GTmetrix API key
    #[arg(long, env = "GTMETRIX_API_KEY", hide_env_values = true)]
    api_key: String,
    /// API base URL
    #[arg(long, env = "GTMETRIX_BASE_URL")]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show API credits and next refill time
    Status,
    /// Start tests for one or more URLs
    Start {
        #[arg(required = true)]
        urls: Vec<String>,
        /// Test parameter such as location=1 or report=lighthouse (repeatable)
        #[arg(short, long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
        /// Wait for the tests to finish and print their reports
        #[arg(short, long)]
        wait: bool,
    },
    /// List recent tests
    List {
        /// created, started or finished; prefix with '-' for descending
        #[arg(short, long)]
        sort: Option<Sort>,
        /// Filter such as state=completed or created:gt=1618437519 (repeatable)
        #[arg(short, long = "filter", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,
    },
    /// Show a test and its report, if any
    Test {
        id: String,
        /// Wait for the test to finish
        #[arg(short, long)]
        wait: bool,
    },
    /// Operations on a report (prints it by default)
    Report {
        id: String,
        #[command(subcommand)]
        action: Option<ReportAction>,
    },
}

#[derive(Subcommand)]
enum ReportAction {
    /// Print the report
    Print,
    /// Delete the report
    Delete,
    /// Start a new test with the same parameters
    Retest,
    /// Download a resource such as report.pdf or net.har
    Resource {
        name: String,
        /// File to save the resource to (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Total uncompressed size of all responses in the HAR
    Size,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::new(cli.api_key);
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }
    let account = Account::new(config)?;

    match cli.command {
        Commands::Status => {
            print_json(&Value::Object(account.status()?))?;
        }
        Commands::Start { urls, params, wait } => {
            start_tests(&account, &urls, &params, wait)?;
        }
        Commands::List { sort, filters } => {
            let mut query = TestQuery::new();
            if let Some(sort) = sort {
                query = query.with_sort(sort);
            }
            for (key, value) in filters {
                query = query.filter(key, value);
            }
            let tests = account.list_tests(&query)?;
            let values = tests.iter().map(Test::to_value).collect();
            print_json(&Value::Array(values))?;
        }
        Commands::Test { id, wait } => {
            let mut test = account.test(&id)?;
            if wait {
                test.wait_for_completion()?;
            }
            print_test(&mut test)?;
        }
        Commands::Report { id, action } => {
            let report = account.report(&id)?;
            run_report_action(&report, action.unwrap_or(ReportAction::Print))?;
        }
    }

    Ok(())
}

fn start_tests(
    account: &Account,
    urls: &[String],
    params: &[(String, String)],
    wait: bool,
) -> Result<(), CliError> {
    let mut tests = Vec::with_capacity(urls.len());
    for url in urls {
        let test = account.start_test(url, test_attributes(params))?;
        print_json(&test.to_value())?;
        tests.push(test);
    }

    if !wait {
        return Ok(());
    }

    for test in &mut tests {
        info!("Waiting for test {} to finish", test.id());
        test.wait_for_completion()?;
    }

    for test in &mut tests {
        let id = test.id().to_string();
        match test.report()? {
            Some(report) => print_json(&report.to_value())?,
            None => warn!("No report for test {}", id),
        }
    }

    Ok(())
}

fn print_test(test: &mut Test) -> Result<(), CliError> {
    print_json(&test.to_value())?;
    if let Some(report) = test.report()? {
        print_json(&report.to_value())?;
    }
    Ok(())
}

fn run_report_action(report: &Report, action: ReportAction) -> Result<(), CliError> {
    match action {
        ReportAction::Print => print_json(&report.to_value())?,
        ReportAction::Delete => {
            report.delete()?;
            println!("Report {} deleted.", report.id());
        }
        ReportAction::Retest => {
            let test = report.retest()?;
            print_json(&test.to_value())?;
        }
        ReportAction::Resource { name, output } => match output {
            Some(path) => {
                let written = report.save_resource(&name, &path)?;
                info!("Saved {} bytes to {}", written, path.display());
            }
            None => {
                let mut stdout = io::stdout().lock();
                report.resource(&name, ResourceDestination::Writer(&mut stdout))?;
            }
        },
        ReportAction::Size => {
            let har = report.resource_bytes("net.har")?;
            println!("{}", summarize_har(&har)?.describe());
        }
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

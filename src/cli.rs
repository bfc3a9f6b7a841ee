//! CLI argument parsing for the Robot Framework to Xray importer.
use crate::config::EvidenceMode;
use crate::filter::{FilterCategory, FilterOp, FilterSet};
use crate::model::ExecutionInfo;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Environment variable consulted when `--password` is not given.
pub const PASSWORD_ENV: &str = "RF2XRAY_PASSWORD";

#[derive(Parser, Debug)]
#[command(
    name = "rf2xray",
    version,
    about = "Import Robot Framework output.xml results into Xray test executions",
    after_help = "Examples:\n  rf2xray import output.xml https://jira.example.com alice --password secret\n  rf2xray import output.xml https://jira.example.com alice --evidences-selection fail --filter-tag smoke\n  rf2xray convert output.xml --no-steps --out executions.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Import(ImportArgs),
    Convert(ConvertArgs),
}

/// Import command inputs: parse a report and submit every execution.
#[derive(Parser, Debug)]
#[command(about = "Parse a report and import its executions into Xray")]
pub struct ImportArgs {
    /// Robot Framework output.xml
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Jira base URL
    #[arg(value_name = "URL")]
    pub url: String,

    /// Jira user name
    #[arg(value_name = "USERNAME")]
    pub username: String,

    /// Jira password or API token (OAuth from the config file when absent)
    #[arg(long, env = PASSWORD_ENV, hide_env_values = true)]
    pub password: Option<String>,

    /// Import endpoint relative to the Jira URL
    #[arg(long, value_name = "PATH")]
    pub endpoint: Option<String>,

    /// PEM file with the CA certificate to trust
    #[arg(long, value_name = "PEM")]
    pub certificate: Option<PathBuf>,

    /// Components of the created test executions
    #[arg(long, value_name = "COMPONENT", num_args = 1..)]
    pub components: Vec<String>,

    #[command(flatten)]
    pub report: ReportArgs,

    #[command(flatten)]
    pub info: InfoArgs,
}

/// Convert command inputs: parse a report and emit the import JSON.
#[derive(Parser, Debug)]
#[command(about = "Parse a report and write the Xray import JSON")]
pub struct ConvertArgs {
    /// Robot Framework output.xml
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output path for the JSON array of executions (stdout when omitted)
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub report: ReportArgs,

    #[command(flatten)]
    pub info: InfoArgs,
}

/// Options controlling how the report is read.
#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Import flattened evidences instead of steps
    #[arg(long)]
    pub no_steps: bool,

    /// Which evidences to import
    #[arg(long, value_enum, ignore_case = true, default_value_t = EvidenceMode::All)]
    pub evidences_selection: EvidenceMode,

    /// Only import tests carrying this tag (full text or value)
    #[arg(long, value_name = "TAG")]
    pub filter_tag: Vec<String>,

    /// Only import tests inside this suite
    #[arg(long, value_name = "SUITE")]
    pub filter_test_suite: Vec<String>,

    /// Only import the test with this name
    #[arg(long, value_name = "NAME")]
    pub filter_test_case: Vec<String>,

    /// How multiple filter categories are combined
    #[arg(long, value_enum, ignore_case = true, default_value_t = FilterOp::And)]
    pub filter_options: FilterOp,

    /// JSON config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Emit debug-level logs
    #[arg(long)]
    pub debug: bool,
}

impl ReportArgs {
    pub fn filters(&self) -> FilterSet {
        FilterSet::new(self.filter_options)
            .with_values(FilterCategory::Tag, self.filter_tag.clone())
            .with_values(FilterCategory::Suite, self.filter_test_suite.clone())
            .with_values(FilterCategory::TestCase, self.filter_test_case.clone())
    }
}

/// Execution metadata supplied by the caller.
#[derive(Args, Debug, Clone, Default)]
pub struct InfoArgs {
    /// Jira project key of created executions
    #[arg(long)]
    pub project: Option<String>,

    /// Execution summary
    #[arg(long)]
    pub summary: Option<String>,

    /// Execution description
    #[arg(long)]
    pub description: Option<String>,

    /// Jira user recorded as executor
    #[arg(long)]
    pub user: Option<String>,

    /// Version of the system under test
    #[arg(long)]
    pub test_exec_version: Option<String>,

    /// Revision of the system under test
    #[arg(long)]
    pub test_exec_revision: Option<String>,

    /// Start date in Xray format (2018-09-12T10:11:12+01:00)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Finish date in Xray format
    #[arg(long)]
    pub finish_date: Option<String>,

    /// Test plan the executions belong to
    #[arg(long)]
    pub test_plan_key: Option<String>,

    /// Test environments separated by '|'
    #[arg(long, value_name = "ENV|ENV")]
    pub test_environments: Option<String>,
}

impl InfoArgs {
    pub fn to_info(&self) -> ExecutionInfo {
        ExecutionInfo {
            project: self.project.clone(),
            summary: self.summary.clone(),
            description: self.description.clone(),
            user: self.user.clone(),
            version: self.test_exec_version.clone(),
            revision: self.test_exec_revision.clone(),
            start_date: self.start_date.clone(),
            finish_date: self.finish_date.clone(),
            test_plan_key: self.test_plan_key.clone(),
            test_environments: self
                .test_environments
                .as_deref()
                .map(split_environments)
                .unwrap_or_default(),
        }
    }
}

fn split_environments(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|env| !env.is_empty())
        .map(str::to_string)
        .collect()
}

//! CLI argument parsing for the seeding run.
//!
//! The CLI only collects values; validation happens when they are turned
//! into a `RunConfig`.
use clap::Parser;

pub const DEFAULT_HOST: &str = "http://localhost:7700";
pub const DEFAULT_KEY: &str = "MASTER_KEY";
pub const DEFAULT_INDEX: &str = "movies";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(
    name = "meili-seed",
    version,
    about = "Seed a Meilisearch index with a demo movie dataset and run verification searches",
    after_help = "Steps:\n  create index -> searchable attributes -> filterable attributes -> documents -> synonyms -> search\n\nEvery step runs even if an earlier one fails; the exit code is 0 once the run completes.\n\nExamples:\n  meili-seed\n  meili-seed --host http://search.local:7700 --key s3cret --index films --verbose\n  meili-seed --fresh --json"
)]
pub struct SeedArgs {
    /// Search engine base URL
    #[arg(long, value_name = "URL", env = "MEILISEARCH_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// API key sent as a bearer token
    #[arg(
        short = 'k',
        long,
        value_name = "KEY",
        env = "MEILISEARCH_API_KEY",
        default_value = DEFAULT_KEY,
        hide_env_values = true
    )]
    pub key: String,

    /// Index to create and seed
    #[arg(short = 'i', long, value_name = "NAME", default_value = DEFAULT_INDEX)]
    pub index: String,

    /// Print every request, response, and classification
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Emit the run summary as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Probe GET /health before seeding
    #[arg(long)]
    pub check_health: bool,

    /// Delete the index before creating it
    #[arg(long)]
    pub fresh: bool,
}

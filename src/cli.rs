use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use converge::ConvergenceMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sonic-converge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge SONiC network configuration to a desired state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the operations and commands a configuration would produce
    Plan(PlanArgs),

    /// Converge one resource and push its commands
    Apply(ApplyArgs),

    /// Run a playbook of resource tasks
    Run(RunArgs),

    /// Check a configuration document against a resource schema
    Validate {
        /// Resource name (see `resources`)
        resource: String,

        /// Configuration document (JSON or TOML)
        file: PathBuf,
    },

    /// List the known resources, or show the schema of one
    Resources {
        /// Resource to describe
        name: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Convergence state
// ============================================================================

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum StateArg {
    #[default]
    Merged,
    Replaced,
    Overridden,
    Deleted,
}

impl From<StateArg> for ConvergenceMode {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Merged => Self::Merged,
            StateArg::Replaced => Self::Replaced,
            StateArg::Overridden => Self::Overridden,
            StateArg::Deleted => Self::Deleted,
        }
    }
}

// ============================================================================
// Plan / Apply
// ============================================================================

#[derive(Args)]
pub struct TargetArgs {
    /// Resource name (see `resources`)
    pub resource: String,

    /// Desired configuration (JSON or TOML); omitted means empty
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Facts file holding the current configuration, keyed by resource
    #[arg(short, long, env = "SONIC_CONVERGE_FACTS")]
    pub facts: Option<PathBuf>,

    /// Convergence state
    #[arg(short, long, value_enum, default_value_t)]
    pub state: StateArg,

    /// Show a before/after diff of the configuration
    #[arg(short, long)]
    pub diff: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub push: PushArgs,
}

#[derive(Args)]
pub struct PushArgs {
    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,

    /// Report what would change without pushing anything
    #[arg(long)]
    pub check: bool,

    /// Append pushed commands to this file instead of printing them
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the resulting configuration back into the facts file
    #[arg(long)]
    pub update_facts: bool,
}

// ============================================================================
// Run
// ============================================================================

#[derive(Args)]
pub struct RunArgs {
    /// Playbook file (JSON or TOML)
    pub playbook: PathBuf,

    /// Facts file for tasks that do not name their own
    #[arg(short, long, env = "SONIC_CONVERGE_FACTS")]
    pub facts: Option<PathBuf>,

    /// Number of parallel jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Show a before/after diff for every changed task
    #[arg(short, long)]
    pub diff: bool,

    #[command(flatten)]
    pub push: PushArgs,
}

//! CLI structure and command definitions

use astractl_core::{BundleKind, Environment, ListFilter};
use clap::{Args, Parser, Subcommand};

/// Astra database lifecycle CLI
#[derive(Parser, Debug)]
#[command(name = "astractl")]
#[command(version, about = "Provision and manage Astra databases from the command line")]
#[command(long_about = "
Provision and manage Astra databases from the command line

Commands that change a database block until it reaches its target status,
polling the control plane at a fixed interval for a bounded number of attempts.

EXAMPLES:
    # Store a service account for the default profile
    astractl login --json '{\"clientName\":\"me\",\"clientId\":\"...\",\"clientSecret\":\"...\"}'

    # Or store a token
    astractl login --token AstraCS:...

    # Create a database and wait until it is active
    astractl db create mydb --keyspace app

    # List databases as JSON for scripting
    astractl db list -o json

    # Download the secure connect bundle
    astractl db secure-bundle <id> --location bundle.zip

For more help on a specific command, run:
    astractl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "ASTRACTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "ASTRACTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Tables for lists, JSON for everything else
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Human-readable table format
    Table,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store credentials for a profile
    #[command(after_help = "EXAMPLES:
    # Paste the service account JSON from the Astra console
    astractl login --json '{\"clientName\":\"me\",\"clientId\":\"...\",\"clientSecret\":\"...\"}'

    # Give the service account fields separately
    astractl login --client-name me --client-id ID --client-secret SECRET

    # Store a token in the OS keyring for a test profile
    astractl --profile staging login --token AstraCS:... --environment test --use-keyring
")]
    Login(LoginArgs),

    /// Profile management
    #[command(subcommand, visible_alias = "prof")]
    #[command(after_help = "EXAMPLES:
    # List all profiles
    astractl profile list

    # Show profile details (secrets are masked)
    astractl profile show staging

    # Make a profile the default
    astractl profile default staging
")]
    Profile(ProfileCommands),

    /// Database lifecycle operations
    #[command(subcommand, visible_alias = "database")]
    Db(DbCommands),

    /// Version information
    #[command(visible_alias = "ver")]
    Version,

    /// Generate shell completions
    #[command(visible_alias = "comp")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion generation
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bourne Again Shell
    Bash,
    /// Z Shell
    Zsh,
    /// Friendly Interactive Shell
    Fish,
    /// PowerShell
    #[value(name = "powershell", alias = "power-shell")]
    PowerShell,
    /// Elvish
    Elvish,
}

/// Credentials accepted by `login`
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Token to store; takes precedence over any service account
    #[arg(long, conflicts_with_all = ["json", "client_name", "client_id", "client_secret"])]
    pub token: Option<String>,

    /// Service account JSON as copied from the Astra console
    #[arg(long, conflicts_with_all = ["client_name", "client_id", "client_secret"])]
    pub json: Option<String>,

    /// Service account client name
    #[arg(long)]
    pub client_name: Option<String>,

    /// Service account client id
    #[arg(long)]
    pub client_id: Option<String>,

    /// Service account client secret
    #[arg(long)]
    pub client_secret: Option<String>,

    /// Control-plane environment for this profile
    #[arg(long, value_enum)]
    pub environment: Option<Environment>,

    /// Override the control-plane API URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Store secrets in the OS keyring instead of the config file
    #[cfg(feature = "secure-storage")]
    #[arg(long)]
    pub use_keyring: bool,
}

/// Profile management commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all configured profiles
    #[command(visible_alias = "ls")]
    List,
    /// Show the path to the configuration file
    Path,
    /// Show details of a specific profile
    #[command(visible_alias = "get")]
    Show {
        /// Profile name to show
        name: String,
    },
    /// Remove a profile
    #[command(visible_alias = "rm", visible_alias = "delete")]
    Remove {
        /// Profile name to remove
        name: String,
    },
    /// Set the default profile
    Default {
        /// Profile name to use when --profile is not given
        name: String,
    },
}

/// Database commands
#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Create a database and wait until it is active
    #[command(after_help = "EXAMPLES:
    # Serverless database on GCP us-east1
    astractl db create mydb --keyspace app

    # Choose region, tier and capacity
    astractl db create mydb --region us-west-2 --cloud-provider AWS --tier C10 --capacity-units 3
")]
    Create {
        /// Database name
        name: String,
        /// Initial keyspace
        #[arg(long)]
        keyspace: Option<String>,
        /// Database user
        #[arg(long, requires = "password")]
        user: Option<String>,
        /// Database password
        #[arg(long, requires = "user")]
        password: Option<String>,
        /// Region to deploy in
        #[arg(long, default_value = "us-east1")]
        region: String,
        /// Service tier
        #[arg(long, default_value = "serverless")]
        tier: String,
        /// Capacity units
        #[arg(long, default_value_t = 1)]
        capacity_units: u32,
        /// Cloud provider
        #[arg(long, default_value = "GCP")]
        cloud_provider: String,
    },

    /// Terminate a database and wait until it is gone
    #[command(visible_alias = "terminate")]
    Delete {
        /// Database id
        id: String,
        /// Only terminate a database that never left the prepared state
        #[arg(long, hide = true)]
        prepared_state_only: bool,
    },

    /// Park a database and wait until it is parked
    Park {
        /// Database id
        id: String,
    },

    /// Unpark a database and wait until it is active
    Unpark {
        /// Database id
        id: String,
    },

    /// Submit a capacity change
    Resize {
        /// Database id
        id: String,
        /// New capacity units
        capacity_units: String,
    },

    /// Show one database
    Get {
        /// Database id
        id: String,
    },

    /// List databases
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// List available tiers and regions with pricing
    Tiers,

    /// Fetch or download the secure connect bundle
    #[command(name = "secure-bundle", visible_alias = "sb")]
    #[command(after_help = "EXAMPLES:
    # Download the external bundle
    astractl db secure-bundle <id> --location bundle.zip

    # Show every bundle URL
    astractl db secure-bundle <id> --format list
")]
    SecureBundle {
        /// Database id
        id: String,
        /// zip downloads the bundle; json and list print its URLs
        #[arg(long, value_enum, default_value = "zip")]
        format: BundleFormat,
        /// Bundle variant to download
        #[arg(long, value_enum, default_value = "external")]
        download_type: BundleKind,
        /// Where to write the zip
        #[arg(long, default_value = "secureBundle.zip")]
        location: String,
    },

    /// Add a keyspace to a database
    #[command(name = "add-keyspace")]
    AddKeyspace {
        /// Database id
        id: String,
        /// Keyspace name
        keyspace: String,
    },

    /// Reset a database user's password
    #[command(name = "reset-password")]
    ResetPassword {
        /// Database id
        id: String,
        /// Database user
        #[arg(long)]
        username: String,
        /// New password; prompted when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

/// Filters for `db list`
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Which databases to include (e.g. nonterminated, all, active)
    #[arg(long)]
    pub include: Option<String>,
    /// Only databases on this cloud provider
    #[arg(long)]
    pub provider: Option<String>,
    /// Page after this database id
    #[arg(long)]
    pub starting_after: Option<String>,
    /// Maximum number of databases
    #[arg(long, default_value_t = ListFilter::DEFAULT_LIMIT)]
    pub limit: u32,
}

impl From<&ListArgs> for ListFilter {
    fn from(args: &ListArgs) -> Self {
        ListFilter {
            include: args.include.clone(),
            provider: args.provider.clone(),
            starting_after: args.starting_after.clone(),
            limit: args.limit,
        }
    }
}

/// Secure bundle output modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BundleFormat {
    Zip,
    Json,
    List,
}

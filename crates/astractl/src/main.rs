use astractl_core::Config;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, shells};
use tracing::{debug, error, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{Cli, Commands};
use connection::ConnectionManager;
use error::AstraCtlError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let conn_mgr = match load_connection_manager(cli.config_file.as_deref()) {
        Ok(conn_mgr) => conn_mgr,
        Err(e) => {
            e.print_diagnostic();
            std::process::exit(1);
        }
    };

    if let Err(e) = execute_command(&cli, &conn_mgr).await {
        e.print_diagnostic();
        std::process::exit(1);
    }
}

/// Load configuration from the specified path or the default location
fn load_connection_manager(config_file: Option<&str>) -> Result<ConnectionManager, AstraCtlError> {
    let (config, config_path) = if let Some(config_file) = config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        let config = Config::load_from_path(&path)?;
        (config, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };
    Ok(ConnectionManager::with_config_path(config, config_path))
}

fn init_tracing(verbose: u8) {
    // RUST_LOG wins over -v
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "astractl=warn,astractl_core=warn",
            1 => "astractl=info,astractl_core=info",
            2 => "astractl=debug,astractl_core=debug",
            _ => "astractl=trace,astractl_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli, conn_mgr: &ConnectionManager) -> Result<(), AstraCtlError> {
    trace!("Executing command: {}", format_command(&cli.command));
    info!("Command: {}", format_command(&cli.command));

    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Version => {
            debug!("Showing version information");
            match cli.output {
                cli::OutputFormat::Json | cli::OutputFormat::Yaml => {
                    let output_data = serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "name": env!("CARGO_PKG_NAME"),
                    });
                    output::print_output(
                        &output_data,
                        output::OutputFormat::resolve(cli.output, false),
                    )?;
                }
                _ => {
                    println!("astractl {}", env!("CARGO_PKG_VERSION"));
                }
            }
            Ok(())
        }
        Commands::Completions { shell } => {
            debug!("Generating completions for {:?}", shell);
            generate_completions(*shell);
            Ok(())
        }
        Commands::Login(args) => {
            commands::login::handle_login(args, conn_mgr, cli.profile.as_deref()).await
        }
        Commands::Profile(profile_cmd) => {
            commands::profile::handle_profile_command(profile_cmd, conn_mgr, cli.output).await
        }
        Commands::Db(db_cmd) => {
            commands::db::handle_db_command(
                db_cmd,
                conn_mgr,
                cli.profile.as_deref(),
                cli.output,
                cli.verbose > 0,
            )
            .await
        }
    };

    let duration = start.elapsed();
    match &result {
        Ok(_) => info!("Command completed successfully in {:?}", duration),
        Err(e) => error!("Command failed after {:?}: {}", duration, e),
    }

    result
}

/// Generate shell completions
fn generate_completions(shell: cli::Shell) {
    let mut cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();

    match shell {
        cli::Shell::Bash => generate(shells::Bash, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Zsh => generate(shells::Zsh, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Fish => generate(shells::Fish, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, name, &mut std::io::stdout())
        }
        cli::Shell::Elvish => generate(shells::Elvish, &mut cmd, name, &mut std::io::stdout()),
    }
}

/// Format command for human-readable logging (without sensitive data)
fn format_command(command: &Commands) -> String {
    use cli::{DbCommands, ProfileCommands};

    match command {
        Commands::Version => "version".to_string(),
        Commands::Completions { shell } => format!("completions {:?}", shell),
        Commands::Login(_) => "login [credentials redacted]".to_string(),
        Commands::Profile(cmd) => match cmd {
            ProfileCommands::List => "profile list".to_string(),
            ProfileCommands::Path => "profile path".to_string(),
            ProfileCommands::Show { name } => format!("profile show {}", name),
            ProfileCommands::Remove { name } => format!("profile remove {}", name),
            ProfileCommands::Default { name } => format!("profile default {}", name),
        },
        Commands::Db(cmd) => match cmd {
            DbCommands::Create { name, .. } => format!("db create {}", name),
            DbCommands::Delete { id, .. } => format!("db delete {}", id),
            DbCommands::Park { id } => format!("db park {}", id),
            DbCommands::Unpark { id } => format!("db unpark {}", id),
            DbCommands::Resize { id, capacity_units } => {
                format!("db resize {} {}", id, capacity_units)
            }
            DbCommands::Get { id } => format!("db get {}", id),
            DbCommands::List(_) => "db list".to_string(),
            DbCommands::Tiers => "db tiers".to_string(),
            DbCommands::SecureBundle { id, .. } => format!("db secure-bundle {}", id),
            DbCommands::AddKeyspace { id, keyspace } => {
                format!("db add-keyspace {} {}", id, keyspace)
            }
            DbCommands::ResetPassword { id, username, .. } => {
                format!("db reset-password {} --username {} [password redacted]", id, username)
            }
        },
    }
}

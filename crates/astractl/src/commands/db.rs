//! Database lifecycle command implementations
//!
//! Commands run against any [`ControlPlane`]; only `secure-bundle` downloads
//! need the concrete client.

use astractl_core::{
    BundleUrls, ControlPlane, CreateResourceSpec, ListFilter, ManagedResource, TierInfo,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{BundleFormat, DbCommands, OutputFormat};
use crate::commands::bundle;
use crate::commands::progress::WaitSpinner;
use crate::connection::ConnectionManager;
use crate::error::{AstraCtlError, Result as CliResult};
use crate::output::{self, dollars, print_output, print_rows};

/// What a database command produced
#[derive(Debug, Clone, PartialEq)]
pub enum DbOutcome {
    Created(ManagedResource),
    Resource(ManagedResource),
    Resources(Vec<ManagedResource>),
    Tiers(Vec<TierInfo>),
    Bundle(BundleUrls),
    Done(DbAction),
}

/// A completed action on one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbAction {
    pub id: String,
    pub message: String,
}

impl DbAction {
    fn new(id: &str, message: String) -> DbOutcome {
        DbOutcome::Done(DbAction {
            id: id.to_string(),
            message,
        })
    }
}

/// Handle database commands
pub async fn handle_db_command(
    db_cmd: &DbCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
    verbose: bool,
) -> CliResult<()> {
    let spinner = waits(db_cmd).then(|| WaitSpinner::new(verbose));
    let client = conn_mgr
        .create_client(
            profile_name,
            verbose,
            spinner.as_ref().map(WaitSpinner::callback),
        )
        .await?;

    let outcome = execute(db_cmd, &client).await;
    if let Some(spinner) = &spinner {
        spinner.finish();
    }
    let outcome = outcome?;

    if let (
        DbCommands::SecureBundle {
            format: BundleFormat::Zip,
            download_type,
            location,
            ..
        },
        DbOutcome::Bundle(urls),
    ) = (db_cmd, &outcome)
    {
        let written = bundle::save_bundle(&client, urls, *download_type, location).await?;
        println!("file {} saved {} bytes written", location, written);
        return Ok(());
    }

    if let (DbCommands::SecureBundle { format: BundleFormat::List, .. }, DbOutcome::Bundle(urls)) =
        (db_cmd, &outcome)
    {
        print!("{}", bundle::listing(urls));
        return Ok(());
    }

    render(&outcome, output_format)
}

/// Whether the command blocks on the poller
fn waits(db_cmd: &DbCommands) -> bool {
    matches!(
        db_cmd,
        DbCommands::Create { .. }
            | DbCommands::Delete { .. }
            | DbCommands::Park { .. }
            | DbCommands::Unpark { .. }
    )
}

/// Run one database command against the control plane
pub async fn execute(db_cmd: &DbCommands, plane: &dyn ControlPlane) -> CliResult<DbOutcome> {
    match db_cmd {
        DbCommands::Create {
            name,
            keyspace,
            user,
            password,
            region,
            tier,
            capacity_units,
            cloud_provider,
        } => {
            let mut spec = CreateResourceSpec::new(name)
                .with_region(region)
                .with_tier(tier)
                .with_capacity_units(*capacity_units)
                .with_cloud_provider(cloud_provider);
            if let Some(keyspace) = keyspace {
                spec = spec.with_keyspace(keyspace);
            }
            if let (Some(user), Some(password)) = (user, password) {
                spec = spec.with_credentials(user, password);
            }
            info!("Creating database {}", name);
            Ok(DbOutcome::Created(plane.create(&spec).await?))
        }
        DbCommands::Delete {
            id,
            prepared_state_only,
        } => {
            info!("starting to delete database {}", id);
            plane.terminate(id, *prepared_state_only).await?;
            Ok(DbAction::new(id, format!("database {} deleted", id)))
        }
        DbCommands::Park { id } => {
            info!("starting to park database {}", id);
            plane.park(id).await?;
            Ok(DbAction::new(id, format!("database {} parked", id)))
        }
        DbCommands::Unpark { id } => {
            info!("starting to unpark database {}", id);
            plane.unpark(id).await?;
            Ok(DbAction::new(id, format!("database {} unparked", id)))
        }
        DbCommands::Resize { id, capacity_units } => {
            let units = parse_capacity_units(capacity_units)?;
            plane.resize(id, units).await?;
            Ok(DbAction::new(
                id,
                format!("resize database {} submitted with size {}", id, units),
            ))
        }
        DbCommands::Get { id } => Ok(DbOutcome::Resource(plane.find(id).await?)),
        DbCommands::List(args) => {
            let filter = ListFilter::from(args);
            debug!("Listing databases with {:?}", filter);
            Ok(DbOutcome::Resources(plane.list(&filter).await?))
        }
        DbCommands::Tiers => Ok(DbOutcome::Tiers(plane.list_tiers().await?)),
        DbCommands::SecureBundle { id, .. } => Ok(DbOutcome::Bundle(plane.fetch_bundle(id).await?)),
        DbCommands::AddKeyspace { id, keyspace } => {
            plane.add_keyspace(id, keyspace).await?;
            Ok(DbAction::new(
                id,
                format!("keyspace {} added to database {}", keyspace, id),
            ))
        }
        DbCommands::ResetPassword {
            id,
            username,
            password,
        } => {
            let password = match password {
                Some(password) => password.clone(),
                None => prompt_password(username)?,
            };
            plane.reset_password(id, username, &password).await?;
            Ok(DbAction::new(
                id,
                format!("password reset for user {} on database {}", username, id),
            ))
        }
    }
}

/// Capacity units must be a positive integer
fn parse_capacity_units(raw: &str) -> CliResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(units) if units > 0 => Ok(units),
        _ => Err(AstraCtlError::InvalidInput {
            message: format!(
                "unable to parse capacity unit '{}': expected a positive integer",
                raw
            ),
        }),
    }
}

fn prompt_password(username: &str) -> CliResult<String> {
    let password = rpassword::prompt_password(format!("New password for {}: ", username))
        .map_err(unreadable_password)?;
    if password.is_empty() {
        return Err(AstraCtlError::InvalidInput {
            message: "password must not be empty".to_string(),
        });
    }
    Ok(password)
}

fn unreadable_password(err: std::io::Error) -> AstraCtlError {
    AstraCtlError::InvalidInput {
        message: format!("unable to read password ({}); pass it with --password", err),
    }
}

/// Print an outcome in the requested format
pub fn render(outcome: &DbOutcome, format: OutputFormat) -> CliResult<()> {
    match outcome {
        DbOutcome::Created(db) if format == OutputFormat::Auto => {
            println!("database {} created", db.id);
            return Ok(());
        }
        DbOutcome::Done(action) if matches!(format, OutputFormat::Auto | OutputFormat::Table) => {
            println!("{}", action.message);
            return Ok(());
        }
        _ => {}
    }

    let list_like = matches!(outcome, DbOutcome::Resources(_) | DbOutcome::Tiers(_));
    match (outcome, output::OutputFormat::resolve(format, list_like)) {
        (DbOutcome::Created(db) | DbOutcome::Resource(db), output::OutputFormat::Table) => {
            print_rows(&DATABASE_HEADERS, database_rows(std::slice::from_ref(db)));
        }
        (DbOutcome::Resources(dbs), output::OutputFormat::Table) => {
            print_rows(&DATABASE_HEADERS, database_rows(dbs));
        }
        (DbOutcome::Tiers(tiers), output::OutputFormat::Table) => {
            print_rows(&TIER_HEADERS, tier_rows(tiers));
        }
        (DbOutcome::Bundle(urls), output::OutputFormat::Table) => {
            print!("{}", bundle::listing(urls));
        }
        (DbOutcome::Created(db) | DbOutcome::Resource(db), fmt) => print_output(db, fmt)?,
        (DbOutcome::Resources(dbs), fmt) => print_output(dbs, fmt)?,
        (DbOutcome::Tiers(tiers), fmt) => print_output(tiers, fmt)?,
        (DbOutcome::Bundle(urls), fmt) => print_output(urls, fmt)?,
        (DbOutcome::Done(action), fmt) => print_output(action, fmt)?,
    }
    Ok(())
}

pub const DATABASE_HEADERS: [&str; 3] = ["name", "id", "status"];

pub const TIER_HEADERS: [&str; 7] = [
    "name",
    "cloud",
    "region",
    "db (used)/(limit)",
    "cap (used)/(limit)",
    "cost per month",
    "cost per minute",
];

pub fn database_rows(dbs: &[ManagedResource]) -> Vec<Vec<String>> {
    dbs.iter()
        .map(|db| vec![db.info.name.clone(), db.id.clone(), db.status.to_string()])
        .collect()
}

pub fn tier_rows(tiers: &[TierInfo]) -> Vec<Vec<String>> {
    tiers
        .iter()
        .map(|tier| {
            vec![
                tier.tier.clone(),
                tier.cloud_provider.clone(),
                tier.region_display.clone(),
                format!("{}/{}", tier.database_count_used, tier.database_count_limit),
                format!("{}/{}", tier.capacity_units_used, tier.capacity_units_limit),
                dollars(tier.cost.per_month_dollars()),
                dollars(tier.cost.per_minute_dollars()),
            ]
        })
        .collect()
}

//! DynamoDB infrastructure management commands.

mod error;
mod planning;

pub use error::{DynamodbError, Result};

use crate::prelude::*;
use dialoguer::Confirm;
use dynarepo::storage::DynamoDbStore;
use dynarepo::{StoreClient, StoreConfig};
use dynarepo_core::storage::{KeySchema, KeyType};

/// DynamoDB infrastructure management commands.
#[derive(Debug, clap::Parser)]
pub struct DynamodbCommand {
    #[command(subcommand)]
    pub action: DynamodbAction,
}

/// Available DynamoDB actions.
#[derive(Debug, clap::Subcommand)]
pub enum DynamodbAction {
    /// Deploy or destroy a repository table.
    Deploy(DeployCommand),
}

/// Key attribute types accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum IdType {
    /// String
    S,
    /// Number
    N,
    /// Binary
    B,
}

impl From<IdType> for KeyType {
    fn from(id_type: IdType) -> Self {
        match id_type {
            IdType::S => KeyType::S,
            IdType::N => KeyType::N,
            IdType::B => KeyType::B,
        }
    }
}

/// Deploy or destroy a DynamoDB table.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Deploy or destroy the DynamoDB table behind a repository.

By default, this command creates the table with a single partition key
named after the entity's identifier attribute, billed PAY_PER_REQUEST.

The command shows a plan of changes before applying and asks for confirmation.

Environment variables:
  AWS_ENDPOINT_URL    - Use local DynamoDB (e.g., http://localhost:8000)
  AWS_REGION          - AWS region (defaults to us-east-1)
  AWS_PROFILE         - AWS profile to use for credentials")]
pub struct DeployCommand {
    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,

    /// Destroy the table instead of creating it.
    #[arg(long)]
    pub destroy: bool,

    /// Table name to use.
    #[arg(long, env = "DYNAMODB_TABLE_NAME", default_value = "dynarepo")]
    pub table_name: String,

    /// Name of the identifier attribute used as partition key.
    #[arg(long, default_value = "id")]
    pub id_attribute: String,

    /// Type of the identifier attribute.
    #[arg(long, value_enum, default_value_t = IdType::S)]
    pub id_type: IdType,
}

/// Main entry point for dynamodb command.
pub async fn run(command: DynamodbCommand, global: crate::Global) -> Result<()> {
    match command.action {
        DynamodbAction::Deploy(deploy_cmd) => run_deploy(deploy_cmd, &global).await,
    }
}

async fn current_status(store: &DynamoDbStore) -> Result<Option<planning::TableStatus>> {
    Ok(store
        .table_status()
        .await?
        .map(|status| planning::TableStatus::from_dynamodb(status.as_str())))
}

fn confirm(prompt: &str, default: bool) -> Result<()> {
    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()?;

    if confirmed {
        Ok(())
    } else {
        Err(DynamodbError::UserCancelled)
    }
}

async fn run_deploy(cmd: DeployCommand, global: &crate::Global) -> Result<()> {
    let config = StoreConfig {
        table_name: cmd.table_name.clone(),
        ..StoreConfig::from_env()
    };

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Target:"), config.target_display());
        aprintln!();
    }

    let store = DynamoDbStore::from_config(&config).await;
    let current = current_status(&store).await?;

    if cmd.destroy {
        // Destroy flow
        let plan = planning::calculate_destroy_plan(current, &cmd.table_name);

        if !global.is_silent() {
            aprintln!("{}", p_y("Destroy Plan:"));
            for line in planning::format_destroy_plan(&plan) {
                aprintln!("  {}", p_r(&line));
            }
            aprintln!();
        }

        if matches!(plan, planning::DestroyPlan::AlreadyGone { .. }) {
            if !global.is_silent() {
                aprintln!("{}", p_g("Nothing to destroy."));
            }
            return Ok(());
        }

        if !cmd.force {
            confirm(
                "Are you sure you want to delete this table? ALL DATA WILL BE LOST",
                false,
            )?;
        }

        if !global.is_silent() {
            aprintln!("{}", p_b("Deleting table..."));
        }

        store.delete_table().await?;

        if !global.is_silent() {
            aprintln!("{}", p_g("Table destroyed successfully."));
        }
    } else {
        // Deploy flow
        let schema = KeySchema::new(&cmd.id_attribute, cmd.id_type.into());
        let plan = planning::calculate_deploy_plan(current, &cmd.table_name, &schema);

        if !global.is_silent() {
            aprintln!("{}", p_c("Deploy Plan:"));
            for line in planning::format_deploy_plan(&plan) {
                if line.starts_with('+') {
                    aprintln!("  {}", p_g(&line));
                } else {
                    aprintln!("  {}", line);
                }
            }
            aprintln!();
        }

        if matches!(plan, planning::DeployPlan::NoChanges { .. }) {
            if !global.is_silent() {
                aprintln!("{}", p_g("Infrastructure is up to date."));
            }
            return Ok(());
        }

        if !cmd.force {
            confirm("Apply these changes?", true)?;
        }

        if !global.is_silent() {
            aprintln!("{}", p_b("Creating table and waiting for it to become active..."));
        }

        store.create_table(&schema).await?;

        if !global.is_silent() {
            aprintln!("{}", p_g("Infrastructure deployed successfully."));
        }
    }

    Ok(())
}

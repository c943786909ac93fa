//! Pure functions for calculating deployment plans (Functional Core).

use dynarepo_core::storage::{KeySchema, KeyType};

/// Table status, as far as deployment cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Active,
    Creating,
    Updating,
    Deleting,
    Other,
}

impl TableStatus {
    /// Maps a DynamoDB table status string such as `ACTIVE`.
    pub fn from_dynamodb(status: &str) -> Self {
        match status {
            "ACTIVE" => Self::Active,
            "CREATING" => Self::Creating,
            "UPDATING" => Self::Updating,
            "DELETING" => Self::Deleting,
            _ => Self::Other,
        }
    }
}

/// Planned changes for deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployPlan {
    /// Table doesn't exist, needs to be created.
    CreateTable {
        table_name: String,
        schema: KeySchema,
    },
    /// Table exists, no changes needed.
    NoChanges {
        table_name: String,
        status: TableStatus,
    },
}

/// Plan for destroying a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyPlan {
    /// Table exists and will be deleted.
    DeleteTable { table_name: String },
    /// Table doesn't exist, nothing to do.
    AlreadyGone { table_name: String },
}

/// Pure function: Calculate what changes are needed to reach desired state.
pub fn calculate_deploy_plan(
    current: Option<TableStatus>,
    table_name: &str,
    schema: &KeySchema,
) -> DeployPlan {
    match current {
        None => DeployPlan::CreateTable {
            table_name: table_name.to_string(),
            schema: schema.clone(),
        },
        Some(status) => DeployPlan::NoChanges {
            table_name: table_name.to_string(),
            status,
        },
    }
}

/// Pure function: Calculate destroy plan.
pub fn calculate_destroy_plan(current: Option<TableStatus>, table_name: &str) -> DestroyPlan {
    match current {
        Some(_) => DestroyPlan::DeleteTable {
            table_name: table_name.to_string(),
        },
        None => DestroyPlan::AlreadyGone {
            table_name: table_name.to_string(),
        },
    }
}

fn key_type_label(key_type: KeyType) -> &'static str {
    match key_type {
        KeyType::S => "S",
        KeyType::N => "N",
        KeyType::B => "B",
    }
}

/// Pure function: Format a deploy plan for display.
pub fn format_deploy_plan(plan: &DeployPlan) -> Vec<String> {
    match plan {
        DeployPlan::CreateTable { table_name, schema } => vec![
            format!("+ Create table: {table_name}"),
            format!(
                "  Partition key: {} ({})",
                schema.partition_key.name,
                key_type_label(schema.partition_key.attribute_type)
            ),
            "  Billing: PAY_PER_REQUEST".to_string(),
        ],
        DeployPlan::NoChanges { table_name, status } => match status {
            TableStatus::Active => vec![format!("= Table '{table_name}' is up to date")],
            status => vec![format!("= Table '{table_name}' exists ({status:?})")],
        },
    }
}

/// Pure function: Format a destroy plan for display.
pub fn format_destroy_plan(plan: &DestroyPlan) -> Vec<String> {
    match plan {
        DestroyPlan::DeleteTable { table_name } => {
            vec![format!("- Delete table: {table_name} (ALL DATA WILL BE LOST)")]
        }
        DestroyPlan::AlreadyGone { table_name } => {
            vec![format!("= Table '{table_name}' does not exist")]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> KeySchema {
        KeySchema::new("id", KeyType::S)
    }

    #[test]
    fn test_deploy_plan_creates_missing_table() {
        let plan = calculate_deploy_plan(None, "fruits", &schema());

        assert_eq!(
            plan,
            DeployPlan::CreateTable {
                table_name: "fruits".to_string(),
                schema: schema(),
            }
        );
        assert_eq!(
            format_deploy_plan(&plan),
            vec![
                "+ Create table: fruits",
                "  Partition key: id (S)",
                "  Billing: PAY_PER_REQUEST",
            ]
        );
    }

    #[test]
    fn test_deploy_plan_existing_table_is_unchanged() {
        let plan = calculate_deploy_plan(Some(TableStatus::Active), "fruits", &schema());

        assert!(matches!(plan, DeployPlan::NoChanges { .. }));
        assert_eq!(
            format_deploy_plan(&plan),
            vec!["= Table 'fruits' is up to date"]
        );

        let plan = calculate_deploy_plan(Some(TableStatus::Creating), "fruits", &schema());
        assert_eq!(
            format_deploy_plan(&plan),
            vec!["= Table 'fruits' exists (Creating)"]
        );
    }

    #[test]
    fn test_destroy_plan() {
        let plan = calculate_destroy_plan(Some(TableStatus::Active), "fruits");
        assert_eq!(
            format_destroy_plan(&plan),
            vec!["- Delete table: fruits (ALL DATA WILL BE LOST)"]
        );

        let plan = calculate_destroy_plan(None, "fruits");
        assert_eq!(
            plan,
            DestroyPlan::AlreadyGone {
                table_name: "fruits".to_string()
            }
        );
        assert_eq!(
            format_destroy_plan(&plan),
            vec!["= Table 'fruits' does not exist"]
        );
    }

    #[test]
    fn test_table_status_from_dynamodb() {
        assert_eq!(TableStatus::from_dynamodb("ACTIVE"), TableStatus::Active);
        assert_eq!(TableStatus::from_dynamodb("DELETING"), TableStatus::Deleting);
        assert_eq!(
            TableStatus::from_dynamodb("ARCHIVED"),
            TableStatus::Other
        );
    }
}

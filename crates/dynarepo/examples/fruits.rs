//! Stores a handful of fruits, filters them and pages through the table.
//!
//! Runs against the in-memory store by default. With `--dynamodb` it creates
//! a table named by `DYNAMODB_TABLE_NAME` on the endpoint given by
//! `AWS_ENDPOINT_URL` (or AWS itself), and deletes it afterwards.
//!
//! ```bash
//! cargo run -p dynarepo --example fruits
//! AWS_ENDPOINT_URL=http://localhost:8000 cargo run -p dynarepo --example fruits -- --dynamodb
//! ```

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use dynarepo::expression::FilterExpressionBuilder;
use dynarepo::pagination::PageRequest;
use dynarepo::storage::{DynamoDbStore, InMemoryStore};
use dynarepo::{Entity, FieldValue, Item, Repository, StoreClient, StoreConfig};
use dynarepo_core::storage::conversions::{get_datetime, get_string, get_uuid};

const FRUITS: [&str; 7] = [
    "mango",
    "avocado",
    "other fruit",
    "other other fruit",
    "jackfruit",
    "tomato",
    "dragon fruit",
];

#[derive(Debug, Parser)]
struct Args {
    /// Use DynamoDB instead of the in-memory store
    #[arg(long)]
    dynamodb: bool,

    /// Items per page when listing the table
    #[arg(long, default_value_t = 3)]
    page_size: u32,
}

#[derive(Debug, Clone)]
struct Fruit {
    id: Uuid,
    value: String,
    created_at: DateTime<Utc>,
}

impl Entity for Fruit {
    type Id = Uuid;
    const ENTITY_TYPE: &'static str = "Fruit";
    const ID_ATTRIBUTE: &'static str = "id";

    fn id(&self) -> Option<&Uuid> {
        Some(&self.id)
    }

    fn to_item(&self) -> Item {
        Item::from([
            ("id".to_string(), FieldValue::from(self.id.to_string())),
            ("value".to_string(), FieldValue::from(self.value.as_str())),
            (
                "createdAt".to_string(),
                FieldValue::from(self.created_at.to_rfc3339()),
            ),
        ])
    }

    fn from_item(item: &Item) -> dynarepo::Result<Self> {
        Ok(Self {
            id: get_uuid(item, "id")?,
            value: get_string(item, "value")?,
            created_at: get_datetime(item, "createdAt")?,
        })
    }
}

async fn run<S: StoreClient>(repository: &Repository<Fruit, S>, page_size: u32) -> anyhow::Result<()> {
    let fruits: Vec<Fruit> = FRUITS
        .iter()
        .map(|value| Fruit {
            id: Uuid::new_v4(),
            value: value.to_string(),
            created_at: Utc::now(),
        })
        .collect();
    let unprocessed = repository.save_all(&fruits).await?;
    if !unprocessed.is_empty() {
        tracing::warn!(count = unprocessed.len(), "Some fruits were not stored");
    }

    // `value` is a reserved word, so it goes through a name placeholder.
    let filter = FilterExpressionBuilder::new()
        .contains("#value", ":fruit0")
        .or()
        .in_list("#value", [":fruit1", ":fruit2"])
        .or()
        .begins_with("#value", ":fruit3")
        .build_filter_specification([
            (":fruit0", FieldValue::from("tomato")),
            (":fruit1", FieldValue::from("jackfruit")),
            (":fruit2", FieldValue::from("avocado")),
            (":fruit3", FieldValue::from("drago")),
        ])
        .with_name("#value", "value");

    let matched = repository.scan_by(&filter).await?;
    println!("{} fruits match `{}`", matched.count, filter.expression());
    for fruit in &matched.items {
        println!("  {}", fruit.value);
    }

    let mut request = PageRequest::of_size(page_size)?;
    let mut number = 1;
    loop {
        let (content, cursor) = repository.find_all(&request).await?.into_parts();
        let values: Vec<String> = content
            .iter()
            .map(|f| format!("{} ({})", f.value, f.created_at.format("%H:%M:%S")))
            .collect();
        println!("page {number}: {values:?}");

        match cursor {
            Some(cursor) => request = request.with_cursor(Some(cursor)),
            None => break,
        }
        number += 1;
    }

    for fruit in &fruits {
        repository.delete(fruit).await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dynarepo=debug,dynarepo_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.dynamodb {
        let config = StoreConfig::from_env();
        println!("Using {}", config.target_display());

        let store = DynamoDbStore::from_config(&config).await;
        let repository: Repository<Fruit, _> = Repository::builder().store(store).build()?;
        repository.store().create_table(&repository.key_schema()).await?;

        let result = run(&repository, args.page_size).await;
        repository.store().delete_table().await?;
        result
    } else {
        let repository = Repository::new(InMemoryStore::for_entity::<Fruit>("fruits"));
        run(&repository, args.page_size).await
    }
}

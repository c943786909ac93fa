mod error;
mod repository;
mod traits;
mod types;

pub mod conversions;

pub use error::{BoxError, RepositoryError, Result};
pub use repository::{Repository, RepositoryBuilder};
pub use traits::{Entity, EntityId, StoreClient};
pub use types::{
    BatchPutOutput, FieldValue, Item, KeyAttribute, KeySchema, KeyType, ScanOutput, ScanPage,
};

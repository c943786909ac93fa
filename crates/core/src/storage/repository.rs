//! Generic repository over a store client.
//!
//! Validates identifiers locally, delegates every call to the bound
//! `StoreClient` and maps raw items back into entities.

use std::marker::PhantomData;

use crate::expression::FilterSpecification;
use crate::pagination::{Page, PageRequest};

use super::{Entity, EntityId, Item, KeySchema, RepositoryError, Result, ScanOutput, StoreClient};

/// CRUD and paginated scan access to one entity type.
pub struct Repository<T, S>
where
    T: Entity,
    S: StoreClient,
{
    store: S,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> Repository<T, S>
where
    T: Entity,
    S: StoreClient,
{
    /// Creates a repository bound to the given store client.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Starts building a repository; `build` fails if no store was supplied.
    pub fn builder() -> RepositoryBuilder<T, S> {
        RepositoryBuilder::default()
    }

    /// Key schema of the table this entity lives in.
    pub fn key_schema(&self) -> KeySchema {
        KeySchema::for_entity::<T>()
    }

    /// The bound store client.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Writes an entity, replacing any entity with the same identifier.
    pub async fn save(&self, entity: &T) -> Result<()> {
        let id = require_entity_id(entity)?;
        tracing::debug!(entity_type = T::ENTITY_TYPE, id = %id, "Saving entity");
        self.store.put(entity.to_item()).await
    }

    /// Writes several entities in one batch.
    ///
    /// Every identifier is checked before anything is sent. Returns the
    /// entities the store reported as unprocessed; they are not retried.
    pub async fn save_all(&self, entities: &[T]) -> Result<Vec<T>> {
        for entity in entities {
            require_entity_id(entity)?;
        }
        if entities.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            entity_type = T::ENTITY_TYPE,
            count = entities.len(),
            "Saving entities"
        );
        let output = self
            .store
            .batch_put(entities.iter().map(Entity::to_item).collect())
            .await?;

        if !output.unprocessed.is_empty() {
            tracing::warn!(
                entity_type = T::ENTITY_TYPE,
                unprocessed = output.unprocessed.len(),
                "Store left items unprocessed"
            );
        }
        output.unprocessed.iter().map(T::from_item).collect()
    }

    /// Looks up an entity. Absence is `Ok(None)`.
    pub async fn find_by_id(&self, id: &T::Id) -> Result<Option<T>> {
        require_id::<T>(id)?;
        tracing::debug!(entity_type = T::ENTITY_TYPE, id = %id, "Finding entity");
        match self.store.get(T::key(id)).await? {
            Some(item) => Ok(Some(T::from_item(&item)?)),
            None => Ok(None),
        }
    }

    /// Deletes an entity. Deleting an entity that isn't stored is a no-op.
    pub async fn delete(&self, entity: &T) -> Result<()> {
        let id = require_entity_id(entity)?;
        self.delete_by_id(id).await
    }

    /// Deletes by identifier. Deleting a missing identifier is a no-op.
    pub async fn delete_by_id(&self, id: &T::Id) -> Result<()> {
        require_id::<T>(id)?;
        tracing::debug!(entity_type = T::ENTITY_TYPE, id = %id, "Deleting entity");
        self.store.delete(T::key(id)).await
    }

    /// Scans the whole table with a filter and returns every match.
    pub async fn scan_by(&self, filter: &FilterSpecification) -> Result<ScanOutput<T>> {
        tracing::debug!(
            entity_type = T::ENTITY_TYPE,
            filter = filter.expression(),
            "Scanning"
        );
        let output = self.store.scan(Some(filter)).await?;
        let items = output
            .items
            .iter()
            .map(T::from_item)
            .collect::<Result<Vec<_>>>()?;
        Ok(ScanOutput {
            items,
            count: output.count,
        })
    }

    /// Number of entities matching a filter, across the whole table.
    pub async fn count_by(&self, filter: &FilterSpecification) -> Result<usize> {
        Ok(self.store.scan(Some(filter)).await?.count)
    }

    /// Fetches one page of all entities.
    pub async fn find_all(&self, request: &PageRequest) -> Result<Page<T>> {
        self.fetch_page(None, request).await
    }

    /// Fetches one page of entities matching a filter.
    ///
    /// The page size bounds the items the store evaluates, so a page may hold
    /// fewer matches than requested (even none) while a next cursor exists.
    pub async fn find_all_by(
        &self,
        filter: &FilterSpecification,
        request: &PageRequest,
    ) -> Result<Page<T>> {
        self.fetch_page(Some(filter), request).await
    }

    async fn fetch_page(
        &self,
        filter: Option<&FilterSpecification>,
        request: &PageRequest,
    ) -> Result<Page<T>> {
        tracing::debug!(
            entity_type = T::ENTITY_TYPE,
            page_size = request.page_size().map(|size| size.get()),
            resumed = request.cursor().is_some(),
            "Fetching page"
        );
        let page = self
            .store
            .scan_page(filter, request.page_size(), request.cursor())
            .await?;

        tracing::trace!(
            entity_type = T::ENTITY_TYPE,
            items = page.items.len(),
            has_next = page.next_cursor.is_some(),
            "Fetched page"
        );
        Page::new(page.items, page.next_cursor).try_map(|item: Item| T::from_item(&item))
    }
}

/// Builder that refuses to produce a repository without a store client.
pub struct RepositoryBuilder<T, S> {
    store: Option<S>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> Default for RepositoryBuilder<T, S> {
    fn default() -> Self {
        Self {
            store: None,
            _entity: PhantomData,
        }
    }
}

impl<T, S> RepositoryBuilder<T, S>
where
    T: Entity,
    S: StoreClient,
{
    pub fn store(mut self, store: S) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the store from an optional value, e.g. one resolved from configuration.
    pub fn maybe_store(mut self, store: Option<S>) -> Self {
        self.store = store;
        self
    }

    pub fn build(self) -> Result<Repository<T, S>> {
        let store = self
            .store
            .ok_or(RepositoryError::ConfigurationMissing("store client"))?;
        Ok(Repository::new(store))
    }
}

fn require_entity_id<T: Entity>(entity: &T) -> Result<&T::Id> {
    match entity.id() {
        Some(id) if !id.is_missing() => Ok(id),
        _ => Err(RepositoryError::IdentifierMissing {
            entity_type: T::ENTITY_TYPE,
        }),
    }
}

fn require_id<T: Entity>(id: &T::Id) -> Result<()> {
    if id.is_missing() {
        return Err(RepositoryError::IdentifierMissing {
            entity_type: T::ENTITY_TYPE,
        });
    }
    Ok(())
}

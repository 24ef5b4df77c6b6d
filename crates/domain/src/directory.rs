//! Lookups into the restaurant's reference data.
//!
//! Products, tables and waiters are managed elsewhere; orders only resolve
//! them by id. [`InMemoryDirectory`] backs all three lookups from a JSON seed.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::order::{Money, ProductId, TableId, WaiterId};

/// A menu product as the catalog currently prices it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    #[serde(default)]
    pub seats: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waiter {
    pub id: WaiterId,
    pub name: String,
}

/// Read-only product lookup.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn resolve_product(&self, product_id: &ProductId) -> Option<Product>;
}

#[async_trait]
pub trait TableRegistry: Send + Sync {
    async fn resolve_table(&self, table_id: TableId) -> Option<Table>;
}

#[async_trait]
pub trait WaiterRegistry: Send + Sync {
    async fn resolve_waiter(&self, waiter_id: &WaiterId) -> Option<Waiter>;
}

/// Errors loading a directory seed.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read directory file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid directory file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reference data loaded at start-up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub waiters: Vec<Waiter>,
}

impl DirectorySeed {
    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DirectoryError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&json)
    }
}

/// Catalog, table and waiter lookups held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
    tables: Arc<RwLock<HashMap<TableId, Table>>>,
    waiters: Arc<RwLock<HashMap<WaiterId, Waiter>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: DirectorySeed) -> Self {
        Self {
            products: Arc::new(RwLock::new(
                seed.products.into_iter().map(|p| (p.id.clone(), p)).collect(),
            )),
            tables: Arc::new(RwLock::new(
                seed.tables.into_iter().map(|t| (t.id, t)).collect(),
            )),
            waiters: Arc::new(RwLock::new(
                seed.waiters.into_iter().map(|w| (w.id.clone(), w)).collect(),
            )),
        }
    }

    /// Adds or replaces a product.
    pub async fn upsert_product(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }

    pub async fn upsert_table(&self, table: Table) {
        self.tables.write().await.insert(table.id, table);
    }

    pub async fn upsert_waiter(&self, waiter: Waiter) {
        self.waiters.write().await.insert(waiter.id.clone(), waiter);
    }

    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }
}

#[async_trait]
impl Catalog for InMemoryDirectory {
    async fn resolve_product(&self, product_id: &ProductId) -> Option<Product> {
        self.products.read().await.get(product_id).cloned()
    }
}

#[async_trait]
impl TableRegistry for InMemoryDirectory {
    async fn resolve_table(&self, table_id: TableId) -> Option<Table> {
        self.tables.read().await.get(&table_id).cloned()
    }
}

#[async_trait]
impl WaiterRegistry for InMemoryDirectory {
    async fn resolve_waiter(&self, waiter_id: &WaiterId) -> Option<Waiter> {
        self.waiters.read().await.get(waiter_id).cloned()
    }
}

//! Persistence layer: store traits and their two backends.
//!
//! Layout:
//! - `json_file.rs`: actor owning the JSON document file
//! - `json.rs`: store traits over the JSON document
//! - `models.rs`: SQLite row mapping
//! - `schema.rs`: SQL DDL for the SQLite backend
//! - `sqlite.rs`: store traits over SQLite

pub mod json;
pub mod json_file;
pub mod models;
pub mod schema;
pub mod sqlite;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, StoreKind};
use crate::error::LeafError;
use crate::types::{Collection, NewCollection, NewPlant, NewUser, Plant, User};

pub use json::JsonStore;
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, SqliteStore};

/// Lookups by id return `Ok(None)` when nothing matches.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Seed admin accounts, skipping emails that already exist.
    async fn init_admins(&self, admins: Vec<NewUser>) -> Result<(), LeafError>;
    async fn get_all(&self) -> Result<Vec<User>, LeafError>;
    async fn get_all_non_admin(&self) -> Result<Vec<User>, LeafError>;
    async fn get_by_id(&self, user_id: &str) -> Result<Option<User>, LeafError>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, LeafError>;
    async fn create(&self, new_user: NewUser) -> Result<User, LeafError>;
    /// Role is never changed through an update.
    async fn update(&self, user: User) -> Result<Option<User>, LeafError>;
    /// Also empties plants and collections.
    async fn delete_all(&self) -> Result<Vec<User>, LeafError>;
    /// Cascades to the user's plants and collections.
    async fn delete_by_id(&self, user_id: &str) -> Result<Option<User>, LeafError>;
}

#[async_trait]
pub trait PlantStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Plant>, LeafError>;
    async fn get_by_id(&self, plant_id: &str) -> Result<Option<Plant>, LeafError>;
    async fn get_all_for_user(&self, user_id: &str) -> Result<Vec<Plant>, LeafError>;
    /// `None` when the owner does not exist.
    async fn create_for_user(
        &self,
        user_id: &str,
        new_plant: NewPlant,
    ) -> Result<Option<Plant>, LeafError>;
    /// Owner and date stay as stored.
    async fn update(&self, plant: Plant) -> Result<Option<Plant>, LeafError>;
    /// Also clears every collection's plant list.
    async fn delete_all(&self) -> Result<Vec<Plant>, LeafError>;
    /// Also removes the plant from every collection.
    async fn delete_by_id(&self, plant_id: &str) -> Result<Option<Plant>, LeafError>;
}

#[async_trait]
pub trait CollectionStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Collection>, LeafError>;
    async fn get_by_id(&self, collection_id: &str) -> Result<Option<Collection>, LeafError>;
    async fn get_all_for_user(&self, user_id: &str) -> Result<Vec<Collection>, LeafError>;
    async fn create_for_user(
        &self,
        user_id: &str,
        new_collection: NewCollection,
    ) -> Result<Option<Collection>, LeafError>;
    /// Writes name, description and image; owner and plants stay as stored.
    async fn update(&self, collection: Collection) -> Result<Option<Collection>, LeafError>;
    async fn delete_all(&self) -> Result<Vec<Collection>, LeafError>;
    async fn delete_by_id(&self, collection_id: &str) -> Result<Option<Collection>, LeafError>;
    /// `None` without mutating anything when either id is unknown.
    async fn add_plant_to_collection(
        &self,
        collection_id: &str,
        plant_id: &str,
    ) -> Result<Option<Collection>, LeafError>;
    async fn delete_plant_from_collection(
        &self,
        collection_id: &str,
        plant_id: &str,
    ) -> Result<Option<Collection>, LeafError>;
    /// Plants in collection order; `None` for an unknown collection.
    async fn get_all_plants_for_collection(
        &self,
        collection_id: &str,
    ) -> Result<Option<Vec<Plant>>, LeafError>;
}

/// The three stores of one backend.
#[derive(Clone)]
pub struct Database {
    pub users: Arc<dyn UserStore>,
    pub plants: Arc<dyn PlantStore>,
    pub collections: Arc<dyn CollectionStore>,
}

impl Database {
    pub fn from_store<S>(store: S) -> Self
    where
        S: UserStore + PlantStore + CollectionStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            plants: store.clone(),
            collections: store,
        }
    }

    pub async fn json(path: impl AsRef<Path>) -> Result<Self, LeafError> {
        let store = JsonStore::open(path.as_ref()).await?;
        Ok(Self::from_store(store))
    }

    pub async fn sqlite(url: &str) -> Result<Self, LeafError> {
        let store = SqliteStore::connect(url).await?;
        store.init_schema().await?;
        Ok(Self::from_store(store))
    }

    /// Open the backend selected by `cfg.store`.
    pub async fn open(cfg: &Config) -> Result<Self, LeafError> {
        match cfg.store {
            StoreKind::Json => {
                info!(path = %cfg.json_path.display(), "using json store");
                Self::json(&cfg.json_path).await
            }
            StoreKind::Sqlite => {
                info!(database = %cfg.database, "using sqlite store");
                Self::sqlite(&cfg.database).await
            }
        }
    }
}

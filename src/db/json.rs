//! Flat JSON file backend.

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use uuid::Uuid;

use crate::db::json_file::{self, JsonFileHandle, LeafDocument};
use crate::db::{CollectionStore, PlantStore, UserStore};
use crate::error::LeafError;
use crate::types::{Collection, NewCollection, NewPlant, NewUser, Plant, Role, User};

#[derive(Clone)]
pub struct JsonStore {
    file: JsonFileHandle,
}

impl JsonStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, LeafError> {
        let file = json_file::spawn(path.into()).await?;
        Ok(Self { file })
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn user_exists(doc: &LeafDocument, user_id: &str) -> bool {
    doc.users.iter().any(|u| u.id == user_id)
}

#[async_trait]
impl UserStore for JsonStore {
    async fn init_admins(&self, admins: Vec<NewUser>) -> Result<(), LeafError> {
        self.file
            .transact(move |doc| {
                let mut dirty = false;
                for admin in admins {
                    if doc.users.iter().any(|u| u.email == admin.email) {
                        continue;
                    }
                    doc.users.push(admin.into_user(new_id(), Role::Admin));
                    dirty = true;
                }
                ((), dirty)
            })
            .await
    }

    async fn get_all(&self) -> Result<Vec<User>, LeafError> {
        self.file.read(|doc| doc.users.clone()).await
    }

    async fn get_all_non_admin(&self) -> Result<Vec<User>, LeafError> {
        self.file
            .read(|doc| doc.users.iter().filter(|u| !u.is_admin()).cloned().collect())
            .await
    }

    async fn get_by_id(&self, user_id: &str) -> Result<Option<User>, LeafError> {
        let user_id = user_id.to_string();
        self.file
            .read(move |doc| doc.users.iter().find(|u| u.id == user_id).cloned())
            .await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, LeafError> {
        let email = email.to_string();
        self.file
            .read(move |doc| doc.users.iter().find(|u| u.email == email).cloned())
            .await
    }

    async fn create(&self, new_user: NewUser) -> Result<User, LeafError> {
        self.file
            .transact(move |doc| {
                let user = new_user.into_user(new_id(), Role::Default);
                doc.users.push(user.clone());
                (user, true)
            })
            .await
    }

    async fn update(&self, user: User) -> Result<Option<User>, LeafError> {
        self.file
            .transact(move |doc| {
                let Some(stored) = doc.users.iter_mut().find(|u| u.id == user.id) else {
                    return (None, false);
                };
                let role = stored.role;
                *stored = User { role, ..user };
                (Some(stored.clone()), true)
            })
            .await
    }

    async fn delete_all(&self) -> Result<Vec<User>, LeafError> {
        self.file
            .transact(|doc| {
                let users = std::mem::take(&mut doc.users);
                doc.plants.clear();
                doc.collections.clear();
                (users, true)
            })
            .await
    }

    async fn delete_by_id(&self, user_id: &str) -> Result<Option<User>, LeafError> {
        let user_id = user_id.to_string();
        self.file
            .transact(move |doc| {
                let Some(index) = doc.users.iter().position(|u| u.id == user_id) else {
                    return (None, false);
                };
                let user = doc.users.remove(index);
                doc.plants.retain(|p| p.user_id != user.id);
                doc.collections.retain(|c| c.user_id != user.id);
                // the user's plants may sit in other users' collections
                doc.prune_dangling();
                (Some(user), true)
            })
            .await
    }
}

#[async_trait]
impl PlantStore for JsonStore {
    async fn get_all(&self) -> Result<Vec<Plant>, LeafError> {
        self.file.read(|doc| doc.plants.clone()).await
    }

    async fn get_by_id(&self, plant_id: &str) -> Result<Option<Plant>, LeafError> {
        let plant_id = plant_id.to_string();
        self.file
            .read(move |doc| doc.plants.iter().find(|p| p.id == plant_id).cloned())
            .await
    }

    async fn get_all_for_user(&self, user_id: &str) -> Result<Vec<Plant>, LeafError> {
        let user_id = user_id.to_string();
        self.file
            .read(move |doc| {
                doc.plants
                    .iter()
                    .filter(|p| p.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .await
    }

    async fn create_for_user(
        &self,
        user_id: &str,
        new_plant: NewPlant,
    ) -> Result<Option<Plant>, LeafError> {
        let user_id = user_id.to_string();
        self.file
            .transact(move |doc| {
                if !user_exists(doc, &user_id) {
                    return (None, false);
                }
                let plant = new_plant.into_plant(new_id(), user_id, Utc::now());
                doc.plants.push(plant.clone());
                (Some(plant), true)
            })
            .await
    }

    async fn update(&self, plant: Plant) -> Result<Option<Plant>, LeafError> {
        self.file
            .transact(move |doc| {
                let Some(stored) = doc.plants.iter_mut().find(|p| p.id == plant.id) else {
                    return (None, false);
                };
                let user_id = std::mem::take(&mut stored.user_id);
                let date = stored.date;
                *stored = Plant {
                    user_id,
                    date,
                    ..plant
                };
                (Some(stored.clone()), true)
            })
            .await
    }

    async fn delete_all(&self) -> Result<Vec<Plant>, LeafError> {
        self.file
            .transact(|doc| {
                let plants = std::mem::take(&mut doc.plants);
                for collection in &mut doc.collections {
                    collection.plant_ids.clear();
                }
                (plants, true)
            })
            .await
    }

    async fn delete_by_id(&self, plant_id: &str) -> Result<Option<Plant>, LeafError> {
        let plant_id = plant_id.to_string();
        self.file
            .transact(move |doc| {
                let Some(index) = doc.plants.iter().position(|p| p.id == plant_id) else {
                    return (None, false);
                };
                let plant = doc.plants.remove(index);
                for collection in &mut doc.collections {
                    collection.remove_plant(&plant.id);
                }
                (Some(plant), true)
            })
            .await
    }
}

#[async_trait]
impl CollectionStore for JsonStore {
    async fn get_all(&self) -> Result<Vec<Collection>, LeafError> {
        self.file
            .transact(|doc| {
                let dirty = doc.prune_dangling();
                (doc.collections.clone(), dirty)
            })
            .await
    }

    async fn get_by_id(&self, collection_id: &str) -> Result<Option<Collection>, LeafError> {
        let collection_id = collection_id.to_string();
        self.file
            .transact(move |doc| {
                let dirty = doc.prune_dangling();
                let found = doc.collections.iter().find(|c| c.id == collection_id).cloned();
                (found, dirty)
            })
            .await
    }

    async fn get_all_for_user(&self, user_id: &str) -> Result<Vec<Collection>, LeafError> {
        let user_id = user_id.to_string();
        self.file
            .transact(move |doc| {
                let dirty = doc.prune_dangling();
                let found = doc
                    .collections
                    .iter()
                    .filter(|c| c.user_id == user_id)
                    .cloned()
                    .collect();
                (found, dirty)
            })
            .await
    }

    async fn create_for_user(
        &self,
        user_id: &str,
        new_collection: NewCollection,
    ) -> Result<Option<Collection>, LeafError> {
        let user_id = user_id.to_string();
        self.file
            .transact(move |doc| {
                if !user_exists(doc, &user_id) {
                    return (None, false);
                }
                let collection = new_collection.into_collection(new_id(), user_id);
                doc.collections.push(collection.clone());
                (Some(collection), true)
            })
            .await
    }

    async fn update(&self, collection: Collection) -> Result<Option<Collection>, LeafError> {
        self.file
            .transact(move |doc| {
                let Some(stored) = doc.collections.iter_mut().find(|c| c.id == collection.id)
                else {
                    return (None, false);
                };
                stored.name = collection.name;
                stored.description = collection.description;
                stored.image_url = collection.image_url;
                (Some(stored.clone()), true)
            })
            .await
    }

    async fn delete_all(&self) -> Result<Vec<Collection>, LeafError> {
        self.file
            .transact(|doc| (std::mem::take(&mut doc.collections), true))
            .await
    }

    async fn delete_by_id(&self, collection_id: &str) -> Result<Option<Collection>, LeafError> {
        let collection_id = collection_id.to_string();
        self.file
            .transact(move |doc| {
                let Some(index) = doc.collections.iter().position(|c| c.id == collection_id)
                else {
                    return (None, false);
                };
                (Some(doc.collections.remove(index)), true)
            })
            .await
    }

    async fn add_plant_to_collection(
        &self,
        collection_id: &str,
        plant_id: &str,
    ) -> Result<Option<Collection>, LeafError> {
        let collection_id = collection_id.to_string();
        let plant_id = plant_id.to_string();
        self.file
            .transact(move |doc| {
                if !doc.plants.iter().any(|p| p.id == plant_id) {
                    return (None, false);
                }
                let Some(collection) = doc.collections.iter_mut().find(|c| c.id == collection_id)
                else {
                    return (None, false);
                };
                collection.add_plant(&plant_id);
                (Some(collection.clone()), true)
            })
            .await
    }

    async fn delete_plant_from_collection(
        &self,
        collection_id: &str,
        plant_id: &str,
    ) -> Result<Option<Collection>, LeafError> {
        let collection_id = collection_id.to_string();
        let plant_id = plant_id.to_string();
        self.file
            .transact(move |doc| {
                if !doc.plants.iter().any(|p| p.id == plant_id) {
                    return (None, false);
                }
                let Some(collection) = doc.collections.iter_mut().find(|c| c.id == collection_id)
                else {
                    return (None, false);
                };
                collection.remove_plant(&plant_id);
                (Some(collection.clone()), true)
            })
            .await
    }

    async fn get_all_plants_for_collection(
        &self,
        collection_id: &str,
    ) -> Result<Option<Vec<Plant>>, LeafError> {
        let collection_id = collection_id.to_string();
        self.file
            .transact(move |doc| {
                let dirty = doc.prune_dangling();
                let Some(collection) = doc.collections.iter().find(|c| c.id == collection_id)
                else {
                    return (None, dirty);
                };
                let plants = collection
                    .plant_ids
                    .iter()
                    .filter_map(|id| doc.plants.iter().find(|p| &p.id == id).cloned())
                    .collect();
                (Some(plants), dirty)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Biome, PlantType};

    fn oak() -> NewPlant {
        NewPlant {
            common_name: "Oak".into(),
            scientific_name: "Quercus robur".into(),
            plant_type: PlantType::Tree,
            biome: Biome::Forest,
            image_urls: vec![],
            note: None,
            latitude: 52.0,
            longitude: -7.0,
        }
    }

    #[tokio::test]
    async fn dangling_plant_ids_are_pruned_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = JsonStore::open(&path).await.unwrap();

        let user = UserStore::create(
            &store,
            NewUser {
                email: "penny@cheesecakefactory.com".into(),
                password: "pw".into(),
                first_name: "Penny".into(),
                second_name: "Hofstadter".into(),
            },
        )
        .await
        .unwrap();
        let plant = PlantStore::create_for_user(&store, &user.id, oak())
            .await
            .unwrap()
            .unwrap();
        let collection = CollectionStore::create_for_user(
            &store,
            &user.id,
            NewCollection {
                name: "Trees".into(),
                description: "big ones".into(),
            },
        )
        .await
        .unwrap()
        .unwrap();

        // simulate a stale reference written by an older process
        let stale = collection.id.clone();
        store
            .file
            .transact(move |doc| {
                let c = doc.collections.iter_mut().find(|c| c.id == stale).unwrap();
                c.plant_ids = vec!["gone".into(), plant.id.clone()];
                ((), true)
            })
            .await
            .unwrap();

        let found = CollectionStore::get_by_id(&store, &collection.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.plant_ids.len(), 1);

        let raw: LeafDocument =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw.collections[0].plant_ids.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("nested").join("db.json"))
            .await
            .unwrap();
        assert!(UserStore::get_all(&store).await.unwrap().is_empty());
    }
}

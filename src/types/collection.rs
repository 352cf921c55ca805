use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub plant_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewCollection {
    pub name: String,
    pub description: String,
}

impl NewCollection {
    pub fn into_collection(self, id: String, user_id: String) -> Collection {
        Collection {
            id,
            name: self.name,
            description: self.description,
            image_url: None,
            user_id,
            plant_ids: Vec::new(),
        }
    }
}

impl Collection {
    /// Set semantics: a plant is listed at most once.
    pub fn add_plant(&mut self, plant_id: &str) {
        if !self.plant_ids.iter().any(|id| id == plant_id) {
            self.plant_ids.push(plant_id.to_string());
        }
    }

    pub fn remove_plant(&mut self, plant_id: &str) {
        self.plant_ids.retain(|id| id != plant_id);
    }
}

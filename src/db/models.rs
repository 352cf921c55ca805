//! Row structs for the SQLite backend and their conversion into domain types.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{Biome, Collection, Plant, PlantType, Role, User};

fn decode_err(msg: String) -> sqlx::Error {
    sqlx::Error::Decode(msg.into())
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub second_name: String,
    pub about_me: Option<String>,
    pub image_url: Option<String>,
    pub role: String,
}

impl TryFrom<DbUser> for User {
    type Error = sqlx::Error;

    fn try_from(row: DbUser) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| decode_err(format!("unknown role {:?}", row.role)))?;
        Ok(User {
            id: row.id,
            email: row.email,
            password: row.password,
            first_name: row.first_name,
            second_name: row.second_name,
            about_me: row.about_me,
            image_url: row.image_url,
            role,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbPlant {
    pub id: String,
    pub common_name: String,
    pub scientific_name: String,
    pub plant_type: String,
    pub biome: String,
    pub image_urls: String,
    pub note: Option<String>,
    pub date: String,
    pub latitude: f64,
    pub longitude: f64,
    pub user_id: String,
}

impl TryFrom<DbPlant> for Plant {
    type Error = sqlx::Error;

    fn try_from(row: DbPlant) -> Result<Self, Self::Error> {
        let plant_type = PlantType::parse(&row.plant_type)
            .ok_or_else(|| decode_err(format!("unknown plant type {:?}", row.plant_type)))?;
        let biome = Biome::parse(&row.biome)
            .ok_or_else(|| decode_err(format!("unknown biome {:?}", row.biome)))?;
        let image_urls: Vec<String> =
            serde_json::from_str(&row.image_urls).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let date = DateTime::parse_from_rfc3339(&row.date)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .with_timezone(&Utc);
        Ok(Plant {
            id: row.id,
            common_name: row.common_name,
            scientific_name: row.scientific_name,
            plant_type,
            biome,
            image_urls,
            note: row.note,
            date,
            latitude: row.latitude,
            longitude: row.longitude,
            user_id: row.user_id,
        })
    }
}

/// Collection row; `plant_ids` is filled from `collection_plants` afterwards.
#[derive(Debug, Clone, FromRow)]
pub struct DbCollection {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub user_id: String,
}

impl DbCollection {
    pub fn with_plants(self, plant_ids: Vec<String>) -> Collection {
        Collection {
            id: self.id,
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            user_id: self.user_id,
            plant_ids,
        }
    }
}

pub fn encode_image_urls(urls: &[String]) -> Result<String, sqlx::Error> {
    serde_json::to_string(urls).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

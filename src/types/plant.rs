use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlantType {
    Tree,
    Flower,
    Fern,
    Moss,
    Grass,
    #[serde(rename = "Aquatic Plant")]
    AquaticPlant,
    Climber,
    Other,
}

impl PlantType {
    pub const ALL: [PlantType; 8] = [
        PlantType::Tree,
        PlantType::Flower,
        PlantType::Fern,
        PlantType::Moss,
        PlantType::Grass,
        PlantType::AquaticPlant,
        PlantType::Climber,
        PlantType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlantType::Tree => "Tree",
            PlantType::Flower => "Flower",
            PlantType::Fern => "Fern",
            PlantType::Moss => "Moss",
            PlantType::Grass => "Grass",
            PlantType::AquaticPlant => "Aquatic Plant",
            PlantType::Climber => "Climber",
            PlantType::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for PlantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Biome {
    Urban,
    Meadow,
    Forest,
    Pond,
    River,
    Sea,
    Desert,
    Other,
}

impl Biome {
    pub const ALL: [Biome; 8] = [
        Biome::Urban,
        Biome::Meadow,
        Biome::Forest,
        Biome::Pond,
        Biome::River,
        Biome::Sea,
        Biome::Desert,
        Biome::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Biome::Urban => "Urban",
            Biome::Meadow => "Meadow",
            Biome::Forest => "Forest",
            Biome::Pond => "Pond",
            Biome::River => "River",
            Biome::Sea => "Sea",
            Biome::Desert => "Desert",
            Biome::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str() == s)
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub common_name: String,
    pub scientific_name: String,
    #[serde(rename = "type")]
    pub plant_type: PlantType,
    pub biome: Biome,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub date: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlant {
    pub common_name: String,
    pub scientific_name: String,
    #[serde(rename = "type")]
    pub plant_type: PlantType,
    pub biome: Biome,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewPlant {
    pub fn into_plant(self, id: String, user_id: String, date: DateTime<Utc>) -> Plant {
        Plant {
            id,
            common_name: self.common_name,
            scientific_name: self.scientific_name,
            plant_type: self.plant_type,
            biome: self.biome,
            image_urls: self.image_urls,
            note: self.note,
            date,
            latitude: self.latitude,
            longitude: self.longitude,
            user_id,
        }
    }
}

impl Plant {
    /// Overwrite the editable fields, keeping id, owner, date and images.
    pub fn apply(&mut self, changes: NewPlant) {
        self.common_name = changes.common_name;
        self.scientific_name = changes.scientific_name;
        self.plant_type = changes.plant_type;
        self.biome = changes.biome;
        self.note = changes.note;
        self.latitude = changes.latitude;
        self.longitude = changes.longitude;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aquatic_plant_uses_spaced_wire_name() {
        let json = serde_json::to_string(&PlantType::AquaticPlant).unwrap();
        assert_eq!(json, r#""Aquatic Plant""#);
        assert_eq!(PlantType::parse("Aquatic Plant"), Some(PlantType::AquaticPlant));
        assert_eq!(PlantType::parse("Cactus"), None);
    }

    #[test]
    fn plant_serializes_with_mongo_style_id() {
        let plant = NewPlant {
            common_name: "Oak".into(),
            scientific_name: "Quercus robur".into(),
            plant_type: PlantType::Tree,
            biome: Biome::Forest,
            image_urls: vec![],
            note: None,
            latitude: 52.1,
            longitude: -7.1,
        }
        .into_plant("p1".into(), "u1".into(), Utc::now());

        let value = serde_json::to_value(&plant).unwrap();
        assert_eq!(value["_id"], "p1");
        assert_eq!(value["type"], "Tree");
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["commonName"], "Oak");
    }
}

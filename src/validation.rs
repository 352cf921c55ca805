//! Payload schemas for the web forms and the JSON API.
//!
//! Every rule is checked so a re-rendered form can show all problems at once.

use serde::{Deserialize, Serialize};

use crate::types::{Biome, Collection, NewCollection, NewPlant, NewUser, Plant, PlantType, User, UserCredentials};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Vec<FieldError>;

    fn check(&self) -> Result<(), Vec<FieldError>> {
        let errors = self.validate();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn required(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, format!("\"{field}\" is not allowed to be empty")));
    }
}

fn email(errors: &mut Vec<FieldError>, value: &str) {
    if value.trim().is_empty() {
        required(errors, "email", value);
        return;
    }
    let valid = value.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.split('.').count() >= 2
            && domain.split('.').all(|part| !part.is_empty())
    });
    if !valid {
        errors.push(FieldError::new("email", "\"email\" must be a valid email"));
    }
}

fn coordinate(errors: &mut Vec<FieldError>, field: &str, value: f64, limit: f64) {
    if !value.is_finite() || value < -limit || value > limit {
        errors.push(FieldError::new(
            field,
            format!("\"{field}\" must be between -{limit} and {limit}"),
        ));
    }
}

impl Validate for UserCredentials {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        email(&mut errors, &self.email);
        required(&mut errors, "password", &self.password);
        errors
    }
}

impl Validate for NewUser {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        email(&mut errors, &self.email);
        required(&mut errors, "password", &self.password);
        required(&mut errors, "firstName", &self.first_name);
        required(&mut errors, "secondName", &self.second_name);
        errors
    }
}

impl Validate for User {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        required(&mut errors, "_id", &self.id);
        email(&mut errors, &self.email);
        required(&mut errors, "password", &self.password);
        required(&mut errors, "firstName", &self.first_name);
        required(&mut errors, "secondName", &self.second_name);
        errors
    }
}

impl Validate for NewPlant {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        required(&mut errors, "commonName", &self.common_name);
        required(&mut errors, "scientificName", &self.scientific_name);
        coordinate(&mut errors, "latitude", self.latitude, 90.0);
        coordinate(&mut errors, "longitude", self.longitude, 180.0);
        errors
    }
}

impl Validate for Plant {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        required(&mut errors, "_id", &self.id);
        required(&mut errors, "commonName", &self.common_name);
        required(&mut errors, "scientificName", &self.scientific_name);
        coordinate(&mut errors, "latitude", self.latitude, 90.0);
        coordinate(&mut errors, "longitude", self.longitude, 180.0);
        errors
    }
}

impl Validate for NewCollection {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        required(&mut errors, "name", &self.name);
        required(&mut errors, "description", &self.description);
        errors
    }
}

impl Validate for Collection {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        required(&mut errors, "_id", &self.id);
        required(&mut errors, "name", &self.name);
        required(&mut errors, "description", &self.description);
        errors
    }
}

/// Raw plant form as posted by the garden and plant pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlantForm {
    pub common_name: String,
    pub scientific_name: String,
    #[serde(rename = "type")]
    pub plant_type: String,
    pub biome: String,
    pub note: String,
    pub latitude: String,
    pub longitude: String,
}

impl From<&Plant> for PlantForm {
    fn from(plant: &Plant) -> Self {
        Self {
            common_name: plant.common_name.clone(),
            scientific_name: plant.scientific_name.clone(),
            plant_type: plant.plant_type.to_string(),
            biome: plant.biome.to_string(),
            note: plant.note.clone().unwrap_or_default(),
            latitude: plant.latitude.to_string(),
            longitude: plant.longitude.to_string(),
        }
    }
}

impl PlantForm {
    pub fn parse(&self) -> Result<NewPlant, Vec<FieldError>> {
        let mut errors = Vec::new();
        let plant_type = PlantType::parse(self.plant_type.trim());
        if plant_type.is_none() {
            errors.push(FieldError::new("type", "\"type\" must be one of the known plant types"));
        }
        let biome = Biome::parse(self.biome.trim());
        if biome.is_none() {
            errors.push(FieldError::new("biome", "\"biome\" must be one of the known biomes"));
        }
        let latitude = self.latitude.trim().parse::<f64>().ok();
        if latitude.is_none() {
            errors.push(FieldError::new("latitude", "\"latitude\" must be a number"));
        }
        let longitude = self.longitude.trim().parse::<f64>().ok();
        if longitude.is_none() {
            errors.push(FieldError::new("longitude", "\"longitude\" must be a number"));
        }

        let note = self.note.trim();
        let plant = NewPlant {
            common_name: self.common_name.trim().to_string(),
            scientific_name: self.scientific_name.trim().to_string(),
            plant_type: plant_type.unwrap_or(PlantType::Other),
            biome: biome.unwrap_or(Biome::Other),
            image_urls: Vec::new(),
            note: (!note.is_empty()).then(|| note.to_string()),
            latitude: latitude.unwrap_or(0.0),
            longitude: longitude.unwrap_or(0.0),
        };
        // Range checks only make sense on numbers that parsed.
        errors.extend(plant.validate().into_iter().filter(|e| match e.field.as_str() {
            "latitude" => latitude.is_some(),
            "longitude" => longitude.is_some(),
            _ => true,
        }));

        if errors.is_empty() { Ok(plant) } else { Err(errors) }
    }
}

/// Profile form; password is optional and kept when left blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileForm {
    pub first_name: String,
    pub second_name: String,
    pub email: String,
    pub password: String,
    pub about_me: String,
}

impl Validate for ProfileForm {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        required(&mut errors, "firstName", &self.first_name);
        required(&mut errors, "secondName", &self.second_name);
        email(&mut errors, &self.email);
        errors
    }
}

impl From<&User> for ProfileForm {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            second_name: user.second_name.clone(),
            email: user.email.clone(),
            password: String::new(),
            about_me: user.about_me.clone().unwrap_or_default(),
        }
    }
}

impl ProfileForm {
    pub fn apply_to(self, user: &mut User) {
        user.first_name = self.first_name.trim().to_string();
        user.second_name = self.second_name.trim().to_string();
        user.email = self.email.trim().to_string();
        if !self.password.is_empty() {
            user.password = self.password;
        }
        let about = self.about_me.trim();
        user.about_me = (!about.is_empty()).then(|| about.to_string());
    }
}

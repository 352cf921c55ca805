#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use leaf_library::config::Config;
use leaf_library::db::Database;
use leaf_library::service::{ImageStore, LocalImageStore};
use leaf_library::types::{Biome, NewCollection, NewPlant, NewUser, PlantType};
use leaf_library::{LeafState, leaf_router};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Both backends, each fresh. Keep the `TempDir` alive for the test's duration.
pub async fn backends() -> (TempDir, Vec<(&'static str, Database)>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let json = Database::json(dir.path().join("db.json"))
        .await
        .expect("json store");
    let sqlite = Database::sqlite("sqlite::memory:")
        .await
        .expect("sqlite store");
    (dir, vec![("json", json), ("sqlite", sqlite)])
}

pub fn sheldon() -> NewUser {
    NewUser {
        email: "sheldon@caltech.edu".into(),
        password: "Bazinga!".into(),
        first_name: "Sheldon".into(),
        second_name: "Cooper".into(),
    }
}

pub fn leonard() -> NewUser {
    NewUser {
        email: "leonard@caltech.edu".into(),
        password: "Penny<3".into(),
        first_name: "Leonard".into(),
        second_name: "Hofstadter".into(),
    }
}

pub fn oak() -> NewPlant {
    NewPlant {
        common_name: "Oak".into(),
        scientific_name: "Quercus robur".into(),
        plant_type: PlantType::Tree,
        biome: Biome::Forest,
        image_urls: vec![],
        note: Some("by the river bend".into()),
        latitude: 52.26,
        longitude: -7.11,
    }
}

pub fn lily() -> NewPlant {
    NewPlant {
        common_name: "Water lily".into(),
        scientific_name: "Nymphaea alba".into(),
        plant_type: PlantType::AquaticPlant,
        biome: Biome::Pond,
        image_urls: vec![],
        note: None,
        latitude: 53.35,
        longitude: -6.26,
    }
}

pub fn trees() -> NewCollection {
    NewCollection {
        name: "Trees".into(),
        description: "Everything with a trunk".into(),
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    dir: TempDir,
}

pub async fn app() -> TestApp {
    app_with_images(|cfg: &Config| -> Arc<dyn ImageStore> {
        Arc::new(LocalImageStore::new(cfg.upload_dir.clone()))
    })
    .await
}

/// App over a fresh JSON store; `images` builds the image host from the test config.
pub async fn app_with_images(
    images: impl FnOnce(&Config) -> Arc<dyn ImageStore>,
) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::json(dir.path().join("db.json"))
        .await
        .expect("json store");
    let mut cfg = Config::default();
    cfg.cookie_password = "a-test-cookie-password-that-is-long-enough".into();
    cfg.public_dir = dir.path().join("public");
    cfg.upload_dir = dir.path().join("uploads");
    let images = images(&cfg);
    let state = LeafState::new(db.clone(), images, &cfg).expect("state");
    TestApp {
        app: leaf_router(state),
        db,
        dir,
    }
}

impl TestApp {
    pub fn upload_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("uploads")
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(req).await.expect("request failed")
    }
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("response body was not utf-8")
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not json")
}

pub fn location(resp: &Response<Body>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

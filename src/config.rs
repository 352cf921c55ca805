use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

/// Which persistence backend the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Json,
    Sqlite,
}

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub loglevel: String,

    pub cookie_name: String,
    pub cookie_password: String,
    /// Drop the `Secure` flag on the session cookie (plain http during development).
    pub insecure_cookie: bool,

    pub admin_email: Option<String>,
    pub admin_password: Option<String>,

    pub store: StoreKind,
    pub json_path: PathBuf,
    pub database: String,

    pub cloudinary_name: Option<String>,
    pub cloudinary_key: Option<String>,
    pub cloudinary_secret: Option<String>,
    pub cloudinary_preset: Option<String>,
    pub upload_dir: PathBuf,
    pub public_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            loglevel: "info".to_string(),
            cookie_name: "leaf-library".to_string(),
            cookie_password: "change-me-please-this-is-a-development-secret".to_string(),
            insecure_cookie: true,
            admin_email: None,
            admin_password: None,
            store: StoreKind::Json,
            json_path: PathBuf::from("data/db.json"),
            database: "sqlite:data/leaf.sqlite".to_string(),
            cloudinary_name: None,
            cloudinary_key: None,
            cloudinary_secret: None,
            cloudinary_preset: None,
            upload_dir: PathBuf::from("public/uploads"),
            public_dir: PathBuf::from("public"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw().only(&ENV_KEYS))
            .extract()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Admin seed list; empty unless both email and password are configured.
    pub fn admins(&self) -> Vec<crate::types::NewUser> {
        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                vec![crate::types::NewUser {
                    email: email.clone(),
                    password: password.clone(),
                    first_name: "admin".to_string(),
                    second_name: "admin".to_string(),
                }]
            }
            _ => Vec::new(),
        }
    }

    /// Cloudinary credentials, only when the whole set is present.
    pub fn cloudinary(&self) -> Option<CloudinaryConfig> {
        let set = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        Some(CloudinaryConfig {
            cloud_name: set(&self.cloudinary_name)?,
            api_key: set(&self.cloudinary_key)?,
            api_secret: set(&self.cloudinary_secret)?,
            upload_preset: set(&self.cloudinary_preset)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub upload_preset: String,
}

const ENV_KEYS: [&str; 17] = [
    "host",
    "port",
    "loglevel",
    "cookie_name",
    "cookie_password",
    "insecure_cookie",
    "admin_email",
    "admin_password",
    "store",
    "json_path",
    "database",
    "cloudinary_name",
    "cloudinary_key",
    "cloudinary_secret",
    "cloudinary_preset",
    "upload_dir",
    "public_dir",
];

pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::from_env().unwrap_or_else(|e| {
        eprintln!("invalid configuration, falling back to defaults: {e}");
        Config::default()
    })
});

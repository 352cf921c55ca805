use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Default,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Default => "default",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Role::Default),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub second_name: String,
    #[serde(default)]
    pub about_me: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.second_name)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Sign-up payload. Missing fields deserialize empty and fail validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub second_name: String,
}

impl NewUser {
    pub fn into_user(self, id: String, role: Role) -> User {
        User {
            id,
            email: self.email,
            password: self.password,
            first_name: self.first_name,
            second_name: self.second_name,
            about_me: None,
            image_url: None,
            role,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserCredentials {
    pub email: String,
    pub password: String,
}

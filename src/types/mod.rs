//! Domain entities shared by the stores, the web controllers and the API.

pub mod collection;
pub mod plant;
pub mod user;

pub use collection::{Collection, NewCollection};
pub use plant::{Biome, NewPlant, Plant, PlantType};
pub use user::{NewUser, Role, User, UserCredentials};

/// Authenticated caller, resolved from a session cookie or a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: String,
    pub role: Role,
}

impl Credential {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners and admins may touch a record.
    pub fn may_access(&self, owner_id: &str) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

impl From<&User> for Credential {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            role: user.role,
        }
    }
}

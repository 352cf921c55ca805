use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::db::models::{DbCollection, DbPlant, DbUser, encode_image_urls};
use crate::db::schema::SQLITE_INIT;
use crate::db::{CollectionStore, PlantStore, UserStore};
use crate::error::LeafError;
use crate::types::{Collection, NewCollection, NewPlant, NewUser, Plant, Role, User};

pub type SqlitePool = Pool<Sqlite>;

const USER_COLUMNS: &str =
    "id, email, password, first_name, second_name, about_me, image_url, role";
const PLANT_COLUMNS: &str = "id, common_name, scientific_name, plant_type, biome, image_urls, \
     note, date, latitude, longitude, user_id";
const COLLECTION_COLUMNS: &str = "id, name, description, image_url, user_id";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `url`, creating the database file if needed.
    /// In-memory databases get a single connection so every query sees
    /// the same data.
    pub async fn connect(url: &str) -> Result<Self, LeafError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(8);
        if url.contains(":memory:") || url.contains("mode=memory") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), LeafError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

async fn fetch_user(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<User>, LeafError> {
    let row: Option<DbUser> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(User::try_from).transpose()?)
}

async fn fetch_plant(
    conn: &mut SqliteConnection,
    plant_id: &str,
) -> Result<Option<Plant>, LeafError> {
    let row: Option<DbPlant> =
        sqlx::query_as(&format!("SELECT {PLANT_COLUMNS} FROM plants WHERE id = ?"))
            .bind(plant_id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(Plant::try_from).transpose()?)
}

async fn fetch_plants(
    conn: &mut SqliteConnection,
    filter: &str,
    bind: Option<&str>,
) -> Result<Vec<Plant>, LeafError> {
    let sql = format!("SELECT {PLANT_COLUMNS} FROM plants {filter} ORDER BY rowid");
    let mut query = sqlx::query_as::<_, DbPlant>(&sql);
    if let Some(value) = bind {
        query = query.bind(value);
    }
    let rows = query.fetch_all(&mut *conn).await?;
    Ok(rows
        .into_iter()
        .map(Plant::try_from)
        .collect::<Result<_, _>>()?)
}

async fn plant_ids_of(
    conn: &mut SqliteConnection,
    collection_id: &str,
) -> Result<Vec<String>, LeafError> {
    let ids: Vec<(String,)> = sqlx::query_as(
        "SELECT plant_id FROM collection_plants WHERE collection_id = ? ORDER BY position",
    )
    .bind(collection_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}

async fn fetch_collection(
    conn: &mut SqliteConnection,
    collection_id: &str,
) -> Result<Option<Collection>, LeafError> {
    let row: Option<DbCollection> = sqlx::query_as(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = ?"
    ))
    .bind(collection_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let plant_ids = plant_ids_of(conn, collection_id).await?;
    Ok(Some(row.with_plants(plant_ids)))
}

async fn fetch_collections(
    conn: &mut SqliteConnection,
    filter: &str,
    bind: Option<&str>,
) -> Result<Vec<Collection>, LeafError> {
    let sql = format!("SELECT {COLLECTION_COLUMNS} FROM collections {filter} ORDER BY rowid");
    let mut query = sqlx::query_as::<_, DbCollection>(&sql);
    if let Some(value) = bind {
        query = query.bind(value);
    }
    let rows = query.fetch_all(&mut *conn).await?;

    // same filter as above, applied through the owning collection
    let member_sql = format!(
        "SELECT cp.collection_id, cp.plant_id FROM collection_plants cp \
         JOIN collections ON collections.id = cp.collection_id {filter} \
         ORDER BY cp.collection_id, cp.position"
    );
    let mut members_query = sqlx::query_as::<_, (String, String)>(&member_sql);
    if let Some(value) = bind {
        members_query = members_query.bind(value);
    }
    let members = members_query.fetch_all(&mut *conn).await?;
    let mut by_collection: HashMap<String, Vec<String>> = HashMap::new();
    for (collection_id, plant_id) in members {
        by_collection.entry(collection_id).or_default().push(plant_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let plant_ids = by_collection.remove(&row.id).unwrap_or_default();
            row.with_plants(plant_ids)
        })
        .collect())
}

async fn exists(
    conn: &mut SqliteConnection,
    table: &str,
    id: &str,
) -> Result<bool, LeafError> {
    let found: Option<(i64,)> = sqlx::query_as(&format!("SELECT 1 FROM {table} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn init_admins(&self, admins: Vec<NewUser>) -> Result<(), LeafError> {
        let mut tx = self.pool.begin().await?;
        for admin in admins {
            let taken: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
                .bind(&admin.email)
                .fetch_optional(&mut *tx)
                .await?;
            if taken.is_some() {
                continue;
            }
            insert_user(&mut tx, &admin.into_user(new_id(), Role::Admin)).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<User>, LeafError> {
        let rows: Vec<DbUser> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn get_all_non_admin(&self) -> Result<Vec<User>, LeafError> {
        let rows: Vec<DbUser> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role != 'admin' ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn get_by_id(&self, user_id: &str) -> Result<Option<User>, LeafError> {
        let mut conn = self.pool.acquire().await?;
        fetch_user(&mut conn, user_id).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, LeafError> {
        let row: Option<DbUser> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? ORDER BY rowid LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, LeafError> {
        let user = new_user.into_user(new_id(), Role::Default);
        let mut conn = self.pool.acquire().await?;
        insert_user(&mut conn, &user).await?;
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<Option<User>, LeafError> {
        let mut tx = self.pool.begin().await?;
        let done = sqlx::query(
            r#"UPDATE users SET
                email = ?,
                password = ?,
                first_name = ?,
                second_name = ?,
                about_me = ?,
                image_url = ?
              WHERE id = ?"#,
        )
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.first_name)
        .bind(&user.second_name)
        .bind(&user.about_me)
        .bind(&user.image_url)
        .bind(&user.id)
        .execute(&mut *tx)
        .await?;
        if done.rows_affected() == 0 {
            return Ok(None);
        }
        let stored = fetch_user(&mut tx, &user.id).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn delete_all(&self) -> Result<Vec<User>, LeafError> {
        let mut tx = self.pool.begin().await?;
        let rows: Vec<DbUser> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid"))
                .fetch_all(&mut *tx)
                .await?;
        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        sqlx::query("DELETE FROM collection_plants")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM collections").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM plants").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM users").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(users)
    }

    async fn delete_by_id(&self, user_id: &str) -> Result<Option<User>, LeafError> {
        let mut tx = self.pool.begin().await?;
        let Some(user) = fetch_user(&mut tx, user_id).await? else {
            return Ok(None);
        };
        // plants and collections follow through ON DELETE CASCADE
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(user))
    }
}

async fn insert_user(conn: &mut SqliteConnection, user: &User) -> Result<(), LeafError> {
    sqlx::query(
        r#"INSERT INTO users (
            id, email, password, first_name, second_name, about_me, image_url, role
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.password)
    .bind(&user.first_name)
    .bind(&user.second_name)
    .bind(&user.about_me)
    .bind(&user.image_url)
    .bind(user.role.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[async_trait]
impl PlantStore for SqliteStore {
    async fn get_all(&self) -> Result<Vec<Plant>, LeafError> {
        let mut conn = self.pool.acquire().await?;
        fetch_plants(&mut conn, "", None).await
    }

    async fn get_by_id(&self, plant_id: &str) -> Result<Option<Plant>, LeafError> {
        let mut conn = self.pool.acquire().await?;
        fetch_plant(&mut conn, plant_id).await
    }

    async fn get_all_for_user(&self, user_id: &str) -> Result<Vec<Plant>, LeafError> {
        let mut conn = self.pool.acquire().await?;
        fetch_plants(&mut conn, "WHERE user_id = ?", Some(user_id)).await
    }

    async fn create_for_user(
        &self,
        user_id: &str,
        new_plant: NewPlant,
    ) -> Result<Option<Plant>, LeafError> {
        let mut tx = self.pool.begin().await?;
        if !exists(&mut tx, "users", user_id).await? {
            return Ok(None);
        }
        let plant = new_plant.into_plant(new_id(), user_id.to_string(), Utc::now());
        sqlx::query(
            r#"INSERT INTO plants (
                id, common_name, scientific_name, plant_type, biome, image_urls,
                note, date, latitude, longitude, user_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&plant.id)
        .bind(&plant.common_name)
        .bind(&plant.scientific_name)
        .bind(plant.plant_type.as_str())
        .bind(plant.biome.as_str())
        .bind(encode_image_urls(&plant.image_urls)?)
        .bind(&plant.note)
        .bind(plant.date.to_rfc3339())
        .bind(plant.latitude)
        .bind(plant.longitude)
        .bind(&plant.user_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(plant))
    }

    async fn update(&self, plant: Plant) -> Result<Option<Plant>, LeafError> {
        let mut tx = self.pool.begin().await?;
        let done = sqlx::query(
            r#"UPDATE plants SET
                common_name = ?,
                scientific_name = ?,
                plant_type = ?,
                biome = ?,
                image_urls = ?,
                note = ?,
                latitude = ?,
                longitude = ?
              WHERE id = ?"#,
        )
        .bind(&plant.common_name)
        .bind(&plant.scientific_name)
        .bind(plant.plant_type.as_str())
        .bind(plant.biome.as_str())
        .bind(encode_image_urls(&plant.image_urls)?)
        .bind(&plant.note)
        .bind(plant.latitude)
        .bind(plant.longitude)
        .bind(&plant.id)
        .execute(&mut *tx)
        .await?;
        if done.rows_affected() == 0 {
            return Ok(None);
        }
        let stored = fetch_plant(&mut tx, &plant.id).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn delete_all(&self) -> Result<Vec<Plant>, LeafError> {
        let mut tx = self.pool.begin().await?;
        let plants = fetch_plants(&mut tx, "", None).await?;
        sqlx::query("DELETE FROM collection_plants")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM plants").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(plants)
    }

    async fn delete_by_id(&self, plant_id: &str) -> Result<Option<Plant>, LeafError> {
        let mut tx = self.pool.begin().await?;
        let Some(plant) = fetch_plant(&mut tx, plant_id).await? else {
            return Ok(None);
        };
        sqlx::query("DELETE FROM plants WHERE id = ?")
            .bind(plant_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(plant))
    }
}

#[async_trait]
impl CollectionStore for SqliteStore {
    async fn get_all(&self) -> Result<Vec<Collection>, LeafError> {
        let mut conn = self.pool.acquire().await?;
        fetch_collections(&mut conn, "", None).await
    }

    async fn get_by_id(&self, collection_id: &str) -> Result<Option<Collection>, LeafError> {
        let mut conn = self.pool.acquire().await?;
        fetch_collection(&mut conn, collection_id).await
    }

    async fn get_all_for_user(&self, user_id: &str) -> Result<Vec<Collection>, LeafError> {
        let mut conn = self.pool.acquire().await?;
        fetch_collections(&mut conn, "WHERE user_id = ?", Some(user_id)).await
    }

    async fn create_for_user(
        &self,
        user_id: &str,
        new_collection: NewCollection,
    ) -> Result<Option<Collection>, LeafError> {
        let mut tx = self.pool.begin().await?;
        if !exists(&mut tx, "users", user_id).await? {
            return Ok(None);
        }
        let collection = new_collection.into_collection(new_id(), user_id.to_string());
        sqlx::query(
            "INSERT INTO collections (id, name, description, image_url, user_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&collection.id)
        .bind(&collection.name)
        .bind(&collection.description)
        .bind(&collection.image_url)
        .bind(&collection.user_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(collection))
    }

    async fn update(&self, collection: Collection) -> Result<Option<Collection>, LeafError> {
        let mut tx = self.pool.begin().await?;
        let done = sqlx::query(
            "UPDATE collections SET name = ?, description = ?, image_url = ? WHERE id = ?",
        )
        .bind(&collection.name)
        .bind(&collection.description)
        .bind(&collection.image_url)
        .bind(&collection.id)
        .execute(&mut *tx)
        .await?;
        if done.rows_affected() == 0 {
            return Ok(None);
        }
        let stored = fetch_collection(&mut tx, &collection.id).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn delete_all(&self) -> Result<Vec<Collection>, LeafError> {
        let mut tx = self.pool.begin().await?;
        let collections = fetch_collections(&mut tx, "", None).await?;
        sqlx::query("DELETE FROM collection_plants")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM collections").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(collections)
    }

    async fn delete_by_id(&self, collection_id: &str) -> Result<Option<Collection>, LeafError> {
        let mut tx = self.pool.begin().await?;
        let Some(collection) = fetch_collection(&mut tx, collection_id).await? else {
            return Ok(None);
        };
        sqlx::query("DELETE FROM collections WHERE id = ?")
            .bind(collection_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(collection))
    }

    async fn add_plant_to_collection(
        &self,
        collection_id: &str,
        plant_id: &str,
    ) -> Result<Option<Collection>, LeafError> {
        let mut tx = self.pool.begin().await?;
        if !exists(&mut tx, "plants", plant_id).await?
            || !exists(&mut tx, "collections", collection_id).await?
        {
            return Ok(None);
        }
        sqlx::query(
            r#"INSERT OR IGNORE INTO collection_plants (collection_id, plant_id, position)
               SELECT ?, ?, COALESCE(MAX(position), -1) + 1
               FROM collection_plants WHERE collection_id = ?"#,
        )
        .bind(collection_id)
        .bind(plant_id)
        .bind(collection_id)
        .execute(&mut *tx)
        .await?;
        let collection = fetch_collection(&mut tx, collection_id).await?;
        tx.commit().await?;
        Ok(collection)
    }

    async fn delete_plant_from_collection(
        &self,
        collection_id: &str,
        plant_id: &str,
    ) -> Result<Option<Collection>, LeafError> {
        let mut tx = self.pool.begin().await?;
        if !exists(&mut tx, "plants", plant_id).await?
            || !exists(&mut tx, "collections", collection_id).await?
        {
            return Ok(None);
        }
        sqlx::query("DELETE FROM collection_plants WHERE collection_id = ? AND plant_id = ?")
            .bind(collection_id)
            .bind(plant_id)
            .execute(&mut *tx)
            .await?;
        let collection = fetch_collection(&mut tx, collection_id).await?;
        tx.commit().await?;
        Ok(collection)
    }

    async fn get_all_plants_for_collection(
        &self,
        collection_id: &str,
    ) -> Result<Option<Vec<Plant>>, LeafError> {
        let mut conn = self.pool.acquire().await?;
        if !exists(&mut conn, "collections", collection_id).await? {
            return Ok(None);
        }
        let rows: Vec<DbPlant> = sqlx::query_as(
            r#"SELECT p.id, p.common_name, p.scientific_name, p.plant_type, p.biome,
                      p.image_urls, p.note, p.date, p.latitude, p.longitude, p.user_id
               FROM collection_plants cp
               JOIN plants p ON p.id = cp.plant_id
               WHERE cp.collection_id = ?
               ORDER BY cp.position"#,
        )
        .bind(collection_id)
        .fetch_all(&mut *conn)
        .await?;
        let plants = rows
            .into_iter()
            .map(Plant::try_from)
            .collect::<Result<_, _>>()?;
        Ok(Some(plants))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_is_idempotent() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store.init_schema().await.unwrap();
        store.init_schema().await.unwrap();
        assert!(UserStore::get_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store.init_schema().await.unwrap();
        let err = sqlx::query(
            "INSERT INTO collections (id, name, description, user_id) VALUES ('c', 'n', 'd', 'nobody')",
        )
        .execute(store.pool())
        .await;
        assert!(err.is_err());
    }
}

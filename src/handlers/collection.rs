use axum::Form;
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Redirect};
use tracing::{info, warn};

use crate::error::LeafError;
use crate::handlers::plant::owned_plant;
use crate::handlers::views::Page;
use crate::handlers::{WebResult, bad_request, read_image};
use crate::middleware::auth::Session;
use crate::router::LeafState;
use crate::types::{Collection, Credential, NewCollection, User};
use crate::validation::Validate;

async fn owned_collection(
    state: &LeafState,
    user: &User,
    collection_id: &str,
) -> Result<Collection, LeafError> {
    let collection = state
        .db
        .collections
        .get_by_id(collection_id)
        .await?
        .ok_or(LeafError::NotFound("no collection with this id"))?;
    if !Credential::from(user).may_access(&collection.user_id) {
        return Err(LeafError::Forbidden("not your collection"));
    }
    Ok(collection)
}

fn back_to(collection_id: &str) -> axum::response::Response {
    Redirect::to(&format!("/collection/{collection_id}")).into_response()
}

pub async fn index(State(state): State<LeafState>, Session(user): Session) -> WebResult {
    let collections = state.db.collections.get_all_for_user(&user.id).await?;
    let page = Page::new("Leaf Library - Collections", Some(&user))
        .with("collections", &collections)
        .with("form", &NewCollection::default());
    Ok(state.views.render("collections.html", &page)?.into_response())
}

pub async fn add_collection(
    State(state): State<LeafState>,
    Session(user): Session,
    Form(new_collection): Form<NewCollection>,
) -> WebResult {
    if let Err(errors) = new_collection.check() {
        let collections = state.db.collections.get_all_for_user(&user.id).await?;
        let page = Page::new("Leaf Library - Collections error", Some(&user))
            .with("collections", &collections)
            .with("form", &new_collection)
            .with_errors(&errors);
        return Ok(bad_request(state.views.render("collections.html", &page)?));
    }
    let collection = state
        .db
        .collections
        .create_for_user(&user.id, new_collection)
        .await?
        .ok_or(LeafError::NotFound("no user with this id"))?;
    info!(collection_id = %collection.id, user_id = %user.id, "collection created");
    Ok(Redirect::to("/collections").into_response())
}

/// Detail page: the collection's plants plus the owner's plants not yet in it.
async fn detail_page(
    state: &LeafState,
    user: &User,
    collection: &Collection,
    title: &str,
) -> Result<Page, LeafError> {
    let plants = state
        .db
        .collections
        .get_all_plants_for_collection(&collection.id)
        .await?
        .unwrap_or_default();
    let addable: Vec<_> = state
        .db
        .plants
        .get_all_for_user(&collection.user_id)
        .await?
        .into_iter()
        .filter(|p| !collection.plant_ids.contains(&p.id))
        .collect();
    Ok(Page::new(title, Some(user))
        .with("collection", collection)
        .with("plants", &plants)
        .with("addable_plants", &addable))
}

pub async fn show(
    State(state): State<LeafState>,
    Session(user): Session,
    Path(collection_id): Path<String>,
) -> WebResult {
    let collection = owned_collection(&state, &user, &collection_id).await?;
    let form = NewCollection {
        name: collection.name.clone(),
        description: collection.description.clone(),
    };
    let page = detail_page(&state, &user, &collection, "Leaf Library - Collection Details")
        .await?
        .with("form", &form);
    Ok(state.views.render("collection.html", &page)?.into_response())
}

pub async fn delete(
    State(state): State<LeafState>,
    Session(user): Session,
    Path(collection_id): Path<String>,
) -> WebResult {
    let collection = owned_collection(&state, &user, &collection_id).await?;
    if let Some(collection) = state.db.collections.delete_by_id(&collection.id).await? {
        if let Some(url) = &collection.image_url
            && let Err(e) = state.images.delete(url).await
        {
            warn!(error = %e, %url, "could not delete collection image");
        }
        info!(%collection_id, "collection deleted");
    }
    Ok(Redirect::to("/collections").into_response())
}

pub async fn update(
    State(state): State<LeafState>,
    Session(user): Session,
    Path(collection_id): Path<String>,
    Form(changes): Form<NewCollection>,
) -> WebResult {
    let mut collection = owned_collection(&state, &user, &collection_id).await?;
    if let Err(errors) = changes.check() {
        let page = detail_page(&state, &user, &collection, "Leaf Library - Update collection error")
            .await?
            .with("form", &changes)
            .with_errors(&errors);
        return Ok(bad_request(state.views.render("collection.html", &page)?));
    }
    collection.name = changes.name;
    collection.description = changes.description;
    state
        .db
        .collections
        .update(collection)
        .await?
        .ok_or(LeafError::NotFound("no collection with this id"))?;
    Ok(back_to(&collection_id))
}

pub async fn add_plant(
    State(state): State<LeafState>,
    Session(user): Session,
    Path((collection_id, plant_id)): Path<(String, String)>,
) -> WebResult {
    owned_collection(&state, &user, &collection_id).await?;
    owned_plant(&state, &user, &plant_id).await?;
    state
        .db
        .collections
        .add_plant_to_collection(&collection_id, &plant_id)
        .await?
        .ok_or(LeafError::NotFound("no collection or plant with this id"))?;
    Ok(back_to(&collection_id))
}

pub async fn delete_plant(
    State(state): State<LeafState>,
    Session(user): Session,
    Path((collection_id, plant_id)): Path<(String, String)>,
) -> WebResult {
    owned_collection(&state, &user, &collection_id).await?;
    state
        .db
        .collections
        .delete_plant_from_collection(&collection_id, &plant_id)
        .await?
        .ok_or(LeafError::NotFound("no collection or plant with this id"))?;
    Ok(back_to(&collection_id))
}

pub async fn upload_image(
    State(state): State<LeafState>,
    Session(user): Session,
    Path(collection_id): Path<String>,
    multipart: Multipart,
) -> WebResult {
    let mut collection = owned_collection(&state, &user, &collection_id).await?;
    let Some((bytes, filename)) = read_image(multipart).await? else {
        return Ok(back_to(&collection_id));
    };
    let url = match state.images.upload(bytes, &filename).await {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, %collection_id, "collection image upload failed");
            return Ok(back_to(&collection_id));
        }
    };
    if let Some(old) = collection.image_url.replace(url)
        && let Err(e) = state.images.delete(&old).await
    {
        warn!(error = %e, url = %old, "could not delete previous collection image");
    }
    state.db.collections.update(collection).await?;
    Ok(back_to(&collection_id))
}

pub async fn delete_image(
    State(state): State<LeafState>,
    Session(user): Session,
    Path(collection_id): Path<String>,
) -> WebResult {
    let mut collection = owned_collection(&state, &user, &collection_id).await?;
    let Some(url) = collection.image_url.take() else {
        return Ok(back_to(&collection_id));
    };
    if let Err(e) = state.images.delete(&url).await {
        warn!(error = %e, %url, "collection image delete failed");
        return Ok(back_to(&collection_id));
    }
    state.db.collections.update(collection).await?;
    Ok(back_to(&collection_id))
}

use axum::Form;
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Redirect};
use tracing::{info, warn};

use crate::error::LeafError;
use crate::handlers::views::Page;
use crate::handlers::{WebResult, bad_request, read_image};
use crate::middleware::auth::Session;
use crate::router::LeafState;
use crate::types::{Credential, Plant, User};
use crate::validation::PlantForm;

/// Load a plant the session user may see (owner or admin).
pub(crate) async fn owned_plant(
    state: &LeafState,
    user: &User,
    plant_id: &str,
) -> Result<Plant, LeafError> {
    let plant = state
        .db
        .plants
        .get_by_id(plant_id)
        .await?
        .ok_or(LeafError::NotFound("no plant with this id"))?;
    if !Credential::from(user).may_access(&plant.user_id) {
        return Err(LeafError::Forbidden("not your plant"));
    }
    Ok(plant)
}

pub async fn index(
    State(state): State<LeafState>,
    Session(user): Session,
    Path(plant_id): Path<String>,
) -> WebResult {
    let plant = owned_plant(&state, &user, &plant_id).await?;
    let page = Page::new("Leaf Library - Plant Details", Some(&user))
        .with("form", &PlantForm::from(&plant))
        .with("plant", &plant);
    Ok(state.views.render("plant.html", &page)?.into_response())
}

pub async fn delete(
    State(state): State<LeafState>,
    Session(user): Session,
    Path(plant_id): Path<String>,
) -> WebResult {
    let plant = owned_plant(&state, &user, &plant_id).await?;
    if let Some(plant) = state.db.plants.delete_by_id(&plant.id).await? {
        for url in &plant.image_urls {
            if let Err(e) = state.images.delete(url).await {
                warn!(error = %e, %url, "could not delete plant image");
            }
        }
        info!(plant_id = %plant.id, "plant deleted");
    }
    Ok(Redirect::to("/garden").into_response())
}

pub async fn update(
    State(state): State<LeafState>,
    Session(user): Session,
    Path(plant_id): Path<String>,
    Form(form): Form<PlantForm>,
) -> WebResult {
    let mut plant = owned_plant(&state, &user, &plant_id).await?;
    match form.parse() {
        Ok(changes) => plant.apply(changes),
        Err(errors) => {
            let page = Page::new("Leaf Library - Update plant error", Some(&user))
                .with("form", &form)
                .with("plant", &plant)
                .with_errors(&errors);
            return Ok(bad_request(state.views.render("plant.html", &page)?));
        }
    }
    state
        .db
        .plants
        .update(plant)
        .await?
        .ok_or(LeafError::NotFound("no plant with this id"))?;
    Ok(Redirect::to(&format!("/plant/{plant_id}")).into_response())
}

pub async fn upload_image(
    State(state): State<LeafState>,
    Session(user): Session,
    Path(plant_id): Path<String>,
    multipart: Multipart,
) -> WebResult {
    let mut plant = owned_plant(&state, &user, &plant_id).await?;
    let back = Redirect::to(&format!("/plant/{plant_id}")).into_response();
    let Some((bytes, filename)) = read_image(multipart).await? else {
        return Ok(back);
    };
    match state.images.upload(bytes, &filename).await {
        Ok(url) => {
            plant.image_urls.push(url);
            state.db.plants.update(plant).await?;
        }
        Err(e) => warn!(error = %e, %plant_id, "plant image upload failed"),
    }
    Ok(back)
}

pub async fn delete_image(
    State(state): State<LeafState>,
    Session(user): Session,
    Path((plant_id, url)): Path<(String, String)>,
) -> WebResult {
    let mut plant = owned_plant(&state, &user, &plant_id).await?;
    let back = Redirect::to(&format!("/plant/{plant_id}")).into_response();
    if !plant.image_urls.contains(&url) {
        return Ok(back);
    }
    if let Err(e) = state.images.delete(&url).await {
        warn!(error = %e, %url, "plant image delete failed");
        return Ok(back);
    }
    plant.image_urls.retain(|u| u != &url);
    state.db.plants.update(plant).await?;
    Ok(back)
}

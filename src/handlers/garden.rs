use axum::Form;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect};
use tracing::info;

use crate::error::LeafError;
use crate::handlers::views::Page;
use crate::handlers::{WebResult, bad_request};
use crate::middleware::auth::Session;
use crate::router::LeafState;
use crate::validation::PlantForm;

pub async fn index(State(state): State<LeafState>, Session(user): Session) -> WebResult {
    let plants = state.db.plants.get_all_for_user(&user.id).await?;
    let page = Page::new("Leaf Library - Your garden", Some(&user))
        .with("plants", &plants)
        .with("form", &PlantForm::default());
    Ok(state.views.render("garden.html", &page)?.into_response())
}

pub async fn add_plant(
    State(state): State<LeafState>,
    Session(user): Session,
    Form(form): Form<PlantForm>,
) -> WebResult {
    let new_plant = match form.parse() {
        Ok(new_plant) => new_plant,
        Err(errors) => {
            let plants = state.db.plants.get_all_for_user(&user.id).await?;
            let page = Page::new("Leaf Library - Your garden error", Some(&user))
                .with("plants", &plants)
                .with("form", &form)
                .with_errors(&errors);
            return Ok(bad_request(state.views.render("garden.html", &page)?));
        }
    };

    let plant = state
        .db
        .plants
        .create_for_user(&user.id, new_plant)
        .await?
        .ok_or(LeafError::NotFound("no user with this id"))?;
    info!(plant_id = %plant.id, user_id = %user.id, "plant added");
    Ok(Redirect::to("/garden").into_response())
}

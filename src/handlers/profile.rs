use axum::Form;
use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Redirect, Response};
use tracing::{info, warn};

use crate::error::LeafError;
use crate::handlers::views::Page;
use crate::handlers::{WebResult, bad_request, read_image};
use crate::middleware::auth::Session;
use crate::router::LeafState;
use crate::validation::{FieldError, ProfileForm, Validate};

fn back() -> Response {
    Redirect::to("/profile").into_response()
}

pub async fn index(State(state): State<LeafState>, Session(user): Session) -> WebResult {
    let page = Page::new("Leaf Library - Your profile", Some(&user))
        .with("form", &ProfileForm::from(&user))
        .with("user", &user);
    Ok(state.views.render("profile.html", &page)?.into_response())
}

pub async fn update(
    State(state): State<LeafState>,
    Session(mut user): Session,
    Form(form): Form<ProfileForm>,
) -> WebResult {
    let mut errors = form.validate();
    if errors.is_empty()
        && let Some(other) = state.db.users.get_by_email(form.email.trim()).await?
        && other.id != user.id
    {
        errors.push(FieldError::new("email", "\"email\" is already registered"));
    }
    if !errors.is_empty() {
        let form = ProfileForm {
            password: String::new(),
            ..form
        };
        let page = Page::new("Leaf Library - Update profile error", Some(&user))
            .with("form", &form)
            .with("user", &user)
            .with_errors(&errors);
        return Ok(bad_request(state.views.render("profile.html", &page)?));
    }

    form.apply_to(&mut user);
    let user = state
        .db
        .users
        .update(user)
        .await?
        .ok_or(LeafError::NotFound("no user with this id"))?;
    info!(user_id = %user.id, "profile updated");
    Ok(back())
}

pub async fn upload_image(
    State(state): State<LeafState>,
    Session(mut user): Session,
    multipart: Multipart,
) -> WebResult {
    let Some((bytes, filename)) = read_image(multipart).await? else {
        return Ok(back());
    };
    let url = match state.images.upload(bytes, &filename).await {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, user_id = %user.id, "profile image upload failed");
            return Ok(back());
        }
    };
    if let Some(old) = user.image_url.replace(url)
        && let Err(e) = state.images.delete(&old).await
    {
        warn!(error = %e, url = %old, "could not delete previous profile image");
    }
    state.db.users.update(user).await?;
    Ok(back())
}

pub async fn delete_image(State(state): State<LeafState>, Session(mut user): Session) -> WebResult {
    let Some(url) = user.image_url.take() else {
        return Ok(back());
    };
    if let Err(e) = state.images.delete(&url).await {
        warn!(error = %e, %url, "profile image delete failed");
        return Ok(back());
    }
    state.db.users.update(user).await?;
    Ok(back())
}

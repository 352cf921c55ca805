use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect};
use tracing::info;

use crate::handlers::WebResult;
use crate::handlers::views::Page;
use crate::middleware::auth::AdminSession;
use crate::router::LeafState;

pub async fn index(State(state): State<LeafState>, AdminSession(admin): AdminSession) -> WebResult {
    let users = state.db.users.get_all_non_admin().await?;
    let page = Page::new("Leaf Library - Admin Page", Some(&admin)).with("users", &users);
    Ok(state.views.render("admin.html", &page)?.into_response())
}

pub async fn delete_user(
    State(state): State<LeafState>,
    AdminSession(admin): AdminSession,
    Path(user_id): Path<String>,
) -> WebResult {
    if let Some(user) = state.db.users.delete_by_id(&user_id).await? {
        info!(user_id = %user.id, admin_id = %admin.id, "user deleted by admin");
    }
    Ok(Redirect::to("/admin").into_response())
}

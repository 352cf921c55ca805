use axum::Form;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect};
use axum_extra::extract::cookie::PrivateCookieJar;
use tracing::{info, warn};

use crate::handlers::views::Page;
use crate::handlers::{WebResult, bad_request};
use crate::middleware::auth::{Session, clear_session, password_matches, session_cookie};
use crate::router::LeafState;
use crate::types::{NewUser, UserCredentials};
use crate::validation::{FieldError, Validate};

pub async fn index(State(state): State<LeafState>, session: Option<Session>) -> WebResult {
    let page = Page::new("Leaf Library", session.as_ref().map(|s| &s.0));
    Ok(state.views.render("index.html", &page)?.into_response())
}

pub async fn signup_form(State(state): State<LeafState>) -> WebResult {
    let page = Page::new("Leaf Library - Sign up", None).with("form", &NewUser::default());
    Ok(state.views.render("signup.html", &page)?.into_response())
}

pub async fn signup(State(state): State<LeafState>, Form(new_user): Form<NewUser>) -> WebResult {
    let mut errors = new_user.validate();
    if errors.is_empty() && state.db.users.get_by_email(&new_user.email).await?.is_some() {
        errors.push(FieldError::new("email", "\"email\" is already registered"));
    }
    if !errors.is_empty() {
        let form = NewUser {
            password: String::new(),
            ..new_user
        };
        let page = Page::new("Leaf Library - Sign up error", None)
            .with("form", &form)
            .with_errors(&errors);
        return Ok(bad_request(state.views.render("signup.html", &page)?));
    }

    let user = state.db.users.create(new_user).await?;
    info!(user_id = %user.id, "user signed up");
    Ok(Redirect::to("/").into_response())
}

pub async fn login_form(State(state): State<LeafState>) -> WebResult {
    let page = Page::new("Leaf Library - Login", None).with("form", &UserCredentials::default());
    Ok(state.views.render("login.html", &page)?.into_response())
}

pub async fn login(
    State(state): State<LeafState>,
    jar: PrivateCookieJar,
    Form(credentials): Form<UserCredentials>,
) -> WebResult {
    if let Err(errors) = credentials.check() {
        let form = UserCredentials {
            password: String::new(),
            ..credentials
        };
        let page = Page::new("Login error", None)
            .with("form", &form)
            .with_errors(&errors);
        return Ok(bad_request(state.views.render("login.html", &page)?));
    }

    let user = state.db.users.get_by_email(&credentials.email).await?;
    let Some(user) = user.filter(|u| password_matches(&u.password, &credentials.password)) else {
        warn!(email = %credentials.email, "failed login");
        return Ok(Redirect::to("/").into_response());
    };

    info!(user_id = %user.id, "user logged in");
    let jar = jar.add(session_cookie(&state.auth, user.id));
    Ok((jar, Redirect::to("/garden")).into_response())
}

pub async fn logout(State(state): State<LeafState>, jar: PrivateCookieJar) -> impl IntoResponse {
    (clear_session(jar, &state.auth), Redirect::to("/"))
}

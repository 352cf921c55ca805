mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{app, body_json, leonard, oak, sheldon, trees, TestApp};
use serde_json::json;

fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

fn bare_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("failed to build request")
}

/// Sign Sheldon up through the API and return (user id, token).
async fn sign_in(app: &TestApp) -> (String, String) {
    let resp = app
        .send(json_request(
            "POST",
            "/api/user/create",
            None,
            serde_json::to_value(sheldon()).unwrap(),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .send(json_request(
            "POST",
            "/api/user/authenticate",
            None,
            json!({"email": "sheldon@caltech.edu", "password": "Bazinga!"}),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["name"], "Sheldon Cooper");
    (
        body["_id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = app().await;
    let resp = app.send(bare_request("GET", "/api/user/all", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .send(bare_request("GET", "/api/plant/all", Some("not-a-jwt")))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authenticate_rejects_bad_password() {
    let app = app().await;
    sign_in(&app).await;
    let resp = app
        .send(json_request(
            "POST",
            "/api/user/authenticate",
            None,
            json!({"email": "sheldon@caltech.edu", "password": "wrong"}),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_user_validates_payload() {
    let app = app().await;
    let resp = app
        .send(json_request(
            "POST",
            "/api/user/create",
            None,
            json!({"email": "not-an-email", "password": ""}),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    let fields: Vec<_> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["email", "password", "firstName", "secondName"]);
}

#[tokio::test]
async fn user_lookup_and_delete() {
    let app = app().await;
    let (user_id, token) = sign_in(&app).await;

    let resp = app
        .send(bare_request("GET", &format!("/api/user/byId/{user_id}"), Some(&token)))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["email"], "sheldon@caltech.edu");

    let resp = app
        .send(bare_request("GET", "/api/user/byEmail/sheldon@caltech.edu", Some(&token)))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .send(bare_request("GET", "/api/user/byId/missing", Some(&token)))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .send(bare_request("DELETE", "/api/user/delete/missing", Some(&token)))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .send(bare_request("DELETE", "/api/user/delete/all", Some(&token)))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(app.db.users.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn user_update_refuses_an_email_already_taken() {
    let app = app().await;
    let (_, token) = sign_in(&app).await;
    let other = app.db.users.create(leonard()).await.unwrap();

    let mut payload = serde_json::to_value(&other).unwrap();
    payload["email"] = json!("sheldon@caltech.edu");
    let resp = app
        .send(json_request("PUT", "/api/user/update", Some(&token), payload))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["details"][0]["field"], "email");

    let users = app.db.users.get_all().await.unwrap();
    let taken = users.iter().filter(|u| u.email == "sheldon@caltech.edu").count();
    assert_eq!(taken, 1);

    // keeping one's own email is fine
    let mut payload = serde_json::to_value(&other).unwrap();
    payload["aboutMe"] = json!("Experimental physicist");
    let resp = app
        .send(json_request("PUT", "/api/user/update", Some(&token), payload))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["aboutMe"], "Experimental physicist");
}

#[tokio::test]
async fn plant_lifecycle() {
    let app = app().await;
    let (user_id, token) = sign_in(&app).await;

    let resp = app
        .send(json_request(
            "POST",
            "/api/plant/create/unknown-user",
            Some(&token),
            serde_json::to_value(oak()).unwrap(),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .send(json_request(
            "POST",
            &format!("/api/plant/create/{user_id}"),
            Some(&token),
            serde_json::to_value(oak()).unwrap(),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let plant = body_json(resp).await;
    assert_eq!(plant["userId"], user_id.as_str());
    assert_eq!(plant["type"], "Tree");
    let plant_id = plant["_id"].as_str().unwrap().to_string();

    let mut changed = plant.clone();
    changed["commonName"] = json!("English oak");
    changed["latitude"] = json!(95.0);
    let resp = app
        .send(json_request("PUT", "/api/plant/update", Some(&token), changed.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    changed["latitude"] = json!(52.0);
    let resp = app
        .send(json_request("PUT", "/api/plant/update", Some(&token), changed))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["commonName"], "English oak");
    assert_eq!(updated["date"], plant["date"]);

    let resp = app
        .send(bare_request("GET", &format!("/api/plant/forUser/{user_id}"), Some(&token)))
        .await;
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);

    let resp = app
        .send(bare_request("DELETE", &format!("/api/plant/delete/{plant_id}"), Some(&token)))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = app
        .send(bare_request("GET", &format!("/api/plant/byId/{plant_id}"), Some(&token)))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn collection_membership_over_the_api() {
    let app = app().await;
    let (user_id, token) = sign_in(&app).await;
    let plant = app.db.plants.create_for_user(&user_id, oak()).await.unwrap().unwrap();

    let resp = app
        .send(json_request(
            "POST",
            &format!("/api/collection/create/{user_id}"),
            Some(&token),
            serde_json::to_value(trees()).unwrap(),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let collection = body_json(resp).await;
    let collection_id = collection["_id"].as_str().unwrap().to_string();
    assert_eq!(collection["plantIds"], json!([]));

    let resp = app
        .send(bare_request(
            "POST",
            &format!("/api/collection/{collection_id}/addPlant/no-such-plant"),
            Some(&token),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .send(bare_request(
            "POST",
            &format!("/api/collection/{collection_id}/addPlant/{}", plant.id),
            Some(&token),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await["plantIds"], json!([plant.id.clone()]));

    let resp = app
        .send(bare_request(
            "GET",
            &format!("/api/collection/{collection_id}/plants"),
            Some(&token),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await[0]["commonName"], "Oak");

    let resp = app
        .send(json_request(
            "PUT",
            "/api/collection/update",
            Some(&token),
            json!({"_id": collection_id, "name": "Old trees", "description": "ancient"}),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["name"], "Old trees");
    assert_eq!(updated["plantIds"], json!([plant.id.clone()]));

    let resp = app
        .send(bare_request(
            "DELETE",
            &format!("/api/collection/{collection_id}/deletePlant/{}", plant.id),
            Some(&token),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .send(bare_request(
            "GET",
            "/api/collection/no-such-collection/plants",
            Some(&token),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_user_over_the_api_cascades() {
    let app = app().await;
    let (user_id, token) = sign_in(&app).await;
    let other = app.db.users.create(common::leonard()).await.unwrap();
    app.db.plants.create_for_user(&other.id, oak()).await.unwrap().unwrap();
    app.db.collections.create_for_user(&other.id, trees()).await.unwrap().unwrap();

    let resp = app
        .send(bare_request("DELETE", &format!("/api/user/delete/{}", other.id), Some(&token)))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(app.db.plants.get_all().await.unwrap().is_empty());
    assert!(app.db.collections.get_all().await.unwrap().is_empty());
    assert!(app.db.users.get_by_id(&user_id).await.unwrap().is_some());
}

#[tokio::test]
async fn token_of_deleted_user_is_refused() {
    let app = app().await;
    let (user_id, token) = sign_in(&app).await;
    app.db.users.delete_by_id(&user_id).await.unwrap();

    let resp = app.send(bare_request("GET", "/api/plant/all", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

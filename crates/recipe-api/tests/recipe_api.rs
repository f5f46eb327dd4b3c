use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::TestServer;
use recipe_api::{create_router, AppState, INGREDIENTS_PATH, TAGS_PATH};
use recipe_core::{ConfigManager, Ingredient, NewUser, OwnedItem, OwnedResource, Settings, Tag, User};
use serde_json::json;
use std::sync::Arc;

struct Fixture {
    server: TestServer,
    state: AppState,
    user: User,
    auth: HeaderValue,
}

async fn fixture() -> Fixture {
    let config = Arc::new(ConfigManager::from_settings(Settings::for_testing()));
    let state = AppState::new(config).await.expect("app state");
    let server = TestServer::new(create_router(state.clone())).unwrap();

    let user = state
        .db
        .create_user(NewUser::new("test@example.com", "amir@123"))
        .await
        .unwrap();
    let token = state.db.get_or_create_token(user.id).await.unwrap();
    let auth = HeaderValue::from_str(&format!("Token {}", token.key)).unwrap();

    Fixture {
        server,
        state,
        user,
        auth,
    }
}

async fn other_user(state: &AppState) -> User {
    state
        .db
        .create_user(NewUser::new("test2@example.com", "test@123"))
        .await
        .unwrap()
}

#[tokio::test]
async fn tags_require_authentication() {
    let f = fixture().await;

    let resp = f.server.get(TAGS_PATH).await;
    assert_eq!(resp.status_code(), StatusCode::UNAUTHORIZED);

    let resp = f.server.post(TAGS_PATH).json(&json!({"name": "x"})).await;
    assert_eq!(resp.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ingredients_require_authentication() {
    let f = fixture().await;

    let resp = f.server.get(INGREDIENTS_PATH).await;
    assert_eq!(resp.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_tags_success() {
    let f = fixture().await;
    f.state.db.create_owned::<Tag>(f.user.id, "test1").await.unwrap();
    f.state.db.create_owned::<Tag>(f.user.id, "test2").await.unwrap();

    let resp = f.server.get(TAGS_PATH).add_header(AUTHORIZATION, f.auth.clone()).await;
    assert_eq!(resp.status_code(), StatusCode::OK);

    let expected: Vec<OwnedItem> = f
        .state
        .db
        .list_owned::<Tag>(f.user.id)
        .await
        .unwrap()
        .iter()
        .map(Tag::item)
        .collect();
    let body: Vec<OwnedItem> = resp.json();
    assert_eq!(body, expected);
    assert_eq!(
        body.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        ["test2", "test1"]
    );
}

#[tokio::test]
async fn tags_limited_to_user() {
    let f = fixture().await;
    let user2 = other_user(&f.state).await;
    f.state.db.create_owned::<Tag>(user2.id, "tag1").await.unwrap();
    let tag2: Tag = f.state.db.create_owned(f.user.id, "tag2").await.unwrap();

    let resp = f.server.get(TAGS_PATH).add_header(AUTHORIZATION, f.auth.clone()).await;
    assert_eq!(resp.status_code(), StatusCode::OK);

    let body: Vec<OwnedItem> = resp.json();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0].name, tag2.name);
    assert_eq!(body[0].id, tag2.id);
}

#[tokio::test]
async fn create_tag_successful() {
    let f = fixture().await;

    let resp = f
        .server
        .post(TAGS_PATH)
        .add_header(AUTHORIZATION, f.auth.clone())
        .json(&json!({"name": "test tag"}))
        .await;

    assert_eq!(resp.status_code(), StatusCode::CREATED);
    let body: OwnedItem = resp.json();
    assert_eq!(body.name, "test tag");
    assert!(f.state.db.exists_owned::<Tag>(f.user.id, "test tag").await.unwrap());
}

#[tokio::test]
async fn create_tag_invalid_name() {
    let f = fixture().await;

    let resp = f
        .server
        .post(TAGS_PATH)
        .add_header(AUTHORIZATION, f.auth.clone())
        .json(&json!({"name": ""}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

    let resp = f
        .server
        .post(TAGS_PATH)
        .add_header(AUTHORIZATION, f.auth.clone())
        .json(&json!({}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

    assert_eq!(f.state.db.count_owned::<Tag>(f.user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn list_ingredients_ordered_and_scoped() {
    let f = fixture().await;
    let user2 = other_user(&f.state).await;
    f.state.db.create_owned::<Ingredient>(f.user.id, "Kale").await.unwrap();
    f.state.db.create_owned::<Ingredient>(f.user.id, "Salt").await.unwrap();
    f.state.db.create_owned::<Ingredient>(user2.id, "Vinegar").await.unwrap();

    let resp = f
        .server
        .get(INGREDIENTS_PATH)
        .add_header(AUTHORIZATION, f.auth.clone())
        .await;
    assert_eq!(resp.status_code(), StatusCode::OK);

    let body: Vec<OwnedItem> = resp.json();
    let names: Vec<_> = body.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["Salt", "Kale"]);
}

#[tokio::test]
async fn create_ingredient_successful() {
    let f = fixture().await;

    let resp = f
        .server
        .post(INGREDIENTS_PATH)
        .add_header(AUTHORIZATION, f.auth.clone())
        .json(&json!({"name": "Cabbage"}))
        .await;

    assert_eq!(resp.status_code(), StatusCode::CREATED);
    assert!(f
        .state
        .db
        .exists_owned::<Ingredient>(f.user.id, "Cabbage")
        .await
        .unwrap());
    // Ingredients and tags live in separate tables.
    assert_eq!(f.state.db.count_owned::<Tag>(f.user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn deleted_user_token_stops_working() {
    let f = fixture().await;
    f.state.db.create_owned::<Tag>(f.user.id, "gone").await.unwrap();
    f.state.db.delete_user(f.user.id).await.unwrap();

    let resp = f.server.get(TAGS_PATH).add_header(AUTHORIZATION, f.auth.clone()).await;
    assert_eq!(resp.status_code(), StatusCode::UNAUTHORIZED);
}

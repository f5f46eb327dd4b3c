use crate::{
    handlers::{self, recipe, user},
    AppState,
};
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use recipe_core::{Ingredient, Tag};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

pub const CREATE_USER_PATH: &str = "/api/user/create/";
pub const TOKEN_PATH: &str = "/api/user/token/";
pub const ME_PATH: &str = "/api/user/me/";
pub const TAGS_PATH: &str = "/api/recipe/tags/";
pub const INGREDIENTS_PATH: &str = "/api/recipe/ingredients/";

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings().security.allowed_origins);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))

        // Users
        .route(CREATE_USER_PATH, post(user::create_user))
        .route(TOKEN_PATH, post(user::create_token))
        .route(
            ME_PATH,
            get(user::get_me)
                .post(user::post_me)
                .patch(user::patch_me)
                .put(user::put_me),
        )

        // Owned resources
        .route(
            TAGS_PATH,
            get(recipe::list_owned::<Tag>).post(recipe::create_owned::<Tag>),
        )
        .route(
            INGREDIENTS_PATH,
            get(recipe::list_owned::<Ingredient>).post(recipe::create_owned::<Ingredient>),
        )

        // Add state
        .with_state(state)

        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}

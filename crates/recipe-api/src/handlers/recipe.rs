//! Tag and ingredient endpoints. Both resources share the same shape, so the
//! handlers are generic over [`OwnedResource`] and instantiated per route.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use recipe_core::{validation::validate_owned_name, OwnedItem, OwnedResource};
use serde::Deserialize;

use crate::{auth::AuthUser, ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct CreateOwnedRequest {
    pub name: Option<String>,
}

/// Lists the requester's rows, name descending.
pub async fn list_owned<T: OwnedResource>(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<OwnedItem>>> {
    let rows = state.db.list_owned::<T>(auth.id()).await?;
    Ok(Json(rows.iter().map(T::item).collect()))
}

pub async fn create_owned<T: OwnedResource>(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<CreateOwnedRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OwnedItem>)> {
    let Json(payload) = payload?;
    let name = validate_owned_name(payload.name.as_deref())?;

    let row = state.db.create_owned::<T>(auth.id(), &name).await?;
    Ok((StatusCode::CREATED, Json(row.item())))
}

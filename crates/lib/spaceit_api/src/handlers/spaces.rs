//! Space handlers.
//!
//! Access checks run as route layers before these; handlers only see
//! callers that hold the required level.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::AppState;
use crate::context::AuthenticatedUser;
use crate::error::AppResult;
use crate::models::{
    AddMemberRequest, CreateSpaceRequest, ListSpacesQuery, PermissionResponse,
    RenameSpaceRequest, SpaceListResponse, SpaceResponse,
};
use crate::services::spaces as space_service;

/// `POST /spaces`: the caller becomes owner with every permission.
pub async fn create_space_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<CreateSpaceRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<SpaceResponse>)> {
    let Json(body) = payload?;
    let created = space_service::create(state.store.as_ref(), user.id, &body.name).await?;
    Ok((StatusCode::CREATED, Json(created.space.into())))
}

/// `GET /spaces`: spaces the caller can read.
pub async fn list_spaces_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    query: Result<Query<ListSpacesQuery>, QueryRejection>,
) -> AppResult<Json<SpaceListResponse>> {
    let Query(query) = query?;
    let (limit, offset) = space_service::page(query.limit, query.offset)?;
    let spaces = space_service::list_readable(state.store.as_ref(), user.id, limit, offset).await?;
    Ok(Json(SpaceListResponse {
        items: spaces.into_iter().map(SpaceResponse::from).collect(),
        limit,
        offset,
    }))
}

/// `GET /spaces/{space_id}`
pub async fn get_space_handler(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
) -> AppResult<Json<SpaceResponse>> {
    let space = space_service::get(state.store.as_ref(), space_id).await?;
    Ok(Json(space.into()))
}

/// `PATCH /spaces/{space_id}`: rename.
pub async fn rename_space_handler(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
    payload: Result<Json<RenameSpaceRequest>, JsonRejection>,
) -> AppResult<Json<SpaceResponse>> {
    let Json(body) = payload?;
    let space = space_service::rename(state.store.as_ref(), space_id, &body.name).await?;
    Ok(Json(space.into()))
}

/// `DELETE /spaces/{space_id}`
pub async fn delete_space_handler(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    space_service::delete(state.store.as_ref(), space_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /spaces/{space_id}/members`: grant or replace a member's permissions.
pub async fn add_member_handler(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
    payload: Result<Json<AddMemberRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<PermissionResponse>)> {
    let Json(body) = payload?;
    let record = space_service::add_member(
        state.store.as_ref(),
        space_id,
        body.user_id,
        &body.permissions,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

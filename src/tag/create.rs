//! Tag creation endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::UserID,
    db::lock_connection,
    tag::{Tag, TagName, create_tag},
};

/// The state needed for creating and listing tags.
#[derive(Debug, Clone)]
pub struct TagState {
    /// The database connection for managing tags.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TagState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a tag.
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    /// Must not be blank.
    pub name: TagName,
}

/// Handle tag creation requests.
pub async fn create_tag_endpoint(
    State(state): State<TagState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Tag>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let tag = create_tag(request.name, user_id, &connection).inspect_err(|error| {
        tracing::error!("An unexpected error occurred while creating a tag: {error}")
    })?;

    Ok((StatusCode::CREATED, Json(tag)))
}

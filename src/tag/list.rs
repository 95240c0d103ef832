//! Tags listing endpoint.

use axum::{Extension, Json, extract::State};

use crate::{
    Error,
    auth::UserID,
    db::lock_connection,
    tag::{Tag, TagState, get_all_tags},
};

/// List the acting user's tags alphabetically.
pub async fn list_tags_endpoint(
    State(state): State<TagState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Tag>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let tags = get_all_tags(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve tags: {error}"))?;

    Ok(Json(tags))
}

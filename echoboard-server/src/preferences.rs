use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json,
};
use echoboard_collab::PreferencePatch;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{PreferenceSchema, ValidatedJson},
    serialized::{SoundPreference, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/boards/{slug}/preferences",
    tag = "preferences",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<SoundPreference>)
    )
)]
async fn list_preferences(
    session: Session,
    State(context): State<ServerContext>,
    Path(slug): Path<String>,
) -> ServerResult<Json<Vec<SoundPreference>>> {
    let user = session.user();
    let board = context.collab.boards.board_by_slug(&slug).await?;

    let preferences = context
        .collab
        .preferences
        .for_board(&user, board.id)
        .await?;

    Ok(Json(preferences.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/sounds/{id}/preference",
    tag = "preferences",
    request_body = PreferenceSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = SoundPreference)
    )
)]
async fn update_preference(
    session: Session,
    State(context): State<ServerContext>,
    Path(sound_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<PreferenceSchema>,
) -> ServerResult<Json<SoundPreference>> {
    let user = session.user();

    let preference = context
        .collab
        .preferences
        .update(
            &user,
            sound_id,
            PreferencePatch {
                volume: body.volume,
                favorite: body.favorite,
            },
        )
        .await?;

    Ok(Json(preference.to_serialized()))
}

pub fn board_router() -> Router {
    Router::new().route("/:slug/preferences", get(list_preferences))
}

pub fn sound_router() -> Router {
    Router::new().route("/:id/preference", put(update_preference))
}

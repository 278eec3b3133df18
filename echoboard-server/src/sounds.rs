use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::Response,
    routing::{delete, get, patch, post},
    Json,
};
use echoboard_collab::NewSoundUpload;
use validator::Validate;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{UpdateSoundSchema, UploadSoundParams, ValidatedJson},
    serialized::{Sound, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/boards/{slug}/sounds",
    tag = "sounds",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Sound>)
    )
)]
async fn list_sounds(
    session: Session,
    State(context): State<ServerContext>,
    Path(slug): Path<String>,
) -> ServerResult<Json<Vec<Sound>>> {
    let user = session.user();
    let board = context.collab.boards.board_by_slug(&slug).await?;

    let sounds = context.collab.sounds.sounds_on_board(board.id, &user).await?;

    Ok(Json(sounds.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/boards/{slug}/sounds",
    tag = "sounds",
    params(UploadSoundParams),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Sound)
    )
)]
async fn upload_sound(
    session: Session,
    State(context): State<ServerContext>,
    Path(slug): Path<String>,
    Query(params): Query<UploadSoundParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Json<Sound>> {
    params
        .validate()
        .map_err(|_| ServerError::InvalidInput("Upload metadata is invalid".to_string()))?;

    let trim = match (params.trim_start, params.trim_end) {
        (Some(start), Some(end)) => Some((start, end)),
        (None, None) => None,
        _ => {
            return Err(ServerError::InvalidInput(
                "Both trimStart and trimEnd must be given".to_string(),
            ))
        }
    };

    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|x| x.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let user = session.user();
    let board = context.collab.boards.board_by_slug(&slug).await?;

    let sound = context
        .collab
        .sounds
        .upload(
            board.id,
            &user,
            NewSoundUpload {
                name: params.name,
                bytes: body.to_vec(),
                filename: params.filename,
                mime_type,
                duration: params.duration,
                emoji: params.emoji,
                image: None,
                global_volume: params.global_volume.unwrap_or(1.0),
                trim,
            },
        )
        .await?;

    Ok(Json(sound.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/sounds/{id}",
    tag = "sounds",
    request_body = UpdateSoundSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Sound)
    )
)]
async fn update_sound(
    session: Session,
    State(context): State<ServerContext>,
    Path(sound_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateSoundSchema>,
) -> ServerResult<Json<Sound>> {
    let user = session.user();

    let sound = context
        .collab
        .sounds
        .update(sound_id, &user, body.name, body.emoji, body.global_volume)
        .await?;

    Ok(Json(sound.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/sounds/{id}",
    tag = "sounds",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The sound and its stored audio were deleted")
    )
)]
async fn delete_sound(
    session: Session,
    State(context): State<ServerContext>,
    Path(sound_id): Path<i32>,
) -> ServerResult<()> {
    let user = session.user();

    context.collab.sounds.delete(sound_id, &user).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/sounds/{id}/audio",
    tag = "sounds",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (
            status = 200,
            content_type = "application/octet-stream",
            description = "The sound's audio bytes"
        )
    )
)]
async fn sound_audio(
    session: Session,
    State(context): State<ServerContext>,
    Path(sound_id): Path<i32>,
) -> ServerResult<Response<Body>> {
    let user = session.user();

    let sound = context.collab.sounds.sound_for_member(sound_id, &user).await?;
    let bytes = context.collab.sounds.audio_bytes(&sound).await?;

    let response = Response::builder()
        .status(200)
        .header("Content-Type", sound.mime_type.as_str())
        .header("Cache-Control", "no-store")
        .header(
            "Content-Disposition",
            format!("inline; filename=\"{}\"", sound.filename),
        )
        .body(Body::from(bytes))
        .expect("response builds from valid parts");

    Ok(response)
}

#[utoipa::path(
    get,
    path = "/v1/sounds/{id}/image",
    tag = "sounds",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (
            status = 200,
            content_type = "application/octet-stream",
            description = "The sound's image bytes, if it has an image"
        )
    )
)]
async fn sound_image(
    session: Session,
    State(context): State<ServerContext>,
    Path(sound_id): Path<i32>,
) -> ServerResult<Response<Body>> {
    let user = session.user();

    let sound = context.collab.sounds.sound_for_member(sound_id, &user).await?;
    let bytes = context.collab.sounds.image_bytes(&sound).await?;

    let response = Response::builder()
        .status(200)
        .header("Cache-Control", "no-store")
        .body(Body::from(bytes))
        .expect("response builds from valid parts");

    Ok(response)
}

pub fn board_router() -> Router {
    Router::new()
        .route("/:slug/sounds", get(list_sounds))
        .route("/:slug/sounds", post(upload_sound))
}

pub fn router() -> Router {
    Router::new()
        .route("/:id", patch(update_sound))
        .route("/:id", delete(delete_sound))
        .route("/:id/audio", get(sound_audio))
        .route("/:id/image", get(sound_image))
}

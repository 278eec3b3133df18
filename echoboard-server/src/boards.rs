use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json,
};
use echoboard_collab::{BoardData, PrimaryKey, SettingsPatch};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{NewBoardSchema, RequestAccessSchema, UpdateSettingsSchema, ValidatedJson},
    serialized::{Board, InvitePreview},
    Router,
};

fn is_admin_of(board: &BoardData, user_id: PrimaryKey) -> bool {
    board
        .members
        .iter()
        .any(|m| m.user.id == user_id && m.admin)
}

fn is_member_of(board: &BoardData, user_id: PrimaryKey) -> bool {
    board.members.iter().any(|m| m.user.id == user_id)
}

#[utoipa::path(
    post,
    path = "/v1/boards",
    tag = "boards",
    request_body = NewBoardSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Board)
    )
)]
async fn create_board(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewBoardSchema>,
) -> ServerResult<Json<Board>> {
    let user = session.user();

    let settings = SettingsPatch {
        max_sounds: body.max_sounds,
        max_file_size_bytes: body.max_file_size_bytes,
        allow_uploads: body.allow_uploads,
    };

    let board = context
        .collab
        .boards
        .create_board(&body.name, &user, settings)
        .await?;

    let invite_link = context.collab.boards.invite_link(&board);

    Ok(Json(Board::for_viewer(&board, true, invite_link)))
}

#[utoipa::path(
    get,
    path = "/v1/boards",
    tag = "boards",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Board>)
    )
)]
async fn list_boards(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Board>>> {
    let user = session.user();
    let boards = context.collab.boards.boards_for_user(user.id).await?;

    let serialized = boards
        .iter()
        .map(|board| {
            let invite_link = context.collab.boards.invite_link(board);
            Board::for_viewer(board, is_admin_of(board, user.id), invite_link)
        })
        .collect();

    Ok(Json(serialized))
}

#[utoipa::path(
    get,
    path = "/v1/boards/{slug}",
    tag = "boards",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Board)
    )
)]
async fn board_by_slug(
    session: Session,
    State(context): State<ServerContext>,
    Path(slug): Path<String>,
) -> ServerResult<Json<Board>> {
    let user = session.user();
    let board = context.collab.boards.board_by_slug(&slug).await?;

    if !is_member_of(&board, user.id) {
        return Err(ServerError::NotAuthorized(
            "You are not a member of this board".to_string(),
        ));
    }

    let invite_link = context.collab.boards.invite_link(&board);

    Ok(Json(Board::for_viewer(
        &board,
        is_admin_of(&board, user.id),
        invite_link,
    )))
}

#[utoipa::path(
    patch,
    path = "/v1/boards/{slug}/settings",
    tag = "boards",
    request_body = UpdateSettingsSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Board)
    )
)]
async fn update_settings(
    session: Session,
    State(context): State<ServerContext>,
    Path(slug): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateSettingsSchema>,
) -> ServerResult<Json<Board>> {
    let user = session.user();
    let board = context.collab.boards.board_by_slug(&slug).await?;

    let patch = SettingsPatch {
        max_sounds: body.max_sounds,
        max_file_size_bytes: body.max_file_size_bytes,
        allow_uploads: body.allow_uploads,
    };

    let board = context
        .collab
        .boards
        .update_settings(board.id, user.id, patch)
        .await?;

    let invite_link = context.collab.boards.invite_link(&board);

    Ok(Json(Board::for_viewer(&board, true, invite_link)))
}

#[utoipa::path(
    post,
    path = "/v1/boards/{slug}/requests/{user_id}/approve",
    tag = "boards",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The request was approved and the user is now a member")
    )
)]
async fn approve_request(
    session: Session,
    State(context): State<ServerContext>,
    Path((slug, target_id)): Path<(String, i32)>,
) -> ServerResult<()> {
    let user = session.user();
    let board = context.collab.boards.board_by_slug(&slug).await?;

    context
        .collab
        .boards
        .approve_member(board.id, user.id, target_id)
        .await?;

    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/boards/{slug}/requests/{user_id}/deny",
    tag = "boards",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The request was denied. The user may request again later")
    )
)]
async fn deny_request(
    session: Session,
    State(context): State<ServerContext>,
    Path((slug, target_id)): Path<(String, i32)>,
) -> ServerResult<()> {
    let user = session.user();
    let board = context.collab.boards.board_by_slug(&slug).await?;

    context
        .collab
        .boards
        .deny_request(board.id, user.id, target_id)
        .await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/invites/{code}",
    tag = "invites",
    responses(
        (status = 200, body = InvitePreview)
    )
)]
async fn invite_preview(
    State(context): State<ServerContext>,
    Path(code): Path<String>,
) -> ServerResult<Json<InvitePreview>> {
    let board = context.collab.boards.board_by_invite_code(&code).await?;

    Ok(Json(InvitePreview::from_board(&board)))
}

#[utoipa::path(
    post,
    path = "/v1/invites/{code}/requests",
    tag = "invites",
    request_body = RequestAccessSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The access request is now pending admin approval")
    )
)]
async fn request_access(
    session: Session,
    State(context): State<ServerContext>,
    Path(code): Path<String>,
    ValidatedJson(body): ValidatedJson<RequestAccessSchema>,
) -> ServerResult<()> {
    let user = session.user();
    let board = context.collab.boards.board_by_invite_code(&code).await?;

    context
        .collab
        .boards
        .request_access(board.id, &user, body.message)
        .await?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_board))
        .route("/", get(list_boards))
        .route("/:slug", get(board_by_slug))
        .route("/:slug/settings", patch(update_settings))
        .route("/:slug/requests/:user_id/approve", post(approve_request))
        .route("/:slug/requests/:user_id/deny", post(deny_request))
}

pub fn invite_router() -> Router {
    Router::new()
        .route("/:code", get(invite_preview))
        .route("/:code/requests", post(request_access))
}

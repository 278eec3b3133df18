use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use echoboard_collab::Collab;
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod auth;
mod boards;
mod context;
mod docs;
mod errors;
mod gateway;
mod preferences;
mod schemas;
mod serialized;
mod sounds;

pub use context::ServerContext;
pub use errors::{ServerError, ServerResult};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9590;

pub type Router = axum::Router<ServerContext>;

/// Starts the echoboard server
pub async fn run_server(collab: Arc<Collab>) {
    let port = env::var("ECHOBOARD_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let context = ServerContext { collab };

    let version_one_router = Router::new()
        .nest("/auth", auth::router())
        .nest(
            "/boards",
            boards::router()
                .merge(sounds::board_router())
                .merge(preferences::board_router()),
        )
        .nest("/invites", boards::invite_router())
        .nest("/sounds", sounds::router().merge(preferences::sound_router()))
        .nest("/gateway", gateway::router());

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", axum::routing::get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on {}", addr);

    axum::serve(listener, root_router.into_make_service())
        .await
        .expect("server runs");
}

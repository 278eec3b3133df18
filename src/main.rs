use std::{env, process::exit, sync::Arc};

use echoboard_collab::{Collab, CollabConfig, PgBlobStore, PgDatabase};
use echoboard_server::run_server;
use log::{error, info};

mod logging;

#[tokio::main]
async fn main() {
    logging::init_logger();

    let database_url = env::var("ECHOBOARD_DATABASE_URL").unwrap_or_else(|_| {
        error!("ECHOBOARD_DATABASE_URL must be set");
        exit(1)
    });

    let config = CollabConfig {
        invite_base_url: env::var("ECHOBOARD_INVITE_BASE_URL")
            .unwrap_or_else(|_| CollabConfig::default().invite_base_url),
    };

    let database = match PgDatabase::new(&database_url).await {
        Ok(database) => database,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            exit(1)
        }
    };

    let blobs = PgBlobStore::new(database.pool());
    let collab = Arc::new(Collab::new(
        Arc::new(database),
        Arc::new(blobs),
        None,
        config,
    ));

    info!("echoboard is starting");

    run_server(collab).await
}

use std::time::Duration;

use actix_web::{
    dev::Server,
    http::KeepAlive,
    middleware::{Compress, Logger},
    web, App, HttpServer,
};
use log::*;
use loyalty_engine::{traits::LedgerDatabase, AuthApi, OrderApi, SqliteDatabase};
use tokio::sync::watch;

use crate::{
    accrual::{start_accrual_worker, AccrualClient},
    auth::TokenIssuer,
    config::ServerConfig,
    errors::ServerError,
    routes::{balance, health, load_order, login, order_list, register, withdraw, withdrawals},
};

const MAX_DB_CONNECTIONS: u32 = 25;

/// Opens the store, spawns the accrual worker and serves HTTP until a shutdown signal arrives.
/// Shutdown order: stop accepting requests and drain handlers (actix does this on signal), stop
/// the worker, then close the store.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let mut db = SqliteDatabase::new_with_url(&config.database_uri, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let (stop_tx, stop_rx) = watch::channel(false);
    let client = AccrualClient::new(&config.accrual_address);
    info!("🔄️ Accrual authority is at {}", client.base_url());
    let worker = start_accrual_worker(db.clone(), client, stop_rx);

    let srv = create_server_instance(&config, db.clone())?;
    let result = srv.await;

    info!("🚀️ HTTP server stopped. Shutting down the accrual worker.");
    let _ = stop_tx.send(true);
    if let Err(e) = worker.await {
        warn!("🚀️ The accrual worker did not shut down cleanly. {e}");
    }
    info!("🚀️ Closing the ledger store.");
    if let Err(e) = db.close().await {
        warn!("🚀️ Error closing the ledger store. {e}");
    }
    result.map_err(ServerError::from)
}

pub fn create_server_instance(config: &ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let check_order_id = config.check_order_id;
    let auth = config.auth.clone();
    let srv = HttpServer::new(move || {
        let order_api = OrderApi::new(db.clone(), check_order_id);
        let auth_api = AuthApi::new(db.clone());
        let signer = TokenIssuer::new(&auth);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %U"))
            .wrap(Compress::default())
            .app_data(web::Data::new(order_api))
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(signer))
            .service(health)
            .service(
                web::scope("/api")
                    .route("/user/register", web::post().to(register::<SqliteDatabase>))
                    .route("/user/login", web::post().to(login::<SqliteDatabase>))
                    .route("/user/orders", web::post().to(load_order::<SqliteDatabase>))
                    .route("/user/orders", web::get().to(order_list::<SqliteDatabase>))
                    .route("/user/balance", web::get().to(balance::<SqliteDatabase>))
                    .route("/user/balance/withdraw", web::post().to(withdraw::<SqliteDatabase>))
                    .route("/user/withdrawals", web::get().to(withdrawals::<SqliteDatabase>)),
            )
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind(config.run_address.as_str())?
    .run();
    Ok(srv)
}

use dotenvy::dotenv;
use env_logger::Env;
use log::{error, info, warn};
use loyalty_server::{config::ServerConfig, server::run_server};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    let config = ServerConfig::from_cli_and_env();
    // RUST_LOG still wins, for ad-hoc debugging.
    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level.as_str())).init();

    if !preflight_check(&config) {
        eprintln!("🚦️ Preflight check failed. Exiting. Check the logs for details.");
        std::process::exit(1);
    }

    info!("🚀️ Starting the loyalty gateway on {}", config.run_address);
    match run_server(config).await {
        Ok(()) => info!("🚀️ Bye!"),
        Err(e) => {
            error!("🚀️ {e}");
            eprintln!("{e}");
            std::process::exit(1);
        },
    }
}

fn preflight_check(config: &ServerConfig) -> bool {
    let mut result = true;
    info!("🚦️ Running preflight checks...");
    if config.database_uri.is_empty() {
        error!("🚦️ DATABASE_URI is not set. Please point it at the ledger database.");
        result = false;
    }
    if config.accrual_address.is_empty() {
        error!("🚦️ ACCRUAL_SYSTEM_ADDRESS is not set. The accrual worker needs the authority's base address.");
        result = false;
    }
    if config.auth.ephemeral {
        warn!(
            "🚦️ LPG_JWT_SECRET is not set. Using an ephemeral signing secret; issued sessions will not survive a \
             restart."
        );
    }
    if result {
        info!("🚦️ Preflight check PASSED.");
    } else {
        error!("🚦️ Preflight check FAILED: Please fix the issues above before starting the server.");
    }
    result
}

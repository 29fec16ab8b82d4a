use std::env;

use clap::{ArgAction, Parser};
use lpg_common::{parse_boolean_flag, Secret};

const DEFAULT_RUN_ADDRESS: &str = "localhost:8181";
const DEFAULT_ACCRUAL_ADDRESS: &str = "localhost:8181";
const DEFAULT_LOG_LEVEL: &str = "info";
const JWT_SECRET_ENV: &str = "LPG_JWT_SECRET";

/// Command-line options. Environment variables win over flags, which is how the deployment
/// tooling for this service has always driven it.
#[derive(Debug, Parser)]
#[command(name = "loyalty_server", about = "Loyalty points accrual gateway", version)]
struct CliOptions {
    /// Address and port to serve the gateway on
    #[arg(short = 'a', long = "address", default_value = DEFAULT_RUN_ADDRESS)]
    run_address: String,
    /// Connection string for the ledger database
    #[arg(short = 'd', long = "database-uri", default_value = "")]
    database_uri: String,
    /// Base address of the external accrual authority
    #[arg(short = 'r', long = "accrual-address", default_value = DEFAULT_ACCRUAL_ADDRESS)]
    accrual_address: String,
    /// Log verbosity filter
    #[arg(short = 'l', long = "log-level", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    /// Validate uploaded order numbers with the Luhn checksum
    #[arg(short = 'c', long = "check-order-id", default_value_t = true, action = ArgAction::Set)]
    check_order_id: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub run_address: String,
    pub database_uri: String,
    pub accrual_address: String,
    pub log_level: String,
    pub check_order_id: bool,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_cli_and_env() -> Self {
        let cli = CliOptions::parse();
        let run_address = env_override("RUN_ADDRESS").unwrap_or(cli.run_address);
        let database_uri = env_override("DATABASE_URI").unwrap_or(cli.database_uri);
        let accrual_address = env_override("ACCRUAL_SYSTEM_ADDRESS").unwrap_or(cli.accrual_address);
        let log_level = env_override("LOG_LEVEL").unwrap_or(cli.log_level);
        let check_order_id = parse_boolean_flag(env_override("CHECK_ORDERID"), cli.check_order_id);
        Self {
            run_address,
            database_uri,
            accrual_address,
            log_level,
            check_order_id,
            auth: AuthConfig::from_env(),
        }
    }
}

fn env_override(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Secret<Vec<u8>>,
    /// Set when the secret was generated at startup rather than configured. Sessions signed with
    /// an ephemeral secret do not survive a restart.
    pub ephemeral: bool,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        match env::var(JWT_SECRET_ENV) {
            Ok(secret) if !secret.is_empty() => {
                Self { jwt_secret: Secret::new(secret.into_bytes()), ephemeral: false }
            },
            _ => {
                let secret: [u8; 32] = rand::random();
                Self { jwt_secret: Secret::new(secret.to_vec()), ephemeral: true }
            },
        }
    }
}

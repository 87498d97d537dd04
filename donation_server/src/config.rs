use std::{env, time::Duration};

use dpg_common::{helpers::parse_boolean_flag, Secret};
use log::*;
use razorpay_tools::RazorpayConfig;

const DEFAULT_DPG_HOST: &str = "127.0.0.1";
const DEFAULT_DPG_PORT: u16 = 8480;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_REPAIR_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// How often unapplied propagation journal entries are replayed. `None` disables the repair worker.
    pub repair_interval: Option<Duration>,
    pub razorpay: GatewayConfig,
}

/// Payment gateway credentials.
#[derive(Clone, Debug, Default)]
pub struct GatewayConfig {
    pub api: RazorpayConfig,
    /// The secret configured on the gateway dashboard for signing webhook calls. It is distinct from the API key
    /// secret.
    pub webhook_secret: Secret<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DPG_HOST.to_string(),
            port: DEFAULT_DPG_PORT,
            database_url: String::default(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            use_x_forwarded_for: false,
            use_forwarded: false,
            repair_interval: Some(DEFAULT_REPAIR_INTERVAL),
            razorpay: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("DPG_HOST").ok().unwrap_or_else(|| DEFAULT_DPG_HOST.into());
        let port = env::var("DPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for DPG_PORT. {e} Using the default, {DEFAULT_DPG_PORT}, instead."
                    );
                    DEFAULT_DPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_DPG_PORT);
        let database_url = env::var("DPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ DPG_DATABASE_URL is not set. Please set it to the URL for the donations database.");
            String::default()
        });
        let db_max_connections = env::var("DPG_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for DPG_DB_MAX_CONNECTIONS. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
        let use_x_forwarded_for = parse_boolean_flag(env::var("DPG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("DPG_USE_FORWARDED").ok(), false);
        let repair_interval = configure_repair_interval();
        let razorpay = GatewayConfig::from_env_or_defaults();
        Self { host, port, database_url, db_max_connections, use_x_forwarded_for, use_forwarded, repair_interval, razorpay }
    }
}

impl GatewayConfig {
    pub fn from_env_or_defaults() -> Self {
        let api = RazorpayConfig::new_from_env_or_default();
        let webhook_secret = env::var("DPG_RAZORPAY_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ DPG_RAZORPAY_WEBHOOK_SECRET is not set. Every webhook call will be rejected until it is set to the \
                 webhook secret from your Razorpay dashboard."
            );
            String::default()
        });
        Self { api, webhook_secret: Secret::new(webhook_secret) }
    }
}

fn configure_repair_interval() -> Option<Duration> {
    let secs = env::var("DPG_REPAIR_INTERVAL_SECS")
        .map_err(|_| {
            info!(
                "🪛️ DPG_REPAIR_INTERVAL_SECS is not set. Using the default value of {}s.",
                DEFAULT_REPAIR_INTERVAL.as_secs()
            )
        })
        .and_then(|s| {
            s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid configuration value for DPG_REPAIR_INTERVAL_SECS. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_REPAIR_INTERVAL.as_secs());
    if secs == 0 {
        warn!("🪛️ The propagation repair worker is disabled. Unapplied aggregate updates will not be retried.");
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that route handlers need. Secrets are deliberately left out.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}

// Gateway configuration
// Sources, lowest to highest priority: defaults, gateway.toml, GATEWAY__* env,
// LEDGER_DATA_DIR / LEDGER_BACKEND, PORT

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listen address
    pub bind_addr: String,

    /// Submit InitLedger once before serving
    pub init_ledger_on_start: bool,

    /// Relay every contract failure as HTTP 200 plain text
    pub legacy_error_status: bool,

    /// Ledger settings
    pub ledger: device_ledger::Config,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".to_string(),
            init_ledger_on_start: true,
            legacy_error_status: true,
            ledger: device_ledger::Config::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from `.env`, the optional config file and the environment
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env is fine
        let _ = dotenvy::dotenv();

        let path = std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| "gateway.toml".to_string());
        let mut config = Self::from_sources(&path)?;
        config.ledger.apply_env()?;

        if let Ok(port) = std::env::var("PORT") {
            config.bind_addr = with_port(&config.bind_addr, &port)?;
        }

        Ok(config)
    }

    fn from_sources(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("GATEWAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Replace the port of a `host:port` address
fn with_port(bind_addr: &str, port: &str) -> anyhow::Result<String> {
    let port: u16 = port
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid PORT {:?}: {}", port, e))?;
    let host = bind_addr
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or(bind_addr);
    Ok(format!("{}:{}", host, port))
}

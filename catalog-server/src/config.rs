use eyre::WrapErr;
use models::config::StoreConfig;

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) port: u16,
    pub(crate) store: StoreConfig,
}

impl Config {
    pub(crate) fn from_env() -> eyre::Result<Self> {
        let port = std::env::var("CATALOG_PORT")
            .unwrap_or_else(|_| "3002".to_string())
            .parse::<u16>()
            .wrap_err("CATALOG_PORT must be a valid u16")?;
        let store = StoreConfig::from_env()?;

        Ok(Self { port, store })
    }
}

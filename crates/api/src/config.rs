//! Process configuration, read once at startup.

use std::net::SocketAddr;

use anyhow::Context;

use beerstock_infra::StoreConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreConfig,
}

impl AppConfig {
    pub const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:8080";

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let raw_addr = lookup("BIND_ADDR").unwrap_or_else(|| Self::DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid BIND_ADDR {raw_addr:?}"))?;

        let store = StoreConfig::from_lookup(&lookup).context("invalid record store configuration")?;

        Ok(Self { bind_addr, store })
    }
}

use anyhow::{Context, Result};
use notewa_core::SweepOptions;
use notewa_gateway::{GatewayConfig, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::ensure_notewa_home;

/// Environment variable that overrides `[gateway].token`.
pub const TOKEN_ENV: &str = "NOTEWA_GATEWAY_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub sweep: SweepSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub base_url: String,
    /// Fonnte device token. Prefer the NOTEWA_GATEWAY_TOKEN env var on shared machines.
    pub token: Option<String>,
    pub country_code: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSection {
    /// How far ahead the scheduled sweep looks.
    pub window_hours: i64,
    pub max_concurrency: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            country_code: notewa_core::COUNTRY_CODE.to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            window_hours: 24,
            max_concurrency: 4,
        }
    }
}

impl Config {
    /// Gateway settings with the env token taking precedence over the file.
    pub fn gateway_config(&self, env_token: Option<String>) -> GatewayConfig {
        let token = env_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.gateway.token.clone());
        GatewayConfig {
            base_url: self.gateway.base_url.clone(),
            token,
            country_code: self.gateway.country_code.clone(),
            timeout: Duration::from_secs(self.gateway.timeout_secs.max(1)),
        }
    }

    pub fn sweep_options(&self) -> SweepOptions {
        SweepOptions {
            max_concurrency: self.sweep.max_concurrency.max(1),
            dispatch_timeout: Duration::from_secs(self.gateway.timeout_secs.max(1)),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_notewa_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn config_check() -> Result<()> {
    let cfg = load_config()?;
    let env_token = std::env::var(TOKEN_ENV).ok();
    let gw = cfg.gateway_config(env_token.clone());

    println!("Config: {}\n", config_path()?.display());
    println!("- gateway.base_url: {}", gw.base_url);
    println!("- gateway.country_code: {}", gw.country_code);
    println!("- gateway.timeout_secs: {}", gw.timeout.as_secs());
    let token_source = match (&env_token, &cfg.gateway.token) {
        (Some(t), _) if !t.trim().is_empty() => "set (from NOTEWA_GATEWAY_TOKEN)",
        (_, Some(t)) if !t.trim().is_empty() => "set (from config.toml)",
        _ => "<not set>",
    };
    println!("- gateway.token: {token_source}");
    println!("- sweep.window_hours: {}", cfg.sweep.window_hours);
    println!("- sweep.max_concurrency: {}", cfg.sweep.max_concurrency);

    if token_source == "<not set>" {
        println!("\nWhat to configure next:");
        println!("export {TOKEN_ENV}=<your Fonnte device token>");
        println!("or set ~/.notewa/config.toml:");
        println!("[gateway]");
        println!("token = \"<your Fonnte device token>\"");
    }

    Ok(())
}

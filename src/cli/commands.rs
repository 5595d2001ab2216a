//! CLI command implementations

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{detail, info, success, warn};
use crate::config::{self, loader::CONFIG_FILENAME};
use crate::error::{Error, Result};

/// Write a default configuration file
pub async fn init(force: bool) -> Result<()> {
    let config_path = Path::new(CONFIG_FILENAME);

    if config_path.exists() && !force {
        warn(&format!("{} already exists (use --force to overwrite)", CONFIG_FILENAME));
        return Ok(());
    }

    fs::write(config_path, config::loader::default_config_content())?;

    success(&format!("Created {}", CONFIG_FILENAME));
    detail("jwt_secret", "from COURSEDESK_JWT_SECRET");
    detail("database", "in-memory until [database].url is set");
    info("Set COURSEDESK_JWT_SECRET and run 'coursedesk serve' to start the API");

    Ok(())
}

/// Start the HTTP API server
pub async fn serve(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path.as_deref())?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let host = config.server.host.clone();
    let port = config.server.port;
    info(&format!("Starting server at http://{}:{}", host, port));
    detail(
        "store",
        if config.database.url.is_some() { "postgres" } else { "memory" },
    );

    crate::api::run_server(config, &host, port).await
}

/// Validate and print the effective configuration, with the secret masked
pub async fn check_config(config_path: Option<PathBuf>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path.as_deref())?;
    config.validate()?;

    if config.uses_default_secret() {
        warn("auth.jwt_secret is the built-in default");
    }
    config.auth.jwt_secret = "********".to_string();

    let rendered =
        toml::to_string_pretty(&config).map_err(|e| Error::Config(e.to_string()))?;
    println!("{}", rendered);
    success("Configuration is valid");
    Ok(())
}

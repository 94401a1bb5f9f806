use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use tracing::*;
use riposte_common::{RiposteConfig, RiposteConfigStore};

pub fn load_config(path: &Path) -> Result<RiposteConfig> {
    let store: RiposteConfigStore = Config::builder()
        .add_source(File::from(path).format(FileFormat::Yaml))
        .add_source(Environment::with_prefix("RIPOSTE"))
        .build()
        .context("Could not load config")?
        .try_deserialize()
        .context("Could not parse config")?;

    let config = RiposteConfig {
        store,
        paths_relative_to: path.parent().context("FS root reached")?.to_path_buf(),
    };

    info!("Using config: {path:?}");
    config.validate();
    Ok(config)
}

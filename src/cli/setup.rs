use crate::core::config::AppConfig;
use anyhow::{Context, Result, bail};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

/// Writes the example configuration to the default location.
pub fn setup() -> Result<()> {
    let path = AppConfig::default_config_path()?;
    let written = write_example_config(&path)?;
    println!(
        "Wrote {}. Fill in the database and email sections before the first run.",
        written.display()
    );
    Ok(())
}

/// Writes the example configuration to `path` and returns it. Never replaces
/// an existing file.
pub fn write_example_config(path: &Path) -> Result<PathBuf> {
    // the bundled template must itself load
    let template: AppConfig =
        serde_yaml::from_str(EXAMPLE_CONFIG).context("Bundled example config is not valid YAML")?;
    template.validate().context("Bundled example config is invalid")?;

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Can't create config directory {}", dir.display()))?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            bail!(
                "ratekeeper is already configured at {}; edit or remove it instead",
                path.display()
            );
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Can't create {}", path.display()));
        }
    };
    file.write_all(EXAMPLE_CONFIG.as_bytes())
        .with_context(|| format!("Can't write {}", path.display()))?;

    tracing::info!(path = %path.display(), "Wrote example configuration");
    Ok(path.to_path_buf())
}

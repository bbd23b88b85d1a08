//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Project-level file names, checked in order
const PROJECT_FILES: [&str; 2] = ["conductor.toml", ".conductor.toml"];

/// Prefix for environment overrides, e.g. `CONDUCTOR_EXECUTOR__MODE=docker`
const ENV_PREFIX: &str = "CONDUCTOR_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to load configuration: {0}")]
    Figment(#[from] Box<figment::Error>),
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. `CONDUCTOR_*` environment variables (`__` separates sections)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./conductor.toml` or `./.conductor.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/conductor/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, ConfigError> {
        if let Some(path) = config_path
            && !path.exists()
        {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::figment(config_path).extract().map_err(|e| ConfigError::Figment(Box::new(e)))
    }

    /// The merged figment, before extraction.
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        if let Some(project_path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(project_path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// `$XDG_CONFIG_HOME/conductor/config.toml` (or the platform equivalent)
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("conductor").join("config.toml"))
    }

    /// The project-level config file, if one exists
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used
    pub fn print_config_sources(config_path: Option<&Path>) {
        println!("Configuration sources (in priority order):");
        println!("  [ENV  ] Environment: {}*", ENV_PREFIX);

        if let Some(path) = config_path {
            let marker = if path.exists() { "FOUND" } else { "MISSING" };
            println!("  [{:<5}] Explicit: {}", marker, path.display());
        }

        match Self::project_config_path() {
            Some(path) => println!("  [FOUND] Project: {}", path.display()),
            None => println!("  [     ] Project: ./{} or ./{}", PROJECT_FILES[0], PROJECT_FILES[1]),
        }

        if let Some(path) = Self::global_config_path() {
            let marker = if path.exists() { "FOUND" } else { "     " };
            println!("  [{}] Global:  {}", marker, path.display());
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_load_without_files() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::figment(None).extract::<FileConfig>()?;
            assert_eq!(config.executor.mode, "native");
            assert_eq!(config.agent.max_iterations, Some(25));
            Ok(())
        });
    }

    #[test]
    fn project_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "conductor.toml",
                r#"
                [executor]
                mode = "docker"

                [orchestrator]
                max_concurrency = 2
                "#,
            )?;
            let config = ConfigLoader::figment(None).extract::<FileConfig>()?;
            assert_eq!(config.executor.mode, "docker");
            assert_eq!(config.executor.network, "none");
            assert_eq!(config.orchestrator.max_concurrency, Some(2));
            Ok(())
        });
    }

    #[test]
    fn explicit_file_beats_project_file() {
        Jail::expect_with(|jail| {
            jail.create_file(".conductor.toml", "[permissions]\naccept_risk_level = \"medium\"\n")?;
            jail.create_file("custom.toml", "[permissions]\naccept_risk_level = \"high\"\n")?;
            let config = ConfigLoader::figment(Some(Path::new("custom.toml"))).extract::<FileConfig>()?;
            assert_eq!(config.permissions.accept_risk_level, "high");
            Ok(())
        });
    }

    #[test]
    fn environment_beats_files() {
        Jail::expect_with(|jail| {
            jail.create_file("conductor.toml", "[executor]\nmode = \"docker\"\n")?;
            jail.set_env("CONDUCTOR_EXECUTOR__MODE", "native");
            jail.set_env("CONDUCTOR_ORCHESTRATOR__SKIP_ENFORCEMENT", "true");
            let config = ConfigLoader::figment(None).extract::<FileConfig>()?;
            assert_eq!(config.executor.mode, "native");
            assert!(config.orchestrator.skip_enforcement);
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        Jail::expect_with(|_jail| {
            let err = ConfigLoader::load(Some(Path::new("nope.toml"))).unwrap_err();
            assert!(matches!(err, ConfigError::NotFound(_)));
            Ok(())
        });
    }

    #[test]
    fn global_config_path_names_the_app() {
        let path = ConfigLoader::global_config_path().unwrap();
        assert!(path.ends_with("conductor/config.toml"));
    }
}

//! Layered loading of [`PumaConfig`].
//!
//! Later layers win: built-in defaults, the user file, `puma.toml`,
//! `puma.local.toml`, then `PUMA_*` variables.

use crate::{Paths, PumaConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Env keys that take comma-separated lists.
const LIST_KEYS: [&str; 2] = ["central.transports", "central.supported_policy_ids"];

pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Reads `puma.toml` and `puma.local.toml` from the working directory.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "PUMA".to_string(),
        }
    }

    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Tests use a private prefix so parallel runs do not see each other.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// The files that exist, lowest precedence first.
    fn file_layers(&self) -> Vec<PathBuf> {
        let user = Paths::new().user_config_file().ok();
        user.into_iter()
            .chain([
                Paths::project_config_file(&self.project_dir),
                Paths::local_config_file(&self.project_dir),
            ])
            .filter(|path| path.exists())
            .collect()
    }

    /// Merges every layer, resolves `policy_dir` against the project
    /// directory and validates the result.
    pub fn load(self) -> Result<PumaConfig> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&PumaConfig::default())?);

        for path in self.file_layers() {
            builder = builder.add_source(
                config::File::from(path)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // PUMA_CENTRAL__BINARY__PORT=9191 sets central.binary.port
        let mut environment = config::Environment::with_prefix(&self.env_prefix)
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .try_parsing(true);
        for key in LIST_KEYS {
            environment = environment.with_list_parse_key(key);
        }
        builder = builder.add_source(environment);

        let mut puma_config: PumaConfig = builder
            .build()
            .context("merging configuration layers")?
            .try_deserialize()
            .context("reading merged configuration")?;

        puma_config.resolve_paths(&self.project_dir);
        puma_config.validate()?;
        Ok(puma_config)
    }

    /// Like [`Self::load`], but any failure yields the defaults rooted at
    /// the project directory.
    pub fn load_or_default(self) -> PumaConfig {
        let project_dir = self.project_dir.clone();
        self.load().unwrap_or_else(|_| {
            let mut defaults = PumaConfig::default();
            defaults.resolve_paths(project_dir);
            defaults
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, path::PathBuf, sync::Arc};

use serde::Deserialize;

use super::types::Res;

/// Default display / trigger name of the bot.
fn default_name() -> String {
    "lunchbot".to_string()
}

/// Default location of the spot store, relative to the working directory.
fn default_db_path() -> PathBuf {
    PathBuf::from("data").join("lunchbot.db")
}

/// Configuration for the lunch-bot application.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared settings.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Settings read from the environment and the config file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Slack app token used for socket mode (`SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Name the bot answers to, and the Slack user it runs as (`NAME`).
    #[serde(default = "default_name")]
    pub name: String,
    /// Path of the spot store (`DB_PATH`).
    ///
    /// The parent directory must already exist.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Channel (by name) that receives the first-run welcome (`WELCOME_CHANNEL`).
    ///
    /// Falls back to the first public channel the bot is a member of.
    #[serde(default)]
    pub welcome_channel: Option<String>,
}

impl Config {
    /// Loads `LUNCH_BOT_*` environment variables, then the config file.
    ///
    /// The file is `explicit_path` if given, else `.hidden/config.toml` when it exists.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("LUNCH_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    fn validate(&self) -> Res<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow::anyhow!("Bot name must not be empty."));
        }

        if self.db_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Database path must not be empty."));
        }

        Ok(())
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_file_and_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "slack_app_token = \"xapp-1\"\nslack_bot_token = \"xoxb-1\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.slack_app_token, "xapp-1");
        assert_eq!(config.slack_bot_token, "xoxb-1");
        assert_eq!(config.name, "lunchbot");
        assert_eq!(config.db_path, PathBuf::from("data").join("lunchbot.db"));
        assert!(config.welcome_channel.is_none());
    }

    #[test]
    fn file_overrides_name_and_db_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "slack_app_token = \"a\"\nslack_bot_token = \"b\"\nname = \"snackbot\"\ndb_path = \"/tmp/spots\"\nwelcome_channel = \"food\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.name, "snackbot");
        assert_eq!(config.db_path, PathBuf::from("/tmp/spots"));
        assert_eq!(config.welcome_channel.as_deref(), Some("food"));
    }

    #[test]
    fn rejects_blank_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "slack_app_token = \"a\"\nslack_bot_token = \"b\"\nname = \"   \"\n").unwrap();

        assert!(Config::load(Some(&path)).is_err());
    }
}

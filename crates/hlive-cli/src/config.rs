use std::{path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

use hlive_model::{
    BindMount, CONFIG_FILE_NAME, CONFIG_MOUNT_TARGET, HostOs, PortMapping, RunSpec,
    SITE_MOUNT_TARGET, mount_source,
};

pub const DEFAULT_IMAGE: &str = "fortinet-hugo:latest";
pub const DEFAULT_PORT: u16 = 1313;
const DEFAULT_DEBOUNCE_MS: u64 = 2000;
const DEFAULT_STOP_GRACE_SECS: u64 = 10;

/// Hugo dev server arguments used by `hlive server`.
pub const SERVER_ARGS: [&str; 6] = [
    "server",
    "--bind",
    "0.0.0.0",
    "--liveReload",
    "--disableFastRender",
    "--poll",
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Process configuration read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub image: String,
    pub host_port: u16,
    pub container_port: u16,
    pub watch_dir: PathBuf,
    pub debounce: Duration,
    pub stop_grace: Duration,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            image: get("DOCKER_IMAGE").unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            host_port: parse(&get, "HOST_PORT", DEFAULT_PORT)?,
            container_port: parse(&get, "CONTAINER_PORT", DEFAULT_PORT)?,
            watch_dir: get("WATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_watch_dir),
            debounce: Duration::from_millis(parse(&get, "DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)?),
            stop_grace: Duration::from_secs(parse(
                &get,
                "STOP_GRACE_SECS",
                DEFAULT_STOP_GRACE_SECS,
            )?),
            log_level: get("LOG_LEVEL"),
            log_format: get("LOG_FORMAT"),
        })
    }

    fn mounts(&self, os: HostOs) -> [BindMount; 2] {
        let config = self.watch_dir.join(CONFIG_FILE_NAME);
        [
            BindMount::new(mount_source(&self.watch_dir, os), SITE_MOUNT_TARGET),
            BindMount::new(mount_source(&config, os), CONFIG_MOUNT_TARGET),
        ]
    }

    /// Interactive dev server with the site and its config mounted.
    pub fn server_spec(&self, os: HostOs) -> RunSpec {
        let [site, config] = self.mounts(os);
        RunSpec::new(&self.image, SERVER_ARGS)
            .interactive(true)
            .with_mount(site)
            .with_mount(config)
            .with_port(PortMapping::new(self.host_port, self.container_port))
    }

    /// Non-interactive one-shot run with the same mounts and no published port.
    pub fn build_spec(&self, args: Vec<String>, os: HostOs) -> RunSpec {
        let [site, config] = self.mounts(os);
        RunSpec::new(&self.image, args)
            .with_mount(site)
            .with_mount(config)
    }
}

fn parse<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn default_watch_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use painel_app::{Capabilities, ChartKind, DEFAULT_SECTORS, DashboardState, ViewKind};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

const CONFIG_VERSION: i64 = 1;
pub const APP_NAME: &str = "painel";
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_LOG_LEVEL: &str = "info";
const CONFIG_PATH_ENV: &str = "PAINEL_CONFIG_PATH";
const BASE_URL_ENV: &str = "PAINEL_BASE_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: Server::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
    /// Unset waits as long as the server takes.
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub default_view: Option<String>,
    pub fill_in: Option<bool>,
    pub analyze: Option<bool>,
    pub chart: Option<String>,
    pub sectors: Option<Vec<String>>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            default_view: Some("visualize".to_owned()),
            fill_in: Some(true),
            analyze: Some(true),
            chart: Some("line".to_owned()),
            sectors: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [server], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.server.base_url {
            validate_base_url(base_url)
                .with_context(|| format!("server.base_url in {}", path.display()))?;
        }

        if let Some(timeout) = &self.server.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "server.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(view) = &self.ui.default_view {
            let parsed = ViewKind::parse(view).ok_or_else(|| {
                anyhow!(
                    "ui.default_view in {} must be one of visualize, fill_in, analyze; got {view:?}",
                    path.display()
                )
            })?;
            if !self.capabilities().allows(parsed) {
                bail!(
                    "ui.default_view in {} is {view:?} but that view is disabled",
                    path.display()
                );
            }
        }

        if let Some(chart) = &self.ui.chart
            && ChartKind::parse(chart).is_none()
        {
            bail!(
                "ui.chart in {} must be one of line, bar, pie; got {chart:?}",
                path.display()
            );
        }

        if let Some(sectors) = &self.ui.sectors
            && sectors.iter().all(|sector| sector.trim().is_empty())
        {
            bail!(
                "ui.sectors in {} must list at least one sector",
                path.display()
            );
        }

        if let Some(level) = &self.log.level {
            EnvFilter::try_new(level).with_context(|| {
                format!("log.level in {} is not a valid filter", path.display())
            })?;
        }

        Ok(())
    }

    /// `PAINEL_BASE_URL` wins over `[server].base_url`.
    pub fn base_url(&self) -> String {
        if let Ok(value) = env::var(BASE_URL_ENV)
            && !value.trim().is_empty()
        {
            return value.trim().to_owned();
        }
        self.server
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_owned()
    }

    pub fn timeout(&self) -> Result<Option<Duration>> {
        self.server
            .timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            fill_in: self.ui.fill_in.unwrap_or(true),
            analyze: self.ui.analyze.unwrap_or(true),
        }
    }

    pub fn default_view(&self) -> ViewKind {
        self.ui
            .default_view
            .as_deref()
            .and_then(ViewKind::parse)
            .unwrap_or(ViewKind::Visualize)
    }

    pub fn chart(&self) -> ChartKind {
        self.ui
            .chart
            .as_deref()
            .and_then(ChartKind::parse)
            .unwrap_or(ChartKind::Line)
    }

    pub fn sectors(&self) -> Vec<String> {
        match &self.ui.sectors {
            Some(sectors) => sectors
                .iter()
                .map(|sector| sector.trim())
                .filter(|sector| !sector.is_empty())
                .map(str::to_owned)
                .collect(),
            None => DEFAULT_SECTORS.iter().map(|sector| (*sector).to_owned()).collect(),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let data_root = dirs::data_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].file in the config")
        })?;
        Ok(data_root.join(APP_NAME).join("painel.log"))
    }

    pub fn initial_state(&self) -> DashboardState {
        DashboardState::new(self.sectors(), self.capabilities())
            .with_view(self.default_view())
            .with_chart(self.chart())
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# painel config\n# Place this file at: {}\n\nversion = 1\n\n[server]\nbase_url = \"{}\"\n# Optional. Unset waits for the server indefinitely.\n# timeout = \"30s\"\n\n[ui]\ndefault_view = \"visualize\"\nfill_in = true\nanalyze = true\nchart = \"line\"\nsectors = [{}]\n\n[log]\nlevel = \"{}\"\n# Optional. Default is the platform data dir (for example ~/.local/share/painel/painel.log)\n# file = \"/absolute/path/to/painel.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_SECTORS
                .iter()
                .map(|sector| format!("\"{sector}\""))
                .collect::<Vec<_>>()
                .join(", "),
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn validate_base_url(raw: &str) -> Result<()> {
    let parsed = Url::parse(raw).with_context(|| format!("{raw:?} is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("{raw:?} must use http or https");
    }
    Ok(())
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

use crate::draft::phase::DraftFormat;

const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: String,
    pub public_dir: PathBuf,
    pub draft_format: DraftFormat,
    pub firestore_project_id: Option<String>,
    pub firestore_credentials: PathBuf,
    pub history_collection: String,
    pub broadcast_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".into(),
            database_url: "sqlite://./data/draft.db".into(),
            public_dir: PathBuf::from("public"),
            draft_format: DraftFormat::Standard,
            firestore_project_id: None,
            firestore_credentials: PathBuf::from("serviceAccountKey.json"),
            history_collection: "MatchDraft".into(),
            broadcast_capacity: 256,
        }
    }
}

/// Optional keys of `server.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    bind_addr: Option<String>,
    database_url: Option<String>,
    public_dir: Option<PathBuf>,
    draft_format: Option<DraftFormat>,
    firestore_project_id: Option<String>,
    firestore_credentials: Option<PathBuf>,
    history_collection: Option<String>,
    broadcast_capacity: Option<usize>,
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let file: FileSettings = toml::from_str(raw).context("invalid server.toml")?;
        let mut settings = Settings::default();
        settings.merge(file);
        Ok(settings)
    }

    fn merge(&mut self, file: FileSettings) {
        if let Some(v) = file.bind_addr {
            self.bind_addr = v;
        }
        if let Some(v) = file.database_url {
            self.database_url = v;
        }
        if let Some(v) = file.public_dir {
            self.public_dir = v;
        }
        if let Some(v) = file.draft_format {
            self.draft_format = v;
        }
        if let Some(v) = file.firestore_project_id {
            self.firestore_project_id = Some(v);
        }
        if let Some(v) = file.firestore_credentials {
            self.firestore_credentials = v;
        }
        if let Some(v) = file.history_collection {
            self.history_collection = v;
        }
        if let Some(v) = file.broadcast_capacity {
            self.broadcast_capacity = v.max(1);
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("DATABASE_URL") {
            self.database_url = v;
        }
        if let Ok(v) = std::env::var("PUBLIC_DIR") {
            self.public_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("DRAFT_FORMAT") {
            match v.parse() {
                Ok(format) => self.draft_format = format,
                Err(e) => warn!("Ignoring DRAFT_FORMAT: {}", e),
            }
        }
        if let Ok(v) = std::env::var("FIRESTORE_PROJECT_ID") {
            self.firestore_project_id = Some(v);
        }
        if let Ok(v) = std::env::var("FIRESTORE_CREDENTIALS") {
            self.firestore_credentials = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("HISTORY_COLLECTION") {
            self.history_collection = v;
        }
    }
}

/// Defaults, then `server.toml` if present, then environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        match Settings::from_toml_str(&raw) {
            Ok(from_file) => settings = from_file,
            Err(e) => warn!("Ignoring {}: {:#}", SETTINGS_FILE, e),
        }
    }

    settings.apply_env();
    settings
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

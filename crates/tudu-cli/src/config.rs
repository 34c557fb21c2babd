use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tudu_core::{DEFAULT_COLLECTION, SEARCH_DEBOUNCE};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub search: Search,
    #[serde(default)]
    pub tui: Tui,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum Storage {
    Memory {
        collection: Option<String>,
    },
    Rtdb {
        url: String,
        auth_token: Option<String>,
        collection: Option<String>,
    },
}

impl Default for Storage {
    fn default() -> Self {
        Storage::Memory { collection: None }
    }
}

impl Storage {
    pub fn collection(&self) -> &str {
        let configured = match self {
            Storage::Memory { collection } | Storage::Rtdb { collection, .. } => collection,
        };
        configured
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_COLLECTION)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Search {
    /// Quiet period before the search box filters the list (default: 300)
    pub debounce_ms: Option<u64>,
}

impl Search {
    pub fn delay(&self) -> Duration {
        self.debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(SEARCH_DEBOUNCE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Tui {
    /// Selected row and focused field color
    pub highlight: Option<String>,
    pub border: Option<String>,
    /// Footer text color
    pub help: Option<String>,
    /// Whether to use the alternate screen (default: true)
    pub alt_screen: Option<bool>,
}

impl Settings {
    /// Copy safe to print: the auth token is masked.
    pub fn redacted(&self) -> Settings {
        let mut out = self.clone();
        if let Storage::Rtdb { auth_token, .. } = &mut out.storage {
            if auth_token.is_some() {
                *auth_token = Some("***".into());
            }
        }
        out
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(bd) = directories::BaseDirs::new() {
        bd.config_dir().join("tudu")
    } else {
        PathBuf::from("./.config/tudu")
    }
}

pub fn state_dir() -> PathBuf {
    // XDG state dir when available; otherwise next to the settings
    if let Some(bd) = directories::BaseDirs::new() {
        if let Some(sd) = bd.state_dir() {
            return sd.join("tudu");
        }
    }
    config_dir()
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

pub fn log_path() -> PathBuf {
    state_dir().join("tudu.log")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if let Ok(s) = std::fs::read_to_string(&path) {
        parse_settings(&s)
    } else {
        Settings::default()
    }
}

fn parse_settings(s: &str) -> Settings {
    match toml::from_str(s) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(%err, "ignoring malformed settings file");
            Settings::default()
        }
    }
}

// client/src/config.rs
// Static settings, loaded once at startup.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::{Backend, HttpBackend};
use crate::error::{AppError, AppResult};

pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;
pub const ALLOWED_FILE_TYPES: [&str; 5] = ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BrandColors {
    pub green: String,
    pub dark_green: String,
    pub light: String,
    pub black: String,
}

impl Default for BrandColors {
    fn default() -> Self {
        Self {
            green: "#00C896".to_string(),
            dark_green: "#00A67C".to_string(),
            light: "#F8FFFE".to_string(),
            black: "#1A1A1A".to_string(),
        }
    }
}

impl BrandColors {
    pub fn accent(&self) -> Color {
        parse_hex_color(&self.green).unwrap_or(Color::Green)
    }

    pub fn accent_dark(&self) -> Color {
        parse_hex_color(&self.dark_green).unwrap_or(Color::Green)
    }
}

/// Parses `#RRGGBB` into a terminal colour.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub anon_key: String,
    pub max_file_size: u64,
    pub allowed_file_types: Vec<String>,
    pub posts_per_page: usize,
    pub messages_per_page: usize,
    pub toast_duration_ms: u64,
    pub search_debounce_ms: u64,
    pub suggestion_count: usize,
    pub storage_bucket: String,
    pub upload_prefix: String,
    pub avatar_fallback_base: String,
    pub request_timeout_secs: u64,
    pub log_file: Option<PathBuf>,
    pub session_file: Option<PathBuf>,
    pub brand_colors: BrandColors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            anon_key: String::new(),
            max_file_size: MAX_FILE_SIZE,
            allowed_file_types: ALLOWED_FILE_TYPES.iter().map(|t| t.to_string()).collect(),
            posts_per_page: 10,
            messages_per_page: 50,
            toast_duration_ms: 5000,
            search_debounce_ms: 300,
            suggestion_count: 3,
            storage_bucket: "posts".to_string(),
            upload_prefix: "uploads".to_string(),
            avatar_fallback_base: "https://api.dicebear.com/7.x/avataaars/svg?seed=".to_string(),
            request_timeout_secs: 30,
            log_file: None,
            session_file: None,
            brand_colors: BrandColors::default(),
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".socialspace.json")
    }

    /// Defaults, then `~/.socialspace.json`, then `.env` and the environment.
    ///
    /// Runs before logging is up, so problems come back as warnings for the caller to log.
    pub fn load() -> (Self, Vec<String>) {
        let (mut config, mut warnings) = Self::load_from(&Self::config_path());
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warnings.push(format!("Ignoring invalid .env file: {}", e));
            }
        }
        config.apply_env();
        (config, warnings)
    }

    /// Reads one JSON config file; a missing file is not a warning.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(config) => (config, Vec::new()),
                Err(e) => (
                    Self::default(),
                    vec![format!("Ignoring unreadable config file {}: {}", path.display(), e)],
                ),
            },
            Err(_) => (Self::default(), Vec::new()),
        }
    }

    pub fn apply_env(&mut self) {
        let pick = |primary: &str, fallback: &str| {
            std::env::var(primary).or_else(|_| std::env::var(fallback)).ok()
        };
        if let Some(url) = pick("SOCIALSPACE_BACKEND_URL", "SUPABASE_URL") {
            self.backend_url = url;
        }
        if let Some(key) = pick("SOCIALSPACE_ANON_KEY", "SUPABASE_ANON_KEY") {
            self.anon_key = key;
        }
        if let Ok(path) = std::env::var("SOCIALSPACE_LOG_FILE") {
            self.log_file = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.backend_url.trim().is_empty() {
            return Err(AppError::Config(
                "Backend URL is not set (SOCIALSPACE_BACKEND_URL or SUPABASE_URL)".to_string(),
            ));
        }
        if self.anon_key.trim().is_empty() {
            return Err(AppError::Config(
                "Backend key is not set (SOCIALSPACE_ANON_KEY or SUPABASE_ANON_KEY)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".socialspace.log")
        })
    }

    /// Where the signed-in session is persisted between runs.
    pub fn session_path(&self) -> PathBuf {
        self.session_file.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".socialspace_session.json")
        })
    }

    /// Avatar URL used when a user has none of their own.
    pub fn fallback_avatar(&self, seed: impl std::fmt::Display) -> String {
        format!("{}{}", self.avatar_fallback_base, seed)
    }
}

/// Backend handle built on first use.
pub struct LazyBackend {
    config: Arc<Config>,
    cell: OnceCell<Arc<dyn Backend>>,
}

impl LazyBackend {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config, cell: OnceCell::new() }
    }

    /// Wraps an already constructed backend (offline mode, tests).
    pub fn with_backend(config: Arc<Config>, backend: Arc<dyn Backend>) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(backend);
        Self { config, cell }
    }

    pub fn get(&self) -> AppResult<Arc<dyn Backend>> {
        self.cell
            .get_or_try_init(|| {
                self.config.validate()?;
                let backend = HttpBackend::new(&self.config)?;
                info!(url = %self.config.backend_url, "Backend client initialized");
                Ok::<Arc<dyn Backend>, AppError>(Arc::new(backend))
            })
            .cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

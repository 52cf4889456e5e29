use std::path::PathBuf;

use home::home_dir;
use ratatui::style::Color;
use serde::{de::Visitor, Deserialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VerseConfig {
    pub sync: SyncConfiguration,
    pub theme: ThemeConfiguration,
}

impl VerseConfig {
    /// Loads configuration from `path`, falling back to
    /// `~/.config/verse/config.toml`. A missing file just yields defaults;
    /// an unreadable or malformed file is an error.
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let path = match path.or_else(default_config_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };
        let str = match tokio::fs::read_to_string(&path).await {
            Ok(str) => str,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&str).map_err(anyhow::Error::from)
    }
}

fn default_config_path() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".config").join("verse").join("config.toml"))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfiguration {
    /// Reveal words within the current line progressively instead of whole
    /// lines at a time.
    pub word_level: bool,
    /// Poll interval while word-level sync is active.
    pub word_interval_ms: u64,
    /// Poll interval for line-level sync.
    pub line_interval_ms: u64,
}

impl Default for SyncConfiguration {
    fn default() -> Self {
        Self {
            word_level: true,
            word_interval_ms: 50,
            line_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThemeConfiguration {
    pub active_text_color: ThemeColor,
    pub inactive_text_color: ThemeColor,
    pub progress_bar_color: ThemeColor,
    pub border_color: ThemeColor,
}

impl Default for ThemeConfiguration {
    fn default() -> Self {
        Self {
            active_text_color: ThemeColor(Color::LightGreen),
            inactive_text_color: ThemeColor(Color::DarkGray),
            progress_bar_color: ThemeColor(Color::LightBlue),
            border_color: ThemeColor(Color::DarkGray),
        }
    }
}

#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct ThemeColor(pub Color);

impl<'de> Deserialize<'de> for ThemeColor {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        de.deserialize_str(ColorVisitor)
    }
}

struct ColorVisitor;

impl<'v> Visitor<'v> for ColorVisitor {
    type Value = ThemeColor;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "a string representing a color")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        if let Some(stripped) = v.strip_prefix('#') {
            let color_rgb = u32::from_str_radix(stripped, 16).map_err(|e| {
                serde::de::Error::custom(format!("Invalid hex string for color {e}"))
            })?;
            let r = (color_rgb & 0xFF0000) >> 16;
            let g = (color_rgb & 0x00FF00) >> 8;
            let b = color_rgb & 0x0000FF;
            Ok(ThemeColor(Color::Rgb(r as u8, g as u8, b as u8)))
        } else {
            v.parse::<Color>()
                .map_err(|e| serde::de::Error::custom(format!("Invalid named color format {e}")))
                .map(ThemeColor)
        }
    }
}

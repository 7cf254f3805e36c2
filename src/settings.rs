// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::{
    fs,
    path::{Path, PathBuf},
};

use dirs_next::config_dir;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::texture::{
    DEFAULT_TEXTURE_HEIGHT, DEFAULT_TEXTURE_WIDTH, PLACEHOLDER_RGBA, TextureOptions,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextureSettings {
    pub default_width: u32,
    pub default_height: u32,
    pub placeholder_rgba: [u8; 4],
    /// Directory image asset names are resolved against.
    pub asset_root: PathBuf,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            default_width: DEFAULT_TEXTURE_WIDTH,
            default_height: DEFAULT_TEXTURE_HEIGHT,
            placeholder_rgba: PLACEHOLDER_RGBA,
            asset_root: PathBuf::from("assets"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deserialization Error: {0}")]
    Serde(#[from] toml::de::Error),

    #[error("Serialization Error: {0}")]
    SerdeSer(#[from] toml::ser::Error),

    #[error("Configuration Directory Not Found")]
    ConfigDirNotFound,
}

impl TextureSettings {
    /// `<config dir>/deferred_texture/texture_settings.toml`
    pub fn user_settings_path() -> Result<PathBuf, SettingsError> {
        let config_dir = config_dir().ok_or(SettingsError::ConfigDirNotFound)?;
        Ok(config_dir
            .join("deferred_texture")
            .join("texture_settings.toml"))
    }

    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        let settings: TextureSettings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Creates the parent directory if needed.
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Loads the user's settings, writing the defaults out the first time. Any failure
    /// falls back to the built-in defaults.
    pub fn load_user_settings() -> Self {
        match Self::initialize_settings() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Error initializing texture settings: {}", e);
                Self::default()
            }
        }
    }

    fn initialize_settings() -> Result<Self, SettingsError> {
        let path = Self::user_settings_path()?;
        if path.exists() {
            return Self::load_from_file(&path);
        }

        info!(
            "Texture settings not found, writing defaults to {}",
            path.display()
        );
        let settings = Self::default();
        settings.save_to_file(&path)?;
        Ok(settings)
    }

    pub fn texture_options(&self) -> TextureOptions {
        TextureOptions {
            width: self.default_width,
            height: self.default_height,
            placeholder: self.placeholder_rgba,
        }
    }
}

use std::path::PathBuf;
use std::time::Duration;

/// Scripts live next to the binary by default, like the bundled examples.
pub const DEFAULT_SCRIPTS_DIR: &str = "assets";

pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_millis(250);

/// Where settings and biome files go unless the user picks elsewhere.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".perlin-biomes")
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub scripts_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Colour by biome; grayscale when off or when no biomes exist
    pub biome_mode: bool,
    /// Island falloff strength, off when `None`
    pub island_falloff: Option<f32>,
    pub watch_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from(DEFAULT_SCRIPTS_DIR),
            data_dir: data_dir(),
            biome_mode: true,
            island_falloff: None,
            watch_interval: DEFAULT_WATCH_INTERVAL,
        }
    }
}

impl AppConfig {
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn biomes_path(&self) -> PathBuf {
        self.data_dir.join("biomes.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = AppConfig::default();
        assert!(config.data_dir.ends_with(".perlin-biomes"));
        assert_eq!(config.settings_path().file_name().unwrap(), "settings.json");
        assert_eq!(config.biomes_path().parent(), Some(config.data_dir.as_path()));
        assert!(config.biome_mode);
    }
}

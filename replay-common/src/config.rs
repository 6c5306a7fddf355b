use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which trainer build produced the run; selects the default data directory.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Release,
    Debug,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Release => "release",
            BuildMode::Debug => "debug",
        }
    }
}

// Configuration for which generations are played and how fast the cursor moves
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Explicit run directory; overrides the mode-derived default.
    pub data_directory: Option<PathBuf>,
    pub mode: BuildMode,
    pub gen_step: u32,
    pub start_generation: u32,
    pub max_ticks: Option<u64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            data_directory: None,
            mode: BuildMode::Release,
            gen_step: 20,
            start_generation: 0,
            max_ticks: None,
        }
    }
}

// Configuration for presentation timing and panel options
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    pub tick_rate: u32,
    pub throttle: bool,
    pub show_legend: bool,
    pub font_path: Option<PathBuf>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            tick_rate: 60,
            throttle: true,
            show_legend: true,
            font_path: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    None,
    Mp4,
    Png,
}

// Configuration for where composed frames go
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub kind: OutputKind,
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            kind: OutputKind::None,
            path: PathBuf::from("replay.mp4"),
        }
    }
}

// Configuration for keyboard input
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct InputConfig {
    /// `None` reads keys only when stdin is a terminal.
    pub interactive: Option<bool>,
}

// Main replay configuration structure, optionally loaded from a TOML file.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ReplayConfig {
    pub playback: PlaybackConfig,
    pub display: DisplayConfig,
    pub output: OutputConfig,
    pub input: InputConfig,
}

impl ReplayConfig {
    /// Loads the replay configuration from a TOML file. Missing sections take defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config: ReplayConfig = toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML from '{}': {}", path_ref.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.playback.gen_step == 0 {
            anyhow::bail!("gen_step must be greater than 0.");
        }
        if self.display.tick_rate == 0 {
            anyhow::bail!("tick_rate must be greater than 0.");
        }
        if self.playback.max_ticks == Some(0) {
            anyhow::bail!("max_ticks must be greater than 0 when set.");
        }
        Ok(())
    }

    /// The run directory: explicit when configured, otherwise `build-<mode>/simulation_data`.
    pub fn data_directory(&self) -> PathBuf {
        match &self.playback.data_directory {
            Some(dir) => dir.clone(),
            None => PathBuf::from(format!("build-{}", self.playback.mode.as_str())).join("simulation_data"),
        }
    }
}

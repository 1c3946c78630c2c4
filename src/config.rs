//! Engine configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! runnable light-speed transition:
//!
//! ```toml
//! preset = "quantum-jump"
//! total_duration_ms = 12000
//! seed = 7
//!
//! [window]
//! fullscreen = true
//!
//! [handoff]
//! candidates = ["./globe"]
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use glam::Vec2;
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::transition::handoff::{CommandLauncher, RetryPolicy};
use crate::transition::phase::{PhaseTable, Preset};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "lightjump.toml";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Light Speed Jump".to_string(),
            width: 1200,
            height: 800,
            fullscreen: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    pub enabled: bool,
    /// Executables to try, in order; the first that exists is launched.
    pub candidates: Vec<PathBuf>,
    pub args: Vec<String>,
    pub attempts: u32,
    pub backoff_ms: u64,
    /// Also launch when the user quits before the hand-off window.
    pub on_quit: bool,
}

impl HandoffConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.attempts.max(1),
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }

    pub fn launcher(&self) -> CommandLauncher {
        CommandLauncher::new(self.candidates.clone(), self.args.clone())
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            candidates: vec![PathBuf::from("./globe"), PathBuf::from("./global")],
            args: Vec::new(),
            attempts: 3,
            backoff_ms: 500,
            on_quit: true,
        }
    }
}

/// Everything fixed at engine construction.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub window: WindowConfig,
    /// Simulation plane size; stars, particles and effects live here.
    pub reference: Resolution,
    pub preset: Preset,
    /// Per-phase durations, replacing the preset's.
    pub durations_ms: Option<Vec<f32>>,
    /// Rescale all phases so the transition lasts this long.
    pub total_duration_ms: Option<f32>,
    pub stars: usize,
    pub max_particles: usize,
    pub target_fps: u32,
    pub seed: Option<u64>,
    /// TTF/OTF for the controls hint and status text; neither is drawn
    /// without it.
    pub font: Option<PathBuf>,
    pub handoff: HandoffConfig,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            reference: Resolution::default(),
            preset: Preset::default(),
            durations_ms: None,
            total_duration_ms: None,
            stars: 400,
            max_particles: 1500,
            target_fps: 60,
            seed: None,
            font: None,
            handoff: HandoffConfig::default(),
        }
    }
}

impl TransitionConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else [`DEFAULT_CONFIG_FILE`] if it exists, else
    /// the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Resolution { width, height } = self.reference;
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidResolution { width, height });
        }
        if self.target_fps == 0 {
            return Err(ConfigError::InvalidFrameRate);
        }
        if self.stars == 0 {
            return Err(ConfigError::NoStars);
        }
        self.phase_table().map(|_| ())
    }

    /// Build the phase table: preset, then duration overrides, then scaling.
    pub fn phase_table(&self) -> Result<PhaseTable, ConfigError> {
        let mut table = PhaseTable::preset(self.preset);
        if let Some(durations) = &self.durations_ms {
            table = table.with_durations(durations)?;
        }
        if let Some(total) = self.total_duration_ms {
            table = table.scaled_to(total)?;
        }
        table.validate()?;
        Ok(table)
    }

    /// The configured seed, or one derived from the current time.
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_total_duration(mut self, total_ms: f32) -> Self {
        self.total_duration_ms = Some(total_ms);
        self
    }

    pub fn with_reference(mut self, width: u32, height: u32) -> Self {
        self.reference = Resolution { width, height };
        self
    }

    pub fn with_handoff(mut self, handoff: HandoffConfig) -> Self {
        self.handoff = handoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::phase::Phase;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = TransitionConfig::from_toml_str("").unwrap();
        assert_eq!(config, TransitionConfig::default());
        assert_eq!(config.reference.as_vec2(), Vec2::new(1920.0, 1080.0));
        assert_eq!(config.handoff.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn parses_nested_tables() {
        let config = TransitionConfig::from_toml_str(
            r#"
            preset = "quantum-jump"
            stars = 250
            seed = 7

            [window]
            title = "Jump"
            fullscreen = true

            [handoff]
            candidates = ["./world"]
            attempts = 5
            backoff_ms = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.preset, Preset::QuantumJump);
        assert_eq!(config.stars, 250);
        assert_eq!(config.resolve_seed(), 7);
        assert_eq!(config.window.title, "Jump");
        assert!(config.window.fullscreen);
        assert_eq!(config.window.width, 1200);
        assert_eq!(config.handoff.candidates, vec![PathBuf::from("./world")]);
        assert!(config.handoff.on_quit);
        assert_eq!(
            config.handoff.retry_policy(),
            RetryPolicy {
                attempts: 5,
                backoff: Duration::from_millis(100)
            }
        );
        let table = config.phase_table().unwrap();
        assert_eq!(table.phases()[0].phase, Phase::Initialization);
    }

    #[test]
    fn overrides_then_scales() {
        let config = TransitionConfig::default()
            .with_total_duration(4000.0)
            .with_preset(Preset::LightSpeed);
        let config = TransitionConfig {
            durations_ms: Some(vec![1000.0, 1000.0, 1000.0, 1000.0]),
            ..config
        };
        let table = config.phase_table().unwrap();
        assert_eq!(table.total_duration_ms(), 4000.0);
        assert_eq!(table.phases()[2].duration_ms, 1000.0);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            TransitionConfig::from_toml_str("target_fps = 0"),
            Err(ConfigError::InvalidFrameRate)
        ));
        assert!(matches!(
            TransitionConfig::from_toml_str("stars = 0"),
            Err(ConfigError::NoStars)
        ));
        assert!(matches!(
            TransitionConfig::from_toml_str("[reference]\nwidth = 0"),
            Err(ConfigError::InvalidResolution { width: 0, .. })
        ));
        assert!(matches!(
            TransitionConfig::from_toml_str("durations_ms = [1.0, 2.0]"),
            Err(ConfigError::DurationCount { .. })
        ));
        assert!(matches!(
            TransitionConfig::from_toml_str("total_duration_ms = 0.0"),
            Err(ConfigError::InvalidTotalDuration(_))
        ));
        assert!(matches!(
            TransitionConfig::from_toml_str("preset = \"warp-drive\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = TransitionConfig::load("/no/such/lightjump.toml").unwrap_err();
        match err {
            ConfigError::Read { path, .. } => {
                assert_eq!(path, PathBuf::from("/no/such/lightjump.toml"))
            }
            other => panic!("unexpected error {other}"),
        }
    }
}

//! Process configuration: env-driven defaults with an optional TOML
//! overlay. No CLI flags; everything arrives through the environment or
//! the overlay file.

use parley_audio::TtsConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// High-level configuration for the speech client.
#[derive(Clone, Debug)]
pub struct SpeechConfig {
    pub tts: TtsConfig,
    /// Where pairing credentials are persisted.
    pub identity_path: PathBuf,
    /// Serial device hosting an auxiliary display, if any.
    pub display_device: Option<PathBuf>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            tts: TtsConfig::default(),
            identity_path: std::env::var("PARLEY_IDENTITY")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
                    Path::new(&home).join(".parley").join("identity.json")
                }),
            display_device: std::env::var("PARLEY_DISPLAY_DEV")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }
}

impl SpeechConfig {
    /// Load configuration from a TOML file (path via PARLEY_SPEECH_CONFIG
    /// or ./speech.toml), overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path =
            std::env::var("PARLEY_SPEECH_CONFIG").unwrap_or_else(|_| "speech.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "speech", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match toml::from_str::<SpeechToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target: "speech", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target: "speech", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    /// Process names a stop request terminates: the active synthesis module
    /// plus the playback chain.
    pub fn stop_targets(&self, module: &str) -> Vec<String> {
        let mut targets = Vec::new();
        if !module.is_empty() {
            targets.push(module.to_string());
        }
        targets.push("aplay".to_string());
        if let Some(player) = &self.tts.player {
            if !targets.iter().any(|t| t == player) {
                targets.push(player.clone());
            }
        }
        targets
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SpeechToml {
    pub identity_path: Option<PathBuf>,
    pub display_device: Option<PathBuf>,
    pub tts: Option<TtsToml>,
}

impl SpeechToml {
    fn overlay(self, mut base: SpeechConfig) -> SpeechConfig {
        if let Some(p) = self.identity_path {
            base.identity_path = p;
        }
        if let Some(d) = self.display_device {
            base.display_device = Some(d);
        }
        if let Some(t) = self.tts {
            t.apply(&mut base.tts);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct TtsToml {
    pub temp_dir: Option<PathBuf>,
    pub sample_rate: Option<u32>,
    pub piper_bin: Option<PathBuf>,
    pub piper_voice: Option<PathBuf>,
    pub espeak_bin: Option<PathBuf>,
    pub player: Option<String>,
}

impl TtsToml {
    fn apply(self, t: &mut TtsConfig) {
        if let Some(x) = self.temp_dir {
            t.temp_dir = x;
        }
        if let Some(x) = self.sample_rate {
            t.sample_rate = x;
        }
        if let Some(x) = self.piper_bin {
            t.piper_bin = Some(x);
        }
        if let Some(x) = self.piper_voice {
            t.piper_voice = Some(x);
        }
        if let Some(x) = self.espeak_bin {
            t.espeak_bin = Some(x);
        }
        if let Some(x) = self.player {
            t.player = Some(x);
        }
    }
}

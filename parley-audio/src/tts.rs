//! Speech synthesis via local CLI engines.
//!
//! Prefers Piper (higher quality, needs a voice model), falls back to
//! espeak-ng, and with neither present logs the text and reports success so
//! the coordinator keeps working on machines without audio. Synthesis and
//! playback are synchronous and carry no timeout: a hung engine hangs the
//! caller (known limitation, documented rather than masked).
//!
//! Env overrides: PIPER_BIN, PIPER_VOICE, ESPEAK_BIN, TTS_TEMP_DIR.

use parley_core::{ParleyError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Synchronous speech-synthesis collaborator. One call speaks one chunk.
pub trait TtsEngine: Send + Sync {
    fn execute(&self, text: &str) -> Result<()>;

    /// Name of the external process doing the speaking, for stop requests.
    fn module_name(&self) -> &str;
}

#[derive(Clone, Debug)]
pub struct TtsConfig {
    pub temp_dir: PathBuf,
    pub sample_rate: u32,
    pub piper_bin: Option<PathBuf>,
    pub piper_voice: Option<PathBuf>,
    pub espeak_bin: Option<PathBuf>,
    /// Preferred playback binary; the aplay/paplay/ffplay chain is probed
    /// when unset.
    pub player: Option<String>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        let temp_dir = std::env::var("TTS_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());
        let piper_bin = get_from_env_or_path("PIPER_BIN", "piper");
        let piper_voice = std::env::var("PIPER_VOICE").ok().map(PathBuf::from);
        let espeak_bin =
            get_from_env_or_path("ESPEAK_BIN", "espeak-ng").or_else(|| get_from_path("espeak"));

        Self {
            temp_dir,
            sample_rate: 16_000,
            piper_bin,
            piper_voice,
            espeak_bin,
            player: None,
        }
    }
}

fn get_from_env_or_path(env_key: &str, default_bin: &str) -> Option<PathBuf> {
    if let Ok(p) = std::env::var(env_key) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Some(pb);
        }
    }
    get_from_path(default_bin)
}

fn get_from_path(bin: &str) -> Option<PathBuf> {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return if p.exists() { Some(p) } else { None };
    }
    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            let candidate = dir.join(bin);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

enum Engine {
    Piper,
    Espeak,
    /// No engine found; spoken text is only logged.
    LogOnly,
}

/// Default [`TtsEngine`]: synthesize to a temp WAV with a CLI engine, then
/// play it with the first available player.
pub struct SubprocessTts {
    cfg: TtsConfig,
    engine: Engine,
    module: String,
}

impl SubprocessTts {
    pub fn new(cfg: TtsConfig) -> Self {
        let engine = if cfg.piper_bin.is_some() && cfg.piper_voice.is_some() {
            Engine::Piper
        } else if cfg.espeak_bin.is_some() {
            Engine::Espeak
        } else {
            Engine::LogOnly
        };
        let module = match engine {
            Engine::Piper => "piper",
            Engine::Espeak => "espeak-ng",
            Engine::LogOnly => "",
        }
        .to_string();
        match &engine {
            Engine::Piper => info!(target: "tts", bin = ?cfg.piper_bin, "Using Piper"),
            Engine::Espeak => info!(target: "tts", bin = ?cfg.espeak_bin, "Using espeak-ng"),
            Engine::LogOnly => {
                warn!(target: "tts", "No TTS engine detected (Piper/espeak-ng missing); printing only")
            }
        }
        Self {
            cfg,
            engine,
            module,
        }
    }

    fn wav_path(&self) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        self.cfg.temp_dir.join(format!("speak_{:x}.wav", nanos))
    }
}

impl TtsEngine for SubprocessTts {
    fn execute(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let wav = self.wav_path();
        match self.engine {
            Engine::Piper => synth_with_piper(&self.cfg, text, &wav)?,
            Engine::Espeak => synth_with_espeak(&self.cfg, text, &wav)?,
            Engine::LogOnly => {
                info!(target: "tts", "(silent) {}", text);
                return Ok(());
            }
        }
        let result = play_wav(&self.cfg, &wav);
        let _ = fs::remove_file(&wav);
        result
    }

    fn module_name(&self) -> &str {
        &self.module
    }
}

fn synth_with_piper(cfg: &TtsConfig, text: &str, out_wav: &Path) -> Result<()> {
    let piper = cfg
        .piper_bin
        .as_ref()
        .ok_or_else(|| ParleyError::TtsError("Piper binary not found".into()))?;
    let voice = cfg
        .piper_voice
        .as_ref()
        .ok_or_else(|| ParleyError::TtsError("Piper voice not found; set PIPER_VOICE".into()))?;

    let mut cmd = Command::new(piper);
    cmd.arg("-m").arg(voice);
    cmd.arg("-f").arg(out_wav);
    cmd.arg("--sample_rate").arg(cfg.sample_rate.to_string());
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!(target: "tts", command = ?cmd, "Running piper");
    let mut child = cmd.spawn().map_err(ParleyError::IoError)?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .map_err(ParleyError::IoError)?;
    }
    let output = child.wait_with_output().map_err(ParleyError::IoError)?;
    if !output.status.success() {
        return Err(ParleyError::TtsError(format!(
            "Piper failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

fn synth_with_espeak(cfg: &TtsConfig, text: &str, out_wav: &Path) -> Result<()> {
    let espeak = cfg
        .espeak_bin
        .as_ref()
        .ok_or_else(|| ParleyError::TtsError("espeak-ng not found".into()))?;
    let mut cmd = Command::new(espeak);
    cmd.arg("-w").arg(out_wav);
    cmd.arg(text);
    debug!(target: "tts", command = ?cmd, "Running espeak-ng");
    let output = cmd.output().map_err(ParleyError::IoError)?;
    if !output.status.success() {
        return Err(ParleyError::TtsError(format!(
            "espeak-ng failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

fn play_wav(cfg: &TtsConfig, wav: &Path) -> Result<()> {
    let player = cfg
        .player
        .as_deref()
        .and_then(get_from_path)
        .or_else(|| get_from_path("aplay"))
        .or_else(|| get_from_path("paplay"))
        .or_else(|| get_from_path("ffplay"));

    let Some(bin) = player else {
        info!(target: "tts", path = ?wav, "No audio player found; skipping playback");
        return Ok(());
    };

    let name = bin.file_name().and_then(|s| s.to_str()).unwrap_or("");
    let mut cmd = Command::new(&bin);
    if name == "ffplay" {
        cmd.arg("-autoexit").arg("-nodisp");
    }
    cmd.arg(wav);
    let status = cmd.status().map_err(ParleyError::IoError)?;
    if !status.success() {
        return Err(ParleyError::TtsError(format!(
            "{} exited with {:?}",
            name,
            status.code()
        )));
    }
    Ok(())
}

/// Best-effort termination of external audio processes by name. A missing
/// process and a missing `pkill` are both non-events.
pub fn kill_audio_processes<S: AsRef<str>>(names: &[S]) {
    for name in names {
        let name = name.as_ref();
        if name.is_empty() {
            continue;
        }
        match Command::new("pkill")
            .arg(name)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => {
                debug!(target: "tts", process = name, code = ?status.code(), "kill requested")
            }
            Err(e) => debug!(target: "tts", process = name, error = %e, "kill skipped"),
        }
    }
}

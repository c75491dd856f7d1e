//! Settings file handling: defaults, validation with fallback, hot reload.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareLap {
    SelfPrevious,
    SelfBest,
    SessionBest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedUnits {
    #[serde(rename = "mph")]
    Mph,
    #[serde(rename = "km/h")]
    Kmh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkSettings {
    pub enabled: bool,
    pub duration: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitSettings {
    pub enabled: bool,
    pub compare_lap: CompareLap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleSettings {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoTextSettings {
    pub sector_split: SplitSettings,
    pub lap_split: SplitSettings,
    pub position: ToggleSettings,
    pub remaining: ToggleSettings,
    pub duration: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrsPtpSettings {
    pub text: bool,
    pub led: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeutralSettings {
    pub symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedSettings {
    pub units: SpeedUnits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelSettings {
    pub enabled: bool,
    pub samples: f32,
    pub warning: f32,
    pub critical: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureSettings {
    pub enabled: bool,
    pub samples: f32,
    pub warning: f32,
    pub critical: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpmSettings {
    pub range: f32,
    pub shift: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub text_blink: BlinkSettings,
    pub led_blink: BlinkSettings,
    pub info_text: InfoTextSettings,
    pub drs_ptp: DrsPtpSettings,
    pub neutral: NeutralSettings,
    pub speed: SpeedSettings,
    pub fuel: FuelSettings,
    pub temperature: TemperatureSettings,
    pub rpm: RpmSettings,
}

impl Default for BlinkSettings {
    fn default() -> BlinkSettings {
        BlinkSettings { enabled: true, duration: 0.5 }
    }
}

impl Default for SplitSettings {
    fn default() -> SplitSettings {
        SplitSettings { enabled: true, compare_lap: CompareLap::SelfPrevious }
    }
}

impl Default for ToggleSettings {
    fn default() -> ToggleSettings {
        ToggleSettings { enabled: true }
    }
}

impl Default for InfoTextSettings {
    fn default() -> InfoTextSettings {
        InfoTextSettings {
            sector_split: SplitSettings { enabled: true, compare_lap: CompareLap::SessionBest },
            lap_split: SplitSettings { enabled: true, compare_lap: CompareLap::SelfPrevious },
            position: ToggleSettings::default(),
            remaining: ToggleSettings::default(),
            duration: 3.0,
        }
    }
}

impl Default for DrsPtpSettings {
    fn default() -> DrsPtpSettings {
        DrsPtpSettings { text: true, led: true }
    }
}

impl Default for NeutralSettings {
    fn default() -> NeutralSettings {
        NeutralSettings { symbol: "n".to_string() }
    }
}

impl Default for SpeedSettings {
    fn default() -> SpeedSettings {
        SpeedSettings { units: SpeedUnits::Mph }
    }
}

impl Default for FuelSettings {
    fn default() -> FuelSettings {
        FuelSettings { enabled: true, samples: 3.0, warning: 3.0, critical: 1.0 }
    }
}

impl Default for TemperatureSettings {
    fn default() -> TemperatureSettings {
        TemperatureSettings { enabled: true, samples: 3.0, warning: 7.0, critical: 12.0 }
    }
}

impl Default for RpmSettings {
    fn default() -> RpmSettings {
        RpmSettings { range: 0.13, shift: 0.95 }
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            text_blink: BlinkSettings { enabled: true, duration: 0.5 },
            led_blink: BlinkSettings { enabled: true, duration: 0.2 },
            info_text: InfoTextSettings::default(),
            drs_ptp: DrsPtpSettings::default(),
            neutral: NeutralSettings::default(),
            speed: SpeedSettings::default(),
            fuel: FuelSettings::default(),
            temperature: TemperatureSettings::default(),
            rpm: RpmSettings::default(),
        }
    }
}

const NEUTRAL_SYMBOLS: [&str; 5] = ["0", "n", "-", "_", " "];

fn check_range(name: &str, value: f32, default: f32, lo: f32, hi: f32) -> f32 {
    if value.is_finite() && value >= lo && value <= hi {
        value
    } else {
        warn!["Bad option value {} for {}, using default value {}", value, name, default];
        default
    }
}

impl Settings {
    /// Replaces every out-of-range value with its default, logging each
    /// substitution. Ranges match the documented tunables.
    pub fn validate(&mut self) {
        let d = Settings::default();
        self.text_blink.duration =
            check_range("text_blink.duration", self.text_blink.duration, d.text_blink.duration, 0.1, 1.0);
        self.led_blink.duration =
            check_range("led_blink.duration", self.led_blink.duration, d.led_blink.duration, 0.1, 1.0);
        self.info_text.duration =
            check_range("info_text.duration", self.info_text.duration, d.info_text.duration, 1.0, 5.0);
        self.fuel.samples = check_range("fuel.samples", self.fuel.samples, d.fuel.samples, 1.0, 5.0);
        self.fuel.warning = check_range("fuel.warning", self.fuel.warning, d.fuel.warning, 2.0, 5.0);
        self.fuel.critical = check_range("fuel.critical", self.fuel.critical, d.fuel.critical, 0.5, 2.0);
        self.temperature.samples =
            check_range("temperature.samples", self.temperature.samples, d.temperature.samples, 1.0, 5.0);
        self.temperature.warning =
            check_range("temperature.warning", self.temperature.warning, d.temperature.warning, 2.0, 10.0);
        self.temperature.critical =
            check_range("temperature.critical", self.temperature.critical, d.temperature.critical, 10.0, 20.0);
        self.rpm.range = check_range("rpm.range", self.rpm.range, d.rpm.range, 0.05, 0.33);
        self.rpm.shift = check_range("rpm.shift", self.rpm.shift, d.rpm.shift, 0.85, 1.0);
        if !NEUTRAL_SYMBOLS.contains(&self.neutral.symbol.as_str()) {
            warn![
                "Bad option value {:?} for neutral.symbol, using default value {:?}",
                self.neutral.symbol, d.neutral.symbol
            ];
            self.neutral.symbol = d.neutral.symbol;
        }
    }

    pub fn neutral_glyph(&self) -> char {
        self.neutral.symbol.chars().next().unwrap_or('n')
    }
}

/// Settings file with change detection. `poll()` re-reads the file only when
/// its mtime moves forward, mirroring the original reload-on-change loop.
pub struct SettingsFile {
    path: PathBuf,
    mtime: Option<SystemTime>,
    current: Settings,
}

impl SettingsFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SettingsFile, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let current = load_settings(&path)?;
        let mtime = fs::metadata(&path).and_then(|m| m.modified()).ok();
        Ok(SettingsFile { path, mtime, current })
    }

    pub fn settings(&self) -> &Settings {
        &self.current
    }

    /// Returns true when the file changed on disk and was re-read.
    pub fn poll(&mut self) -> bool {
        let mtime = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => return false,
        };
        if self.mtime.map_or(true, |seen| mtime > seen) {
            info!["Reading settings from {}", self.path.display()];
            match load_settings(&self.path) {
                Ok(settings) => {
                    self.current = settings;
                    self.mtime = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
                    return true;
                }
                Err(err) => warn!["Failed to reload settings: {}", err],
            }
        }
        false
    }
}

/// Reads, validates, and writes back the settings file. A missing or
/// unparseable file yields the defaults (and creates the file).
fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let mut settings = match fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str::<Settings>(&text) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!["Invalid or missing settings file, creating using defaults ({})", err];
                Settings::default()
            }
        },
        Err(_) => {
            info!["No settings file at {}, creating using defaults", path.display()];
            Settings::default()
        }
    };
    settings.validate();
    fs::write(path, serde_json::to_string_pretty(&settings)?)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert!(s.text_blink.enabled);
        assert_eq!(s.text_blink.duration, 0.5);
        assert_eq!(s.led_blink.duration, 0.2);
        assert_eq!(s.info_text.duration, 3.0);
        assert_eq!(s.info_text.lap_split.compare_lap, CompareLap::SelfPrevious);
        assert_eq!(s.info_text.sector_split.compare_lap, CompareLap::SessionBest);
        assert_eq!(s.neutral.symbol, "n");
        assert_eq!(s.speed.units, SpeedUnits::Mph);
        assert_eq!(s.fuel.warning, 3.0);
        assert_eq!(s.fuel.critical, 1.0);
        assert_eq!(s.temperature.warning, 7.0);
        assert_eq!(s.temperature.critical, 12.0);
        assert_eq!(s.rpm.range, 0.13);
        assert_eq!(s.rpm.shift, 0.95);
    }

    #[test]
    fn out_of_range_values_fall_back_to_defaults() {
        let mut s = Settings::default();
        s.text_blink.duration = 3.0;
        s.rpm.shift = 0.5;
        s.fuel.warning = -1.0;
        s.temperature.critical = f32::NAN;
        s.validate();
        assert_eq!(s.text_blink.duration, 0.5);
        assert_eq!(s.rpm.shift, 0.95);
        assert_eq!(s.fuel.warning, 3.0);
        assert_eq!(s.temperature.critical, 12.0);
    }

    #[test]
    fn in_range_values_survive_validation() {
        let mut s = Settings::default();
        s.led_blink.duration = 0.3;
        s.rpm.range = 0.2;
        s.neutral.symbol = "-".to_string();
        s.validate();
        assert_eq!(s.led_blink.duration, 0.3);
        assert_eq!(s.rpm.range, 0.2);
        assert_eq!(s.neutral.symbol, "-");
    }

    #[test]
    fn unknown_neutral_symbol_rejected() {
        let mut s = Settings::default();
        s.neutral.symbol = "x".to_string();
        s.validate();
        assert_eq!(s.neutral.symbol, "n");
    }

    #[test]
    fn missing_keys_take_defaults() {
        let s: Settings = serde_json::from_str(r#"{"speed":{"units":"km/h"}}"#).unwrap();
        assert_eq!(s.speed.units, SpeedUnits::Kmh);
        assert_eq!(s.fuel.samples, 3.0);
        assert!(s.info_text.remaining.enabled);
    }

    #[test]
    fn compare_lap_round_trips_snake_case() {
        let json = serde_json::to_string(&CompareLap::SessionBest).unwrap();
        assert_eq!(json, r#""session_best""#);
        let parsed: CompareLap = serde_json::from_str(r#""self_best""#).unwrap();
        assert_eq!(parsed, CompareLap::SelfBest);
    }

    #[test]
    fn neutral_glyph_first_char() {
        let mut s = Settings::default();
        assert_eq!(s.neutral_glyph(), 'n');
        s.neutral.symbol = " ".to_string();
        assert_eq!(s.neutral_glyph(), ' ');
    }
}

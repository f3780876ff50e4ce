use crate::game::gameplay::{DEFAULT_END_DELAY_SECONDS, DEFAULT_TRAVEL_TIME_SECONDS, SessionConfig};
use crate::game::timing_windows::TimingWindows;
use log::{info, warn};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::str::FromStr;

pub const CONFIG_PATH: &str = "stepsync.ini";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: FxHashMap<String, FxHashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.load_str(&content);
        Ok(())
    }

    pub fn load_str(&mut self, content: &str) {
        self.sections.clear();
        let mut current_section: Option<String> = None;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // Section header: [SectionName]
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let section = line[1..line.len() - 1].trim().to_string();
                current_section = Some(section.clone());
                self.sections.entry(section).or_default();
                continue;
            }

            if let Some((key_raw, value_raw)) = line.split_once('=') {
                let key = key_raw.trim();
                if key.is_empty() {
                    continue;
                }
                let section = current_section.clone().unwrap_or_default();
                self.sections
                    .entry(section)
                    .or_default()
                    .insert(key.to_string(), value_raw.trim().to_string());
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }

    pub fn get_section(&self, section: &str) -> Option<&FxHashMap<String, String>> {
        self.sections.get(section)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub log_level: LogLevel,
    /// Output-latency compensation subtracted from song time.
    pub global_offset_seconds: f64,
    pub travel_time_seconds: f64,
    pub end_when_chart_finished: bool,
    pub end_delay_seconds: f64,
    pub cache_songs: bool,
    pub windows: TimingWindows,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            global_offset_seconds: 0.0,
            travel_time_seconds: DEFAULT_TRAVEL_TIME_SECONDS,
            end_when_chart_finished: true,
            end_delay_seconds: DEFAULT_END_DELAY_SECONDS,
            cache_songs: true,
            windows: TimingWindows::default(),
        }
    }
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            travel_time_seconds: self.travel_time_seconds,
            windows: self.windows,
            end_when_chart_finished: self.end_when_chart_finished,
            end_delay_seconds: self.end_delay_seconds,
            output_latency_seconds: self.global_offset_seconds,
        }
    }

    /// Reads every known key, keeping defaults for missing or malformed ones.
    pub fn from_ini(conf: &SimpleIni) -> Self {
        let default = Self::default();
        let flag = |key: &str, fallback: bool| {
            conf.get("Options", key)
                .and_then(|v| v.parse::<u8>().ok())
                .map_or(fallback, |v| v != 0)
        };
        let seconds = |key: &str, fallback: f64| {
            conf.get("Options", key)
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(fallback)
        };

        Self {
            log_level: conf
                .get("Options", "LogLevel")
                .and_then(|v| LogLevel::from_str(&v).ok())
                .unwrap_or(default.log_level),
            global_offset_seconds: seconds("GlobalOffsetSeconds", default.global_offset_seconds),
            travel_time_seconds: Some(seconds("TravelTimeSeconds", default.travel_time_seconds))
                .filter(|v| *v > 0.0)
                .unwrap_or(default.travel_time_seconds),
            end_when_chart_finished: flag("EndWhenChartFinished", default.end_when_chart_finished),
            end_delay_seconds: seconds("EndDelaySeconds", default.end_delay_seconds).max(0.0),
            cache_songs: flag("CacheSongs", default.cache_songs),
            windows: load_timing_windows(conf, default.windows),
        }
    }
}

fn load_timing_windows(conf: &SimpleIni, default: TimingWindows) -> TimingWindows {
    let Some(section) = conf.get_section("Timing") else {
        return default;
    };
    let read = |key: &str, fallback: f32| {
        section
            .get(key)
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(fallback)
    };
    let custom = TimingWindows::new(
        read("Marvelous", default.marvelous),
        read("Perfect", default.perfect),
        read("Great", default.great),
        read("Good", default.good),
        read("Miss", default.miss),
    );
    custom.unwrap_or_else(|| {
        warn!("[Timing] windows must be positive and strictly increasing. Using default windows.");
        default
    })
}

// --- File I/O ---

fn default_config_content() -> String {
    let default = Config::default();
    let mut content = String::new();

    // [Options] section - keys in alphabetical order
    content.push_str("[Options]\n");
    content.push_str(&format!("CacheSongs={}\n", if default.cache_songs { "1" } else { "0" }));
    content.push_str(&format!("EndDelaySeconds={}\n", default.end_delay_seconds));
    content.push_str(&format!(
        "EndWhenChartFinished={}\n",
        if default.end_when_chart_finished { "1" } else { "0" }
    ));
    content.push_str(&format!("GlobalOffsetSeconds={}\n", default.global_offset_seconds));
    content.push_str(&format!("LogLevel={}\n", default.log_level.as_str()));
    content.push_str(&format!("TravelTimeSeconds={}\n", default.travel_time_seconds));
    content.push('\n');

    content.push_str("[Timing]\n");
    content.push_str(&format!("Good={}\n", default.windows.good));
    content.push_str(&format!("Great={}\n", default.windows.great));
    content.push_str(&format!("Marvelous={}\n", default.windows.marvelous));
    content.push_str(&format!("Miss={}\n", default.windows.miss));
    content.push_str(&format!("Perfect={}\n", default.windows.perfect));
    content
}

fn create_default_config_file(path: &Path) -> Result<(), std::io::Error> {
    info!("'{}' not found, creating with default values.", path.display());
    std::fs::write(path, default_config_content())
}

/// Loads the config at `path`, writing a default file first if none exists.
/// Any failure falls back to defaults.
pub fn load(path: &Path) -> Config {
    if !path.exists()
        && let Err(e) = create_default_config_file(path)
    {
        warn!("Failed to create default config file: {e}");
    }

    let mut conf = SimpleIni::new();
    match conf.load(path) {
        Ok(()) => {
            let cfg = Config::from_ini(&conf);
            info!("Configuration loaded from '{}'.", path.display());
            cfg
        }
        Err(e) => {
            warn!("Failed to load '{}': {e}. Using default values.", path.display());
            Config::default()
        }
    }
}

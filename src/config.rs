//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::controller::deadzone::Deadzones;
use crate::error::{BridgeError, Result};

/// Default configuration file location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Which handset transport to drive
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HandsetModel {
    /// DJI RC3 / FPV Remote Controller 3, enumerated as a USB joystick
    Rc3,
    /// DJI RC-N1, speaking DUML over its USB serial port
    N1,
}

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_controller_config")]
    pub controller: ControllerConfig,
    #[serde(default = "default_serial_config")]
    pub serial: SerialConfig,
    #[serde(default = "default_keyboard_config")]
    pub keyboard: KeyboardConfig,
}

/// Handset configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    #[serde(default = "default_model")]
    pub model: HandsetModel,

    /// Substring of the joystick name to match; empty picks the first joystick
    #[serde(default)]
    pub joystick_name: String,

    #[serde(default = "default_deadzone_movement")]
    pub deadzone_movement: f32,

    #[serde(default = "default_deadzone_elevation")]
    pub deadzone_elevation: f32,

    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,

    #[serde(default = "default_poll_rate_hz")]
    pub poll_rate_hz: u32,

    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,

    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

/// Serial port configuration (RC-N1 only)
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Virtual keyboard configuration
#[derive(Debug, Deserialize, Clone)]
pub struct KeyboardConfig {
    /// Inject keys into the OS; when false events are only logged
    #[serde(default = "default_emulate_hardware")]
    pub emulate_hardware: bool,

    #[serde(default = "default_print_events")]
    pub print_events: bool,

    #[serde(default = "default_tap_ms")]
    pub tap_ms: u64,

    #[serde(default = "default_emergency_pause_ms")]
    pub emergency_pause_ms: u64,
}

// Default value functions
fn default_model() -> HandsetModel { HandsetModel::Rc3 }
fn default_deadzone_movement() -> f32 { 0.3 }
fn default_deadzone_elevation() -> f32 { 0.6 }
fn default_long_press_ms() -> u64 { 1000 }
fn default_poll_rate_hz() -> u32 { 100 }
fn default_connect_retries() -> u32 { 15 }
fn default_retry_interval_ms() -> u64 { 1000 }

fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 100 }

fn default_emulate_hardware() -> bool { true }
fn default_print_events() -> bool { true }
fn default_tap_ms() -> u64 { 80 }
fn default_emergency_pause_ms() -> u64 { 3000 }

fn default_controller_config() -> ControllerConfig {
    ControllerConfig {
        model: default_model(),
        joystick_name: String::new(),
        deadzone_movement: default_deadzone_movement(),
        deadzone_elevation: default_deadzone_elevation(),
        long_press_ms: default_long_press_ms(),
        poll_rate_hz: default_poll_rate_hz(),
        connect_retries: default_connect_retries(),
        retry_interval_ms: default_retry_interval_ms(),
    }
}

fn default_serial_config() -> SerialConfig {
    SerialConfig {
        port: default_serial_port(),
        baud_rate: default_baud_rate(),
        timeout_ms: default_timeout_ms(),
    }
}

fn default_keyboard_config() -> KeyboardConfig {
    KeyboardConfig {
        emulate_hardware: default_emulate_hardware(),
        print_events: default_print_events(),
        tap_ms: default_tap_ms(),
        emergency_pause_ms: default_emergency_pause_ms(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            controller: default_controller_config(),
            serial: default_serial_config(),
            keyboard: default_keyboard_config(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_keybridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or fall back to defaults if the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Poll period derived from `poll_rate_hz`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.controller.poll_rate_hz))
    }

    /// Threshold after which a held button counts as a long press
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.controller.long_press_ms)
    }

    /// Deadzone thresholds for controller sources
    pub fn deadzones(&self) -> Deadzones {
        Deadzones::new(
            self.controller.deadzone_movement,
            self.controller.deadzone_elevation,
        )
    }

    /// Read timeout for one serial frame
    pub fn serial_timeout(&self) -> Duration {
        Duration::from_millis(self.serial.timeout_ms)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("deadzone_movement", self.controller.deadzone_movement),
            ("deadzone_elevation", self.controller.deadzone_elevation),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(BridgeError::Config(toml::de::Error::custom(format!(
                    "{} must be between 0.0 and 1.0",
                    name
                ))));
            }
        }

        if self.controller.long_press_ms == 0 || self.controller.long_press_ms > 10000 {
            return Err(BridgeError::Config(toml::de::Error::custom(
                "long_press_ms must be between 1 and 10000",
            )));
        }

        if self.controller.poll_rate_hz == 0 || self.controller.poll_rate_hz > 1000 {
            return Err(BridgeError::Config(toml::de::Error::custom(
                "poll_rate_hz must be between 1 and 1000",
            )));
        }

        if self.controller.connect_retries == 0 {
            return Err(BridgeError::Config(toml::de::Error::custom(
                "connect_retries must be greater than 0",
            )));
        }

        if self.controller.retry_interval_ms == 0 || self.controller.retry_interval_ms > 60000 {
            return Err(BridgeError::Config(toml::de::Error::custom(
                "retry_interval_ms must be between 1 and 60000",
            )));
        }

        // Serial settings only matter for the N1 but are checked for every model
        if self.serial.port.is_empty() {
            return Err(BridgeError::Config(toml::de::Error::custom(
                "serial port cannot be empty",
            )));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(BridgeError::Config(toml::de::Error::custom(
                "timeout_ms must be between 1 and 10000",
            )));
        }

        if ![9600, 57600, 115200, 230400, 921600].contains(&self.serial.baud_rate) {
            return Err(BridgeError::Config(toml::de::Error::custom(
                "baud_rate must be one of: 9600, 57600, 115200, 230400, 921600",
            )));
        }

        if self.keyboard.tap_ms == 0 || self.keyboard.tap_ms > 1000 {
            return Err(BridgeError::Config(toml::de::Error::custom(
                "tap_ms must be between 1 and 1000",
            )));
        }

        if self.keyboard.emergency_pause_ms > 60000 {
            return Err(BridgeError::Config(toml::de::Error::custom(
                "emergency_pause_ms must be at most 60000",
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.controller.model, HandsetModel::Rc3);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[controller]
model = "n1"
deadzone_movement = 0.1

[serial]
port = "/dev/ttyUSB0"

[keyboard]
emulate_hardware = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.controller.model, HandsetModel::N1);
        assert_eq!(config.controller.deadzone_movement, 0.1);
        assert_eq!(config.controller.deadzone_elevation, 0.6);
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert!(!config.keyboard.emulate_hardware);
        assert!(config.keyboard.print_events);
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        use tempfile::NamedTempFile;

        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.controller.long_press_ms, 1000);
        assert_eq!(config.serial.baud_rate, 115200);
    }

    #[test]
    fn test_load_unknown_model_fails() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[controller]\nmodel = \"m300\"\n").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/rc-keybridge.toml").unwrap();
        assert_eq!(config.controller.poll_rate_hz, 100);
    }

    #[test]
    fn test_deadzone_out_of_range() {
        let mut config = Config::default();
        config.controller.deadzone_movement = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.controller.deadzone_elevation = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_long_press_bounds() {
        let mut config = Config::default();
        config.controller.long_press_ms = 0;
        assert!(config.validate().is_err());
        config.controller.long_press_ms = 10001;
        assert!(config.validate().is_err());
        config.controller.long_press_ms = 1500;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_rate_bounds() {
        let mut config = Config::default();
        config.controller.poll_rate_hz = 0;
        assert!(config.validate().is_err());
        config.controller.poll_rate_hz = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connect_retries_zero() {
        let mut config = Config::default();
        config.controller.connect_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = Config::default();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_zero() {
        let mut config = Config::default();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tap_ms_zero() {
        let mut config = Config::default();
        config.keyboard.tap_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_durations() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.long_press(), Duration::from_secs(1));
        assert_eq!(config.serial_timeout(), Duration::from_millis(100));
        assert_eq!(config.deadzones(), Deadzones::new(0.3, 0.6));
    }

    #[test]
    fn test_shipped_config_file_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.controller.model, HandsetModel::Rc3);
        assert_eq!(config.controller.poll_rate_hz, 100);
        assert_eq!(config.serial.port, "/dev/ttyACM0");
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_deadzone_movement(), 0.3);
        assert_eq!(default_deadzone_elevation(), 0.6);
        assert_eq!(default_long_press_ms(), 1000);
        assert_eq!(default_poll_rate_hz(), 100);
        assert_eq!(default_connect_retries(), 15);
        assert_eq!(default_retry_interval_ms(), 1000);
        assert_eq!(default_serial_port(), "/dev/ttyACM0");
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_timeout_ms(), 100);
        assert!(default_emulate_hardware());
        assert!(default_print_events());
        assert_eq!(default_tap_ms(), 80);
        assert_eq!(default_emergency_pause_ms(), 3000);
    }
}

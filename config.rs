use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_WU_URL: &str =
    "http://weatherstation.wunderground.com/weatherstation/updateweatherstation.php";
pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

const DEFAULT_MEASUREMENT_INTERVAL: i64 = 10;
const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 10;
const DEFAULT_I2C_BUS: u8 = 1;

/// Upload interval in minutes, always within `1..=60`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementInterval(u32);

impl MeasurementInterval {
    pub fn new(minutes: i64) -> Result<Self, ConfigError> {
        if minutes <= 0 || minutes > 60 {
            return Err(ConfigError::IntervalOutOfRange(minutes));
        }
        Ok(Self(minutes as u32))
    }

    pub fn minutes(self) -> u32 {
        self.0
    }
}

impl Default for MeasurementInterval {
    fn default() -> Self {
        Self(DEFAULT_MEASUREMENT_INTERVAL as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpuTempSource {
    ThermalZone(PathBuf),
    Vcgencmd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub station_id: String,
    pub station_key: String,
    pub interval: MeasurementInterval,
    pub upload_enabled: bool,
    pub upload_url: String,
    pub upload_timeout: Duration,
    pub cpu_temp: CpuTempSource,
    pub i2c_bus: u8,
}

impl Config {
    /// Loads `.env` if present, then reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Ignoring unreadable .env file: {}", e);
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as missing, same as an absent variable.
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let interval = match get("MEASUREMENT_INTERVAL") {
            Some(raw) => {
                let minutes = raw.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
                    key: "MEASUREMENT_INTERVAL",
                    value: raw.clone(),
                })?;
                MeasurementInterval::new(minutes)?
            }
            None => MeasurementInterval::default(),
        };

        let station_id = get("WU_STATION_ID").ok_or(ConfigError::MissingStationId)?;
        let station_key = get("WU_STATION_KEY").ok_or(ConfigError::MissingStationKey)?;

        let upload_enabled = match get("WEATHER_UPLOAD") {
            Some(raw) => parse_bool("WEATHER_UPLOAD", &raw)?,
            None => true,
        };

        let upload_url = get("WU_URL").unwrap_or_else(|| DEFAULT_WU_URL.to_string());
        if !upload_url.starts_with("http://") && !upload_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "WU_URL",
                value: upload_url,
            });
        }

        let upload_timeout = match get("UPLOAD_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "UPLOAD_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
        };

        let cpu_temp = match get("CPU_TEMP_SOURCE") {
            Some(raw) if raw.eq_ignore_ascii_case("vcgencmd") => CpuTempSource::Vcgencmd,
            Some(raw) => CpuTempSource::ThermalZone(PathBuf::from(raw)),
            None => CpuTempSource::ThermalZone(PathBuf::from(DEFAULT_THERMAL_ZONE)),
        };

        let i2c_bus = match get("SENSE_HAT_I2C_BUS") {
            Some(raw) => raw.parse::<u8>().map_err(|_| ConfigError::InvalidValue {
                key: "SENSE_HAT_I2C_BUS",
                value: raw.clone(),
            })?,
            None => DEFAULT_I2C_BUS,
        };

        Ok(Config {
            station_id,
            station_key,
            interval,
            upload_enabled,
            upload_url,
            upload_timeout,
            cpu_temp,
            i2c_bus,
        })
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

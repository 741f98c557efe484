use std::process::Command;

use crate::config::CpuTempSource;
use crate::error::SensorError;

/// Host processor temperature, used to correct the Sense HAT self-heating.
pub trait CpuTemperature {
    fn read_cpu_temp_c(&mut self) -> Result<f64, SensorError>;
}

pub struct CpuBiasEstimator {
    source: CpuTempSource,
}

impl CpuBiasEstimator {
    pub fn new(source: CpuTempSource) -> Self {
        Self { source }
    }
}

impl CpuTemperature for CpuBiasEstimator {
    fn read_cpu_temp_c(&mut self) -> Result<f64, SensorError> {
        match &self.source {
            CpuTempSource::ThermalZone(path) => {
                let text = std::fs::read_to_string(path).map_err(SensorError::CpuTelemetry)?;
                parse_millidegrees(&text)
            }
            CpuTempSource::Vcgencmd => {
                let output = Command::new("vcgencmd")
                    .arg("measure_temp")
                    .output()
                    .map_err(SensorError::CpuTelemetry)?;
                parse_vcgencmd(&String::from_utf8_lossy(&output.stdout))
            }
        }
    }
}

// sysfs thermal zones report integer millidegrees, e.g. "48312\n"
fn parse_millidegrees(text: &str) -> Result<f64, SensorError> {
    let trimmed = text.trim();
    trimmed
        .parse::<i64>()
        .map(|milli| milli as f64 / 1000.0)
        .map_err(|_| SensorError::CpuParse(trimmed.to_string()))
}

// "temp=48.3'C"
fn parse_vcgencmd(text: &str) -> Result<f64, SensorError> {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("temp=")
        .and_then(|rest| rest.strip_suffix("'C"))
        .and_then(|value| value.parse::<f64>().ok())
        .ok_or_else(|| SensorError::CpuParse(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_thermal_zone() {
        assert_eq!(parse_millidegrees("48312\n").unwrap(), 48.312);
        assert_eq!(parse_millidegrees("-5000").unwrap(), -5.0);
        assert!(matches!(parse_millidegrees("hot"), Err(SensorError::CpuParse(_))));
        assert!(matches!(parse_millidegrees(""), Err(SensorError::CpuParse(_))));
    }

    #[test]
    fn parses_vcgencmd() {
        assert_eq!(parse_vcgencmd("temp=48.3'C\n").unwrap(), 48.3);
        assert_eq!(parse_vcgencmd("temp=60.0'C").unwrap(), 60.0);
        assert!(matches!(
            parse_vcgencmd("VCHI initialization failed"),
            Err(SensorError::CpuParse(_))
        ));
    }

    #[test]
    fn reads_thermal_zone_file() {
        let path = std::env::temp_dir().join(format!("piweather-thermal-{}", std::process::id()));
        std::fs::write(&path, "51250\n").unwrap();
        let mut cpu = CpuBiasEstimator::new(CpuTempSource::ThermalZone(path.clone()));
        assert_eq!(cpu.read_cpu_temp_c().unwrap(), 51.25);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_thermal_zone_is_unavailable() {
        let mut cpu = CpuBiasEstimator::new(CpuTempSource::ThermalZone(PathBuf::from(
            "/nonexistent/thermal_zone9/temp",
        )));
        assert!(matches!(cpu.read_cpu_temp_c(), Err(SensorError::CpuTelemetry(_))));
    }
}

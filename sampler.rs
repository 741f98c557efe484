use crate::cpu::CpuTemperature;
use crate::error::SensorError;
use crate::sense_hat::EnvironmentSensor;
use crate::smoothing::SmoothingFilter;
use crate::structs::{CorrectedReading, RawReading};

// Empirical damping applied to the CPU's excess heat over the sensor average.
const CPU_BIAS_DIVISOR: f64 = 1.5;
const MB_TO_IN_HG: f64 = 0.0295300;

pub fn c_to_f(temp_c: f64) -> f64 {
    temp_c * 1.8 + 32.0
}

pub fn mb_to_in_hg(pressure_mb: f64) -> f64 {
    round_to(pressure_mb * MB_TO_IN_HG, 1)
}

// Halves go to the even neighbour, so 44.5 rounds to 44 and 45.5 to 46.
fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// The Sense HAT sits over the Pi's CPU, so both of its temperature sensors
/// read high. The CPU's excess heat over the sensor average is treated as a
/// proportional bias and subtracted.
pub fn compensate_cpu_heat(sensor_avg_c: f64, cpu_c: f64) -> f64 {
    sensor_avg_c - ((cpu_c - sensor_avg_c) / CPU_BIAS_DIVISOR)
}

/// Turns raw Sense HAT values into a corrected reading. Holds the one
/// smoothing filter for the life of the station.
pub struct TemperatureSampler<S, C> {
    sensor: S,
    cpu: C,
    filter: SmoothingFilter,
}

impl<S, C> TemperatureSampler<S, C>
where
    S: EnvironmentSensor,
    C: CpuTemperature,
{
    pub fn new(sensor: S, cpu: C) -> Self {
        Self {
            sensor,
            cpu,
            filter: SmoothingFilter::new(),
        }
    }

    pub fn sample(&mut self) -> Result<CorrectedReading, SensorError> {
        let raw = self.read_raw()?;
        let cpu_c = self.cpu.read_cpu_temp_c()?;
        Ok(self.correct(&raw, cpu_c))
    }

    fn read_raw(&mut self) -> Result<RawReading, SensorError> {
        Ok(RawReading {
            humidity_derived_temp_c: self.sensor.humidity_derived_temperature()?,
            pressure_derived_temp_c: self.sensor.pressure_derived_temperature()?,
            humidity_pct: self.sensor.humidity()?,
            pressure_mb: self.sensor.pressure()?,
        })
    }

    fn correct(&mut self, raw: &RawReading, cpu_c: f64) -> CorrectedReading {
        let avg = (raw.humidity_derived_temp_c + raw.pressure_derived_temp_c) / 2.0;
        let smoothed = self.filter.update(compensate_cpu_heat(avg, cpu_c));
        log::trace!("raw {:?}, cpu {:.1}C, smoothed {:.3}C", raw, cpu_c, smoothed);

        CorrectedReading {
            temp_c: round_to(smoothed, 1),
            temp_f: round_to(c_to_f(smoothed), 1),
            humidity_pct: round_to(raw.humidity_pct, 0),
            pressure_in_hg: mb_to_in_hg(raw.pressure_mb),
        }
    }
}

use std::fmt::Display;

use chrono::Timelike;
use log::{info, warn};

use crate::config::MeasurementInterval;
use crate::cpu::CpuTemperature;
use crate::display::{render_temperature, LedMatrix};
use crate::sampler::TemperatureSampler;
use crate::sense_hat::EnvironmentSensor;
use crate::structs::CorrectedReading;
use crate::upload::Reporter;

// Sampling runs every 5 seconds because the smoothing depends on frequent readings.
const SAMPLE_EVERY_SECS: u32 = 5;

pub fn is_sample_second(second: u32) -> bool {
    second == 0 || second % SAMPLE_EVERY_SECS == 0
}

/// Tracks the last clock minute seen so each qualifying minute uploads once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleState {
    interval: MeasurementInterval,
    last_seen_minute: u32,
}

impl ScheduleState {
    /// Starts as if the previous minute was already handled, so a start on an
    /// interval minute uploads right away.
    pub fn new(interval: MeasurementInterval, start_minute: u32) -> Self {
        Self {
            interval,
            last_seen_minute: (start_minute % 60 + 59) % 60,
        }
    }

    /// Returns true at most once per distinct minute value, and only when the
    /// minute is 0 or a multiple of the interval.
    pub fn claim_upload(&mut self, minute: u32) -> bool {
        if minute == self.last_seen_minute {
            return false;
        }
        self.last_seen_minute = minute;
        minute == 0 || minute % self.interval.minutes() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Idle,
    SampleFailed,
    Sampled(CorrectedReading),
    Uploaded(CorrectedReading),
    UploadFailed(CorrectedReading),
    UploadSkipped(CorrectedReading),
}

pub struct SampleScheduler<S, C, D, R> {
    sampler: TemperatureSampler<S, C>,
    display: D,
    reporter: Option<R>,
    state: ScheduleState,
}

impl<S, C, D, R> SampleScheduler<S, C, D, R>
where
    S: EnvironmentSensor,
    C: CpuTemperature,
    D: LedMatrix,
    R: Reporter,
{
    /// `reporter` is `None` when uploads are disabled; the upload gate still
    /// runs and logs.
    pub fn new(
        sampler: TemperatureSampler<S, C>,
        display: D,
        reporter: Option<R>,
        state: ScheduleState,
    ) -> Self {
        Self {
            sampler,
            display,
            reporter,
            state,
        }
    }

    pub fn on_tick<T>(&mut self, now: &T) -> TickOutcome
    where
        T: Timelike + Display,
    {
        if !is_sample_second(now.second()) {
            return TickOutcome::Idle;
        }

        let reading = match self.sampler.sample() {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Skipping sample: {}", e);
                return TickOutcome::SampleFailed;
            }
        };
        info!(
            "Temp: {:.1}F ({:.1}C), Pressure: {:.1} inHg, Humidity: {:.0}%",
            reading.temp_f, reading.temp_c, reading.pressure_in_hg, reading.humidity_pct
        );

        let frame = render_temperature(reading.temp_f.round_ties_even() as i32);
        if let Err(e) = self.display.set_pixels(&frame) {
            warn!("Unable to update LED matrix: {}", e);
        }

        let minute = now.minute();
        if !self.state.claim_upload(minute) {
            return TickOutcome::Sampled(reading);
        }
        info!(
            "{} minute mark ({} @ {})",
            self.state.interval.minutes(),
            minute,
            now
        );
        self.upload(reading)
    }

    fn upload(&mut self, reading: CorrectedReading) -> TickOutcome {
        let reporter = match self.reporter.as_mut() {
            Some(reporter) => reporter,
            None => {
                info!("Skipping Weather Underground upload");
                return TickOutcome::UploadSkipped(reading);
            }
        };

        info!("Uploading data to Weather Underground");
        match reporter.upload(&reading) {
            Ok(body) => {
                info!("Server response: {}", body);
                TickOutcome::Uploaded(reading)
            }
            Err(e) => {
                warn!("Upload failed: {}", e);
                TickOutcome::UploadFailed(reading)
            }
        }
    }
}

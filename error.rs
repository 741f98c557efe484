use thiserror::Error;

/// Failures reading the Sense HAT chips or the host CPU temperature.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("I2C transfer failed: {0}")]
    I2c(#[from] rppal::i2c::Error),

    #[error("unexpected WHO_AM_I 0x{found:02X} at address 0x{address:02X} (expected 0x{expected:02X})")]
    WrongDevice { address: u16, expected: u8, found: u8 },

    #[error("CPU temperature unavailable: {0}")]
    CpuTelemetry(#[source] std::io::Error),

    #[error("unparseable CPU temperature output {0:?}")]
    CpuParse(String),
}

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("no framebuffer named {0:?} under /sys/class/graphics")]
    NotFound(&'static str),

    #[error("framebuffer I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Upload failures that the scheduler swallows. Anything else is a bug and
/// is not caught here.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not read response body: {0}")]
    Body(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing station ID (set WU_STATION_ID)")]
    MissingStationId,

    #[error("missing station key (set WU_STATION_KEY)")]
    MissingStationKey,

    #[error("MEASUREMENT_INTERVAL must be between 1 and 60 minutes, got {0}")]
    IntervalOutOfRange(i64),

    #[error("{key} has invalid value {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

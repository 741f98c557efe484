// Values straight off the Sense HAT for one sample tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    pub humidity_derived_temp_c: f64,
    pub pressure_derived_temp_c: f64,
    pub humidity_pct: f64,
    pub pressure_mb: f64,
}

// Bias-corrected, smoothed and rounded reading ready for display and upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectedReading {
    pub temp_c: f64,
    pub temp_f: f64,
    pub humidity_pct: f64,
    pub pressure_in_hg: f64,
}

// HTS221 factory calibration. Two reference points per quantity, used for
// linear interpolation of the raw ADC outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HumidityCalibration {
    pub h0_rh: f64,
    pub h1_rh: f64,
    pub h0_t0_out: i16,
    pub h1_t0_out: i16,
    pub t0_deg_c: f64,
    pub t1_deg_c: f64,
    pub t0_out: i16,
    pub t1_out: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

pub const MATRIX_SIDE: usize = 8;
pub const MATRIX_PIXELS: usize = MATRIX_SIDE * MATRIX_SIDE;

// Row-major 8x8 frame for the LED matrix.
pub type Frame = [Rgb; MATRIX_PIXELS];

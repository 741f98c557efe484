const WINDOW: usize = 3;

/// Three-sample moving average over corrected temperatures.
///
/// The first value seeds every slot, so the output starts at the first input
/// instead of ramping up from zero.
#[derive(Debug, Clone, Default)]
pub struct SmoothingFilter {
    // newest first
    window: Option<[f64; WINDOW]>,
}

impl SmoothingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, x: f64) -> f64 {
        let window = self.window.get_or_insert([x; WINDOW]);
        window.rotate_right(1);
        window[0] = x;
        window.iter().sum::<f64>() / WINDOW as f64
    }

    #[cfg(test)]
    fn window(&self) -> Option<[f64; WINDOW]> {
        self.window
    }
}

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::error::DisplayError;
use crate::structs::{Frame, Rgb, MATRIX_PIXELS, MATRIX_SIDE};

const SENSE_HAT_FB_NAME: &str = "RPi-Sense FB";
const GRAPHICS_CLASS: &str = "/sys/class/graphics";

const BLUE: Rgb = Rgb::new(0, 0, 255);
const RED: Rgb = Rgb::new(255, 0, 0);
const YELLOW: Rgb = Rgb::new(255, 255, 0);
const OFF: Rgb = Rgb::new(0, 0, 0);

const GLYPH_WIDTH: usize = 4;

// 4x8 digit glyphs, one byte per row, high nibble unused.
const DIGITS: [[u8; MATRIX_SIDE]; 10] = [
    [0b1111, 0b1001, 0b1001, 0b1001, 0b1001, 0b1001, 0b1001, 0b1111], // 0
    [0b0110, 0b0110, 0b0110, 0b0110, 0b0110, 0b0110, 0b0110, 0b0110], // 1
    [0b1111, 0b0001, 0b0001, 0b1111, 0b1000, 0b1000, 0b1000, 0b1111], // 2
    [0b1111, 0b0001, 0b0001, 0b1111, 0b0001, 0b0001, 0b0001, 0b1111], // 3
    [0b1001, 0b1001, 0b1001, 0b1111, 0b0001, 0b0001, 0b0001, 0b0001], // 4
    [0b1111, 0b1000, 0b1000, 0b1111, 0b0001, 0b0001, 0b0001, 0b1111], // 5
    [0b1111, 0b1000, 0b1000, 0b1111, 0b1001, 0b1001, 0b1001, 0b1111], // 6
    [0b1111, 0b0001, 0b0001, 0b0001, 0b0001, 0b0001, 0b0001, 0b0001], // 7
    [0b1111, 0b1001, 0b1001, 0b1111, 0b1001, 0b1001, 0b1001, 0b1111], // 8
    [0b1111, 0b1001, 0b1001, 0b1111, 0b0001, 0b0001, 0b0001, 0b0001], // 9
];

// "In", shown at startup.
const BANNER: [[u8; MATRIX_SIDE]; 2] = [
    [0b1110, 0b0100, 0b0100, 0b0100, 0b0100, 0b0100, 0b0100, 0b1110],
    [0b0000, 0b0000, 0b1110, 0b1001, 0b1001, 0b1001, 0b1001, 0b1001],
];

pub trait LedMatrix {
    fn set_pixels(&mut self, frame: &Frame) -> Result<(), DisplayError>;

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.set_pixels(&[OFF; MATRIX_PIXELS])
    }

    /// Shows the startup banner for `hold`, then blanks the matrix.
    fn show_banner(&mut self, hold: Duration) -> Result<(), DisplayError> {
        self.set_pixels(&render_banner())?;
        thread::sleep(hold);
        self.clear()
    }
}

/// Renders the last two digits of `temp_f`: tens in blue on the left half,
/// ones in red on the right half. Negative values and values above 99 wrap.
pub fn render_temperature(temp_f: i32) -> Frame {
    let tens = (temp_f.rem_euclid(100) / 10) as usize;
    let ones = temp_f.rem_euclid(10) as usize;
    render_pair((&DIGITS[tens], BLUE), (&DIGITS[ones], RED), OFF)
}

/// Startup cue: "In" in yellow on a blue background.
pub fn render_banner() -> Frame {
    render_pair((&BANNER[0], YELLOW), (&BANNER[1], YELLOW), BLUE)
}

fn render_pair(
    (left_glyph, left_colour): (&[u8; MATRIX_SIDE], Rgb),
    (right_glyph, right_colour): (&[u8; MATRIX_SIDE], Rgb),
    background: Rgb,
) -> Frame {
    let mut frame = [background; MATRIX_PIXELS];
    for (row, pixels) in frame.chunks_exact_mut(MATRIX_SIDE).enumerate() {
        let (left, right) = pixels.split_at_mut(GLYPH_WIDTH);
        paint_row(left, left_glyph[row], left_colour);
        paint_row(right, right_glyph[row], right_colour);
    }
    frame
}

fn paint_row(pixels: &mut [Rgb], bits: u8, colour: Rgb) {
    for (col, pixel) in pixels.iter_mut().enumerate() {
        if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
            *pixel = colour;
        }
    }
}

fn rgb565(pixel: Rgb) -> u16 {
    (u16::from(pixel.r >> 3) << 11) | (u16::from(pixel.g >> 2) << 5) | u16::from(pixel.b >> 3)
}

/// The Sense HAT LED matrix, driven through its Linux framebuffer device.
pub struct Framebuffer {
    device: File,
}

impl Framebuffer {
    pub fn open() -> Result<Self, DisplayError> {
        let path = find_device(Path::new(GRAPHICS_CLASS))?;
        log::debug!("Using LED matrix framebuffer {}", path.display());
        Self::open_path(&path)
    }

    pub fn open_path(path: &Path) -> Result<Self, DisplayError> {
        let device = OpenOptions::new().write(true).open(path)?;
        Ok(Self { device })
    }
}

impl LedMatrix for Framebuffer {
    fn set_pixels(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        let mut bytes = [0u8; MATRIX_PIXELS * 2];
        for (chunk, pixel) in bytes.chunks_exact_mut(2).zip(frame.iter()) {
            chunk.copy_from_slice(&rgb565(*pixel).to_le_bytes());
        }
        self.device.seek(SeekFrom::Start(0))?;
        self.device.write_all(&bytes)?;
        self.device.flush()?;
        Ok(())
    }
}

// Scans /sys/class/graphics/fb*/name for the Sense HAT driver.
fn find_device(class_dir: &Path) -> Result<PathBuf, DisplayError> {
    for entry in fs::read_dir(class_dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if !file_name.starts_with("fb") {
            continue;
        }
        match fs::read_to_string(entry.path().join("name")) {
            Ok(name) if name.trim() == SENSE_HAT_FB_NAME => {
                return Ok(Path::new("/dev").join(&*file_name));
            }
            _ => continue,
        }
    }
    Err(DisplayError::NotFound(SENSE_HAT_FB_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(frame: &Frame, row: usize) -> &[Rgb] {
        &frame[row * MATRIX_SIDE..(row + 1) * MATRIX_SIDE]
    }

    #[test]
    fn renders_two_digits() {
        let frame = render_temperature(72);
        // 7: full top bar, then right column only
        assert_eq!(row(&frame, 0)[..4], [BLUE; 4]);
        assert_eq!(row(&frame, 1)[..4], [OFF, OFF, OFF, BLUE]);
        // 2: full bar on rows 0, 3 and 7, left column on row 5
        assert_eq!(row(&frame, 0)[4..], [RED; 4]);
        assert_eq!(row(&frame, 3)[4..], [RED; 4]);
        assert_eq!(row(&frame, 5)[4..], [RED, OFF, OFF, OFF]);
        assert_eq!(row(&frame, 7)[4..], [RED; 4]);
    }

    #[test]
    fn only_two_colours_used() {
        for t in 0..100 {
            assert!(render_temperature(t)
                .iter()
                .all(|p| *p == OFF || *p == BLUE || *p == RED));
        }
    }

    #[test]
    fn wraps_out_of_range_values() {
        assert_eq!(render_temperature(105), render_temperature(5));
        assert_eq!(render_temperature(5), render_temperature(105));
        // -3 rem_euclid 100 = 97
        assert_eq!(render_temperature(-3), render_temperature(97));
    }

    #[test]
    fn one_is_a_centred_bar() {
        let frame = render_temperature(11);
        for r in 0..MATRIX_SIDE {
            assert_eq!(row(&frame, r), [OFF, BLUE, BLUE, OFF, OFF, RED, RED, OFF]);
        }
    }

    #[test]
    fn banner_is_yellow_on_blue() {
        let frame = render_banner();
        assert!(frame.iter().all(|p| *p == YELLOW || *p == BLUE));
        // I: serifed bar
        assert_eq!(row(&frame, 0)[..4], [YELLOW, YELLOW, YELLOW, BLUE]);
        assert_eq!(row(&frame, 4)[..4], [BLUE, YELLOW, BLUE, BLUE]);
        // n: blank top rows, arch on row 2
        assert_eq!(row(&frame, 0)[4..], [BLUE; 4]);
        assert_eq!(row(&frame, 2)[4..], [YELLOW, YELLOW, YELLOW, BLUE]);
        assert_eq!(row(&frame, 7)[4..], [YELLOW, BLUE, BLUE, YELLOW]);
    }

    #[derive(Default)]
    struct Recorder(Vec<Frame>);

    impl LedMatrix for Recorder {
        fn set_pixels(&mut self, frame: &Frame) -> Result<(), DisplayError> {
            self.0.push(*frame);
            Ok(())
        }
    }

    #[test]
    fn banner_then_blank() {
        let mut matrix = Recorder::default();
        matrix.show_banner(Duration::ZERO).unwrap();
        assert_eq!(matrix.0, [render_banner(), [OFF; MATRIX_PIXELS]]);
    }

    #[test]
    fn converts_to_rgb565() {
        assert_eq!(rgb565(RED), 0xF800);
        assert_eq!(rgb565(BLUE), 0x001F);
        assert_eq!(rgb565(Rgb::new(0, 255, 0)), 0x07E0);
        assert_eq!(rgb565(OFF), 0);
    }

    #[test]
    fn writes_frame_to_device() {
        let path = std::env::temp_dir().join(format!("piweather-fb-{}", std::process::id()));
        fs::write(&path, b"").unwrap();
        let mut fb = Framebuffer::open_path(&path).unwrap();
        fb.set_pixels(&render_temperature(88)).unwrap();
        fb.clear().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), MATRIX_PIXELS * 2);
        assert!(bytes.iter().all(|b| *b == 0));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn finds_sense_hat_framebuffer() {
        let root = std::env::temp_dir().join(format!("piweather-graphics-{}", std::process::id()));
        for (fb, name) in [("fb0", "BCM2708 FB"), ("fb1", "RPi-Sense FB"), ("fbcon", "")] {
            fs::create_dir_all(root.join(fb)).unwrap();
            fs::write(root.join(fb).join("name"), format!("{}\n", name)).unwrap();
        }
        assert_eq!(find_device(&root).unwrap(), PathBuf::from("/dev/fb1"));

        fs::remove_dir_all(root.join("fb1")).unwrap();
        assert!(matches!(find_device(&root), Err(DisplayError::NotFound(_))));
        fs::remove_dir_all(&root).unwrap();
    }
}

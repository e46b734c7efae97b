use easel::Image;

/// One pixel the rendered scene must contain, in physical pixel coordinates.
#[derive(Debug, Clone)]
pub struct PixelExpectation {
    pub x: u32,
    pub y: u32,
    pub rgba: [u8; 4],
    /// Largest per-channel difference still accepted.
    pub tolerance: u8,
    pub label: &'static str,
}

impl PixelExpectation {
    pub fn new(x: u32, y: u32, rgba: [u8; 4], label: &'static str) -> Self {
        Self {
            x,
            y,
            rgba,
            tolerance: 6,
            label,
        }
    }

    pub fn opaque(x: u32, y: u32, rgb: [u8; 3], label: &'static str) -> Self {
        Self::new(x, y, [rgb[0], rgb[1], rgb[2], 255], label)
    }

    pub fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn matches(&self, actual: [u8; 4]) -> bool {
        self.rgba
            .iter()
            .zip(actual)
            .all(|(expected, actual)| expected.abs_diff(actual) <= self.tolerance)
    }
}

/// Checks `expectations` against a read-back frame and describes every mismatch. An empty
/// result means the frame passed.
pub fn check_pixels(frame: &Image, expectations: &[PixelExpectation]) -> Vec<String> {
    expectations
        .iter()
        .filter_map(|expectation| {
            let Some(actual) = frame.pixel(expectation.x, expectation.y) else {
                return Some(format!(
                    "[{}] ({},{}) lies outside the {}x{} frame",
                    expectation.label,
                    expectation.x,
                    expectation.y,
                    frame.width(),
                    frame.height()
                ));
            };
            (!expectation.matches(actual)).then(|| {
                format!(
                    "[{}] ({},{}) expected rgba{:?} ±{} but got rgba{:?}",
                    expectation.label,
                    expectation.x,
                    expectation.y,
                    expectation.rgba,
                    expectation.tolerance,
                    actual
                )
            })
        })
        .collect()
}

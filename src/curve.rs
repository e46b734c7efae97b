//! Parametric curve sampling for the immediate-mode accumulator.
//!
//! Curves are sampled through coefficient tables: `detail + 1` rows of blending weights for
//! `t = 0, 1/detail, ..., 1`. Positions and every per-vertex attribute are blended with the same
//! row, so a curve's colors follow its shape.

/// Bernstein weights of a cubic Bézier at `t`.
pub fn bezier_coefficients(t: f32) -> [f32; 4] {
    let mt = 1.0 - t;
    [mt * mt * mt, 3.0 * mt * mt * t, 3.0 * mt * t * t, t * t * t]
}

/// Bernstein weights of a quadratic Bézier at `t`.
pub fn quadratic_coefficients(t: f32) -> [f32; 3] {
    let mt = 1.0 - t;
    [mt * mt, 2.0 * mt * t, t * t]
}

/// Lazily built table of blending weights, rebuilt whenever the requested detail changes.
pub struct CoefficientTable<const N: usize> {
    coefficients: fn(f32) -> [f32; N],
    detail: Option<u32>,
    rows: Vec<[f32; N]>,
    builds: usize,
}

impl<const N: usize> CoefficientTable<N> {
    pub fn new(coefficients: fn(f32) -> [f32; N]) -> Self {
        Self {
            coefficients,
            detail: None,
            rows: Vec::new(),
            builds: 0,
        }
    }

    /// Rows for `detail` segments (`detail + 1` rows).
    pub fn rows(&mut self, detail: u32) -> &[[f32; N]] {
        let detail = detail.max(1);
        if self.detail != Some(detail) {
            self.rows.clear();
            self.rows.extend((0..=detail).map(|i| {
                let t = i as f32 / detail as f32;
                (self.coefficients)(t)
            }));
            self.detail = Some(detail);
            self.builds += 1;
        }
        &self.rows
    }

    /// How many times the table has been (re)built.
    pub fn builds(&self) -> usize {
        self.builds
    }
}

/// A curve control point with the attributes that travel with it.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePoint {
    pub position: [f32; 3],
    pub fill: [f32; 4],
    pub stroke: [f32; 4],
    /// Flattened custom attributes in declaration order.
    pub custom: Vec<f32>,
}

impl CurvePoint {
    /// A control point placed at `position` with attributes interpolated between `start` and
    /// `end` at `amount`.
    fn between(position: [f32; 3], start: &CurvePoint, end: &CurvePoint, amount: f32) -> Self {
        let lerp = |a: f32, b: f32| a * (1.0 - amount) + b * amount;
        Self {
            position,
            fill: std::array::from_fn(|i| lerp(start.fill[i], end.fill[i])),
            stroke: std::array::from_fn(|i| lerp(start.stroke[i], end.stroke[i])),
            custom: start
                .custom
                .iter()
                .zip(&end.custom)
                .map(|(&a, &b)| lerp(a, b))
                .collect(),
        }
    }
}

/// Weighted sum of every component of `points`. A weight of exactly one with zeros elsewhere
/// reproduces that point bit for bit.
fn blend(points: &[&CurvePoint], weights: &[f32]) -> CurvePoint {
    let custom_len = points.iter().map(|p| p.custom.len()).min().unwrap_or(0);
    let mut out = CurvePoint {
        position: [0.0; 3],
        fill: [0.0; 4],
        stroke: [0.0; 4],
        custom: vec![0.0; custom_len],
    };
    for (point, &weight) in points.iter().zip(weights) {
        for i in 0..3 {
            out.position[i] += point.position[i] * weight;
        }
        for i in 0..4 {
            out.fill[i] += point.fill[i] * weight;
            out.stroke[i] += point.stroke[i] * weight;
        }
        for (acc, value) in out.custom.iter_mut().zip(&point.custom) {
            *acc += value * weight;
        }
    }
    out
}

fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
}

/// Chord lengths of a control polygon as fractions of its total length.
fn chord_fractions<const N: usize>(polygon: [[f32; 3]; N]) -> [f32; N] {
    let mut fractions = [0.0; N];
    let mut total = 0.0;
    for i in 1..N {
        fractions[i - 1] = distance(polygon[i - 1], polygon[i]);
        total += fractions[i - 1];
    }
    if total <= f32::EPSILON {
        // Degenerate polygon: spread the control points evenly.
        for fraction in fractions.iter_mut().take(N - 1) {
            *fraction = 1.0 / (N - 1) as f32;
        }
        return fractions;
    }
    for fraction in fractions.iter_mut() {
        *fraction /= total;
    }
    fractions
}

/// Samples a cubic Bézier from `start` to `end` with control positions `c1` and `c2`.
///
/// Returns one point per table row; the first and last carry `start` and `end` unchanged.
pub fn sample_bezier(
    rows: &[[f32; 4]],
    start: &CurvePoint,
    c1: [f32; 3],
    c2: [f32; 3],
    end: &CurvePoint,
) -> Vec<CurvePoint> {
    let [d0, _, d2, _] = chord_fractions([start.position, c1, c2, end.position]);
    let control1 = CurvePoint::between(c1, start, end, d0);
    let control2 = CurvePoint::between(c2, start, end, 1.0 - d2);
    let points = [start, &control1, &control2, end];
    rows.iter().map(|row| blend(&points, row)).collect()
}

/// Samples a quadratic Bézier from `start` to `end` with control position `c1`.
pub fn sample_quadratic(
    rows: &[[f32; 3]],
    start: &CurvePoint,
    c1: [f32; 3],
    end: &CurvePoint,
) -> Vec<CurvePoint> {
    let [d0, _, _] = chord_fractions([start.position, c1, end.position]);
    let control = CurvePoint::between(c1, start, end, d0);
    let points = [start, &control, end];
    rows.iter().map(|row| blend(&points, row)).collect()
}

/// Bézier control values equivalent to the Catmull-Rom span `w1 -> w2`.
pub fn catmull_to_bezier(w: [f32; 4], tightness: f32) -> [f32; 4] {
    let factor = (1.0 - tightness) / 6.0;
    [
        w[1],
        w[1] + (w[2] - w[0]) * factor,
        w[2] - (w[3] - w[1]) * factor,
        w[2],
    ]
}

fn catmull_component<const N: usize>(
    window: [&CurvePoint; 4],
    tightness: f32,
    read: impl Fn(&CurvePoint) -> [f32; N],
) -> [[f32; N]; 4] {
    let values = window.map(&read);
    let mut out = [[0.0; N]; 4];
    for i in 0..N {
        let converted = catmull_to_bezier(
            [values[0][i], values[1][i], values[2][i], values[3][i]],
            tightness,
        );
        for (k, value) in converted.into_iter().enumerate() {
            out[k][i] = value;
        }
    }
    out
}

/// Samples the Catmull-Rom span between the middle two points of `window`.
///
/// Attributes are converted with the same basis change as positions, so the span starts and
/// ends exactly at the attributes of `window[1]` and `window[2]`.
pub fn sample_catmull(
    rows: &[[f32; 4]],
    window: [&CurvePoint; 4],
    tightness: f32,
) -> Vec<CurvePoint> {
    let positions = catmull_component(window, tightness, |p| p.position);
    let fills = catmull_component(window, tightness, |p| p.fill);
    let strokes = catmull_component(window, tightness, |p| p.stroke);
    let custom_len = window.iter().map(|p| p.custom.len()).min().unwrap_or(0);
    let mut custom = vec![Vec::with_capacity(custom_len); 4];
    for i in 0..custom_len {
        let converted = catmull_to_bezier(window.map(|p| p.custom[i]), tightness);
        for (k, value) in converted.into_iter().enumerate() {
            custom[k].push(value);
        }
    }
    let controls: Vec<CurvePoint> = (0..4)
        .map(|k| CurvePoint {
            position: positions[k],
            fill: fills[k],
            stroke: strokes[k],
            custom: std::mem::take(&mut custom[k]),
        })
        .collect();
    let points: Vec<&CurvePoint> = controls.iter().collect();
    rows.iter().map(|row| blend(&points, row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(position: [f32; 3], fill: [f32; 4], custom: Vec<f32>) -> CurvePoint {
        CurvePoint {
            position,
            fill,
            stroke: [0.0, 0.0, 0.0, 1.0],
            custom,
        }
    }

    #[test]
    fn tables_have_detail_plus_one_rows_summing_to_one() {
        let mut cubic = CoefficientTable::new(bezier_coefficients);
        let mut quadratic = CoefficientTable::new(quadratic_coefficients);
        for detail in [1, 2, 3, 7, 20, 64] {
            let rows = cubic.rows(detail);
            assert_eq!(rows.len(), detail as usize + 1);
            for row in rows {
                assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
            }
            let rows = quadratic.rows(detail);
            assert_eq!(rows.len(), detail as usize + 1);
            for row in rows {
                assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn table_rebuilds_only_when_detail_changes() {
        let mut cubic = CoefficientTable::new(bezier_coefficients);
        cubic.rows(10);
        cubic.rows(10);
        assert_eq!(cubic.builds(), 1);
        cubic.rows(12);
        assert_eq!(cubic.builds(), 2);
        assert_eq!(cubic.rows(0).len(), 2);
    }

    #[test]
    fn bezier_endpoints_keep_exact_colors() {
        let mut table = CoefficientTable::new(bezier_coefficients);
        let start = point([0.0, 0.0, 0.0], [0.1, 0.2, 0.3, 0.4], vec![0.7, 0.9]);
        let end = point([30.0, 5.0, 0.0], [0.9, 0.35, 0.15, 1.0], vec![0.3, 0.1]);
        let samples = sample_bezier(
            table.rows(13),
            &start,
            [10.0, 40.0, 0.0],
            [25.0, -20.0, 0.0],
            &end,
        );
        assert_eq!(samples.len(), 14);
        assert_eq!(samples[0], start);
        assert_eq!(samples[13], end);
    }

    #[test]
    fn quadratic_endpoints_keep_exact_colors() {
        let mut table = CoefficientTable::new(quadratic_coefficients);
        let start = point([1.0, 2.0, 0.0], [0.33, 0.66, 0.99, 1.0], vec![]);
        let end = point([9.0, 2.0, 0.0], [0.12, 0.34, 0.56, 0.78], vec![]);
        let samples = sample_quadratic(table.rows(5), &start, [5.0, 12.0, 0.0], &end);
        assert_eq!(samples.first(), Some(&start));
        assert_eq!(samples.last(), Some(&end));
    }

    #[test]
    fn quadratic_uses_control_y_coordinate() {
        let mut table = CoefficientTable::new(quadratic_coefficients);
        let start = point([0.0, 0.0, 0.0], [1.0; 4], vec![]);
        let end = point([10.0, 0.0, 0.0], [1.0; 4], vec![]);
        let samples = sample_quadratic(table.rows(2), &start, [5.0, 10.0, 0.0], &end);
        // B(0.5) = 0.25 * 0 + 0.5 * 10 + 0.25 * 0
        assert!((samples[1].position[1] - 5.0).abs() < 1e-6);
        assert!((samples[1].position[0] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn midpoint_color_uses_chord_length_controls() {
        let mut table = CoefficientTable::new(bezier_coefficients);
        let start = point([0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0], vec![0.0]);
        let end = point([3.0, 0.0, 0.0], [1.0, 1.0, 1.0, 1.0], vec![1.0]);
        // Evenly spaced controls on a straight line: colors progress linearly.
        let samples = sample_bezier(table.rows(2), &start, [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], &end);
        assert!((samples[1].fill[0] - 0.5).abs() < 1e-6);
        assert!((samples[1].custom[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn catmull_span_passes_through_inner_points() {
        let mut table = CoefficientTable::new(bezier_coefficients);
        let p0 = point([0.0, 0.0, 0.0], [0.0; 4], vec![]);
        let p1 = point([10.0, 10.0, 0.0], [0.25, 0.5, 0.75, 1.0], vec![]);
        let p2 = point([20.0, -5.0, 0.0], [1.0, 0.0, 0.5, 1.0], vec![]);
        let p3 = point([30.0, 0.0, 0.0], [0.0; 4], vec![]);
        let samples = sample_catmull(table.rows(8), [&p0, &p1, &p2, &p3], 0.0);
        assert_eq!(samples.len(), 9);
        assert_eq!(samples[0].position, p1.position);
        assert_eq!(samples[0].fill, p1.fill);
        assert_eq!(samples[8].position, p2.position);
        assert_eq!(samples[8].fill, p2.fill);
    }

    #[test]
    fn tightness_scales_the_tangents() {
        let w = [0.0, 10.0, 20.0, 40.0];
        let half = catmull_to_bezier(w, 0.5);
        assert_eq!(half[0], 10.0);
        assert!((half[1] - (10.0 + 20.0 / 12.0)).abs() < 1e-5);
        assert!((half[2] - (20.0 - 30.0 / 12.0)).abs() < 1e-5);
        assert_eq!(half[3], 20.0);
        // Full tightness collapses the controls onto the anchors.
        assert_eq!(catmull_to_bezier(w, 1.0), [10.0, 10.0, 20.0, 20.0]);
    }

    #[test]
    fn tight_catmull_span_is_a_straight_segment() {
        let mut table = CoefficientTable::new(bezier_coefficients);
        let p0 = point([0.0, 50.0, 0.0], [0.0; 4], vec![9.0]);
        let p1 = point([10.0, 0.0, 0.0], [0.0; 4], vec![1.0]);
        let p2 = point([20.0, 10.0, 0.0], [0.0; 4], vec![3.0]);
        let p3 = point([30.0, -10.0, 0.0], [0.0; 4], vec![-7.0]);
        let samples = sample_catmull(table.rows(2), [&p0, &p1, &p2, &p3], 1.0);
        assert!((samples[1].position[0] - 15.0).abs() < 1e-5);
        assert!((samples[1].position[1] - 5.0).abs() < 1e-5);
        assert!((samples[1].custom[0] - 2.0).abs() < 1e-5);

        let loose = sample_catmull(table.rows(2), [&p0, &p1, &p2, &p3], 0.0);
        assert!((loose[1].position[1] - 5.0).abs() > 1.0);
    }

    #[test]
    fn catmull_custom_values_pass_through_inner_points() {
        let mut table = CoefficientTable::new(bezier_coefficients);
        let p0 = point([0.0, 0.0, 0.0], [0.0; 4], vec![0.0, 1.0]);
        let p1 = point([10.0, 5.0, 0.0], [0.0; 4], vec![2.0, 3.0]);
        let p2 = point([20.0, 0.0, 0.0], [0.0; 4], vec![4.0, 5.0]);
        let p3 = point([30.0, 5.0, 0.0], [0.0; 4], vec![6.0, 7.0]);
        let samples = sample_catmull(table.rows(4), [&p0, &p1, &p2, &p3], 0.3);
        assert_eq!(samples[0].custom, p1.custom);
        assert_eq!(samples[4].custom, p2.custom);
    }

    #[test]
    fn quadratic_custom_values_follow_the_chord_fraction() {
        let mut table = CoefficientTable::new(quadratic_coefficients);
        let start = point([0.0, 0.0, 0.0], [0.0; 4], vec![0.0]);
        let end = point([10.0, 0.0, 0.0], [0.0; 4], vec![2.0]);
        // The control sits a fifth of the way along: its value is 0.4, not the midpoint 1.0.
        let samples = sample_quadratic(table.rows(2), &start, [2.0, 0.0, 0.0], &end);
        assert!((samples[1].custom[0] - (0.5 * 0.4 + 0.25 * 2.0)).abs() < 1e-6);
        assert!((samples[1].position[0] - 3.5).abs() < 1e-6);
        assert_eq!(samples[2].custom, end.custom);
    }
}

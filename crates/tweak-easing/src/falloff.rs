//! Pre-sampled falloff curves for brushes.

use crate::Easing;

/// Number of samples taken from a falloff curve.
pub const FALLOFF_SAMPLES: usize = 256;

/// A curve over `[0, 1]` stored as evenly spaced samples.
///
/// The input is the normalized distance from the brush center (`0` at the
/// center, `1` at the rim); the output is a weight in `[0, 1]`. Samples are
/// clamped to `[0, 1]` when the curve is built and linearly interpolated
/// when read back.
///
/// # Example
///
/// ```
/// use rhizome_tweak_easing::FalloffCurve;
///
/// let curve = FalloffCurve::linear();
/// assert!((curve.sample(0.0) - 1.0).abs() < 1e-4);
/// assert!((curve.sample(0.5) - 0.5).abs() < 1e-3);
/// assert!(curve.sample(1.0).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FalloffCurve {
    samples: Vec<f32>,
}

impl Default for FalloffCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl FalloffCurve {
    /// Samples `f` at [`FALLOFF_SAMPLES`] evenly spaced points.
    pub fn from_fn(f: impl Fn(f32) -> f32) -> Self {
        Self::with_resolution(FALLOFF_SAMPLES, f)
    }

    /// Samples `f` at `count` evenly spaced points (at least two).
    pub fn with_resolution(count: usize, f: impl Fn(f32) -> f32) -> Self {
        let count = count.max(2);
        let unit = 1.0 / (count - 1) as f32;
        let samples = (0..count)
            .map(|i| f(unit * i as f32).clamp(0.0, 1.0))
            .collect();
        Self { samples }
    }

    /// Full weight at the center, fading linearly to zero at the rim.
    pub fn linear() -> Self {
        Self::from_fn(|t| 1.0 - t)
    }

    /// Constant full weight inside the radius.
    pub fn constant() -> Self {
        Self::from_fn(|_| 1.0)
    }

    /// Falloff shaped by an easing curve, `1 - ease(t)`.
    pub fn from_easing(easing: Easing) -> Self {
        Self::from_fn(|t| 1.0 - easing.ease(t))
    }

    /// Piecewise-linear curve through `(time, value)` keys.
    ///
    /// Keys are sorted by time. Before the first key and after the last key
    /// the curve holds the end value. An empty key list gives [`FalloffCurve::linear`].
    pub fn from_keys(keys: &[(f32, f32)]) -> Self {
        if keys.is_empty() {
            return Self::linear();
        }

        let mut keys = keys.to_vec();
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));

        Self::from_fn(|t| {
            let first = keys[0];
            let last = keys[keys.len() - 1];
            if t <= first.0 {
                return first.1;
            }
            if t >= last.0 {
                return last.1;
            }
            for pair in keys.windows(2) {
                let (t0, v0) = pair[0];
                let (t1, v1) = pair[1];
                if t >= t0 && t <= t1 {
                    let span = t1 - t0;
                    if span <= f32::EPSILON {
                        return v1;
                    }
                    return v0 + (v1 - v0) * ((t - t0) / span);
                }
            }
            last.1
        })
    }

    /// Returns the raw samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Evaluates the curve at `t`, clamped to `[0, 1]`.
    pub fn sample(&self, t: f32) -> f32 {
        let Some(last) = self.samples.len().checked_sub(1) else {
            return 0.0;
        };
        let x = t.clamp(0.0, 1.0) * last as f32;
        let i = (x.floor() as usize).min(last);
        if i == last {
            return self.samples[last];
        }
        let frac = x - i as f32;
        self.samples[i] + (self.samples[i + 1] - self.samples[i]) * frac
    }
}

//! Time-based opacity interpolation for label show/hide transitions.

use serde::{Deserialize, Serialize};

/// Easing curve of a fade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Linear,
    /// Quadratic ease.
    Pow,
    #[default]
    Sine,
}

impl Interpolation {
    /// Eased value of normalized time `t` in `[0, 1]` for a fade-in or fade-out.
    pub fn ease(self, t: f32, fade_in: bool) -> f32 {
        use std::f32::consts::FRAC_PI_2;

        match (self, fade_in) {
            (Interpolation::Linear, true) => t,
            (Interpolation::Linear, false) => 1.0 - t,
            (Interpolation::Pow, true) => t * t,
            (Interpolation::Pow, false) => 1.0 - t * t,
            (Interpolation::Sine, true) => (t * FRAC_PI_2).sin(),
            (Interpolation::Sine, false) => (t * FRAC_PI_2).cos(),
        }
    }
}

/// Fade in or out over a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeEffect {
    interpolation: Interpolation,
    duration: f32,
    step: f32,
    fade_in: bool,
}

impl Default for FadeEffect {
    fn default() -> Self {
        Self::new(true, Interpolation::default(), 0.5)
    }
}

impl FadeEffect {
    pub fn new(fade_in: bool, interpolation: Interpolation, duration: f32) -> Self {
        Self {
            interpolation,
            duration: duration.max(0.0),
            step: 0.0,
            fade_in,
        }
    }

    /// Advance by `dt` seconds and return the current alpha.
    pub fn update(&mut self, dt: f32) -> f32 {
        self.step += dt;

        let t = if self.duration > 0.0 {
            (self.step / self.duration).min(1.0)
        } else {
            1.0
        };

        self.interpolation.ease(t, self.fade_in).clamp(0.0, 1.0)
    }

    /// Re-arm the effect with a new direction and curve, zeroing the elapsed time.
    pub fn reset(&mut self, fade_in: bool, interpolation: Interpolation, duration: f32) {
        *self = Self::new(fade_in, interpolation, duration);
    }

    /// True once more than `duration` has elapsed.
    pub fn is_finished(&self) -> bool {
        self.step > self.duration
    }

    pub fn is_fade_in(&self) -> bool {
        self.fade_in
    }

    pub fn elapsed(&self) -> f32 {
        self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_fade_out() {
        let mut fade = FadeEffect::new(false, Interpolation::Linear, 1.0);
        assert!((fade.update(0.0) - 1.0).abs() < 1e-6);
        assert!((fade.update(0.5) - 0.5).abs() < 1e-6);
        assert!(!fade.is_finished());
        assert!((fade.update(0.5) - 0.0).abs() < 1e-6);
        // Exactly at duration is not finished yet
        assert!(!fade.is_finished());
        fade.update(0.01);
        assert!(fade.is_finished());
    }

    #[test]
    fn test_fade_in_monotonic() {
        for interp in [Interpolation::Linear, Interpolation::Pow, Interpolation::Sine] {
            let mut fade = FadeEffect::new(true, interp, 1.0);
            let mut prev = fade.update(0.0);
            for _ in 0..20 {
                let alpha = fade.update(0.07);
                assert!(alpha >= prev - 1e-6, "{interp:?} not monotonic");
                assert!((0.0..=1.0).contains(&alpha));
                prev = alpha;
            }
        }
    }

    #[test]
    fn test_fade_out_monotonic() {
        for interp in [Interpolation::Linear, Interpolation::Pow, Interpolation::Sine] {
            let mut fade = FadeEffect::new(false, interp, 0.5);
            let mut prev = fade.update(0.0);
            assert!((prev - 1.0).abs() < 1e-6);
            for _ in 0..20 {
                let alpha = fade.update(0.03);
                assert!(alpha <= prev + 1e-6);
                prev = alpha;
            }
            assert!(prev.abs() < 1e-6);
        }
    }

    #[test]
    fn test_sine_uses_cosine_for_fade_out() {
        let mut fade = FadeEffect::new(false, Interpolation::Sine, 1.0);
        let alpha = fade.update(0.5);
        assert!((alpha - std::f32::consts::FRAC_PI_4.cos()).abs() < 1e-6);
    }

    #[test]
    fn test_reset() {
        let mut fade = FadeEffect::new(true, Interpolation::Pow, 1.0);
        fade.update(2.0);
        assert!(fade.is_finished());
        fade.reset(false, Interpolation::Linear, 1.0);
        assert!(!fade.is_finished());
        assert!(!fade.is_fade_in());
        assert_eq!(fade.elapsed(), 0.0);
    }

    #[test]
    fn test_zero_duration() {
        let mut fade = FadeEffect::new(true, Interpolation::Linear, 0.0);
        assert!((fade.update(0.0) - 1.0).abs() < 1e-6);
        assert!(!fade.is_finished());
        fade.update(1e-3);
        assert!(fade.is_finished());
    }
}

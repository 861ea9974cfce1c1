//! Tone-mapping curves applied when the display thread blits the Film's
//! current snapshot into the window's RGB buffer.

use bif_math::Spectrum;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToneMap {
    #[default]
    Linear,
    Gamma,
    Reinhard,
    Filmic,
}

impl ToneMap {
    pub fn apply(self, color: Spectrum) -> Spectrum {
        match self {
            ToneMap::Linear => color,
            ToneMap::Gamma => gamma(color),
            ToneMap::Reinhard => reinhard(color),
            ToneMap::Filmic => filmic(color),
        }
    }
}

fn gamma(color: Spectrum) -> Spectrum {
    let inv_gamma = 1.0 / 2.2;
    Spectrum::new(
        color.r().max(0.0).powf(inv_gamma),
        color.g().max(0.0).powf(inv_gamma),
        color.b().max(0.0).powf(inv_gamma),
    )
}

fn reinhard(color: Spectrum) -> Spectrum {
    Spectrum::new(
        color.r() / (1.0 + color.r()),
        color.g() / (1.0 + color.g()),
        color.b() / (1.0 + color.b()),
    )
}

/// Hejl/Burgess-Dawson filmic curve, the version that already bakes in the
/// gamma correction (no separate gamma pass needed afterward).
fn filmic(color: Spectrum) -> Spectrum {
    let f = |x: f32| -> f32 {
        let x = (x - 0.004).max(0.0);
        (x * (6.2 * x + 0.5)) / (x * (6.2 * x + 1.7) + 0.06)
    };
    Spectrum::new(f(color.r()), f(color.g()), f(color.b()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_is_passthrough() {
        let c = Spectrum::new(0.3, 0.6, 0.9);
        assert_eq!(ToneMap::Linear.apply(c).0, c.0);
    }

    #[test]
    fn reinhard_compresses_bright_values_below_one() {
        let c = Spectrum::splat(1000.0);
        let mapped = ToneMap::Reinhard.apply(c);
        assert!(mapped.r() < 1.0);
        assert!(mapped.r() > 0.0);
    }

    #[test]
    fn filmic_maps_black_near_zero() {
        let mapped = ToneMap::Filmic.apply(Spectrum::BLACK);
        assert!(mapped.r() >= 0.0 && mapped.r() < 0.1);
    }

    #[test]
    fn gamma_darkens_midtones_less_than_linear_would_suggest() {
        let c = Spectrum::splat(0.5);
        let mapped = ToneMap::Gamma.apply(c);
        assert!(mapped.r() > c.r());
    }
}

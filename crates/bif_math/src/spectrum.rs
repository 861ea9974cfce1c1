use glam::Vec3;

/// Luminance weights for the Rec.601-ish RGB-to-intensity projection used
/// throughout the renderer (Film variance, firefly detection, etc).
const LUMINANCE_WEIGHTS: Vec3 = Vec3::new(0.212671, 0.715160, 0.072169);

/// An RGB radiance/reflectance sample. A thin wrapper rather than a bare
/// `Vec3` so intensity/clamp/black-test read as spectral operations at
/// their call sites.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spectrum(pub Vec3);

impl Spectrum {
    pub const BLACK: Spectrum = Spectrum(Vec3::ZERO);
    pub const WHITE: Spectrum = Spectrum(Vec3::ONE);

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self(Vec3::new(r, g, b))
    }

    pub fn splat(v: f32) -> Self {
        Self(Vec3::splat(v))
    }

    pub fn r(&self) -> f32 {
        self.0.x
    }

    pub fn g(&self) -> f32 {
        self.0.y
    }

    pub fn b(&self) -> f32 {
        self.0.z
    }

    /// Luminance (perceived intensity) of the color, used as the Film's
    /// variance channel.
    pub fn intensity(&self) -> f32 {
        self.0.dot(LUMINANCE_WEIGHTS)
    }

    pub fn is_black(&self) -> bool {
        self.0 == Vec3::ZERO
    }

    pub fn clamp(&self, min: f32, max: f32) -> Spectrum {
        Spectrum(self.0.clamp(Vec3::splat(min), Vec3::splat(max)))
    }

    pub fn max_component(&self) -> f32 {
        self.0.max_element()
    }
}

impl Default for Spectrum {
    fn default() -> Self {
        Spectrum::BLACK
    }
}

impl std::ops::Add for Spectrum {
    type Output = Spectrum;
    fn add(self, rhs: Spectrum) -> Spectrum {
        Spectrum(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Spectrum {
    fn add_assign(&mut self, rhs: Spectrum) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Spectrum {
    type Output = Spectrum;
    fn sub(self, rhs: Spectrum) -> Spectrum {
        Spectrum(self.0 - rhs.0)
    }
}

impl std::ops::Mul<f32> for Spectrum {
    type Output = Spectrum;
    fn mul(self, rhs: f32) -> Spectrum {
        Spectrum(self.0 * rhs)
    }
}

impl std::ops::Mul<Spectrum> for Spectrum {
    type Output = Spectrum;
    fn mul(self, rhs: Spectrum) -> Spectrum {
        Spectrum(self.0 * rhs.0)
    }
}

impl std::ops::Div<f32> for Spectrum {
    type Output = Spectrum;
    fn div(self, rhs: f32) -> Spectrum {
        Spectrum(self.0 / rhs)
    }
}

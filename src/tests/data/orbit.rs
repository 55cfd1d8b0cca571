use crate::prelude::{Epoch, Vector3};

/// Circular orbit, used as reference trajectory to generate
/// precise samples and verify their interpolation.
#[derive(Debug, Copy, Clone)]
pub struct CircularOrbit {
    /// Reference epoch
    pub t0: Epoch,
    /// Radius (m)
    pub radius_m: f64,
    /// Inclination (rad)
    pub inclination: f64,
    /// Ascending node (rad)
    pub raan: f64,
    /// Argument of latitude at t0 (rad)
    pub u0: f64,
}

impl CircularOrbit {
    /// Earth gravitational constant (m³.s⁻²)
    const GM: f64 = 3.986004418E14;

    /// MEO orbit similar to GPS vehicles
    pub fn meo(t0: Epoch) -> Self {
        Self {
            t0,
            radius_m: 26_560_000.0,
            inclination: 55.0_f64.to_radians(),
            raan: 0.3,
            u0: 1.1,
        }
    }

    /// Mean motion (rad.s⁻¹)
    pub fn mean_motion(&self) -> f64 {
        (Self::GM / self.radius_m.powi(3)).sqrt()
    }

    /// Position (m) and velocity (m.s⁻¹) at `t`
    pub fn state(&self, t: Epoch) -> (Vector3<f64>, Vector3<f64>) {
        let n = self.mean_motion();
        let u = self.u0 + n * (t - self.t0).to_seconds();

        let (su, cu) = u.sin_cos();
        let (si, ci) = self.inclination.sin_cos();
        let (so, co) = self.raan.sin_cos();
        let r = self.radius_m;

        let position = Vector3::new(
            r * (cu * co - su * ci * so),
            r * (cu * so + su * ci * co),
            r * su * si,
        );

        let velocity = Vector3::new(
            r * n * (-su * co - cu * ci * so),
            r * n * (-su * so + cu * ci * co),
            r * n * cu * si,
        );

        (position, velocity)
    }
}

use crate::{ephemeris::kepler::fold_half_week, prelude::Epoch};

/// Broadcast clock model: `a0 + a1 dt + a2 dt²`, dt counted from ToC.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ClockPolynomial {
    /// Time of Clock, expressed in the constellation timescale
    pub toc: Epoch,
    /// Bias (s)
    pub a0: f64,
    /// Drift (s.s⁻¹)
    pub a1: f64,
    /// Drift rate (s.s⁻²)
    pub a2: f64,
}

impl ClockPolynomial {
    /// Quadratic model
    pub fn new(toc: Epoch, a0: f64, a1: f64, a2: f64) -> Self {
        Self { toc, a0, a1, a2 }
    }

    /// Linear model (GLONASS and SBAS)
    pub fn linear(toc: Epoch, a0: f64, a1: f64) -> Self {
        Self::new(toc, a0, a1, 0.0)
    }

    /// Elapsed time since ToC (s), folded to half a week
    pub fn dt(&self, t: Epoch) -> f64 {
        fold_half_week((t - self.toc).to_seconds())
    }

    /// Returns (offset (s), drift (s.s⁻¹)) at `t`
    pub fn evaluate(&self, t: Epoch) -> (f64, f64) {
        let dt = self.dt(t);
        let offset = self.a0 + self.a1 * dt + self.a2 * dt.powi(2);
        let drift = self.a1 + 2.0 * self.a2 * dt;
        (offset, drift)
    }
}

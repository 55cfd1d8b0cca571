//! Polynomial fitting and Lagrange interpolation.
//!
//! Abscissa are expected to be expressed relative to a reference and
//! in a unit that keeps them of order one: callers working with [Epoch]s
//! should use [Polynomial::fit_epochs] which handles that scaling.
use log::error;
use nalgebra::{DMatrix, DVector};

use crate::{
    error::Error,
    prelude::{Duration, Epoch},
};

/// Monomial polynomial p(x) = Σ c_k (x - x_ref)^k
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polynomial {
    /// Reference abscissa
    reference: f64,
    /// Coefficients, in increasing power order
    coefficients: Vec<f64>,
    /// Post-fit RMS, for least squares fits
    rms: Option<f64>,
}

impl Polynomial {
    /// Builds a [Polynomial] from known coefficients (increasing power order).
    pub fn from_coefficients(reference: f64, coefficients: Vec<f64>) -> Self {
        Self {
            reference,
            coefficients,
            rms: None,
        }
    }

    /// True once a fit was successfully performed
    pub fn is_valid(&self) -> bool {
        !self.coefficients.is_empty()
    }

    /// Polynomial degree, None if not fitted
    pub fn degree(&self) -> Option<usize> {
        self.coefficients.len().checked_sub(1)
    }

    /// Coefficients in increasing power order
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Reference abscissa
    pub fn reference(&self) -> f64 {
        self.reference
    }

    /// Post-fit RMS of the least squares fit
    pub fn rms(&self) -> Option<f64> {
        self.rms
    }

    fn reset(&mut self) {
        self.coefficients.clear();
        self.rms = None;
    }

    /// Exact fit of the degree N-1 polynomial passing through the N samples.
    /// Coefficients are obtained from the Newton divided differences, then expanded
    /// around the reference abscissa.
    pub fn fit(&mut self, xs: &[f64], ys: &[f64], reference: f64) -> Result<(), Error> {
        self.reset();

        if xs.len() != ys.len() {
            return Err(Error::MismatchedLengths(xs.len(), ys.len()));
        }
        if xs.is_empty() {
            return Err(Error::EmptyFit);
        }

        let u = xs.iter().map(|x| x - reference).collect::<Vec<_>>();
        let n = u.len();

        // divided differences, in place
        let mut dd = ys.to_vec();
        for j in 1..n {
            for i in (j..n).rev() {
                let dx = u[i] - u[i - j];
                if dx == 0.0 {
                    return Err(Error::RepeatedAbscissa);
                }
                dd[i] = (dd[i] - dd[i - 1]) / dx;
            }
        }

        // Newton form to monomials (Horner like expansion)
        let mut coefficients = vec![0.0_f64; n];
        coefficients[0] = dd[n - 1];
        for k in (0..n - 1).rev() {
            // poly = poly * (u - u_k) + dd_k
            for m in (1..n).rev() {
                coefficients[m] = coefficients[m - 1] - u[k] * coefficients[m];
            }
            coefficients[0] = dd[k] - u[k] * coefficients[0];
        }

        self.reference = reference;
        self.coefficients = coefficients;
        Ok(())
    }

    /// Least squares fit of desired degree, through QR decomposition of the design matrix.
    /// Returns the post-fit RMS. Self is reset on failure.
    pub fn fit_least_squares(
        &mut self,
        xs: &[f64],
        ys: &[f64],
        degree: usize,
        reference: f64,
    ) -> Result<f64, Error> {
        self.reset();

        if xs.len() != ys.len() {
            return Err(Error::MismatchedLengths(xs.len(), ys.len()));
        }

        let (m, n) = (xs.len(), degree + 1);
        if m < n {
            return Err(Error::UnderDeterminedFit { samples: m, degree });
        }

        let design = DMatrix::<f64>::from_fn(m, n, |i, j| (xs[i] - reference).powi(j as i32));
        let y = DVector::<f64>::from_column_slice(ys);

        // R.x = Qt.y
        let qr = design.clone().qr();
        let rhs = qr.q().transpose() * &y;
        let solution = qr
            .r()
            .solve_upper_triangular(&rhs)
            .ok_or(Error::SingularSystem)?;

        let residuals = &y - &design * &solution;
        let rms = if m > n {
            (residuals.norm_squared() / (m - n) as f64).sqrt()
        } else {
            0.0
        };

        self.reference = reference;
        self.coefficients = solution.iter().copied().collect();
        self.rms = Some(rms);
        Ok(rms)
    }

    /// [Epoch] aware fit. Abscissa are expressed as multiples of `unit`
    /// elapsed since `reference`. Exact interpolation when `degree` is None
    /// (or matches the number of samples), least squares otherwise.
    pub fn fit_epochs(
        &mut self,
        samples: &[(Epoch, f64)],
        degree: Option<usize>,
        unit: Duration,
        reference: Epoch,
    ) -> Result<Option<f64>, Error> {
        let unit_s = unit.to_seconds();
        if unit_s <= 0.0 {
            return Err(Error::InvalidConfig("fit time unit must be positive"));
        }

        let xs = samples
            .iter()
            .map(|(t, _)| (*t - reference).to_seconds() / unit_s)
            .collect::<Vec<_>>();

        let ys = samples.iter().map(|(_, y)| *y).collect::<Vec<_>>();

        match degree {
            Some(degree) if degree + 1 < samples.len() => {
                let rms = self.fit_least_squares(&xs, &ys, degree, 0.0)?;
                Ok(Some(rms))
            },
            _ => {
                self.fit(&xs, &ys, 0.0)?;
                Ok(None)
            },
        }
    }

    /// Evaluates the polynomial, or its k-th derivative, at x.
    /// Returns 0 (and logs) if the polynomial was never fitted.
    pub fn evaluate(&self, x: f64, derivative: usize) -> f64 {
        if !self.is_valid() {
            error!("polynomial evaluation: not fitted");
            return 0.0;
        }

        let n = self.coefficients.len();
        if derivative >= n {
            return 0.0;
        }

        let u = x - self.reference;

        // Horner over the derivative coefficients c_j * j! / (j-k)!
        let mut y = 0.0_f64;
        for j in (derivative..n).rev() {
            y = y * u + self.coefficients[j] * falling_factorial(j, derivative);
        }
        y
    }
}

/// j * (j-1) * ... * (j-k+1)
fn falling_factorial(j: usize, k: usize) -> f64 {
    ((j - k + 1)..=j).fold(1.0, |prod, i| prod * i as f64)
}

/// Direct (barycentric) Lagrange interpolation at `x`, with optional first derivative.
/// No polynomial is retained. Returns None on empty or mismatched input,
/// or repeated abscissa.
pub fn lagrange_interpolate(
    xs: &[f64],
    ys: &[f64],
    x: f64,
    derivative: bool,
) -> Option<(f64, Option<f64>)> {
    let n = xs.len();
    if n == 0 || n != ys.len() {
        return None;
    }

    // barycentric weights
    let mut weights = vec![1.0_f64; n];
    for j in 0..n {
        for m in 0..n {
            if m != j {
                let dx = xs[j] - xs[m];
                if dx == 0.0 {
                    return None;
                }
                weights[j] /= dx;
            }
        }
    }

    if let Some(k) = xs.iter().position(|x_k| *x_k == x) {
        // limiting form at a node
        let value = ys[k];
        let slope = if derivative {
            // L_j'(x_k) = w_j / w_k / (x_k - x_j) ; L_k'(x_k) = Σ 1 / (x_k - x_j)
            let mut slope = 0.0;
            for j in 0..n {
                if j != k {
                    let dx = xs[k] - xs[j];
                    slope += (weights[j] / weights[k] * ys[j] + ys[k]) / dx;
                }
            }
            Some(slope)
        } else {
            None
        };
        return Some((value, slope));
    }

    let (mut num, mut den) = (0.0_f64, 0.0_f64);
    for j in 0..n {
        let w = weights[j] / (x - xs[j]);
        num += w * ys[j];
        den += w;
    }

    let value = num / den;

    let slope = if derivative {
        let mut acc = 0.0_f64;
        for j in 0..n {
            acc += weights[j] * (value - ys[j]) / (x - xs[j]).powi(2);
        }
        Some(acc / den)
    } else {
        None
    };

    Some((value, slope))
}

use hifitime::Unit;

use crate::{
    error::Error,
    polynomial::{lagrange_interpolate, Polynomial},
    precise::{
        samples::Series,
        window::{Shortfall, Window},
    },
    prelude::Epoch,
};

/// Polynomial fit of one or several components of a [Series],
/// over one sample [Window]. Abscissa are normalized to [-1, 1]
/// over the window and ordinates are fitted with their mean removed.
#[derive(Debug, Clone)]
pub(crate) struct Fit {
    /// First and last sample of the window
    pub first: Epoch,
    pub last: Epoch,
    /// Number of samples fitted
    pub len: usize,
    /// Validity zone
    pub zone: (Epoch, Epoch),
    /// Window touches a boundary of the series
    pub clamped: bool,
    /// Series revision at fit (or last check) time
    pub revision: u64,
    /// Window midpoint
    reference: Epoch,
    /// Window half span (s)
    half_span_s: f64,
    /// Mean value per component
    offsets: Vec<f64>,
    polynomials: Vec<Polynomial>,
}

impl Fit {
    /// Fits `components` values extracted from the [Series] samples
    /// within this [Window]. Least squares is used when the window
    /// holds more than `degree + 1` samples.
    pub fn new<T>(
        series: &Series<T>,
        window: &Window,
        degree: usize,
        components: usize,
        extract: impl Fn(&T, usize) -> f64,
    ) -> Result<Self, Error> {
        let (first, last) = (series.epoch(window.start), series.epoch(window.end()));
        let half_span_s = (last - first).to_seconds() / 2.0;
        let reference = first + half_span_s * Unit::Second;

        let degree = degree.min(window.len - 1);

        let mut offsets = Vec::with_capacity(components);
        let mut polynomials = Vec::with_capacity(components);

        for component in 0..components {
            let values = (window.start..=window.end())
                .map(|i| extract(series.value(i), component))
                .collect::<Vec<_>>();

            let mean = values.iter().sum::<f64>() / values.len() as f64;

            let samples = (window.start..=window.end())
                .zip(values.iter())
                .map(|(i, value)| (series.epoch(i), value - mean))
                .collect::<Vec<_>>();

            let mut polynomial = Polynomial::default();
            polynomial.fit_epochs(
                &samples,
                Some(degree),
                half_span_s * Unit::Second,
                reference,
            )?;

            offsets.push(mean);
            polynomials.push(polynomial);
        }

        Ok(Self {
            first,
            last,
            len: window.len,
            zone: window.zone(series),
            clamped: window.head || window.tail,
            revision: series.revision(),
            reference,
            half_span_s,
            offsets,
            polynomials,
        })
    }

    /// True if `t` lies within the validity zone
    pub fn covers(&self, t: Epoch) -> bool {
        t >= self.zone.0 && t <= self.zone.1
    }

    /// True when the [Series] evolved in a way this fit does not reflect:
    /// a clamped window may now be extended, or a sample was inserted
    /// within the fitted span.
    pub fn is_stale<T>(&self, series: &Series<T>) -> bool {
        if self.revision == series.revision() {
            return false;
        }
        self.clamped || series.count_within(self.first, self.last) != self.len
    }

    /// Evaluates one component and its time derivative (per second) at `t`
    pub fn evaluate(&self, component: usize, t: Epoch) -> (f64, f64) {
        let x = (t - self.reference).to_seconds() / self.half_span_s;
        let polynomial = &self.polynomials[component];
        let value = self.offsets[component] + polynomial.evaluate(x, 0);
        let rate = polynomial.evaluate(x, 1) / self.half_span_s;
        (value, rate)
    }
}

/// Direct Lagrange evaluation of one component over this [Window],
/// and its time derivative (per second). Nothing is retained.
pub(crate) fn lagrange<T>(
    series: &Series<T>,
    window: &Window,
    t: Epoch,
    component: usize,
    extract: impl Fn(&T, usize) -> f64,
) -> Result<(f64, f64), Shortfall> {
    let (first, last) = (series.epoch(window.start), series.epoch(window.end()));
    let half_span_s = (last - first).to_seconds() / 2.0;
    let reference = first + half_span_s * Unit::Second;

    let xs = (window.start..=window.end())
        .map(|i| (series.epoch(i) - reference).to_seconds() / half_span_s)
        .collect::<Vec<_>>();

    let ys = (window.start..=window.end())
        .map(|i| extract(series.value(i), component))
        .collect::<Vec<_>>();

    let x = (t - reference).to_seconds() / half_span_s;

    match lagrange_interpolate(&xs, &ys, x, true) {
        Some((value, Some(rate))) => Ok((value, rate / half_span_s)),
        _ => Err(Shortfall::Insufficient {
            needed: 2,
            available: xs.len(),
        }),
    }
}

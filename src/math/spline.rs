//! Natural cubic spline interpolation.

use nalgebra::{DMatrix, DVector};

/// A natural cubic spline `y = f(x)` through a set of knots.
///
/// "Natural" means the second derivative vanishes at both end knots.
/// Outside the knot range, the boundary polynomial is extrapolated.
#[derive(Clone, Debug)]
pub struct CubicSpline {
    x: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

/// The reason a spline could not be fitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplineError {
    /// Fewer than two knots, or mismatched x/y lengths.
    TooFewKnots,
    /// The knot x-values were not strictly increasing.
    NonMonotonicKnots,
}

impl CubicSpline {
    /// Fits a natural cubic spline through the given knots.
    /// The x-values must be strictly increasing.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self, SplineError> {
        let n = xs.len();
        if n < 2 || ys.len() != n {
            return Err(SplineError::TooFewKnots);
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SplineError::NonMonotonicKnots);
        }

        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let a = ys.to_vec();

        // Tridiagonal system for the second-derivative coefficients,
        // with the natural boundary condition pinning both ends to zero.
        let mut m = DMatrix::zeros(n, n);
        let mut rhs = DVector::zeros(n);
        m[(0, 0)] = 1.0;
        m[(n - 1, n - 1)] = 1.0;
        for i in 1..n - 1 {
            m[(i, i - 1)] = h[i - 1];
            m[(i, i)] = 2.0 * (h[i - 1] + h[i]);
            m[(i, i + 1)] = h[i];
            rhs[i] = 3.0 * ((a[i + 1] - a[i]) / h[i] - (a[i] - a[i - 1]) / h[i - 1]);
        }
        let c = m.lu().solve(&rhs).ok_or(SplineError::NonMonotonicKnots)?;

        let mut b = Vec::with_capacity(n - 1);
        let mut d = Vec::with_capacity(n - 1);
        for i in 0..n - 1 {
            b.push((a[i + 1] - a[i]) / h[i] - h[i] * (c[i + 1] + 2.0 * c[i]) / 3.0);
            d.push((c[i + 1] - c[i]) / (3.0 * h[i]));
        }

        Ok(Self {
            x: xs.to_vec(),
            a,
            b,
            c: c.iter().copied().collect(),
            d,
        })
    }

    /// Evaluates the spline at `x`.
    pub fn y(&self, x: f64) -> f64 {
        let i = self.segment(x);
        let dx = x - self.x[i];
        self.a[i] + self.b[i] * dx + self.c[i] * dx * dx + self.d[i] * dx * dx * dx
    }

    /// Evaluates the first derivative of the spline at `x`.
    pub fn dy(&self, x: f64) -> f64 {
        let i = self.segment(x);
        let dx = x - self.x[i];
        self.b[i] + 2.0 * self.c[i] * dx + 3.0 * self.d[i] * dx * dx
    }

    /// The index of the polynomial segment covering `x`, clamped to the
    /// knot range so out-of-range queries extrapolate the boundary segment.
    fn segment(&self, x: f64) -> usize {
        let n = self.x.len();
        self.x[..n - 1]
            .partition_point(|&k| k <= x)
            .saturating_sub(1)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{Rng, SeedableRng};

    #[test]
    fn interpolates_knots_exactly() {
        let mut rng = rand::rngs::StdRng::from_seed(*b"Vegemite sandwhich is not fun...");
        for _ in 0..50 {
            let xs = [0.0, 1.5, 4.0, 9.0];
            let ys: Vec<f64> = (0..4).map(|_| rng.gen_range(-50.0..50.0)).collect();
            let spline = CubicSpline::fit(&xs, &ys).unwrap();
            for (x, y) in xs.iter().zip(&ys) {
                assert_approx_eq!(spline.y(*x), *y, 1e-9);
            }
        }
    }

    #[test]
    fn reproduces_straight_lines() {
        let xs = [-2.0, 0.0, 3.0, 7.0];
        let ys: Vec<f64> = xs.iter().map(|x| 0.5 * x - 4.0).collect();
        let spline = CubicSpline::fit(&xs, &ys).unwrap();

        for i in -40..=100 {
            let x = 0.1 * i as f64;
            assert_approx_eq!(spline.y(x), 0.5 * x - 4.0, 1e-9);
            assert_approx_eq!(spline.dy(x), 0.5, 1e-9);
        }
    }

    #[test]
    fn value_and_slope_are_continuous_at_knots() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.0, 2.0, -1.0, 0.5];
        let spline = CubicSpline::fit(&xs, &ys).unwrap();

        let eps = 1e-7;
        for x in [1.0, 2.0] {
            assert_approx_eq!(spline.y(x - eps), spline.y(x + eps), 1e-5);
            assert_approx_eq!(spline.dy(x - eps), spline.dy(x + eps), 1e-5);
        }
    }

    #[test]
    fn rejects_unsorted_knots() {
        let result = CubicSpline::fit(&[0.0, 2.0, 1.0], &[0.0, 1.0, 2.0]);
        assert_eq!(result.unwrap_err(), SplineError::NonMonotonicKnots);

        let result = CubicSpline::fit(&[0.0], &[0.0]);
        assert_eq!(result.unwrap_err(), SplineError::TooFewKnots);
    }
}

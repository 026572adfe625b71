//! One-sided threshold penalties used to weight the objectives.
//!
//! Both functions are zero on one side of their threshold, so exceeding a
//! target is never rewarded beyond meeting it.

/// Agent-performance penalty: `2(x − c)` for `x ≥ c`, zero below.
///
/// The derivative of the squared hinge `max(0, x − c)²`.
pub fn df(x: f64, c: f64) -> f64 {
    if x >= c {
        2.0 * (x - c)
    } else {
        0.0
    }
}

/// Task-performance penalty: the log-odds gap between a success estimate
/// `x` and the threshold `e`,
/// `ln(x/e) − ln((1−x)/(1−e))` for `0 < x ≤ e`, zero otherwise.
///
/// Non-positive on its support: zero at `x = e` and unbounded below as
/// `x → 0⁺`.
pub fn dh(x: f64, e: f64) -> f64 {
    if e >= x && x > 0.0 {
        (x / e).ln() - ((1.0 - x) / (1.0 - e)).ln()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn df_zero_below_threshold() {
        for x in [-3.0, 0.0, 0.49] {
            assert_eq!(df(x, 0.5), 0.0);
        }
    }

    #[test]
    fn df_linear_and_continuous_above_threshold() {
        assert_eq!(df(0.5, 0.5), 0.0);
        assert!((df(1.5, 0.5) - 2.0).abs() < 1e-12);
        let mut prev = df(0.5, 0.5);
        for i in 1..20 {
            let x = 0.5 + i as f64 * 0.1;
            let v = df(x, 0.5);
            assert!(v > prev);
            assert!((v - 2.0 * (x - 0.5)).abs() < 1e-12);
            prev = v;
        }
        // Continuity at the threshold.
        assert!(df(0.5 + 1e-9, 0.5) < 1e-8);
    }

    #[test]
    fn dh_zero_outside_support() {
        let e = 0.8;
        for x in [-0.1, 0.0, 0.81, 1.0, 2.0] {
            assert_eq!(dh(x, e), 0.0);
        }
        assert!(dh(e, e).abs() < 1e-12);
    }

    #[test]
    fn dh_magnitude_decreases_towards_threshold() {
        let e = 0.8;
        let xs: Vec<f64> = (1..=80).map(|i| i as f64 * 0.01).collect();
        for w in xs.windows(2) {
            let (a, b) = (dh(w[0], e), dh(w[1], e));
            assert!(a.is_finite() && b.is_finite());
            assert!(a.abs() > b.abs(), "x={} {a} {b}", w[0]);
        }
        assert!(dh(1e-12, e).abs() > 20.0);
    }
}

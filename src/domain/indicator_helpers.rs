//! Shared column helpers for indicator and feature calculations.
//!
//! Columns are `Option<f64>` slices where `None` means "no value". A rolling
//! window containing any `None` yields `None`, and so does any arithmetic that
//! would produce a non-finite number.

/// Keeps finite numbers, maps everything else to `None`.
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() { Some(value) } else { None }
}

pub fn to_column(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().map(|&v| finite(v)).collect()
}

fn window_values(values: &[Option<f64>], end: usize, window: usize) -> Option<Vec<f64>> {
    if window == 0 || end + 1 < window {
        return None;
    }
    values[end + 1 - window..=end].iter().copied().collect()
}

pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            window_values(values, i, window)
                .and_then(|w| finite(w.iter().sum::<f64>() / window as f64))
        })
        .collect()
}

/// Rolling sample standard deviation (divides by n - 1).
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window < 2 {
                return None;
            }
            let w = window_values(values, i, window)?;
            let mean = w.iter().sum::<f64>() / window as f64;
            let variance = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
            finite(variance.sqrt())
        })
        .collect()
}

/// value[i] - value[i - 1]
pub fn diff(values: &[Option<f64>]) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if i == 0 {
                return None;
            }
            match (values[i], values[i - 1]) {
                (Some(curr), Some(prev)) => finite(curr - prev),
                _ => None,
            }
        })
        .collect()
}

/// value[i] / value[i - periods] - 1
pub fn pct_change(values: &[Option<f64>], periods: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if periods == 0 || i < periods {
                return None;
            }
            match (values[i], values[i - periods]) {
                (Some(curr), Some(prev)) if prev != 0.0 => finite(curr / prev - 1.0),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rolling_mean_warmup_and_values() {
        let col = to_column(&[1.0, 2.0, 3.0, 4.0]);
        let out = rolling_mean(&col, 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_relative_eq!(out[2].unwrap(), 2.0);
        assert_relative_eq!(out[3].unwrap(), 3.0);
    }

    #[test]
    fn rolling_mean_none_in_window_propagates() {
        let col = vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)];
        let out = rolling_mean(&col, 2);
        assert_eq!(out[1], None);
        assert_eq!(out[2], None);
        assert_relative_eq!(out[3].unwrap(), 3.5);
    }

    #[test]
    fn rolling_std_is_sample_std() {
        let col = to_column(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let out = rolling_std(&col, 8);
        // population std is 2.0, sample std is sqrt(32 / 7)
        assert_relative_eq!(out[7].unwrap(), (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn rolling_std_window_of_one_is_undefined() {
        let col = to_column(&[1.0, 2.0]);
        assert!(rolling_std(&col, 1).iter().all(Option::is_none));
    }

    #[test]
    fn diff_first_is_none() {
        let out = diff(&to_column(&[1.0, 4.0, 2.0]));
        assert_eq!(out, vec![None, Some(3.0), Some(-2.0)]);
    }

    #[test]
    fn pct_change_periods() {
        let out = pct_change(&to_column(&[100.0, 110.0, 121.0]), 2);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_relative_eq!(out[2].unwrap(), 0.21, epsilon = 1e-12);
    }

    #[test]
    fn pct_change_zero_base_is_none() {
        let out = pct_change(&to_column(&[0.0, 5.0]), 1);
        assert_eq!(out[1], None);
    }

    #[test]
    fn finite_filters_inf_and_nan() {
        assert_eq!(finite(f64::INFINITY), None);
        assert_eq!(finite(f64::NAN), None);
        assert_eq!(finite(1.5), Some(1.5));
    }
}

//! Cell-wise hazard and risk kernels.
//!
//! Each kernel has a serial form and, with the `parallel` feature, a
//! rayon form producing identical output.

use ndarray::{Array2, ArrayView2, Zip};

#[cfg(feature = "parallel")]
use std::sync::atomic::{AtomicUsize, Ordering};

#[inline]
fn hazard_cell(depth: f64, velocity: f64, threshold: f64) -> f64 {
    if velocity > threshold {
        depth * velocity
    } else {
        depth
    }
}

#[inline]
fn risk_cell(land_use_value: f64, hazard: f64, return_period: f64) -> f64 {
    land_use_value * hazard / return_period
}

#[inline]
fn is_no_data_cell(
    risk: f64,
    depth: f64,
    depth_no_data: Option<f64>,
    zero_as_no_data: bool,
) -> bool {
    !risk.is_finite() || depth_no_data == Some(depth) || (zero_as_no_data && risk == 0.0)
}

/// Hazard intensity per cell.
///
/// Without velocity the hazard is the inundation depth. With velocity,
/// cells flowing faster than `threshold` get `depth * velocity`; the rest
/// keep their depth. NaN velocity counts as not exceeding the threshold.
///
/// # Panics
///
/// Panics if depth and velocity have different shapes.
pub fn hazard_intensity(
    depth: ArrayView2<'_, f64>,
    velocity: Option<ArrayView2<'_, f64>>,
    threshold: f64,
) -> Array2<f64> {
    let Some(velocity) = velocity else {
        return depth.to_owned();
    };
    assert_eq!(depth.dim(), velocity.dim(), "Depth and velocity shapes differ");

    Zip::from(depth)
        .and(velocity)
        .map_collect(|&d, &v| hazard_cell(d, v, threshold))
}

/// Parallel version of [`hazard_intensity`].
#[cfg(feature = "parallel")]
pub fn hazard_intensity_parallel(
    depth: ArrayView2<'_, f64>,
    velocity: Option<ArrayView2<'_, f64>>,
    threshold: f64,
) -> Array2<f64> {
    let Some(velocity) = velocity else {
        return depth.to_owned();
    };
    assert_eq!(depth.dim(), velocity.dim(), "Depth and velocity shapes differ");

    Zip::from(depth)
        .and(velocity)
        .par_map_collect(|&d, &v| hazard_cell(d, v, threshold))
}

/// Annualized risk: `land_use_value * hazard / return_period`.
///
/// # Panics
///
/// Panics if the grids have different shapes or `return_period` is zero.
pub fn compute_risk(
    land_use_values: ArrayView2<'_, f64>,
    hazard: ArrayView2<'_, f64>,
    return_period: u32,
) -> Array2<f64> {
    assert!(return_period > 0, "Return period must be positive");
    let period = f64::from(return_period);

    Zip::from(land_use_values)
        .and(hazard)
        .map_collect(|&lu, &h| risk_cell(lu, h, period))
}

/// Parallel version of [`compute_risk`].
#[cfg(feature = "parallel")]
pub fn compute_risk_parallel(
    land_use_values: ArrayView2<'_, f64>,
    hazard: ArrayView2<'_, f64>,
    return_period: u32,
) -> Array2<f64> {
    assert!(return_period > 0, "Return period must be positive");
    let period = f64::from(return_period);

    Zip::from(land_use_values)
        .and(hazard)
        .par_map_collect(|&lu, &h| risk_cell(lu, h, period))
}

/// Replace cells without a meaningful risk value by `sentinel`.
///
/// A cell is replaced when its risk is non-finite, when its depth equals
/// the depth raster's own no-data value, or, if `zero_as_no_data` is set,
/// when its risk is exactly zero. Every other cell is left untouched.
///
/// Returns the number of replaced cells.
pub fn apply_no_data(
    risk: &mut Array2<f64>,
    depth: ArrayView2<'_, f64>,
    depth_no_data: Option<f64>,
    sentinel: f64,
    zero_as_no_data: bool,
) -> usize {
    assert_eq!(risk.dim(), depth.dim(), "Risk and depth shapes differ");

    let mut replaced = 0;
    Zip::from(risk).and(depth).for_each(|r, &d| {
        if is_no_data_cell(*r, d, depth_no_data, zero_as_no_data) {
            *r = sentinel;
            replaced += 1;
        }
    });
    replaced
}

/// Parallel version of [`apply_no_data`].
#[cfg(feature = "parallel")]
pub fn apply_no_data_parallel(
    risk: &mut Array2<f64>,
    depth: ArrayView2<'_, f64>,
    depth_no_data: Option<f64>,
    sentinel: f64,
    zero_as_no_data: bool,
) -> usize {
    assert_eq!(risk.dim(), depth.dim(), "Risk and depth shapes differ");

    let replaced = AtomicUsize::new(0);
    Zip::from(risk).and(depth).par_for_each(|r, &d| {
        if is_no_data_cell(*r, d, depth_no_data, zero_as_no_data) {
            *r = sentinel;
            replaced.fetch_add(1, Ordering::Relaxed);
        }
    });
    replaced.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_hazard_without_velocity_is_depth() {
        let depth = array![[2.0, 0.0], [4.0, 1.0]];
        let hazard = hazard_intensity(depth.view(), None, 1.0);
        assert_eq!(hazard, depth);
    }

    #[test]
    fn test_hazard_velocity_threshold() {
        let depth = array![[2.0, 2.0, 2.0, 2.0]];
        let velocity = array![[0.5, 3.0, 1.0, f64::NAN]];

        let hazard = hazard_intensity(depth.view(), Some(velocity.view()), 1.0);

        assert_eq!(hazard[[0, 0]], 2.0);
        assert_eq!(hazard[[0, 1]], 6.0);
        // Equal to the threshold does not exceed it
        assert_eq!(hazard[[0, 2]], 2.0);
        assert_eq!(hazard[[0, 3]], 2.0);
    }

    #[test]
    #[should_panic(expected = "shapes differ")]
    fn test_hazard_shape_mismatch() {
        let depth = array![[1.0, 2.0]];
        let velocity = array![[1.0], [2.0]];
        hazard_intensity(depth.view(), Some(velocity.view()), 1.0);
    }

    #[test]
    fn test_compute_risk() {
        let land_use = array![[10.0, 10.0], [5.0, 5.0]];
        let hazard = array![[2.0, 0.0], [4.0, 1.0]];

        let risk = compute_risk(land_use.view(), hazard.view(), 2);

        assert_eq!(risk, array![[10.0, 0.0], [10.0, 2.5]]);
    }

    #[test]
    fn test_compute_risk_formula() {
        let land_use = array![[50.0, 12.0, 3.0]];
        let hazard = array![[0.37, 1.9, 12.25]];

        let risk = compute_risk(land_use.view(), hazard.view(), 30);

        for ((&lu, &h), &r) in land_use.iter().zip(hazard.iter()).zip(risk.iter()) {
            let expected = lu * h / 30.0;
            assert!((r - expected).abs() < TOL, "risk {} vs {}", r, expected);
        }
    }

    #[test]
    fn test_missing_land_use_propagates() {
        let land_use = array![[f64::NAN, 5.0]];
        let hazard = array![[1.0, 1.0]];
        let risk = compute_risk(land_use.view(), hazard.view(), 1);
        assert!(risk[[0, 0]].is_nan());
        assert_eq!(risk[[0, 1]], 5.0);
    }

    #[test]
    fn test_zero_risk_becomes_sentinel() {
        let depth = array![[2.0, 0.0], [4.0, 1.0]];
        let mut risk = array![[10.0, 0.0], [10.0, 2.5]];

        let replaced = apply_no_data(&mut risk, depth.view(), None, -9999.0, true);

        assert_eq!(replaced, 1);
        assert_eq!(risk, array![[10.0, -9999.0], [10.0, 2.5]]);
    }

    #[test]
    fn test_zero_risk_kept_when_disabled() {
        let depth = array![[2.0, 0.0]];
        let mut risk = array![[10.0, 0.0]];

        let replaced = apply_no_data(&mut risk, depth.view(), None, -9999.0, false);

        assert_eq!(replaced, 0);
        assert_eq!(risk, array![[10.0, 0.0]]);
    }

    #[test]
    fn test_depth_no_data_and_nan_become_sentinel() {
        let depth = array![[-1.0, 1.0, 2.0]];
        let mut risk = array![[-5.0, f64::NAN, 4.0]];

        let replaced = apply_no_data(&mut risk, depth.view(), Some(-1.0), -9999.0, false);

        assert_eq!(replaced, 2);
        assert_eq!(risk, array![[-9999.0, -9999.0, 4.0]]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_serial() {
        let depth = Array2::from_shape_fn((37, 23), |(i, j)| ((i * 7 + j * 3) % 5) as f64 * 0.4);
        let velocity = Array2::from_shape_fn((37, 23), |(i, j)| ((i + j) % 4) as f64 * 0.6);
        let land_use = Array2::from_shape_fn((37, 23), |(i, j)| ((i * j) % 6) as f64 * 5.0);

        let h_s = hazard_intensity(depth.view(), Some(velocity.view()), 1.0);
        let h_p = hazard_intensity_parallel(depth.view(), Some(velocity.view()), 1.0);
        assert_eq!(h_s, h_p);

        let mut r_s = compute_risk(land_use.view(), h_s.view(), 10);
        let mut r_p = compute_risk_parallel(land_use.view(), h_p.view(), 10);
        assert_eq!(r_s, r_p);

        let n_s = apply_no_data(&mut r_s, depth.view(), None, -9999.0, true);
        let n_p = apply_no_data_parallel(&mut r_p, depth.view(), None, -9999.0, true);
        assert_eq!(n_s, n_p);
        assert_eq!(r_s, r_p);
    }
}

//! Risk aggregated per land-use category.

use ndarray::ArrayView2;

/// Aggregate risk of one land-use category.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CategoryRisk {
    /// Land-use category value
    pub category: f64,
    /// Sum of risk over the category's cells
    pub total_risk: f64,
    /// Mean risk per cell
    pub average_risk: f64,
    /// Number of contributing cells
    pub pixel_count: usize,
}

/// Group risk by land-use category.
///
/// Cells whose risk equals `no_data`, and cells with a non-finite risk or
/// category, are excluded. Rows come out in ascending category order and
/// categories left without cells are omitted.
///
/// # Panics
///
/// Panics if the grids have different shapes.
pub fn risk_by_category(
    risk: ArrayView2<'_, f64>,
    land_use: ArrayView2<'_, f64>,
    no_data: f64,
) -> Vec<CategoryRisk> {
    assert_eq!(
        risk.dim(),
        land_use.dim(),
        "Risk and land-use grids must have the same shape"
    );

    let mut cells: Vec<(f64, f64)> = land_use
        .iter()
        .zip(risk.iter())
        .filter(|&(&category, &value)| {
            category.is_finite() && value.is_finite() && value != no_data
        })
        .map(|(&category, &value)| (category, value))
        .collect();
    cells.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut rows: Vec<CategoryRisk> = Vec::new();
    for (category, value) in cells {
        match rows.last_mut() {
            Some(row) if row.category == category => {
                row.total_risk += value;
                row.pixel_count += 1;
            }
            _ => rows.push(CategoryRisk {
                category,
                total_risk: value,
                average_risk: 0.0,
                pixel_count: 1,
            }),
        }
    }

    for row in &mut rows {
        row.average_risk = row.total_risk / row.pixel_count as f64;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_grouping_and_order() {
        let risk = array![[10.0, -9999.0], [10.0, 2.5]];
        let land_use = array![[10.0, 10.0], [5.0, 5.0]];

        let rows = risk_by_category(risk.view(), land_use.view(), -9999.0);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, 5.0);
        assert_eq!(rows[0].total_risk, 12.5);
        assert_eq!(rows[0].average_risk, 6.25);
        assert_eq!(rows[0].pixel_count, 2);
        assert_eq!(rows[1].category, 10.0);
        assert_eq!(rows[1].total_risk, 10.0);
        assert_eq!(rows[1].pixel_count, 1);
    }

    #[test]
    fn test_category_with_only_no_data_omitted() {
        let risk = array![[-9999.0, -9999.0, 3.0]];
        let land_use = array![[40.0, 40.0, 12.0]];

        let rows = risk_by_category(risk.view(), land_use.view(), -9999.0);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, 12.0);
    }

    #[test]
    fn test_missing_category_excluded() {
        let risk = array![[1.0, 2.0]];
        let land_use = array![[f64::NAN, 3.0]];

        let rows = risk_by_category(risk.view(), land_use.view(), -9999.0);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_risk, 2.0);
    }

    #[test]
    fn test_all_no_data_is_empty() {
        let risk = array![[-1.0, -1.0]];
        let land_use = array![[1.0, 2.0]];
        assert!(risk_by_category(risk.view(), land_use.view(), -1.0).is_empty());
    }

    #[test]
    #[should_panic(expected = "same shape")]
    fn test_shape_mismatch() {
        let risk = array![[1.0, 2.0]];
        let land_use = array![[1.0], [2.0]];
        risk_by_category(risk.view(), land_use.view(), -1.0);
    }
}

/// Regression metrics between a predicted and a reference D x N trajectory,
/// masking entries where either side holds NaN. Per-dimension masks are
/// independent; the overall block pools every kept element. R^2 is guarded
/// by a floor on the total sum of squares so near-constant references do not
/// blow up; a dimension with no kept samples reports NaN across the board.
use nalgebra::DMatrix;

const SST_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct MetricSet {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl MetricSet {
    fn all_nan() -> MetricSet {
        MetricSet {
            mse: f64::NAN,
            rmse: f64::NAN,
            mae: f64::NAN,
            r2: f64::NAN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsRecord {
    pub per_dim: Vec<MetricSet>,
    pub overall: MetricSet,
}

fn score_pairs(pairs: &[(f64, f64)]) -> MetricSet {
    if pairs.is_empty() {
        return MetricSet::all_nan();
    }
    let n = pairs.len() as f64;
    let mut sse = 0.0;
    let mut sae = 0.0;
    let mut mean_true = 0.0;
    for (hat, truth) in pairs {
        let err = hat - truth;
        sse += err * err;
        sae += err.abs();
        mean_true += truth;
    }
    mean_true /= n;
    // total sum of squares around the kept subset's own mean
    let mut sst = 0.0;
    for (_, truth) in pairs {
        let dev = truth - mean_true;
        sst += dev * dev;
    }
    let mse = sse / n;
    MetricSet {
        mse,
        rmse: mse.sqrt(),
        mae: sae / n,
        r2: 1.0 - sse / sst.max(SST_FLOOR),
    }
}

pub fn regression_metrics(y_hat: &DMatrix<f64>, y_true: &DMatrix<f64>) -> MetricsRecord {
    assert_eq!(
        y_hat.shape(),
        y_true.shape(),
        "prediction and reference shapes disagree"
    );
    let (d, n) = y_hat.shape();
    let mut per_dim = Vec::with_capacity(d);
    let mut all_pairs = Vec::new();
    for i in 0..d {
        let mut pairs = Vec::with_capacity(n);
        for j in 0..n {
            let hat = y_hat[(i, j)];
            let truth = y_true[(i, j)];
            if hat.is_nan() || truth.is_nan() {
                continue;
            }
            pairs.push((hat, truth));
        }
        all_pairs.extend_from_slice(&pairs);
        per_dim.push(score_pairs(&pairs));
    }
    MetricsRecord {
        per_dim,
        overall: score_pairs(&all_pairs),
    }
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identical_arrays_score_perfectly() {
        let y = DMatrix::from_row_slice(2, 4, &[1.0, 2.0, 3.0, 4.0, -1.0, 0.0, 1.0, 2.0]);
        let record = regression_metrics(&y, &y);
        for set in record.per_dim.iter().chain([&record.overall]) {
            assert_eq!(set.mse, 0.0);
            assert_eq!(set.mae, 0.0);
            assert_relative_eq!(set.r2, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_known_errors() {
        // dim 0: constant error 1 => mse 1, mae 1
        let y_true = DMatrix::from_row_slice(1, 4, &[0.0, 1.0, 2.0, 3.0]);
        let y_hat = DMatrix::from_row_slice(1, 4, &[1.0, 2.0, 3.0, 4.0]);
        let record = regression_metrics(&y_hat, &y_true);
        assert_relative_eq!(record.overall.mse, 1.0, epsilon = 1e-12);
        assert_relative_eq!(record.overall.rmse, 1.0, epsilon = 1e-12);
        assert_relative_eq!(record.overall.mae, 1.0, epsilon = 1e-12);
        // sst around the reference mean 1.5 is 5, so r2 = 1 - 4/5
        assert_relative_eq!(record.overall.r2, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_nan_masks_remove_only_the_marked_sample() {
        let y_true = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut y_true_masked = y_true.clone();
        y_true_masked[(0, 1)] = f64::NAN;
        let y_hat = DMatrix::from_row_slice(2, 3, &[1.5, 9.0, 3.5, 4.5, 5.5, 6.5]);

        let record = regression_metrics(&y_hat, &y_true_masked);
        // dim 0 keeps samples 0 and 2 only: errors 0.5, 0.5
        assert_relative_eq!(record.per_dim[0].mse, 0.25, epsilon = 1e-12);
        // dim 1 untouched: errors all 0.5
        assert_relative_eq!(record.per_dim[1].mse, 0.25, epsilon = 1e-12);
        assert_relative_eq!(record.per_dim[1].mae, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_fully_masked_dimension_reports_nan() {
        let y_true = DMatrix::from_row_slice(2, 2, &[f64::NAN, f64::NAN, 1.0, 2.0]);
        let y_hat = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 1.0, 2.0]);
        let record = regression_metrics(&y_hat, &y_true);
        assert!(record.per_dim[0].mse.is_nan());
        assert!(record.per_dim[0].r2.is_nan());
        assert_eq!(record.per_dim[1].mse, 0.0);
        // overall still scores the surviving pairs
        assert_eq!(record.overall.mse, 0.0);
    }

    #[test]
    fn test_constant_reference_hits_the_floor_instead_of_dividing_by_zero() {
        let y_true = DMatrix::from_row_slice(1, 3, &[2.0, 2.0, 2.0]);
        let y_hat = DMatrix::from_row_slice(1, 3, &[2.1, 2.0, 1.9]);
        let record = regression_metrics(&y_hat, &y_true);
        assert!(record.overall.r2.is_finite());
        assert!(record.overall.r2 < 0.0);
    }
}

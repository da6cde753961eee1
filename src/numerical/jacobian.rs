/// Central-difference approximation of the jacobian of a vector function.
/// Used by the implicit step methods instead of an analytic jacobian and by
/// the training engine when the right-hand side must be differentiated with
/// respect to the state.
use nalgebra::{DMatrix, DVector};

/// Jacobian of F at the point y, column by column:
/// J[:, i] = (F(y + h_i e_i) - F(y - h_i e_i)) / (2 h_i)
/// with h_i = eps0*(1 + |y_i|), eps0 = 1e-6*max(1, ||y||).
/// Costs 2*D evaluations of F. F must map R^D -> R^D.
pub fn jacobian_central<F>(f: &F, y: &DVector<f64>) -> DMatrix<f64>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let n = y.len();
    assert!(n > 0, "jacobian of an empty vector requested");
    let eps0 = 1e-6 * y.norm().max(1.0);
    let mut jac = DMatrix::zeros(n, n);
    for i in 0..n {
        let h = eps0 * (1.0 + y[i].abs());
        let mut y_plus = y.clone();
        let mut y_minus = y.clone();
        y_plus[i] += h;
        y_minus[i] -= h;
        let f_plus = f(&y_plus);
        let f_minus = f(&y_minus);
        assert_eq!(
            f_plus.len(),
            n,
            "function output dimension does not match input dimension"
        );
        let col = (f_plus - f_minus) / (2.0 * h);
        jac.set_column(i, &col);
    }
    jac
}

/// Newton-Raphson corrector embedded into the implicit step methods.
/// Each step of Backward Euler / Crank-Nicolson hands this solver the step
/// equation F(y_next) = 0 together with an explicit predictor as the guess.
/// The jacobian is approximated numerically (see jacobian.rs).
use crate::numerical::jacobian::jacobian_central;
use log::warn;
use nalgebra::DVector;

pub struct NRStep {
    pub tolerance: f64,
    pub max_iterations: usize,
    /// iterations spent by the most recent solve
    pub i: usize,
    /// how many solves exhausted the iteration budget since construction;
    /// the last iterate is still accepted in that case
    pub non_converged: usize,
}

impl NRStep {
    pub fn new() -> NRStep {
        NRStep {
            tolerance: 1e-8,
            max_iterations: 20,
            i: 0,
            non_converged: 0,
        }
    }

    pub fn with_params(tolerance: f64, max_iterations: usize) -> NRStep {
        assert!(
            tolerance >= 0.0,
            "Tolerance should be a non-negative number."
        );
        assert!(
            max_iterations > 0,
            "Max iterations should be a positive number."
        );
        NRStep {
            tolerance,
            max_iterations,
            i: 0,
            non_converged: 0,
        }
    }

    /// Iterate y <- y - J^-1 F(y) from the given guess. Converged when
    /// ||F(y)|| < tol or ||dy|| < tol; after the budget the last iterate is
    /// returned regardless (callers treating implicit accuracy as a hard
    /// guarantee should watch the non_converged counter).
    pub fn solve<F>(&mut self, residual: F, guess: &DVector<f64>) -> DVector<f64>
    where
        F: Fn(&DVector<f64>) -> DVector<f64>,
    {
        let mut y = guess.clone();
        for it in 0..self.max_iterations {
            self.i = it + 1;
            let fy = residual(&y);
            if fy.norm() < self.tolerance {
                return y;
            }
            let jac = jacobian_central(&residual, &y);
            let delta = match jac.lu().solve(&fy) {
                Some(d) => d,
                None => {
                    // singular jacobian: keep the current iterate
                    warn!("Newton step: singular jacobian, keeping last iterate");
                    self.non_converged += 1;
                    return y;
                }
            };
            y -= &delta;
            if delta.norm() < self.tolerance {
                return y;
            }
        }
        self.non_converged += 1;
        warn!(
            "Newton step: maximum number of iterations ({}) reached, accepting last iterate",
            self.max_iterations
        );
        y
    }
}

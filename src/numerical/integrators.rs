use core::fmt::Display;

/// Fixed-grid step methods for initial value problems. Every method takes the
/// system, a strictly increasing 1 x N time grid and an initial state and
/// returns a D x N trajectory whose first column equals the initial state.
/// Implicit members solve their step equation with the Newton corrector,
/// falling back to the last iterate when the budget is exhausted.
use crate::numerical::newton::NRStep;
use crate::numerical::ode_systems::OdeSystem;
use itertools::Itertools;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use std::time::Instant;
use strum_macros::EnumIter;

pub type Trajectory = DMatrix<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum IntegratorKind {
    ForwardEuler,
    BackwardEuler,
    CrankNicolson,
    RK4,
    Leapfrog,
}

impl Display for IntegratorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IntegratorKind::ForwardEuler => "forward_euler",
            IntegratorKind::BackwardEuler => "backward_euler",
            IntegratorKind::CrankNicolson => "crank_nicolson",
            IntegratorKind::RK4 => "rk4",
            IntegratorKind::Leapfrog => "leapfrog",
        };
        write!(f, "{}", name)
    }
}

fn check_grid(t_grid: &DVector<f64>) {
    assert!(t_grid.len() >= 2, "time grid needs at least two points");
    for (a, b) in t_grid.iter().tuple_windows() {
        assert!(b > a, "time grid must be strictly increasing");
    }
}

/// y_{n+1} = y_n + h f(t_n, y_n). The step is derived once from the first
/// grid interval and applied uniformly, so callers must supply a uniform grid.
pub fn forward_euler(
    system: &OdeSystem,
    t_grid: &DVector<f64>,
    y0: &DVector<f64>,
) -> Trajectory {
    check_grid(t_grid);
    let n = t_grid.len();
    let h = t_grid[1] - t_grid[0];
    let mut result = DMatrix::zeros(y0.len(), n);
    result.set_column(0, y0);
    let mut y = y0.clone();
    for k in 0..n - 1 {
        let f = system.rhs_at(t_grid[k], &y);
        y += h * f;
        result.set_column(k + 1, &y);
    }
    result
}

/// y_{n+1} = y_n + h f(t_{n+1}, y_{n+1}), Newton-solved with the explicit
/// Euler predictor as the guess.
pub fn backward_euler(
    system: &OdeSystem,
    t_grid: &DVector<f64>,
    y0: &DVector<f64>,
    newton: &mut NRStep,
) -> Trajectory {
    check_grid(t_grid);
    let n = t_grid.len();
    let mut result = DMatrix::zeros(y0.len(), n);
    result.set_column(0, y0);
    let mut y = y0.clone();
    for k in 0..n - 1 {
        let h = t_grid[k + 1] - t_grid[k];
        let t_next = t_grid[k + 1];
        let guess = &y + h * system.rhs_at(t_grid[k], &y);
        let y_prev = y.clone();
        let step_eq =
            |y_next: &DVector<f64>| y_next - &y_prev - h * system.rhs_at(t_next, y_next);
        y = newton.solve(step_eq, &guess);
        result.set_column(k + 1, &y);
    }
    result
}

/// Trapezoidal rule y_{n+1} = y_n + h/2 (f_n + f(t_{n+1}, y_{n+1})),
/// Newton-solved with the explicit trapezoid (Heun) predictor as the guess.
pub fn crank_nicolson(
    system: &OdeSystem,
    t_grid: &DVector<f64>,
    y0: &DVector<f64>,
    newton: &mut NRStep,
) -> Trajectory {
    check_grid(t_grid);
    let n = t_grid.len();
    let mut result = DMatrix::zeros(y0.len(), n);
    result.set_column(0, y0);
    let mut y = y0.clone();
    for k in 0..n - 1 {
        let h = t_grid[k + 1] - t_grid[k];
        let t_next = t_grid[k + 1];
        let f_n = system.rhs_at(t_grid[k], &y);
        let euler = &y + h * &f_n;
        let guess = &y + h / 2.0 * (&f_n + system.rhs_at(t_next, &euler));
        let y_prev = y.clone();
        let step_eq = |y_next: &DVector<f64>| {
            y_next - &y_prev - h / 2.0 * (&f_n + system.rhs_at(t_next, y_next))
        };
        y = newton.solve(step_eq, &guess);
        result.set_column(k + 1, &y);
    }
    result
}

/// Classic 4-stage Runge-Kutta.
pub fn rk4(system: &OdeSystem, t_grid: &DVector<f64>, y0: &DVector<f64>) -> Trajectory {
    check_grid(t_grid);
    let n = t_grid.len();
    let mut result = DMatrix::zeros(y0.len(), n);
    result.set_column(0, y0);
    let mut y = y0.clone();
    for k in 0..n - 1 {
        let h = t_grid[k + 1] - t_grid[k];
        let t = t_grid[k];
        let k1 = h * system.rhs_at(t, &y);
        let k2 = h * system.rhs_at(t + h / 2.0, &(&y + &k1 / 2.0));
        let k3 = h * system.rhs_at(t + h / 2.0, &(&y + &k2 / 2.0));
        let k4 = h * system.rhs_at(t + h, &(&y + &k3));
        y += (&k1 + 2.0 * &k2 + 2.0 * &k3 + &k4) / 6.0;
        result.set_column(k + 1, &y);
    }
    result
}

/// Velocity-Verlet / leapfrog for systems in [x; v] layout: half-step
/// velocity kick, full-step position drift, second kick with the updated
/// position. The second kick evaluates the acceleration at the half-step
/// velocity, which is exact for velocity-independent forces.
pub fn leapfrog(system: &OdeSystem, t_grid: &DVector<f64>, y0: &DVector<f64>) -> Trajectory {
    check_grid(t_grid);
    assert!(
        y0.len() % 2 == 0,
        "leapfrog needs an even state dimension, got {}",
        y0.len()
    );
    assert!(
        system.has_acceleration(),
        "leapfrog needs an acceleration function"
    );
    let n = t_grid.len();
    let d = y0.len() / 2;
    let mut result = DMatrix::zeros(y0.len(), n);
    result.set_column(0, y0);
    let mut x = y0.rows(0, d).into_owned();
    let mut v = y0.rows(d, d).into_owned();
    for k in 0..n - 1 {
        let h = t_grid[k + 1] - t_grid[k];
        let a = system.acceleration_at(t_grid[k], &x, &v);
        let v_half = &v + h / 2.0 * a;
        x += h * &v_half;
        let a_next = system.acceleration_at(t_grid[k + 1], &x, &v_half);
        v = &v_half + h / 2.0 * a_next;
        result.view_mut((0, k + 1), (d, 1)).copy_from(&x);
        result.view_mut((d, k + 1), (d, 1)).copy_from(&v);
    }
    result
}

impl IntegratorKind {
    /// Shared entry point advance(f, grid, y0) -> trajectory.
    pub fn advance(
        &self,
        system: &OdeSystem,
        t_grid: &DVector<f64>,
        y0: &DVector<f64>,
        newton: &mut NRStep,
    ) -> Trajectory {
        match self {
            IntegratorKind::ForwardEuler => forward_euler(system, t_grid, y0),
            IntegratorKind::BackwardEuler => backward_euler(system, t_grid, y0, newton),
            IntegratorKind::CrankNicolson => crank_nicolson(system, t_grid, y0, newton),
            IntegratorKind::RK4 => rk4(system, t_grid, y0),
            IntegratorKind::Leapfrog => leapfrog(system, t_grid, y0),
        }
    }
}

/// Driver that runs the whole suite on one system. When the system is not in
/// second order [x; v] form, the leapfrog slot is filled with an all-NaN
/// matrix so downstream comparisons see "unavailable" rather than a hole.
pub struct IntegratorSuite {
    pub tolerance: f64,
    pub max_iterations: usize,
    pub status: String,
    pub results: Vec<(IntegratorKind, Trajectory)>,
    /// Newton budget exhaustions accumulated over the implicit methods
    pub non_converged: usize,
}

impl IntegratorSuite {
    pub fn new() -> IntegratorSuite {
        IntegratorSuite {
            tolerance: 1e-8,
            max_iterations: 20,
            status: "created".to_string(),
            results: Vec::new(),
            non_converged: 0,
        }
    }

    pub fn solve_all(
        &mut self,
        system: &OdeSystem,
        t_grid: &DVector<f64>,
    ) -> &Vec<(IntegratorKind, Trajectory)> {
        use strum::IntoEnumIterator;
        let start = Instant::now();
        self.results.clear();
        self.status = "running".to_string();
        for kind in IntegratorKind::iter() {
            let trajectory = if kind == IntegratorKind::Leapfrog && !system.supports_leapfrog() {
                warn!(
                    "system '{}' is not in second order [x; v] form, leapfrog result set to NaN",
                    system.name
                );
                DMatrix::from_element(system.state_dim, t_grid.len(), f64::NAN)
            } else {
                let mut newton = NRStep::with_params(self.tolerance, self.max_iterations);
                let result = kind.advance(system, t_grid, &system.y0, &mut newton);
                self.non_converged += newton.non_converged;
                result
            };
            self.results.push((kind, trajectory));
        }
        let duration = start.elapsed();
        info!(
            "integrator suite for '{}' took {} milliseconds",
            system.name,
            duration.as_millis()
        );
        self.status = "finished".to_string();
        &self.results
    }

    pub fn get_result(&self, kind: IntegratorKind) -> Option<&Trajectory> {
        self.results
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, trajectory)| trajectory)
    }
}

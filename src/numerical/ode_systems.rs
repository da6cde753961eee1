/// Dynamical system descriptors consumed by both the integrator suite and the
/// physics-informed training engine, plus a collection of classic benchmark
/// systems (oscillators, chaotic attractors, orbital mechanics, a boundary
/// layer shooting problem).
use nalgebra::{DMatrix, DVector};
use strum_macros::EnumIter;

/// Right-hand side over a batch: times of length N and a D x N state block
/// map to a D x N derivative block. Column j may depend only on column j.
pub type BatchRhs = Box<dyn Fn(&DVector<f64>, &DMatrix<f64>) -> DMatrix<f64>>;

/// Acceleration a(t, x, v) for systems in [position; velocity] layout.
pub type AccelFn = Box<dyn Fn(f64, &DVector<f64>, &DVector<f64>) -> DVector<f64>>;

/// Lift a single-state right-hand side to the batched columnar convention.
pub fn columnwise<F>(f: F) -> BatchRhs
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64> + 'static,
{
    Box::new(move |t: &DVector<f64>, y: &DMatrix<f64>| {
        assert_eq!(t.len(), y.ncols(), "time batch and state batch disagree");
        let mut out = DMatrix::zeros(y.nrows(), y.ncols());
        for j in 0..y.ncols() {
            let yj = y.column(j).into_owned();
            out.set_column(j, &f(t[j], &yj));
        }
        out
    })
}

/// Immutable description of an initial value problem.
pub struct OdeSystem {
    pub name: String,
    /// order of the underlying scalar equation: 1, 2 or 3
    pub order: usize,
    pub state_dim: usize,
    pub t_span: (f64, f64),
    pub y0: DVector<f64>,
    rhs: BatchRhs,
    accel: Option<AccelFn>,
}

impl OdeSystem {
    pub fn new(
        name: &str,
        order: usize,
        t_span: (f64, f64),
        y0: DVector<f64>,
        rhs: BatchRhs,
        accel: Option<AccelFn>,
    ) -> OdeSystem {
        assert!(!y0.is_empty(), "initial state is empty");
        assert!(
            order >= 1 && order <= 3,
            "order must be 1, 2 or 3, got {}",
            order
        );
        assert!(t_span.1 > t_span.0, "time span must be increasing");
        if order == 2 {
            assert!(
                y0.len() % 2 == 0,
                "second order system must have even state dimension"
            );
            assert!(
                accel.is_some(),
                "second order system must provide an acceleration function"
            );
        }
        let state_dim = y0.len();
        OdeSystem {
            name: name.to_string(),
            order,
            state_dim,
            t_span,
            y0,
            rhs,
            accel,
        }
    }

    /// Batched evaluation: times 1 x N against a D x N state block.
    pub fn rhs_batch(&self, t: &DVector<f64>, y: &DMatrix<f64>) -> DMatrix<f64> {
        assert_eq!(y.nrows(), self.state_dim, "state dimension mismatch");
        assert_eq!(t.len(), y.ncols(), "time batch and state batch disagree");
        (self.rhs)(t, y)
    }

    /// Single-point evaluation through the batched interface.
    pub fn rhs_at(&self, t: f64, y: &DVector<f64>) -> DVector<f64> {
        let t_b = DVector::from_element(1, t);
        let y_b = DMatrix::from_column_slice(self.state_dim, 1, y.as_slice());
        (self.rhs)(&t_b, &y_b).column(0).into_owned()
    }

    pub fn acceleration_at(&self, t: f64, x: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        let accel = self
            .accel
            .as_ref()
            .expect("acceleration requested for a system that does not provide one");
        accel(t, x, v)
    }

    pub fn has_acceleration(&self) -> bool {
        self.accel.is_some()
    }

    /// Symplectic stepping needs the [x; v] split and the acceleration.
    pub fn supports_leapfrog(&self) -> bool {
        self.order == 2 && self.state_dim % 2 == 0 && self.accel.is_some()
    }
}

//EXAMPLES OF CLASSIC BENCHMARK SYSTEMS
// oscillators, chaotic attractors, orbital mechanics and the Blasius
// boundary layer equation reduced to first order form
#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumIter)]
pub enum BenchProblem {
    Hooke,
    Harmonic,
    VanDerPol,
    Lorenz,
    DoublePendulum,
    ThreeBody,
    Jerk,
    Blasius,
}

const HARMONIC_DAMPING: f64 = 0.0;
const VDP_MU: f64 = 1.0;
const PENDULUM_G: f64 = 9.81;
const SOFTENING: f64 = 1e-2;
const JERK_A: f64 = 2.017;
/// shooting parameter f''(0) for the Blasius profile
const BLASIUS_SHOOT: f64 = 0.33205733621519;

impl BenchProblem {
    pub fn setup(&self) -> OdeSystem {
        match self {
            // m x'' = -k x with m = k = 1; exact solution x(t) = cos(t)
            BenchProblem::Hooke => {
                let accel: AccelFn = Box::new(|_t, x, _v| -x.clone());
                let rhs = columnwise(|_t, y: &DVector<f64>| {
                    DVector::from_vec(vec![y[1], -y[0]])
                });
                OdeSystem::new(
                    "hooke",
                    2,
                    (0.0, 10.0),
                    DVector::from_vec(vec![1.0, 0.0]),
                    rhs,
                    Some(accel),
                )
            }
            // x'' = -x - c x'
            BenchProblem::Harmonic => {
                let accel: AccelFn =
                    Box::new(|_t, x, v| -x.clone() - HARMONIC_DAMPING * v.clone());
                let rhs = columnwise(|_t, y: &DVector<f64>| {
                    DVector::from_vec(vec![y[1], -y[0] - HARMONIC_DAMPING * y[1]])
                });
                OdeSystem::new(
                    "harmonic",
                    2,
                    (0.0, 20.0),
                    DVector::from_vec(vec![1.0, 0.0]),
                    rhs,
                    Some(accel),
                )
            }
            // x'' = mu (1 - x^2) x' - x, limit cycle for mu > 0
            BenchProblem::VanDerPol => {
                let accel: AccelFn = Box::new(|_t, x, v| {
                    DVector::from_vec(vec![VDP_MU * (1.0 - x[0] * x[0]) * v[0] - x[0]])
                });
                let rhs = columnwise(|_t, y: &DVector<f64>| {
                    DVector::from_vec(vec![y[1], VDP_MU * (1.0 - y[0] * y[0]) * y[1] - y[0]])
                });
                OdeSystem::new(
                    "van_der_pol",
                    2,
                    (0.0, 20.0),
                    DVector::from_vec(vec![2.0, 0.0]),
                    rhs,
                    Some(accel),
                )
            }
            // sigma = 10, rho = 28, beta = 8/3
            BenchProblem::Lorenz => {
                let (sigma, rho, beta) = (10.0, 28.0, 8.0 / 3.0);
                let rhs = columnwise(move |_t, y: &DVector<f64>| {
                    DVector::from_vec(vec![
                        sigma * (y[1] - y[0]),
                        y[0] * (rho - y[2]) - y[1],
                        y[0] * y[1] - beta * y[2],
                    ])
                });
                OdeSystem::new(
                    "lorenz",
                    1,
                    (0.0, 25.0),
                    DVector::from_vec(vec![1.0, 1.0, 1.0]),
                    rhs,
                    None,
                )
            }
            // equal masses and rod lengths, state [th1, th2, w1, w2]
            BenchProblem::DoublePendulum => {
                let accel: AccelFn = Box::new(|_t, x, v| double_pendulum_accel(x, v));
                let rhs = columnwise(|_t, y: &DVector<f64>| {
                    let x = DVector::from_vec(vec![y[0], y[1]]);
                    let v = DVector::from_vec(vec![y[2], y[3]]);
                    let a = double_pendulum_accel(&x, &v);
                    DVector::from_vec(vec![y[2], y[3], a[0], a[1]])
                });
                OdeSystem::new(
                    "double_pendulum",
                    2,
                    (0.0, 10.0),
                    DVector::from_vec(vec![
                        std::f64::consts::FRAC_PI_2,
                        std::f64::consts::FRAC_PI_2,
                        0.0,
                        0.0,
                    ]),
                    rhs,
                    Some(accel),
                )
            }
            // planar three body problem with softened gravity, G = m_i = 1,
            // state [r1 r2 r3; v1 v2 v3] flattened to 12 entries
            BenchProblem::ThreeBody => {
                let accel: AccelFn = Box::new(|_t, x, _v| three_body_accel(x));
                let rhs = columnwise(|_t, y: &DVector<f64>| {
                    let x = y.rows(0, 6).into_owned();
                    let v = y.rows(6, 6).into_owned();
                    let a = three_body_accel(&x);
                    let mut dy = DVector::zeros(12);
                    dy.rows_mut(0, 6).copy_from(&v);
                    dy.rows_mut(6, 6).copy_from(&a);
                    dy
                });
                let mut y0 = DVector::zeros(12);
                // positions
                y0[0] = -1.0;
                y0[1] = 0.0;
                y0[2] = 1.0;
                y0[3] = 0.0;
                y0[4] = 0.0;
                y0[5] = 0.5;
                // velocities
                y0[6] = 0.0;
                y0[7] = -0.3;
                y0[8] = 0.0;
                y0[9] = 0.3;
                y0[10] = 0.2;
                y0[11] = 0.0;
                OdeSystem::new("three_body", 2, (0.0, 5.0), y0, rhs, Some(accel))
            }
            // chaotic jerk equation x''' = -a x'' + x'^2 - x (Sprott)
            BenchProblem::Jerk => {
                let rhs = columnwise(|_t, y: &DVector<f64>| {
                    DVector::from_vec(vec![y[1], y[2], -JERK_A * y[2] + y[1] * y[1] - y[0]])
                });
                OdeSystem::new(
                    "jerk",
                    3,
                    (0.0, 20.0),
                    DVector::from_vec(vec![0.1, 0.0, 0.0]),
                    rhs,
                    None,
                )
            }
            // Blasius boundary layer: f''' + 0.5 f f'' = 0,
            // f(0) = f'(0) = 0 with the shooting value for f''(0)
            BenchProblem::Blasius => {
                let rhs = columnwise(|_t, y: &DVector<f64>| {
                    DVector::from_vec(vec![y[1], y[2], -0.5 * y[0] * y[2]])
                });
                OdeSystem::new(
                    "blasius",
                    3,
                    (0.0, 10.0),
                    DVector::from_vec(vec![0.0, 0.0, BLASIUS_SHOOT]),
                    rhs,
                    None,
                )
            }
        }
    }

    pub fn values(&self) -> Vec<String> {
        let names: Vec<&str> = match self {
            BenchProblem::Hooke | BenchProblem::Harmonic | BenchProblem::VanDerPol => {
                vec!["x", "v"]
            }
            BenchProblem::Lorenz => vec!["x", "y", "z"],
            BenchProblem::DoublePendulum => vec!["th1", "th2", "w1", "w2"],
            BenchProblem::ThreeBody => vec![
                "x1", "y1", "x2", "y2", "x3", "y3", "vx1", "vy1", "vx2", "vy2", "vx3", "vy3",
            ],
            BenchProblem::Jerk => vec!["x", "dx", "ddx"],
            BenchProblem::Blasius => vec!["f", "df", "ddf"],
        };
        names.iter().map(|s| s.to_string()).collect()
    }
}

/// Angular accelerations of the equal-mass, unit-length double pendulum.
fn double_pendulum_accel(x: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
    let (th1, th2, w1, w2) = (x[0], x[1], v[0], v[1]);
    let g = PENDULUM_G;
    let delta = th1 - th2;
    let den = 3.0 - (2.0 * delta).cos();
    let a1 = (-3.0 * g * th1.sin()
        - g * (th1 - 2.0 * th2).sin()
        - 2.0 * delta.sin() * (w2 * w2 + w1 * w1 * delta.cos()))
        / den;
    let a2 = 2.0 * delta.sin() * (2.0 * w1 * w1 + 2.0 * g * th1.cos() + w2 * w2 * delta.cos())
        / den;
    DVector::from_vec(vec![a1, a2])
}

/// Softened pairwise gravity for three unit masses in the plane.
fn three_body_accel(x: &DVector<f64>) -> DVector<f64> {
    let mut a = DVector::zeros(6);
    for i in 0..3 {
        let (xi, yi) = (x[2 * i], x[2 * i + 1]);
        for j in 0..3 {
            if i == j {
                continue;
            }
            let (xj, yj) = (x[2 * j], x[2 * j + 1]);
            let dx = xj - xi;
            let dy = yj - yi;
            let r2 = dx * dx + dy * dy + SOFTENING * SOFTENING;
            let inv_r3 = 1.0 / (r2 * r2.sqrt());
            a[2 * i] += dx * inv_r3;
            a[2 * i + 1] += dy * inv_r3;
        }
    }
    a
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn test_all_bench_problems_construct_and_evaluate() {
        for problem in BenchProblem::iter() {
            let system = problem.setup();
            assert_eq!(system.y0.len(), system.state_dim);
            assert_eq!(problem.values().len(), system.state_dim);
            let dy = system.rhs_at(system.t_span.0, &system.y0);
            assert_eq!(dy.len(), system.state_dim);
            assert!(dy.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_batched_rhs_matches_columnwise_evaluation() {
        let system = BenchProblem::Lorenz.setup();
        let t = DVector::from_vec(vec![0.0, 0.5, 1.0]);
        let y = DMatrix::from_columns(&[
            DVector::from_vec(vec![1.0, 1.0, 1.0]),
            DVector::from_vec(vec![2.0, -1.0, 5.0]),
            DVector::from_vec(vec![-3.0, 0.5, 10.0]),
        ]);
        let batch = system.rhs_batch(&t, &y);
        for j in 0..3 {
            let single = system.rhs_at(t[j], &y.column(j).into_owned());
            for i in 0..3 {
                assert_relative_eq!(batch[(i, j)], single[i], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_hooke_rhs_and_acceleration_agree() {
        let system = BenchProblem::Hooke.setup();
        let x = DVector::from_vec(vec![0.7]);
        let v = DVector::from_vec(vec![-0.2]);
        let a = system.acceleration_at(0.0, &x, &v);
        let dy = system.rhs_at(0.0, &DVector::from_vec(vec![0.7, -0.2]));
        assert_relative_eq!(dy[1], a[0], epsilon = 1e-14);
        assert!(system.supports_leapfrog());
    }

    #[test]
    fn test_third_order_systems_do_not_support_leapfrog() {
        assert!(!BenchProblem::Blasius.setup().supports_leapfrog());
        assert!(!BenchProblem::Jerk.setup().supports_leapfrog());
        assert!(!BenchProblem::Lorenz.setup().supports_leapfrog());
    }

    #[test]
    #[should_panic(expected = "even state dimension")]
    fn test_second_order_system_with_odd_dimension_rejected() {
        let rhs = columnwise(|_t, y: &DVector<f64>| y.clone());
        let accel: AccelFn = Box::new(|_t, x, _v| x.clone());
        let _ = OdeSystem::new(
            "broken",
            2,
            (0.0, 1.0),
            DVector::from_vec(vec![1.0, 0.0, 0.0]),
            rhs,
            Some(accel),
        );
    }
}

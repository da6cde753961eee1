/// Collocation point generation: interior time samples at which the physics
/// residual is penalized during training.
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    Random,
    Grid,
}

/// Draw `count` time points from the span. Random mode forces the first
/// entry to t0 so the initial condition is always covered; grid mode spaces
/// evenly including both endpoints. A seed makes the random draw
/// reproducible for that call site.
pub fn sample_collocation(
    t_span: (f64, f64),
    count: usize,
    mode: SamplingMode,
    seed: Option<u64>,
) -> DVector<f64> {
    let (t0, t1) = t_span;
    assert!(t1 > t0, "time span must be increasing");
    assert!(count >= 2, "at least two collocation points are required");
    match mode {
        SamplingMode::Random => {
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::seed_from_u64(rand::rng().random::<u64>()),
            };
            DVector::from_fn(count, |i, _| {
                if i == 0 {
                    t0
                } else {
                    rng.random_range(t0..t1)
                }
            })
        }
        SamplingMode::Grid => {
            let step = (t1 - t0) / (count - 1) as f64;
            DVector::from_fn(count, |i, _| t0 + i as f64 * step)
        }
    }
}

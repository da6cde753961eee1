/// Physics residual of a surrogate against the governing equation:
/// R = dY/dt - f(t, Y) over a collocation batch. The time derivative comes
/// from the tangent chain of the forward pass; the batched layout is valid
/// because sample j's output depends only on time_batch[j].
use crate::numerical::ode_systems::OdeSystem;
use crate::pinn::network::{ForwardCache, PinnNet};
use nalgebra::{DMatrix, DVector};

/// Evaluate the residual and hand back the cache so the caller can
/// backpropagate through the same forward pass.
pub fn physics_residual(
    net: &mut PinnNet,
    system: &OdeSystem,
    t_batch: &DVector<f64>,
) -> (DMatrix<f64>, ForwardCache) {
    assert!(!t_batch.is_empty(), "empty collocation batch");
    assert_eq!(
        net.config.output_dim, system.state_dim,
        "surrogate output dimension does not match the system state dimension"
    );
    let t_row = DMatrix::from_row_slice(1, t_batch.len(), t_batch.as_slice());
    let cache = net.forward_cached(&t_row, true);
    let ydot = cache
        .ydot
        .as_ref()
        .expect("forward pass did not record tangents");
    let rhs = system.rhs_batch(t_batch, &cache.y);
    let residual = ydot - rhs;
    (residual, cache)
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::ode_systems::columnwise;
    use crate::pinn::network::NetConfig;
    use approx::assert_relative_eq;

    #[test]
    fn test_residual_zero_for_system_matching_the_tangent() {
        // against f(t, y) = dY/dt of the surrogate itself the residual
        // must vanish identically
        let mut net = PinnNet::new(NetConfig::new(2));
        let t = DVector::from_vec(vec![0.0, 0.3, 0.6, 0.9]);

        // record the surrogate tangents once, then build a system whose rhs
        // replays them per column
        let t_row = DMatrix::from_row_slice(1, t.len(), t.as_slice());
        let reference = net.forward_cached(&t_row, true).ydot.unwrap();
        let times: Vec<f64> = t.iter().copied().collect();
        let system = OdeSystem::new(
            "replay",
            1,
            (0.0, 1.0),
            DVector::from_vec(vec![0.0, 0.0]),
            columnwise(move |ti, _y: &DVector<f64>| {
                let j = times.iter().position(|&x| (x - ti).abs() < 1e-12).unwrap();
                reference.column(j).into_owned()
            }),
            None,
        );

        let (residual, cache) = physics_residual(&mut net, &system, &t);
        assert_eq!(residual.shape(), (2, 4));
        assert_relative_eq!(residual.norm(), 0.0, epsilon = 1e-12);
        assert_eq!(cache.y.shape(), (2, 4));
    }

    #[test]
    #[should_panic(expected = "state dimension")]
    fn test_dimension_mismatch_rejected() {
        let mut net = PinnNet::new(NetConfig::new(3));
        let system = crate::numerical::ode_systems::BenchProblem::Hooke.setup();
        let t = DVector::from_vec(vec![0.0, 0.5]);
        let _ = physics_residual(&mut net, &system, &t);
    }
}

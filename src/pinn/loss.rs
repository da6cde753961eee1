/// Composite training loss: physics residual over a collocation batch,
/// initial-condition misfit, and an optional labeled data misfit, weighted
/// and summed. Gradient assembly backpropagates each active term through its
/// own forward pass; the residual term additionally needs the rhs jacobian
/// with respect to the state, supplied per sample by the same
/// central-difference approximation the implicit integrators use.
use crate::numerical::jacobian::jacobian_central;
use crate::numerical::ode_systems::OdeSystem;
use crate::pinn::backprop::{NetGrads, backward};
use crate::pinn::network::PinnNet;
use crate::pinn::residual::physics_residual;
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, Copy)]
pub struct LossWeights {
    pub res: f64,
    pub ic: f64,
    pub data: f64,
}

impl Default for LossWeights {
    fn default() -> LossWeights {
        LossWeights {
            res: 1.0,
            ic: 1.0,
            data: 0.0,
        }
    }
}

impl LossWeights {
    pub fn check(&self) {
        assert!(
            self.res >= 0.0 && self.ic >= 0.0 && self.data >= 0.0,
            "loss weights must be non-negative"
        );
    }
}

/// Unweighted values of the three loss terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct LossTerms {
    pub residual: f64,
    pub ic: f64,
    pub data: f64,
}

/// Labeled samples for the data term: times and the matching D x N states.
pub struct DataBatch {
    pub t: DVector<f64>,
    pub y: DMatrix<f64>,
}

impl DataBatch {
    pub fn new(t: DVector<f64>, y: DMatrix<f64>) -> DataBatch {
        assert_eq!(t.len(), y.ncols(), "times and states disagree in length");
        DataBatch { t, y }
    }
}

fn mean_sq(m: &DMatrix<f64>) -> f64 {
    m.map(|v| v * v).sum() / (m.nrows() * m.ncols()) as f64
}

/// Loss value only, for logging and held-out scoring.
pub fn composite_loss(
    net: &mut PinnNet,
    system: &OdeSystem,
    colloc: &DVector<f64>,
    weights: &LossWeights,
    data: Option<&DataBatch>,
) -> (f64, LossTerms) {
    let (loss, terms, _) = loss_pieces(net, system, colloc, weights, data, false);
    (loss, terms)
}

/// Loss value plus parameter gradients of the weighted sum.
pub fn composite_loss_and_grads(
    net: &mut PinnNet,
    system: &OdeSystem,
    colloc: &DVector<f64>,
    weights: &LossWeights,
    data: Option<&DataBatch>,
) -> (f64, LossTerms, NetGrads) {
    let (loss, terms, grads) = loss_pieces(net, system, colloc, weights, data, true);
    (loss, terms, grads.expect("gradients requested"))
}

fn loss_pieces(
    net: &mut PinnNet,
    system: &OdeSystem,
    colloc: &DVector<f64>,
    weights: &LossWeights,
    data: Option<&DataBatch>,
    with_grads: bool,
) -> (f64, LossTerms, Option<NetGrads>) {
    weights.check();
    let d = system.state_dim;
    let mut grads = if with_grads {
        Some(NetGrads::zeros_like(net))
    } else {
        None
    };

    // residual term over the collocation batch
    let (residual, cache) = physics_residual(net, system, colloc);
    let res_term = mean_sq(&residual);
    if let Some(ref mut total) = grads {
        if weights.res > 0.0 {
            let n = colloc.len();
            let scale = 2.0 * weights.res / (d * n) as f64;
            let g_ydot = scale * &residual;
            // chain through f(t, Y): dL/dY_j = -J_f(t_j, Y_j)^T s_j
            let mut g_y = DMatrix::zeros(d, n);
            for j in 0..n {
                let t_j = colloc[j];
                let y_j = cache.y.column(j).into_owned();
                let jac = jacobian_central(&|y: &DVector<f64>| system.rhs_at(t_j, y), &y_j);
                let s_j = g_ydot.column(j).into_owned();
                g_y.set_column(j, &(-(jac.transpose() * s_j)));
            }
            total.add(&backward(net, &cache, &g_y, Some(&g_ydot)));
        }
    }

    // initial-condition term at t0
    let (t0, _) = system.t_span;
    let t0_batch = DMatrix::from_row_slice(1, 1, &[t0]);
    let ic_cache = net.forward_cached(&t0_batch, false);
    let ic_diff = &ic_cache.y.column(0) - &system.y0;
    let ic_term = ic_diff.map(|v| v * v).sum() / d as f64;
    if let Some(ref mut total) = grads {
        if weights.ic > 0.0 {
            let scale = 2.0 * weights.ic / d as f64;
            let g_y = DMatrix::from_column_slice(d, 1, (scale * &ic_diff).as_slice());
            total.add(&backward(net, &ic_cache, &g_y, None));
        }
    }

    // optional data term
    let data_term = if let Some(batch) = data {
        assert_eq!(batch.y.nrows(), d, "labeled batch state dimension mismatch");
        let t_row = DMatrix::from_row_slice(1, batch.t.len(), batch.t.as_slice());
        let data_cache = net.forward_cached(&t_row, false);
        let diff = &data_cache.y - &batch.y;
        let term = mean_sq(&diff);
        if let Some(ref mut total) = grads {
            if weights.data > 0.0 {
                let scale = 2.0 * weights.data / (d * batch.t.len()) as f64;
                let g_y = scale * diff;
                total.add(&backward(net, &data_cache, &g_y, None));
            }
        }
        term
    } else {
        0.0
    };

    let loss = weights.res * res_term + weights.ic * ic_term + weights.data * data_term;
    (
        loss,
        LossTerms {
            residual: res_term,
            ic: ic_term,
            data: data_term,
        },
        grads,
    )
}

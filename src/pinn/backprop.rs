/// Reverse-mode pass through the surrogate's forward computation. The
/// physics residual differentiates the network output with respect to its
/// time input (the tangent chain recorded by forward_cached), so gradients of
/// the composite loss require adjoints through both the value chain and the
/// tangent chain; the latter is where the activation second derivative
/// enters. The result is one gradient block per parameter block, never an
/// update in place: the training loop owns all mutation.
use crate::pinn::network::{ForwardCache, PinnNet};
use nalgebra::{DMatrix, DVector};

/// Gradients mirroring the layer layout of the network.
pub struct NetGrads {
    pub w: Vec<DMatrix<f64>>,
    pub b: Vec<DVector<f64>>,
}

impl NetGrads {
    pub fn zeros_like(net: &PinnNet) -> NetGrads {
        NetGrads {
            w: net
                .layers
                .iter()
                .map(|l| DMatrix::zeros(l.w.nrows(), l.w.ncols()))
                .collect(),
            b: net.layers.iter().map(|l| DVector::zeros(l.b.len())).collect(),
        }
    }

    pub fn add(&mut self, other: &NetGrads) {
        for (a, b) in self.w.iter_mut().zip(other.w.iter()) {
            *a += b;
        }
        for (a, b) in self.b.iter_mut().zip(other.b.iter()) {
            *a += b;
        }
    }

    pub fn scale(&mut self, factor: f64) {
        for w in self.w.iter_mut() {
            *w *= factor;
        }
        for b in self.b.iter_mut() {
            *b *= factor;
        }
    }

    /// Global L2 norm across every parameter block.
    pub fn global_norm(&self) -> f64 {
        let mut sq = 0.0;
        for w in &self.w {
            sq += w.norm_squared();
        }
        for b in &self.b {
            sq += b.norm_squared();
        }
        sq.sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.w.iter().all(|w| w.iter().all(|v| v.is_finite()))
            && self.b.iter().all(|b| b.iter().all(|v| v.is_finite()))
    }
}

/// Backpropagate the seeds dL/dY (and optionally dL/d(dY/dt)) recorded
/// against a forward cache into parameter gradients.
///
/// Per layer, with value chain z = W a_in + b, a = mask .* act(z) and tangent
/// chain zd = W ad_in, ad = mask .* act'(z) .* zd:
///   dW += g_z a_in^T + g_zd ad_in^T
///   db += row sums of g_z
///   g_z  = act'(z) .* g_a  +  act''(z) .* zd .* g_ad
///   g_zd = act'(z) .* g_ad
pub fn backward(
    net: &PinnNet,
    cache: &ForwardCache,
    g_y: &DMatrix<f64>,
    g_ydot: Option<&DMatrix<f64>>,
) -> NetGrads {
    let n_hidden = net.config.hidden_sizes.len();
    let act = net.config.activation;
    let tangent = g_ydot.is_some();
    if tangent {
        assert!(
            cache.ydot.is_some(),
            "tangent seed supplied but the forward pass did not record tangents"
        );
    }

    let mut grads = NetGrads::zeros_like(net);

    // output affine map
    let out = &net.layers[n_hidden];
    grads.w[n_hidden] = g_y * cache.activ[n_hidden].transpose();
    grads.b[n_hidden] = g_y.column_sum();
    let mut g_a = out.w.transpose() * g_y;
    let mut g_adot = if let Some(gd) = g_ydot {
        grads.w[n_hidden] += gd * cache.adots[n_hidden].transpose();
        Some(out.w.transpose() * gd)
    } else {
        None
    };

    for l in (0..n_hidden).rev() {
        // dropout mask applies to value and tangent alike
        if let Some(mask) = &cache.masks[l] {
            g_a = g_a.component_mul(mask);
            if let Some(ref mut gd) = g_adot {
                *gd = gd.component_mul(mask);
            }
        }
        let z = &cache.zs[l];
        let d1 = z.map(|x| act.deriv(x));
        let mut g_z = d1.component_mul(&g_a);
        let g_zdot = if let Some(ref gd) = g_adot {
            let d2 = z.map(|x| act.deriv2(x));
            g_z += d2.component_mul(&cache.zdots[l]).component_mul(gd);
            Some(d1.component_mul(gd))
        } else {
            None
        };

        grads.w[l] = &g_z * cache.activ[l].transpose();
        grads.b[l] = g_z.column_sum();
        let layer = &net.layers[l];
        let next_g_a = layer.w.transpose() * &g_z;
        let next_g_adot = if let Some(ref gzd) = g_zdot {
            grads.w[l] += gzd * cache.adots[l].transpose();
            Some(layer.w.transpose() * gzd)
        } else {
            None
        };
        g_a = next_g_a;
        g_adot = next_g_adot;
    }

    grads
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use crate::pinn::network::{Activation, NetConfig};
    use approx::assert_relative_eq;

    // scalar loss used for the numerical gradient checks below
    fn value_loss(net: &PinnNet, t: &DMatrix<f64>) -> f64 {
        let y = net.predict(t);
        y.map(|v| v * v).sum() / (y.nrows() * y.ncols()) as f64
    }

    fn tangent_loss(net: &mut PinnNet, t: &DMatrix<f64>) -> f64 {
        let cache = net.forward_cached(t, true);
        let yd = cache.ydot.unwrap();
        yd.map(|v| v * v).sum() / (yd.nrows() * yd.ncols()) as f64
    }

    #[test]
    fn test_value_chain_gradients_match_finite_differences() {
        // L = mean(Y^2); seed dL/dY = 2Y/(D*N)
        let mut config = NetConfig::new(2);
        config.hidden_sizes = vec![6, 5];
        config.activation = Activation::Tanh;
        config.init_scale = 1.0;
        let mut net = PinnNet::new(config);
        let t = DMatrix::from_row_slice(1, 4, &[0.1, 0.4, 0.7, 1.0]);

        let cache = net.forward_cached(&t, false);
        let dn = (cache.y.nrows() * cache.y.ncols()) as f64;
        let g_y = 2.0 / dn * &cache.y;
        let grads = backward(&net, &cache, &g_y, None);

        let eps = 1e-6;
        for l in 0..net.layers.len() {
            for idx in [(0, 0), (net.layers[l].w.nrows() - 1, net.layers[l].w.ncols() - 1)] {
                let orig = net.layers[l].w[idx];
                net.layers[l].w[idx] = orig + eps;
                let lp = value_loss(&net, &t);
                net.layers[l].w[idx] = orig - eps;
                let lm = value_loss(&net, &t);
                net.layers[l].w[idx] = orig;
                let fd = (lp - lm) / (2.0 * eps);
                assert_relative_eq!(grads.w[l][idx], fd, epsilon = 1e-7);
            }
            let orig = net.layers[l].b[0];
            net.layers[l].b[0] = orig + eps;
            let lp = value_loss(&net, &t);
            net.layers[l].b[0] = orig - eps;
            let lm = value_loss(&net, &t);
            net.layers[l].b[0] = orig;
            let fd = (lp - lm) / (2.0 * eps);
            assert_relative_eq!(grads.b[l][0], fd, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_tangent_chain_gradients_match_finite_differences() {
        // L = mean((dY/dt)^2); exercises the act'' term
        let mut config = NetConfig::new(1);
        config.hidden_sizes = vec![7];
        config.activation = Activation::Tanh;
        config.init_scale = 1.0;
        let mut net = PinnNet::new(config);
        let t = DMatrix::from_row_slice(1, 3, &[0.2, 0.5, 0.9]);

        let cache = net.forward_cached(&t, true);
        let yd = cache.ydot.as_ref().unwrap();
        let dn = (yd.nrows() * yd.ncols()) as f64;
        let g_ydot = 2.0 / dn * yd;
        let g_y = DMatrix::zeros(yd.nrows(), yd.ncols());
        let grads = backward(&net, &cache, &g_y, Some(&g_ydot));

        let eps = 1e-6;
        for l in 0..net.layers.len() {
            let idx = (0, 0);
            let orig = net.layers[l].w[idx];
            net.layers[l].w[idx] = orig + eps;
            let lp = tangent_loss(&mut net, &t);
            net.layers[l].w[idx] = orig - eps;
            let lm = tangent_loss(&mut net, &t);
            net.layers[l].w[idx] = orig;
            let fd = (lp - lm) / (2.0 * eps);
            assert_relative_eq!(grads.w[l][idx], fd, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_swish_gradients_match_finite_differences() {
        let mut config = NetConfig::new(1);
        config.hidden_sizes = vec![5];
        config.activation = Activation::Swish;
        config.init_scale = 1.0;
        let mut net = PinnNet::new(config);
        let t = DMatrix::from_row_slice(1, 2, &[0.3, 0.8]);

        let cache = net.forward_cached(&t, true);
        let yd = cache.ydot.as_ref().unwrap();
        let g_ydot = 2.0 * yd / (yd.ncols() as f64);
        let g_y = DMatrix::zeros(1, 2);
        let grads = backward(&net, &cache, &g_y, Some(&g_ydot));

        let eps = 1e-6;
        let orig = net.layers[0].w[(2, 0)];
        net.layers[0].w[(2, 0)] = orig + eps;
        let lp = tangent_loss(&mut net, &t);
        net.layers[0].w[(2, 0)] = orig - eps;
        let lm = tangent_loss(&mut net, &t);
        net.layers[0].w[(2, 0)] = orig;
        let fd = (lp - lm) / (2.0 * eps);
        assert_relative_eq!(grads.w[0][(2, 0)], fd, epsilon = 1e-6);
    }

    #[test]
    fn test_grads_utilities() {
        let net = PinnNet::new(NetConfig::new(2));
        let mut g = NetGrads::zeros_like(&net);
        assert_eq!(g.global_norm(), 0.0);
        g.w[0][(0, 0)] = 3.0;
        g.b[0][0] = 4.0;
        assert_relative_eq!(g.global_norm(), 5.0, epsilon = 1e-14);
        g.scale(0.5);
        assert_relative_eq!(g.global_norm(), 2.5, epsilon = 1e-14);
        assert!(g.is_finite());
    }
}

/// Parameter update rules. State buffers are keyed by parameter name, shaped
/// like the parameter collection, zero-initialized at training start and
/// discarded with the optimizer; the network itself never owns them.
use crate::pinn::backprop::NetGrads;
use crate::pinn::network::PinnNet;
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;

pub enum Optimizer {
    Sgd(SgdMomentum),
    Adam(Adam),
}

impl Optimizer {
    pub fn step(&mut self, net: &mut PinnNet, grads: &NetGrads, lr: f64) {
        match self {
            Optimizer::Sgd(sgd) => sgd.step(net, grads, lr),
            Optimizer::Adam(adam) => adam.step(net, grads, lr),
        }
    }
}

/// v <- momentum*v - lr*g; theta <- theta + v
pub struct SgdMomentum {
    pub momentum: f64,
    vel_w: HashMap<String, DMatrix<f64>>,
    vel_b: HashMap<String, DVector<f64>>,
}

impl SgdMomentum {
    pub fn new(net: &PinnNet, momentum: f64) -> SgdMomentum {
        let mut vel_w = HashMap::new();
        let mut vel_b = HashMap::new();
        for (i, layer) in net.layers.iter().enumerate() {
            vel_w.insert(
                format!("layer{}.weight", i),
                DMatrix::zeros(layer.w.nrows(), layer.w.ncols()),
            );
            vel_b.insert(format!("layer{}.bias", i), DVector::zeros(layer.b.len()));
        }
        SgdMomentum {
            momentum,
            vel_w,
            vel_b,
        }
    }

    pub fn step(&mut self, net: &mut PinnNet, grads: &NetGrads, lr: f64) {
        for (i, layer) in net.layers.iter_mut().enumerate() {
            let vw = self.vel_w.get_mut(&format!("layer{}.weight", i)).unwrap();
            *vw = self.momentum * &*vw - lr * &grads.w[i];
            layer.w += &*vw;
            let vb = self.vel_b.get_mut(&format!("layer{}.bias", i)).unwrap();
            *vb = self.momentum * &*vb - lr * &grads.b[i];
            layer.b += &*vb;
        }
    }
}

/// Bias-corrected Adam. The step counter is advanced by the training loop
/// (once per epoch in the reference schedule, or per batch when the trainer
/// is configured that way), not by this update.
pub struct Adam {
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    pub t: usize,
    m_w: HashMap<String, DMatrix<f64>>,
    v_w: HashMap<String, DMatrix<f64>>,
    m_b: HashMap<String, DVector<f64>>,
    v_b: HashMap<String, DVector<f64>>,
}

impl Adam {
    pub fn new(net: &PinnNet, beta1: f64, beta2: f64, eps: f64) -> Adam {
        let mut m_w = HashMap::new();
        let mut v_w = HashMap::new();
        let mut m_b = HashMap::new();
        let mut v_b = HashMap::new();
        for (i, layer) in net.layers.iter().enumerate() {
            let wname = format!("layer{}.weight", i);
            let bname = format!("layer{}.bias", i);
            m_w.insert(wname.clone(), DMatrix::zeros(layer.w.nrows(), layer.w.ncols()));
            v_w.insert(wname, DMatrix::zeros(layer.w.nrows(), layer.w.ncols()));
            m_b.insert(bname.clone(), DVector::zeros(layer.b.len()));
            v_b.insert(bname, DVector::zeros(layer.b.len()));
        }
        Adam {
            beta1,
            beta2,
            eps,
            t: 0,
            m_w,
            v_w,
            m_b,
            v_b,
        }
    }

    pub fn advance_counter(&mut self) {
        self.t += 1;
    }

    pub fn step(&mut self, net: &mut PinnNet, grads: &NetGrads, lr: f64) {
        let t = self.t.max(1);
        let bc1 = 1.0 - self.beta1.powi(t as i32);
        let bc2 = 1.0 - self.beta2.powi(t as i32);
        for (i, layer) in net.layers.iter_mut().enumerate() {
            let wname = format!("layer{}.weight", i);
            let bname = format!("layer{}.bias", i);

            let m = self.m_w.get_mut(&wname).unwrap();
            *m = self.beta1 * &*m + (1.0 - self.beta1) * &grads.w[i];
            let v = self.v_w.get_mut(&wname).unwrap();
            *v = self.beta2 * &*v + (1.0 - self.beta2) * grads.w[i].component_mul(&grads.w[i]);
            let m_hat = &*m / bc1;
            let v_hat = &*v / bc2;
            let update =
                m_hat.zip_map(&v_hat, |mh, vh| -lr * mh / (vh.sqrt() + self.eps));
            layer.w += update;

            let m = self.m_b.get_mut(&bname).unwrap();
            *m = self.beta1 * &*m + (1.0 - self.beta1) * &grads.b[i];
            let v = self.v_b.get_mut(&bname).unwrap();
            *v = self.beta2 * &*v + (1.0 - self.beta2) * grads.b[i].component_mul(&grads.b[i]);
            let m_hat = &*m / bc1;
            let v_hat = &*v / bc2;
            let update =
                m_hat.zip_map(&v_hat, |mh, vh| -lr * mh / (vh.sqrt() + self.eps));
            layer.b += update;
        }
    }
}

use core::fmt::Display;

/// Feed-forward surrogate mapping scalar time to a state vector. The forward
/// pass is vectorized over a 1 x N time batch and can simultaneously
/// propagate d/dt tangents, which is what the physics residual consumes.
/// Precondition of the batched layout: sample j's output depends only on
/// time_batch[j] (no cross-sample coupling such as batch normalization).
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Tanh,
    Relu,
    Swish,
}

impl Activation {
    /// Used by entry points that take the activation by name.
    pub fn from_name(name: &str) -> Activation {
        match name {
            "tanh" => Activation::Tanh,
            "relu" => Activation::Relu,
            "swish" => Activation::Swish,
            _ => panic!("unknown activation '{}', expected tanh/relu/swish", name),
        }
    }

    pub fn value(&self, x: f64) -> f64 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Relu => x.max(0.0),
            Activation::Swish => x * sigmoid(x),
        }
    }

    pub fn deriv(&self, x: f64) -> f64 {
        match self {
            Activation::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            Activation::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Swish => {
                let s = sigmoid(x);
                s * (1.0 + x * (1.0 - s))
            }
        }
    }

    /// Second derivative, needed when backpropagating through the tangent
    /// chain of the forward pass.
    pub fn deriv2(&self, x: f64) -> f64 {
        match self {
            Activation::Tanh => {
                let t = x.tanh();
                -2.0 * t * (1.0 - t * t)
            }
            Activation::Relu => 0.0,
            Activation::Swish => {
                let s = sigmoid(x);
                s * (1.0 - s) * (2.0 + x * (1.0 - 2.0 * s))
            }
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Network configuration, validated once at construction.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// state dimension D of the described system
    pub output_dim: usize,
    pub hidden_sizes: Vec<usize>,
    pub activation: Activation,
    pub dropout: f64,
    /// multiplier on the Glorot uniform bound
    pub init_scale: f64,
    pub seed: u64,
}

impl NetConfig {
    pub fn new(output_dim: usize) -> NetConfig {
        NetConfig {
            output_dim,
            hidden_sizes: vec![32, 32],
            activation: Activation::Tanh,
            dropout: 0.0,
            init_scale: 0.1,
            seed: 42,
        }
    }

    pub fn check(&self) {
        assert!(self.output_dim >= 1, "output dimension must be positive");
        assert!(
            !self.hidden_sizes.is_empty(),
            "at least one hidden layer is required"
        );
        assert!(
            self.hidden_sizes.iter().all(|&w| w > 0),
            "hidden layer widths must be positive"
        );
        assert!(
            self.dropout >= 0.0 && self.dropout <= 1.0,
            "dropout must lie in [0, 1], got {}",
            self.dropout
        );
        assert!(self.init_scale > 0.0, "init scale must be positive");
    }
}

pub struct DenseLayer {
    pub w: DMatrix<f64>,
    pub b: DVector<f64>,
}

/// Values and d/dt tangents recorded by a forward pass, laid out for the
/// reverse pass. activ[l] is the input of layer l (activ[0] is the time row),
/// zs[l]/zdots[l] are the pre-activations of hidden layer l.
pub struct ForwardCache {
    pub activ: Vec<DMatrix<f64>>,
    pub zs: Vec<DMatrix<f64>>,
    pub masks: Vec<Option<DMatrix<f64>>>,
    pub adots: Vec<DMatrix<f64>>,
    pub zdots: Vec<DMatrix<f64>>,
    pub y: DMatrix<f64>,
    pub ydot: Option<DMatrix<f64>>,
}

pub struct PinnNet {
    pub config: NetConfig,
    /// hidden layers followed by the output affine map
    pub layers: Vec<DenseLayer>,
    pub training: bool,
    rng: StdRng,
}

impl Display for PinnNet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let widths: Vec<String> = self.config.hidden_sizes.iter().map(|w| w.to_string()).collect();
        write!(
            f,
            "PinnNet {{ 1 -> {} -> {}, activation: {:?}, dropout: {} }}",
            widths.join(" -> "),
            self.config.output_dim,
            self.config.activation,
            self.config.dropout
        )
    }
}

impl PinnNet {
    /// Glorot-uniform initialization scaled by config.init_scale:
    /// limit = scale*sqrt(6/(fan_in + fan_out)), biases zero.
    pub fn new(config: NetConfig) -> PinnNet {
        config.check();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut layers = Vec::new();
        let mut fan_in = 1;
        for &width in &config.hidden_sizes {
            layers.push(init_layer(&mut rng, width, fan_in, config.init_scale));
            fan_in = width;
        }
        layers.push(init_layer(&mut rng, config.output_dim, fan_in, config.init_scale));
        PinnNet {
            config,
            layers,
            training: false,
            rng,
        }
    }

    pub fn train_mode(&mut self) {
        self.training = true;
    }

    pub fn eval_mode(&mut self) {
        self.training = false;
    }

    pub fn n_params(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.w.nrows() * l.w.ncols() + l.b.len())
            .sum()
    }

    /// Parameter names in optimizer-buffer order.
    pub fn param_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for i in 0..self.layers.len() {
            names.push(format!("layer{}.weight", i));
            names.push(format!("layer{}.bias", i));
        }
        names
    }

    /// Accept times as a row or a column and normalize to the 1 x N row
    /// convention used internally.
    fn to_row(t: &DMatrix<f64>) -> DMatrix<f64> {
        if t.nrows() == 1 {
            t.clone()
        } else if t.ncols() == 1 {
            t.transpose()
        } else {
            panic!(
                "time input must be a row or a column, got {} x {}",
                t.nrows(),
                t.ncols()
            );
        }
    }

    /// Full forward pass with caches; with_tangent additionally propagates
    /// d/dt through every layer (the tangent seed is a row of ones since the
    /// input is the time itself).
    pub fn forward_cached(&mut self, t: &DMatrix<f64>, with_tangent: bool) -> ForwardCache {
        let input = Self::to_row(t);
        let n = input.ncols();
        let act = self.config.activation;
        let n_hidden = self.config.hidden_sizes.len();

        let mut activ: Vec<DMatrix<f64>> = vec![input];
        let mut zs: Vec<DMatrix<f64>> = Vec::with_capacity(n_hidden);
        let mut masks: Vec<Option<DMatrix<f64>>> = Vec::with_capacity(n_hidden);
        let mut adots: Vec<DMatrix<f64>> = Vec::new();
        let mut zdots: Vec<DMatrix<f64>> = Vec::new();
        if with_tangent {
            adots.push(DMatrix::from_element(1, n, 1.0));
        }

        let apply_dropout = self.training && self.config.dropout > 0.0;
        let keep_prob = 1.0 - self.config.dropout;

        for l in 0..n_hidden {
            let layer = &self.layers[l];
            let z = &layer.w * &activ[l] + broadcast(&layer.b, n);
            let mut a = z.map(|x| act.value(x));
            let mut adot = if with_tangent {
                let zdot = &layer.w * &adots[l];
                let sd = z.map(|x| act.deriv(x));
                let adot = sd.component_mul(&zdot);
                zdots.push(zdot);
                Some(adot)
            } else {
                None
            };
            // inverted dropout: fresh keep mask scaled by 1/keep_prob, drawn
            // independently per call, applied to value and tangent alike
            let mask = if apply_dropout {
                let m = DMatrix::from_fn(a.nrows(), a.ncols(), |_, _| {
                    if self.rng.random_range(0.0..1.0) < keep_prob {
                        1.0 / keep_prob
                    } else {
                        0.0
                    }
                });
                a = a.component_mul(&m);
                if let Some(ref mut ad) = adot {
                    *ad = ad.component_mul(&m);
                }
                Some(m)
            } else {
                None
            };
            zs.push(z);
            masks.push(mask);
            activ.push(a);
            if let Some(ad) = adot {
                adots.push(ad);
            }
        }

        let out_layer = &self.layers[n_hidden];
        let y = &out_layer.w * &activ[n_hidden] + broadcast(&out_layer.b, n);
        let ydot = if with_tangent {
            Some(&out_layer.w * &adots[n_hidden])
        } else {
            None
        };

        ForwardCache {
            activ,
            zs,
            masks,
            adots,
            zdots,
            y,
            ydot,
        }
    }

    /// Evaluation-path forward: no dropout, no caches, no tangent.
    pub fn predict(&self, t: &DMatrix<f64>) -> DMatrix<f64> {
        let input = Self::to_row(t);
        let n = input.ncols();
        let act = self.config.activation;
        let n_hidden = self.config.hidden_sizes.len();
        let mut a = input;
        for l in 0..n_hidden {
            let layer = &self.layers[l];
            let z = &layer.w * &a + broadcast(&layer.b, n);
            a = z.map(|x| act.value(x));
        }
        let out = &self.layers[n_hidden];
        &out.w * &a + broadcast(&out.b, n)
    }

    /// Predicted D x N trajectory over a time grid.
    pub fn predict_times(&self, t: &DVector<f64>) -> DMatrix<f64> {
        let row = DMatrix::from_row_slice(1, t.len(), t.as_slice());
        self.predict(&row)
    }
}

fn init_layer(rng: &mut StdRng, rows: usize, cols: usize, scale: f64) -> DenseLayer {
    let limit = scale * (6.0 / (cols as f64 + rows as f64)).sqrt();
    let w = DMatrix::from_fn(rows, cols, |_, _| rng.random_range(-limit..limit));
    DenseLayer {
        w,
        b: DVector::zeros(rows),
    }
}

/// Repeat a bias column across N samples.
fn broadcast(b: &DVector<f64>, n: usize) -> DMatrix<f64> {
    DMatrix::from_fn(b.len(), n, |i, _| b[i])
}

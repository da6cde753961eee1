/// Epoch/batch training driver for the physics-informed surrogate. A fixed
/// collocation pool is sampled once before the loop starts and only
/// re-shuffled into batches afterwards; each batch evaluates the composite
/// loss, clips the gradient collection to a global norm bound and applies
/// one optimizer update. Runs exactly `epochs` iterations, no early exit.
use crate::numerical::ode_systems::OdeSystem;
use crate::pinn::backprop::NetGrads;
use crate::pinn::loss::{DataBatch, LossTerms, LossWeights, composite_loss_and_grads};
use crate::pinn::metrics::{MetricsRecord, regression_metrics};
use crate::pinn::network::PinnNet;
use crate::pinn::optimizers::{Adam, Optimizer, SgdMomentum};
use crate::pinn::sampler::{SamplingMode, sample_collocation};
use log::info;
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    Sgd,
    Adam,
}

/// All knobs of a training run, resolved once at construction and never
/// re-read mid-run.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub collocation_n: usize,
    pub sampling: SamplingMode,
    pub lr: f64,
    pub optimizer: OptimizerKind,
    pub momentum: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    /// reference schedule advances the Adam counter once per epoch; set this
    /// to get the textbook per-batch counter instead
    pub adam_step_per_batch: bool,
    /// global L2 bound on the gradient collection, 0 disables clipping
    pub grad_clip: f64,
    /// multiply lr by decay_factor every decay_every epochs, 0 disables
    pub decay_every: usize,
    pub decay_factor: f64,
    pub print_every: usize,
    pub weights: LossWeights,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> TrainConfig {
        TrainConfig {
            epochs: 200,
            batch_size: 32,
            collocation_n: 128,
            sampling: SamplingMode::Random,
            lr: 1e-3,
            optimizer: OptimizerKind::Adam,
            momentum: 0.9,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            adam_step_per_batch: false,
            grad_clip: 1.0,
            decay_every: 0,
            decay_factor: 0.9,
            print_every: 50,
            weights: LossWeights::default(),
            seed: 42,
        }
    }
}

impl TrainConfig {
    pub fn check(&self) {
        assert!(self.epochs > 0, "epochs must be positive");
        assert!(self.batch_size > 0, "batch size must be positive");
        assert!(self.collocation_n >= 2, "collocation pool too small");
        assert!(self.lr > 0.0, "learning rate must be positive");
        assert!(self.grad_clip >= 0.0, "grad clip must be non-negative");
        assert!(
            self.decay_factor > 0.0 && self.decay_factor <= 1.0,
            "decay factor must lie in (0, 1]"
        );
        self.weights.check();
    }
}

/// Per-epoch report row surfaced to callers and the log.
#[derive(Debug, Clone)]
pub struct EpochRecord {
    pub epoch: usize,
    pub loss: f64,
    pub residual_term: f64,
    pub ic_term: f64,
    pub data_term: f64,
    pub metrics: Option<MetricsRecord>,
}

/// Rescale the whole gradient collection so its global L2 norm does not
/// exceed the bound; untouched when already within it. Returns the pre-clip
/// norm.
pub fn clip_gradients(grads: &mut NetGrads, grad_clip: f64) -> f64 {
    let norm = grads.global_norm();
    if grad_clip > 0.0 && norm > grad_clip {
        grads.scale(grad_clip / norm);
    }
    norm
}

pub struct PinnTrainer {
    pub config: TrainConfig,
    pub history: Vec<EpochRecord>,
    pub status: String,
}

impl PinnTrainer {
    pub fn new(config: TrainConfig) -> PinnTrainer {
        config.check();
        PinnTrainer {
            config,
            history: Vec::new(),
            status: "created".to_string(),
        }
    }

    /// Train the surrogate on the system's physics. `data` feeds the labeled
    /// misfit term (weighted by weights.data); `eval` is a held-out set
    /// scored on the logging cadence.
    pub fn train(
        &mut self,
        net: &mut PinnNet,
        system: &OdeSystem,
        data: Option<&DataBatch>,
        eval: Option<&DataBatch>,
    ) {
        let start = Instant::now();
        let cfg = self.config.clone();
        self.history.clear();
        self.status = "running".to_string();
        net.train_mode();

        // the pool is drawn once; epochs only re-shuffle it
        let pool = sample_collocation(
            system.t_span,
            cfg.collocation_n,
            cfg.sampling,
            Some(cfg.seed),
        );
        let mut shuffle_rng = StdRng::seed_from_u64(cfg.seed ^ 0x5eed);
        let mut optimizer = match cfg.optimizer {
            OptimizerKind::Sgd => Optimizer::Sgd(SgdMomentum::new(net, cfg.momentum)),
            OptimizerKind::Adam => {
                Optimizer::Adam(Adam::new(net, cfg.beta1, cfg.beta2, cfg.eps))
            }
        };

        let mut lr = cfg.lr;
        let mut indices: Vec<usize> = (0..pool.len()).collect();

        for epoch in 0..cfg.epochs {
            if cfg.decay_every > 0 && epoch > 0 && epoch % cfg.decay_every == 0 {
                lr *= cfg.decay_factor;
                info!("epoch {}: learning rate decayed to {:.3e}", epoch, lr);
            }
            if let Optimizer::Adam(ref mut adam) = optimizer {
                if !cfg.adam_step_per_batch {
                    adam.advance_counter();
                }
            }

            indices.shuffle(&mut shuffle_rng);
            let mut epoch_terms = LossTerms::default();
            let mut epoch_loss = 0.0;
            let mut n_batches = 0usize;

            for batch_idx in indices.chunks(cfg.batch_size) {
                let batch =
                    DVector::from_fn(batch_idx.len(), |i, _| pool[batch_idx[i]]);
                let (loss, terms, mut grads) =
                    composite_loss_and_grads(net, system, &batch, &cfg.weights, data);
                assert!(
                    loss.is_finite() && grads.is_finite(),
                    "loss or gradients are not finite at epoch {}",
                    epoch
                );
                clip_gradients(&mut grads, cfg.grad_clip);
                if let Optimizer::Adam(ref mut adam) = optimizer {
                    if cfg.adam_step_per_batch {
                        adam.advance_counter();
                    }
                }
                optimizer.step(net, &grads, lr);
                epoch_loss += loss;
                epoch_terms.residual += terms.residual;
                epoch_terms.ic += terms.ic;
                epoch_terms.data += terms.data;
                n_batches += 1;
            }

            let inv = 1.0 / n_batches as f64;
            let record_metrics = epoch == 0
                || epoch == cfg.epochs - 1
                || (cfg.print_every > 0 && epoch % cfg.print_every == 0);
            let metrics = if record_metrics {
                eval.map(|set| {
                    net.eval_mode();
                    let prediction = net.predict_times(&set.t);
                    let record = regression_metrics(&prediction, &set.y);
                    net.train_mode();
                    record
                })
            } else {
                None
            };
            let record = EpochRecord {
                epoch,
                loss: epoch_loss * inv,
                residual_term: epoch_terms.residual * inv,
                ic_term: epoch_terms.ic * inv,
                data_term: epoch_terms.data * inv,
                metrics,
            };
            if record_metrics {
                match &record.metrics {
                    Some(m) => info!(
                        "epoch {}: loss {:.6e} (res {:.3e}, ic {:.3e}, data {:.3e}), eval mse {:.3e}, r2 {:.4}",
                        epoch,
                        record.loss,
                        record.residual_term,
                        record.ic_term,
                        record.data_term,
                        m.overall.mse,
                        m.overall.r2
                    ),
                    None => info!(
                        "epoch {}: loss {:.6e} (res {:.3e}, ic {:.3e}, data {:.3e})",
                        epoch, record.loss, record.residual_term, record.ic_term, record.data_term
                    ),
                }
            }
            self.history.push(record);
        }

        net.eval_mode();
        let duration = start.elapsed();
        info!(
            "training took {} milliseconds for {} epochs",
            duration.as_millis(),
            cfg.epochs
        );
        self.status = "finished".to_string();
    }
}

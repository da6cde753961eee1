/// Comparison harness: fit the surrogate to a system, run the classical
/// integrator suite on the same grid and score everything on a held-out
/// chronological tail of the reference trajectory. Results land in a table
/// keyed by method name with MSE/RMSE/MAE/R^2 columns.
use crate::Utils::dataset::{Dataset, SplitPolicy};
use crate::numerical::integrators::IntegratorSuite;
use crate::numerical::ode_systems::{BenchProblem, OdeSystem};
use crate::pinn::metrics::regression_metrics;
use crate::pinn::network::{NetConfig, PinnNet};
use crate::pinn::train::{PinnTrainer, TrainConfig};
use log::info;
use nalgebra::DMatrix;
use tabled::{builder::Builder, settings::Style};

#[derive(Debug, Clone)]
pub struct MethodScore {
    pub method: String,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

pub struct CompareHarness {
    pub net_config: NetConfig,
    pub train_config: TrainConfig,
    /// samples of the reference trajectory over the system span
    pub n_points: usize,
    /// share of the reference kept for fitting; the rest is scored
    pub split_ratio: f64,
    pub noise_std: f64,
    pub scores: Vec<MethodScore>,
    pub status: String,
}

impl CompareHarness {
    pub fn new(net_config: NetConfig, train_config: TrainConfig) -> CompareHarness {
        CompareHarness {
            net_config,
            train_config,
            n_points: 501,
            split_ratio: 0.8,
            noise_std: 0.0,
            scores: Vec::new(),
            status: "created".to_string(),
        }
    }

    pub fn run_problem(&mut self, problem: BenchProblem) -> &Vec<MethodScore> {
        let system = problem.setup();
        self.run(&system, problem.values())
    }

    pub fn run(&mut self, system: &OdeSystem, names: Vec<String>) -> &Vec<MethodScore> {
        assert_eq!(
            self.net_config.output_dim, system.state_dim,
            "surrogate output dimension does not match the system"
        );
        self.status = "running".to_string();
        self.scores.clear();

        let reference = Dataset::synthetic(
            system,
            names,
            self.n_points,
            self.noise_std,
            self.train_config.seed,
        );
        let (train_set, test_set) = reference.split(self.split_ratio, SplitPolicy::Chronological);
        let n_train = train_set.len();
        info!(
            "harness for '{}': {} fitting samples, {} held-out samples",
            system.name,
            n_train,
            test_set.len()
        );

        // surrogate: residual + initial condition supervision, with the
        // labeled fitting block when the data weight is active
        let mut net = PinnNet::new(self.net_config.clone());
        let mut trainer = PinnTrainer::new(self.train_config.clone());
        let data_batch = train_set.batch();
        let eval_batch = test_set.batch();
        let data = if self.train_config.weights.data > 0.0 {
            Some(&data_batch)
        } else {
            None
        };
        trainer.train(&mut net, system, data, Some(&eval_batch));

        let prediction = net.predict_times(&test_set.t);
        self.push_score("PINN", &prediction, &test_set.y);

        // classical suite over the full grid, scored on the same tail
        let mut suite = IntegratorSuite::new();
        suite.solve_all(system, &reference.t);
        for (kind, trajectory) in &suite.results {
            let tail = trajectory.columns(n_train, test_set.len()).into_owned();
            self.push_score(&format!("ODE {}", kind), &tail, &test_set.y);
        }

        info!("\n{}", self.report());
        self.status = "finished".to_string();
        &self.scores
    }

    fn push_score(&mut self, method: &str, prediction: &DMatrix<f64>, truth: &DMatrix<f64>) {
        let record = regression_metrics(prediction, truth);
        self.scores.push(MethodScore {
            method: method.to_string(),
            mse: record.overall.mse,
            rmse: record.overall.rmse,
            mae: record.overall.mae,
            r2: record.overall.r2,
        });
    }

    /// Render the score table.
    pub fn report(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(["method", "MSE", "RMSE", "MAE", "R2"]);
        for score in &self.scores {
            builder.push_record([
                score.method.clone(),
                format!("{:.6e}", score.mse),
                format!("{:.6e}", score.rmse),
                format!("{:.6e}", score.mae),
                format!("{:.4}", score.r2),
            ]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use crate::pinn::loss::LossWeights;

    #[test]
    fn test_harness_scores_all_methods_on_hooke() {
        let mut net_config = NetConfig::new(2);
        net_config.hidden_sizes = vec![8, 8];
        let mut train_config = TrainConfig::default();
        train_config.epochs = 3;
        train_config.collocation_n = 16;
        train_config.batch_size = 16;
        train_config.print_every = 0;
        let mut harness = CompareHarness::new(net_config, train_config);
        harness.n_points = 201;

        let scores = harness.run_problem(BenchProblem::Hooke).clone();
        assert_eq!(scores.len(), 6);
        assert_eq!(scores[0].method, "PINN");
        assert!(scores.iter().any(|s| s.method == "ODE rk4"));

        // the classical fixed-grid reference is essentially exact here
        let rk4 = scores.iter().find(|s| s.method == "ODE rk4").unwrap();
        assert!(rk4.mse < 1e-10);
        assert!(rk4.r2 > 0.9999);

        let table = harness.report();
        assert!(table.contains("PINN"));
        assert!(table.contains("RMSE"));
    }

    #[test]
    fn test_harness_with_data_term_runs() {
        let mut net_config = NetConfig::new(2);
        net_config.hidden_sizes = vec![8];
        let mut train_config = TrainConfig::default();
        train_config.epochs = 2;
        train_config.collocation_n = 8;
        train_config.batch_size = 8;
        train_config.print_every = 0;
        train_config.weights = LossWeights {
            res: 1.0,
            ic: 1.0,
            data: 1.0,
        };
        let mut harness = CompareHarness::new(net_config, train_config);
        harness.n_points = 101;
        harness.noise_std = 0.01;
        let scores = harness.run_problem(BenchProblem::Hooke);
        assert_eq!(scores.len(), 6);
        assert!(scores.iter().all(|s| s.mse.is_finite()));
    }

    #[test]
    fn test_harness_nan_sentinel_propagates_for_first_order_systems() {
        // lorenz has no [x; v] split, so the leapfrog row must come out NaN
        let mut net_config = NetConfig::new(3);
        net_config.hidden_sizes = vec![8];
        let mut train_config = TrainConfig::default();
        train_config.epochs = 2;
        train_config.collocation_n = 8;
        train_config.batch_size = 8;
        train_config.print_every = 0;
        let mut harness = CompareHarness::new(net_config, train_config);
        harness.n_points = 101;
        let scores = harness.run_problem(BenchProblem::Lorenz);
        let lf = scores.iter().find(|s| s.method == "ODE leapfrog").unwrap();
        assert!(lf.mse.is_nan());
    }
}

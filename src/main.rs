#![allow(non_snake_case)]
use RustedPINN::Utils::dataset::{Dataset, SplitPolicy};
use RustedPINN::Utils::logger::init_console_logger;
use RustedPINN::Utils::plots::{plot_overlay, plots};
use RustedPINN::harness::CompareHarness;
use RustedPINN::numerical::integrators::{IntegratorKind, IntegratorSuite};
use RustedPINN::numerical::ode_systems::BenchProblem;
use RustedPINN::pinn::loss::LossWeights;
use RustedPINN::pinn::network::{NetConfig, PinnNet};
use RustedPINN::pinn::train::{PinnTrainer, TrainConfig};
use nalgebra::DVector;

fn main() {
    init_console_logger("info");
    let example = 2;
    match example {
        0 => {
            // CLASSICAL SUITE ON HOOKE'S LAW
            // x'' = -x, x(0) = 1: all five methods on a uniform grid,
            // leapfrog holds the energy where explicit Euler drifts
            let problem = BenchProblem::Hooke;
            let system = problem.setup();
            let h = 0.01;
            let n = ((system.t_span.1 - system.t_span.0) / h).round() as usize + 1;
            let grid = DVector::from_fn(n, |i, _| system.t_span.0 + i as f64 * h);
            let mut suite = IntegratorSuite::new();
            suite.solve_all(&system, &grid);
            let rk4 = suite.get_result(IntegratorKind::RK4).unwrap();
            println!(
                "RK4 x(10) = {:.8} (exact cos(10) = {:.8})",
                rk4[(0, n - 1)],
                (10.0_f64).cos()
            );
            plots(
                "t".to_string(),
                problem.values(),
                grid.clone(),
                rk4.clone(),
            );
        }
        1 => {
            // TRAIN A SURROGATE ON THE HARMONIC OSCILLATOR
            let problem = BenchProblem::Harmonic;
            let system = problem.setup();
            let mut net_config = NetConfig::new(system.state_dim);
            net_config.hidden_sizes = vec![32, 32];
            let mut net = PinnNet::new(net_config);

            let reference = Dataset::synthetic(&system, problem.values(), 401, 0.0, 42);
            let (train_set, test_set) = reference.split(0.8, SplitPolicy::Chronological);

            let mut train_config = TrainConfig::default();
            train_config.epochs = 500;
            train_config.collocation_n = 256;
            train_config.batch_size = 64;
            train_config.lr = 2e-3;
            train_config.decay_every = 100;
            train_config.weights = LossWeights {
                res: 1.0,
                ic: 1.0,
                data: 1.0,
            };
            let mut trainer = PinnTrainer::new(train_config);
            let data = train_set.batch();
            let eval = test_set.batch();
            trainer.train(&mut net, &system, Some(&data), Some(&eval));

            let prediction = net.predict_times(&reference.t);
            plot_overlay(
                "t".to_string(),
                problem.values(),
                reference.t.clone(),
                reference.y.clone(),
                prediction,
                "harmonic_pinn",
            );
        }
        2 => {
            // FULL COMPARISON HARNESS ON HOOKE'S LAW
            let problem = BenchProblem::Hooke;
            let system = problem.setup();
            let mut net_config = NetConfig::new(system.state_dim);
            net_config.hidden_sizes = vec![32, 32];
            let mut train_config = TrainConfig::default();
            train_config.epochs = 300;
            train_config.collocation_n = 200;
            train_config.batch_size = 50;
            train_config.lr = 2e-3;
            let mut harness = CompareHarness::new(net_config, train_config);
            harness.run_problem(problem);
            println!("{}", harness.report());
        }
        3 => {
            // LORENZ: first order system, leapfrog row comes out NaN
            let problem = BenchProblem::Lorenz;
            let mut net_config = NetConfig::new(3);
            net_config.hidden_sizes = vec![64, 64];
            let mut train_config = TrainConfig::default();
            train_config.epochs = 200;
            train_config.collocation_n = 256;
            train_config.batch_size = 64;
            let mut harness = CompareHarness::new(net_config, train_config);
            harness.n_points = 1001;
            harness.run_problem(problem);
            println!("{}", harness.report());
        }
        _ => {
            println!("unknown example number {}", example);
        }
    }
}

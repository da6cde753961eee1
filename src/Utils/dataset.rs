/// Time-series datasets for training and scoring: CSV loading, synthetic
/// trajectory generation with optional Gaussian noise, and chronological
/// train/test splitting. A dataset holds a time column and a D x N state
/// block aligned with it.
use crate::numerical::integrators::rk4;
use crate::numerical::ode_systems::OdeSystem;
use crate::pinn::loss::DataBatch;
use csv::{Reader, Writer};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::path::Path;

/// Chronological is the only split the harness needs; being an enum keeps
/// the selector closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPolicy {
    Chronological,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub t: DVector<f64>,
    /// D x N states, column j belongs to t[j]
    pub y: DMatrix<f64>,
    pub names: Vec<String>,
}

impl Dataset {
    pub fn new(t: DVector<f64>, y: DMatrix<f64>, names: Vec<String>) -> Dataset {
        assert_eq!(t.len(), y.ncols(), "times and states disagree in length");
        assert_eq!(names.len(), y.nrows(), "one name per state dimension");
        Dataset { t, y, names }
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn state_dim(&self) -> usize {
        self.y.nrows()
    }

    /// Load a CSV whose first column is time and remaining columns are the
    /// state dimensions; rows are sorted chronologically on load.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Dataset, Box<dyn Error>> {
        let mut reader = Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        assert!(
            headers.len() >= 2,
            "dataset needs a time column and at least one state column"
        );
        let names: Vec<String> = headers.iter().skip(1).map(|s| s.to_string()).collect();

        let mut rows: Vec<(f64, Vec<f64>)> = Vec::new();
        for record in reader.records() {
            let record = record?;
            let t: f64 = record[0].parse()?;
            let state: Result<Vec<f64>, _> =
                record.iter().skip(1).map(|v| v.parse::<f64>()).collect();
            rows.push((t, state?));
        }
        assert!(!rows.is_empty(), "dataset file contains no rows");
        rows.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("non-comparable time value"));

        let n = rows.len();
        let d = names.len();
        let t = DVector::from_fn(n, |j, _| rows[j].0);
        let y = DMatrix::from_fn(d, n, |i, j| rows[j].1[i]);
        Ok(Dataset::new(t, y, names))
    }

    /// Write time and states back out, one row per sample.
    pub fn save_csv<P: AsRef<Path>>(&self, path: P, arg: &str) -> Result<(), Box<dyn Error>> {
        let mut writer = Writer::from_path(path)?;
        let mut header = vec![arg.to_string()];
        header.extend(self.names.iter().cloned());
        writer.write_record(&header)?;
        for j in 0..self.len() {
            let mut row = vec![self.t[j].to_string()];
            row.extend(self.y.column(j).iter().map(|v| v.to_string()));
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reference trajectory of a system on a uniform grid (classic RK4),
    /// optionally corrupted by zero-mean Gaussian noise.
    pub fn synthetic(
        system: &OdeSystem,
        names: Vec<String>,
        n_points: usize,
        noise_std: f64,
        seed: u64,
    ) -> Dataset {
        assert!(n_points >= 2, "at least two samples are required");
        assert!(noise_std >= 0.0, "noise level must be non-negative");
        let (t0, t1) = system.t_span;
        let step = (t1 - t0) / (n_points - 1) as f64;
        let t = DVector::from_fn(n_points, |j, _| t0 + j as f64 * step);
        let mut y = rk4(system, &t, &system.y0);
        if noise_std > 0.0 {
            let mut rng = StdRng::seed_from_u64(seed);
            y = y.map(|v| v + noise_std * gaussian(&mut rng));
        }
        Dataset::new(t, y, names)
    }

    /// Split into (train, test) with the first `ratio` share of the ordered
    /// samples in the train part.
    pub fn split(&self, ratio: f64, policy: SplitPolicy) -> (Dataset, Dataset) {
        assert!(
            ratio > 0.0 && ratio < 1.0,
            "split ratio must lie strictly between 0 and 1"
        );
        let SplitPolicy::Chronological = policy;
        let n_train = ((self.len() as f64) * ratio).round() as usize;
        let n_train = n_train.clamp(1, self.len() - 1);
        let take = |from: usize, count: usize| {
            Dataset::new(
                DVector::from_fn(count, |j, _| self.t[from + j]),
                DMatrix::from_fn(self.state_dim(), count, |i, j| self.y[(i, from + j)]),
                self.names.clone(),
            )
        };
        (take(0, n_train), take(n_train, self.len() - n_train))
    }

    /// View as a labeled batch for the training loss.
    pub fn batch(&self) -> DataBatch {
        DataBatch::new(self.t.clone(), self.y.clone())
    }
}

/// Box-Muller transform over two uniform draws.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.random_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::ode_systems::BenchProblem;
    use approx::assert_relative_eq;

    #[test]
    fn test_synthetic_dataset_matches_exact_solution() {
        // noiseless Hooke trajectory: x(t) = cos(t)
        let problem = BenchProblem::Hooke;
        let system = problem.setup();
        let set = Dataset::synthetic(&system, problem.values(), 1001, 0.0, 0);
        assert_eq!(set.len(), 1001);
        assert_eq!(set.state_dim(), 2);
        let mid = 500;
        assert_relative_eq!(set.y[(0, mid)], set.t[mid].cos(), epsilon = 1e-5);
    }

    #[test]
    fn test_noise_injection_perturbs_but_tracks_the_signal() {
        let problem = BenchProblem::Hooke;
        let system = problem.setup();
        let clean = Dataset::synthetic(&system, problem.values(), 201, 0.0, 7);
        let noisy = Dataset::synthetic(&system, problem.values(), 201, 0.05, 7);
        let diff = &noisy.y - &clean.y;
        assert!(diff.norm() > 0.0);
        // rms of the perturbation should be near the requested level
        let rms = (diff.norm_squared() / (diff.nrows() * diff.ncols()) as f64).sqrt();
        assert!(rms > 0.02 && rms < 0.1, "noise rms {} off target", rms);
    }

    #[test]
    fn test_chronological_split_keeps_order() {
        let problem = BenchProblem::Hooke;
        let system = problem.setup();
        let set = Dataset::synthetic(&system, problem.values(), 100, 0.0, 0);
        let (train, test) = set.split(0.8, SplitPolicy::Chronological);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
        assert!(train.t[train.len() - 1] < test.t[0]);
    }

    #[test]
    fn test_csv_round_trip() {
        let problem = BenchProblem::Hooke;
        let system = problem.setup();
        let set = Dataset::synthetic(&system, problem.values(), 25, 0.0, 0);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooke.csv");
        set.save_csv(&path, "t").unwrap();
        let loaded = Dataset::from_csv(&path).unwrap();
        assert_eq!(loaded.len(), set.len());
        assert_eq!(loaded.names, set.names);
        assert_relative_eq!((loaded.y - set.y).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_csv_loading_sorts_chronologically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unsorted.csv");
        std::fs::write(&path, "t,x\n2.0,20.0\n0.0,0.0\n1.0,10.0\n").unwrap();
        let set = Dataset::from_csv(&path).unwrap();
        assert_eq!(set.t, DVector::from_vec(vec![0.0, 1.0, 2.0]));
        assert_eq!(set.y[(0, 2)], 20.0);
    }

    #[test]
    #[should_panic(expected = "split ratio")]
    fn test_degenerate_split_ratio_rejected() {
        let problem = BenchProblem::Hooke;
        let system = problem.setup();
        let set = Dataset::synthetic(&system, problem.values(), 10, 0.0, 0);
        let _ = set.split(1.0, SplitPolicy::Chronological);
    }
}

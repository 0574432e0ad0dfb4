//! Exact t-SNE
//!
//! Quadratic in the number of points, which is fine for the few thousand
//! papers a snapshot holds.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use biblio_common::{AppError, Result};

use crate::{squared_distance, Projector};

const PERPLEXITY_TOLERANCE: f64 = 1e-5;
const PERPLEXITY_STEPS: usize = 50;
const MIN_GAIN: f64 = 0.01;
const MIN_PROBABILITY: f64 = 1e-12;

/// Parameters of the projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsneParams {
    /// Output dimensionality
    pub n_dims: usize,

    /// Effective number of neighbours. Clamped for small inputs.
    pub perplexity: f64,

    /// Gradient descent iterations
    pub iterations: usize,

    /// Step size (`None` picks `max(n / exaggeration / 4, 50)`)
    pub learning_rate: Option<f64>,

    pub early_exaggeration: f64,

    /// Iterations run with exaggerated affinities and low momentum
    pub exaggeration_iterations: usize,

    /// Seed of the initial layout
    pub seed: u64,
}

impl Default for TsneParams {
    fn default() -> Self {
        Self {
            n_dims: 3,
            perplexity: 30.0,
            iterations: 1000,
            learning_rate: None,
            early_exaggeration: 12.0,
            exaggeration_iterations: 250,
            seed: 0,
        }
    }
}

impl TsneParams {
    #[must_use]
    pub fn with_n_dims(mut self, n_dims: usize) -> Self {
        self.n_dims = n_dims;
        self
    }

    #[must_use]
    pub fn with_perplexity(mut self, perplexity: f64) -> Self {
        self.perplexity = perplexity;
        self
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_dims == 0 {
            return Err(invalid("n_dims", "must be >= 1"));
        }
        if !(self.perplexity > 0.0) {
            return Err(invalid("perplexity", "must be > 0"));
        }
        if self.learning_rate.is_some_and(|lr| !(lr > 0.0)) {
            return Err(invalid("learning_rate", "must be > 0"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> AppError {
    AppError::Validation {
        message: format!("t-SNE {} {}", field, message),
        field: Some(field.to_string()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tsne {
    params: TsneParams,
}

impl Tsne {
    pub fn new(params: TsneParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TsneParams {
        &self.params
    }
}

impl Projector for Tsne {
    #[instrument(skip(self, data), fields(points = data.len(), n_dims = self.params.n_dims))]
    fn project(&self, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.params.validate()?;
        let n = data.len();
        let dims = self.params.n_dims;

        if let Some(row) = data.iter().position(|row| row.len() != data[0].len()) {
            return Err(AppError::Validation {
                message: format!("row {} has {} columns, expected {}", row, data[row].len(), data[0].len()),
                field: None,
            });
        }
        if n < 2 {
            return Ok(vec![vec![0.0; dims]; n]);
        }

        let perplexity = self.params.perplexity.min(((n - 1) as f64 / 3.0).max(1.0));
        let p = joint_probabilities(data, perplexity);

        let exaggeration = self.params.early_exaggeration;
        let learning_rate = self
            .params
            .learning_rate
            .unwrap_or_else(|| (n as f64 / exaggeration / 4.0).max(50.0));

        let mut y = initial_layout(n, dims, self.params.seed);
        let mut update = vec![0.0_f64; n * dims];
        let mut gains = vec![1.0_f64; n * dims];
        let mut gradient = vec![0.0_f64; n * dims];
        let mut num = vec![0.0_f64; n * n];

        info!(points = n, perplexity, learning_rate, "Computing t-SNE projection");

        for iteration in 0..self.params.iterations {
            let early = iteration < self.params.exaggeration_iterations;
            let factor = if early { exaggeration } else { 1.0 };
            let momentum = if early { 0.5 } else { 0.8 };

            // Student-t affinities of the current layout
            let mut sum_q = 0.0_f64;
            for i in 0..n {
                for j in (i + 1)..n {
                    let d = squared_distance(&y[i * dims..(i + 1) * dims], &y[j * dims..(j + 1) * dims]);
                    let q = 1.0 / (1.0 + d);
                    num[i * n + j] = q;
                    num[j * n + i] = q;
                    sum_q += 2.0 * q;
                }
            }
            let sum_q = sum_q.max(f64::MIN_POSITIVE);

            gradient.iter_mut().for_each(|g| *g = 0.0);
            for i in 0..n {
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let q = num[i * n + j];
                    let mult = (factor * p[i * n + j] - q / sum_q) * q;
                    for d in 0..dims {
                        gradient[i * dims + d] += 4.0 * mult * (y[i * dims + d] - y[j * dims + d]);
                    }
                }
            }

            for k in 0..n * dims {
                let same_sign = (gradient[k] > 0.0) == (update[k] > 0.0);
                gains[k] = if same_sign { gains[k] * 0.8 } else { gains[k] + 0.2 };
                gains[k] = gains[k].max(MIN_GAIN);
                update[k] = momentum * update[k] - learning_rate * gains[k] * gradient[k];
                y[k] += update[k];
            }
            recenter(&mut y, n, dims);

            if (iteration + 1) % 100 == 0 {
                debug!(done = iteration + 1, total = self.params.iterations, "t-SNE iterations");
            }
        }

        Ok(y.chunks(dims).map(|row| row.to_vec()).collect())
    }
}

/// Symmetric input affinities, flattened row-major
fn joint_probabilities(data: &[Vec<f64>], perplexity: f64) -> Vec<f64> {
    let n = data.len();
    let mut distances = vec![0.0_f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = squared_distance(&data[i], &data[j]);
            distances[i * n + j] = d;
            distances[j * n + i] = d;
        }
    }

    let mut conditional = vec![0.0_f64; n * n];
    for i in 0..n {
        let row = &distances[i * n..(i + 1) * n];
        let probabilities = conditional_row(row, i, perplexity);
        conditional[i * n..(i + 1) * n].copy_from_slice(&probabilities);
    }

    let mut joint = vec![0.0_f64; n * n];
    let norm = 2.0 * n as f64;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                joint[i * n + j] = ((conditional[i * n + j] + conditional[j * n + i]) / norm).max(MIN_PROBABILITY);
            }
        }
    }
    joint
}

/// Row of conditional probabilities whose entropy matches `ln(perplexity)`
///
/// Distances are shifted by the row minimum, which leaves the entropy
/// unchanged and keeps the exponentials from underflowing.
fn conditional_row(distances: &[f64], own: usize, perplexity: f64) -> Vec<f64> {
    let n = distances.len();
    let target = perplexity.ln();
    let min_distance = distances
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != own)
        .map(|(_, d)| *d)
        .fold(f64::INFINITY, f64::min);

    let mut beta = 1.0_f64;
    let mut beta_min = f64::NEG_INFINITY;
    let mut beta_max = f64::INFINITY;
    let mut row = vec![0.0; n];

    for _ in 0..PERPLEXITY_STEPS {
        let mut sum = 0.0_f64;
        let mut weighted = 0.0_f64;
        for j in 0..n {
            if j == own {
                row[j] = 0.0;
                continue;
            }
            let shifted = distances[j] - min_distance;
            let value = (-shifted * beta).exp();
            row[j] = value;
            sum += value;
            weighted += shifted * value;
        }

        let entropy = sum.ln() + beta * weighted / sum;
        let diff = entropy - target;
        if diff.abs() < PERPLEXITY_TOLERANCE {
            break;
        }
        if diff > 0.0 {
            beta_min = beta;
            beta = if beta_max.is_infinite() { beta * 2.0 } else { (beta + beta_max) / 2.0 };
        } else {
            beta_max = beta;
            beta = if beta_min.is_infinite() { beta / 2.0 } else { (beta + beta_min) / 2.0 };
        }
    }

    let sum: f64 = row.iter().sum();
    if sum > 0.0 {
        row.iter_mut().for_each(|v| *v /= sum);
    }
    row
}

/// Gaussian layout with standard deviation 1e-4, drawn with Box-Muller
fn initial_layout(n: usize, dims: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n * dims)
        .map(|_| {
            let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
            let u2: f64 = rng.gen();
            1e-4 * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
        })
        .collect()
}

fn recenter(y: &mut [f64], n: usize, dims: usize) {
    for d in 0..dims {
        let mean = (0..n).map(|i| y[i * dims + d]).sum::<f64>() / n as f64;
        for i in 0..n {
            y[i * dims + d] -= mean;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two groups of points far apart in 5 dimensions
    fn two_blobs() -> Vec<Vec<f64>> {
        let offsets = [0.0, 0.1, -0.1, 0.2, -0.2, 0.15, -0.05, 0.05, -0.15, 0.12];
        let mut data = Vec::new();
        for (blob, center) in [0.0, 20.0].iter().enumerate() {
            for (i, o) in offsets.iter().enumerate() {
                let mut row = vec![*center; 5];
                row[i % 5] += o;
                row[(i + blob + 1) % 5] -= o / 2.0;
                data.push(row);
            }
        }
        data
    }

    fn nearest(points: &[Vec<f64>], i: usize) -> usize {
        (0..points.len())
            .filter(|j| *j != i)
            .min_by(|a, b| {
                squared_distance(&points[i], &points[*a])
                    .total_cmp(&squared_distance(&points[i], &points[*b]))
            })
            .unwrap()
    }

    #[test]
    fn test_conditional_row_matches_perplexity() {
        let distances = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let row = conditional_row(&distances, 0, 3.0);
        assert_eq!(row[0], 0.0);
        assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let entropy: f64 = -row.iter().filter(|p| **p > 0.0).map(|p| p * p.ln()).sum::<f64>();
        assert!((entropy.exp() - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_joint_probabilities_are_symmetric() {
        let data = two_blobs();
        let n = data.len();
        let p = joint_probabilities(&data, 5.0);
        for i in 0..n {
            for j in 0..n {
                assert!((p[i * n + j] - p[j * n + i]).abs() < 1e-15);
            }
        }
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_projection_shape_and_determinism() {
        let tsne = Tsne::new(TsneParams::default().with_iterations(300));
        let data = two_blobs();

        let a = tsne.project(&data).unwrap();
        let b = tsne.project(&data).unwrap();
        assert_eq!(a.len(), data.len());
        assert!(a.iter().all(|row| row.len() == 3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_projection_keeps_groups_apart() {
        let tsne = Tsne::new(TsneParams::default().with_n_dims(2).with_iterations(500));
        let data = two_blobs();
        let projected = tsne.project(&data).unwrap();

        for i in 0..projected.len() {
            assert_eq!(nearest(&projected, i) / 10, i / 10, "point {i} crossed groups");
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let tsne = Tsne::default();
        assert!(tsne.project(&[]).unwrap().is_empty());
        assert_eq!(tsne.project(&[vec![1.0, 2.0]]).unwrap(), vec![vec![0.0; 3]]);
        assert!(tsne.project(&[vec![1.0, 2.0], vec![1.0]]).is_err());
        assert!(Tsne::new(TsneParams::default().with_n_dims(0)).project(&[]).is_err());
    }
}

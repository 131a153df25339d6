//! Clustering for RAPTOR: PCA reduction + Gaussian mixture with BIC.
//!
//! Deliberately dependency-free plain-vector math. Everything is
//! deterministic: PCA uses fixed-seed power iteration and the GMM
//! initializes means from evenly spaced points, so the same input
//! always yields the same tree.

const POWER_ITERATIONS: usize = 50;
const EM_ITERATIONS: usize = 30;
const VARIANCE_FLOOR: f64 = 1e-4;

/// Project vectors onto their top `target` principal components.
///
/// Returns the input unchanged when it is already at or below the
/// target dimensionality or has too few points to be worth reducing.
pub(crate) fn reduce_dimensions(vectors: &[Vec<f32>], target: usize) -> Vec<Vec<f32>> {
    let n = vectors.len();
    if n < 3 {
        return vectors.to_vec();
    }
    let dim = vectors[0].len();
    if dim <= target || target == 0 {
        return vectors.to_vec();
    }

    // center
    let mut mean = vec![0.0f64; dim];
    for v in vectors {
        for (m, x) in mean.iter_mut().zip(v) {
            *m += *x as f64;
        }
    }
    for m in &mut mean {
        *m /= n as f64;
    }
    let centered: Vec<Vec<f64>> = vectors
        .iter()
        .map(|v| v.iter().zip(&mean).map(|(x, m)| *x as f64 - m).collect())
        .collect();

    // top components by power iteration with deflation
    let mut data = centered.clone();
    let mut components: Vec<Vec<f64>> = Vec::with_capacity(target);
    for comp_idx in 0..target {
        // deterministic start: basis vector offset per component
        let mut direction = vec![0.0f64; dim];
        direction[comp_idx % dim] = 1.0;

        for _ in 0..POWER_ITERATIONS {
            // direction <- X^T X direction, normalized
            let mut next = vec![0.0f64; dim];
            for row in &data {
                let proj: f64 = row.iter().zip(&direction).map(|(x, d)| x * d).sum();
                for (nx, x) in next.iter_mut().zip(row) {
                    *nx += proj * x;
                }
            }
            let norm: f64 = next.iter().map(|x| x * x).sum::<f64>().sqrt();
            if norm < 1e-12 {
                break;
            }
            for x in &mut next {
                *x /= norm;
            }
            direction = next;
        }
        // deflate: remove this component from the data
        for row in &mut data {
            let proj: f64 = row.iter().zip(&direction).map(|(x, d)| x * d).sum();
            for (x, d) in row.iter_mut().zip(&direction) {
                *x -= proj * d;
            }
        }
        components.push(direction);
    }

    centered
        .iter()
        .map(|row| {
            components
                .iter()
                .map(|c| row.iter().zip(c).map(|(x, d)| x * d).sum::<f64>() as f32)
                .collect()
        })
        .collect()
}

/// Diagonal-covariance Gaussian mixture fit by EM.
pub(crate) struct Gmm {
    pub weights: Vec<f64>,
    pub means: Vec<Vec<f64>>,
    pub variances: Vec<Vec<f64>>,
}

impl Gmm {
    pub fn k(&self) -> usize {
        self.weights.len()
    }

    /// Per-component membership log densities (unnormalized posterior:
    /// log weight + log likelihood).
    fn log_joint(&self, point: &[f64]) -> Vec<f64> {
        (0..self.k())
            .map(|c| {
                let mut log_p = self.weights[c].max(1e-12).ln();
                for ((x, m), v) in point.iter().zip(&self.means[c]).zip(&self.variances[c]) {
                    let var = v.max(VARIANCE_FLOOR);
                    let diff = x - m;
                    log_p += -0.5 * (2.0 * std::f64::consts::PI * var).ln()
                        - diff * diff / (2.0 * var);
                }
                log_p
            })
            .collect()
    }

    /// Membership probabilities of a point across components.
    pub fn responsibilities(&self, point: &[f64]) -> Vec<f64> {
        let log_joint = self.log_joint(point);
        let max = log_joint.iter().cloned().fold(f64::MIN, f64::max);
        let exp: Vec<f64> = log_joint.iter().map(|l| (l - max).exp()).collect();
        let sum: f64 = exp.iter().sum();
        exp.into_iter().map(|e| e / sum.max(1e-300)).collect()
    }

    /// Total log-likelihood of the data.
    pub fn log_likelihood(&self, data: &[Vec<f64>]) -> f64 {
        data.iter()
            .map(|point| {
                let log_joint = self.log_joint(point);
                let max = log_joint.iter().cloned().fold(f64::MIN, f64::max);
                max + log_joint.iter().map(|l| (l - max).exp()).sum::<f64>().ln()
            })
            .sum()
    }

    /// Bayesian information criterion; lower is better.
    pub fn bic(&self, data: &[Vec<f64>]) -> f64 {
        let n = data.len() as f64;
        let dim = data.first().map(|p| p.len()).unwrap_or(0) as f64;
        // means + variances per component, plus free mixture weights
        let params = self.k() as f64 * 2.0 * dim + (self.k() as f64 - 1.0);
        params * n.ln() - 2.0 * self.log_likelihood(data)
    }
}

/// Fit a `k`-component diagonal GMM. Means initialize from evenly
/// spaced data points, so the fit is deterministic.
pub(crate) fn fit_gmm(data: &[Vec<f64>], k: usize) -> Gmm {
    let n = data.len();
    let dim = data[0].len();

    let mut gmm = Gmm {
        weights: vec![1.0 / k as f64; k],
        means: (0..k).map(|c| data[c * n / k].clone()).collect(),
        variances: vec![vec![1.0; dim]; k],
    };

    let mut resp = vec![vec![0.0f64; k]; n];
    for _ in 0..EM_ITERATIONS {
        // E-step
        for (i, point) in data.iter().enumerate() {
            resp[i] = gmm.responsibilities(point);
        }
        // M-step
        for c in 0..k {
            let total: f64 = resp.iter().map(|r| r[c]).sum::<f64>().max(1e-12);
            gmm.weights[c] = total / n as f64;
            for d in 0..dim {
                let mean: f64 =
                    data.iter().zip(&resp).map(|(p, r)| r[c] * p[d]).sum::<f64>() / total;
                gmm.means[c][d] = mean;
            }
            for d in 0..dim {
                let var: f64 = data
                    .iter()
                    .zip(&resp)
                    .map(|(p, r)| {
                        let diff = p[d] - gmm.means[c][d];
                        r[c] * diff * diff
                    })
                    .sum::<f64>()
                    / total;
                gmm.variances[c][d] = var.max(VARIANCE_FLOOR);
            }
        }
    }
    gmm
}

/// Cluster points with the GMM whose component count minimizes BIC
/// over `1..=max_k`, assigning each point to the first cluster whose
/// membership probability exceeds `threshold` (cluster 0 otherwise).
pub(crate) fn cluster(vectors: &[Vec<f32>], max_k: usize, threshold: f32) -> Vec<usize> {
    let n = vectors.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 || max_k <= 1 {
        return vec![0; n];
    }

    let data: Vec<Vec<f64>> = vectors
        .iter()
        .map(|v| v.iter().map(|x| *x as f64).collect())
        .collect();

    let max_k = max_k.min(n);
    let mut best: Option<(f64, Gmm)> = None;
    for k in 1..=max_k {
        let gmm = fit_gmm(&data, k);
        let bic = gmm.bic(&data);
        if best.as_ref().map(|(b, _)| bic < *b).unwrap_or(true) {
            best = Some((bic, gmm));
        }
    }
    let Some((_, gmm)) = best else {
        return vec![0; n];
    };

    data.iter()
        .map(|point| {
            let resp = gmm.responsibilities(point);
            resp.iter()
                .position(|p| *p > threshold as f64)
                .unwrap_or(0)
        })
        .collect()
}

//! Constant-velocity Kalman filter over a box center, using ndarray and a nalgebra-based inverse.
//!
//! State is `[cx, cy, vx, vy]`, measurement is `[cx, cy]`. Noise scales with
//! the box height so large and small targets are treated alike.

use ndarray::{Array1, Array2};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let ndim = 2;
        let mut motion_mat = Array2::eye(2 * ndim);
        for i in 0..ndim {
            motion_mat[[i, ndim + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((ndim, 2 * ndim));
        for i in 0..ndim {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    pub fn initiate(&self, center: [f64; 2], scale: f64) -> (Array1<f64>, Array2<f64>) {
        let mean = Array1::from_vec(vec![center[0], center[1], 0.0, 0.0]);

        let std = [
            2.0 * self.std_weight_position * scale,
            2.0 * self.std_weight_position * scale,
            10.0 * self.std_weight_velocity * scale,
            10.0 * self.std_weight_velocity * scale,
        ];

        (mean, diagonal(&std))
    }

    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        scale: f64,
    ) -> (Array1<f64>, Array2<f64>) {
        let std = [
            self.std_weight_position * scale,
            self.std_weight_position * scale,
            self.std_weight_velocity * scale,
            self.std_weight_velocity * scale,
        ];

        let new_mean = self.motion_mat.dot(mean);
        let new_covariance =
            self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + diagonal(&std);

        (new_mean, new_covariance)
    }

    pub fn project(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        scale: f64,
    ) -> (Array1<f64>, Array2<f64>) {
        let std = [
            self.std_weight_position * scale,
            self.std_weight_position * scale,
        ];

        let mean_proj = self.update_mat.dot(mean);
        let covariance_proj =
            self.update_mat.dot(covariance).dot(&self.update_mat.t()) + diagonal(&std);

        (mean_proj, covariance_proj)
    }

    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 2],
        scale: f64,
    ) -> Result<(Array1<f64>, Array2<f64>)> {
        let (projected_mean, projected_cov) = self.project(mean, covariance, scale);

        let innovation = Array1::from_vec(measurement.to_vec()) - projected_mean;

        // K = P * H^T * S^-1, with H = [I 0]
        let s_inv = invert_2x2(&projected_cov)?;
        let pht = covariance.dot(&self.update_mat.t()); // 4x2
        let kalman_gain = pht.dot(&s_inv); // 4x2

        let new_mean = mean + &kalman_gain.dot(&innovation);
        let new_covariance = covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());

        Ok((new_mean, new_covariance))
    }
}

fn diagonal(std: &[f64]) -> Array2<f64> {
    let mut cov = Array2::zeros((std.len(), std.len()));
    for (i, s) in std.iter().enumerate() {
        cov[[i, i]] = s * s;
    }
    cov
}

/// Invert a 2x2 matrix using nalgebra (pure Rust).
fn invert_2x2(m: &Array2<f64>) -> Result<Array2<f64>> {
    let nm = nalgebra::Matrix2::new(m[[0, 0]], m[[0, 1]], m[[1, 0]], m[[1, 1]]);
    let inv = nm.try_inverse().ok_or(Error::SingularCovariance)?;
    let mut res = Array2::zeros((2, 2));
    for i in 0..2 {
        for j in 0..2 {
            res[[i, j]] = inv[(i, j)];
        }
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiate() {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate([100.0, 200.0], 50.0);
        assert_eq!(mean[0], 100.0);
        assert_eq!(mean[1], 200.0);
        assert_eq!(mean[2], 0.0);
        assert!(cov[[0, 0]] > 0.0);
        assert_eq!(cov[[0, 1]], 0.0);
    }

    #[test]
    fn test_learns_constant_velocity() {
        let kf = KalmanFilter::new();
        let (mut mean, mut cov) = kf.initiate([0.0, 0.0], 20.0);

        for step in 1..=20 {
            let (m, c) = kf.predict(&mean, &cov, 20.0);
            let (m, c) = kf.update(&m, &c, [5.0 * step as f64, 0.0], 20.0).unwrap();
            mean = m;
            cov = c;
        }

        let (predicted, _) = kf.predict(&mean, &cov, 20.0);
        assert!((predicted[0] - 105.0).abs() < 3.0);
        assert!(predicted[1].abs() < 1.0);
        assert!((mean[2] - 5.0).abs() < 1.0);
    }

    #[test]
    fn test_singular_covariance() {
        let singular = Array2::zeros((2, 2));
        assert!(matches!(invert_2x2(&singular), Err(Error::SingularCovariance)));
    }
}

//! Bounded single-parameter least squares for the pass-by speed.

use serde::{Deserialize, Serialize};

use crate::error::{DopplerError, Result};
use crate::types::PassGeometry;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub lower: f64,
    pub upper: f64,
    pub max_iterations: usize,
    /// Relative cost reduction below which the fit is considered converged
    pub cost_tolerance: f64,
    /// Relative step size below which the fit is considered converged
    pub step_tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 200.0,
            max_iterations: 200,
            cost_tolerance: 1e-10,
            step_tolerance: 1e-8,
        }
    }
}

fn cost(geometry: &PassGeometry, times: &[f64], observed: &[f64], speed: f64) -> f64 {
    times
        .iter()
        .zip(observed)
        .map(|(&t, &v)| {
            let r = v - geometry.radial_velocity(t, speed);
            r * r
        })
        .sum::<f64>()
        * 0.5
}

/// Fit `car_speed` so that `geometry.radial_velocity(t, car_speed)` matches
/// the observed radial velocities in the least-squares sense.
///
/// Levenberg–Marquardt with the iterate projected onto `[lower, upper]`.
/// Fails with [`DopplerError::FitDivergence`] when the cost turns non-finite
/// or the iteration budget runs out before convergence.
pub fn fit_car_speed(
    geometry: &PassGeometry,
    times: &[f64],
    observed: &[f64],
    initial: f64,
    options: &FitOptions,
) -> Result<f64> {
    if times.len() != observed.len() {
        return Err(DopplerError::Validation(format!(
            "time/velocity length mismatch: {} vs {}",
            times.len(),
            observed.len()
        )));
    }
    if times.is_empty() {
        return Err(DopplerError::InsufficientData(
            "no radial velocity samples to fit".to_string(),
        ));
    }
    if !(options.lower <= options.upper) {
        return Err(DopplerError::Validation(format!(
            "invalid fit bounds [{}, {}]",
            options.lower, options.upper
        )));
    }
    if !initial.is_finite() {
        return Err(DopplerError::FitDivergence(format!(
            "non-finite initial guess {}",
            initial
        )));
    }

    let mut speed = initial.clamp(options.lower, options.upper);
    let mut current = cost(geometry, times, observed, speed);
    if !current.is_finite() {
        return Err(DopplerError::FitDivergence(
            "cost is not finite at the initial guess".to_string(),
        ));
    }

    let mut lambda = 1e-3;

    for iteration in 0..options.max_iterations {
        let (mut gradient, mut hessian) = (0.0, 0.0);
        for (&t, &v) in times.iter().zip(observed) {
            let j = geometry.radial_velocity_derivative(t, speed);
            let r = v - geometry.radial_velocity(t, speed);
            gradient += j * r;
            hessian += j * j;
        }

        if !gradient.is_finite() || !hessian.is_finite() {
            return Err(DopplerError::FitDivergence(format!(
                "non-finite jacobian at speed {}",
                speed
            )));
        }
        if gradient == 0.0 || hessian == 0.0 {
            log::debug!("Fit stationary point after {} iterations", iteration);
            return Ok(speed);
        }

        loop {
            let step = gradient / (hessian * (1.0 + lambda));
            let candidate = (speed + step).clamp(options.lower, options.upper);
            let candidate_cost = cost(geometry, times, observed, candidate);

            if candidate_cost.is_finite() && candidate_cost <= current {
                let cost_drop = current - candidate_cost;
                let moved = (candidate - speed).abs();
                let converged = cost_drop <= options.cost_tolerance * current.max(f64::MIN_POSITIVE)
                    || moved <= options.step_tolerance * (speed.abs() + options.step_tolerance);

                speed = candidate;
                current = candidate_cost;
                lambda = (lambda / 10.0).max(1e-12);

                if converged {
                    log::debug!(
                        "Fit converged after {} iterations: speed={:.4}, cost={:.6}",
                        iteration + 1,
                        speed,
                        current
                    );
                    return Ok(speed);
                }
                break;
            }

            lambda *= 10.0;
            if lambda > 1e12 {
                // No step along the gradient lowers the cost any further
                return Ok(speed);
            }
        }
    }

    Err(DopplerError::FitDivergence(format!(
        "no convergence within {} iterations (last speed {:.3} m/s)",
        options.max_iterations, speed
    )))
}

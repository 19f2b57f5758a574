use serde::Serialize;
use tracing::debug;

use super::engine::run_monte_carlo;
use super::error::{InputError, require_at_least, require_within};
use super::types::{ProjectionInputs, SimulationConfig};

/// Bisection over the monthly contribution needed to reach
/// `ProjectionInputs::target` with at least `target_success` percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveConfig {
    pub target_success: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_steps: u32,
    pub iterations_per_step: usize,
    pub final_iterations: usize,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            target_success: 90.0,
            search_min: 0.0,
            search_max: 1_000_000.0,
            tolerance: 100.0,
            max_steps: 40,
            iterations_per_step: 500,
            final_iterations: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveStep {
    pub step: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate: f64,
    pub success_probability: f64,
    pub ci_half_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResult {
    pub target_success: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub solved_contribution: Option<f64>,
    pub achieved_success: Option<f64>,
    pub achieved_ci_half_width: Option<f64>,
    pub steps: Vec<SolveStep>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    success_probability: f64,
    ci_half_width: f64,
}

pub fn solve_required_contribution(
    inputs: &ProjectionInputs,
    config: &SolveConfig,
    sim: &SimulationConfig,
) -> Result<SolveResult, InputError> {
    validate_config(config)?;

    // Every candidate sees the same shocks, which keeps success monotone in
    // the contribution.
    let seed = sim.seed.unwrap_or_else(rand::random);
    let step_sim = SimulationConfig {
        iterations: config.iterations_per_step,
        seed: Some(seed),
        ..*sim
    };
    let final_sim = SimulationConfig {
        iterations: config.final_iterations,
        ..step_sim
    };
    let meets = |eval: CandidateEval| eval.success_probability + 1e-9 >= config.target_success;

    let low_eval = evaluate_candidate(inputs, &step_sim, config.search_min);
    let high_eval = evaluate_candidate(inputs, &step_sim, config.search_max);

    let mut steps = Vec::with_capacity(config.max_steps as usize);
    let mut solved = None;
    let mut converged = false;
    let feasible;
    let message;

    if meets(low_eval) {
        solved = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Already meets target at lower contribution bound.".to_string();
    } else if !meets(high_eval) {
        feasible = false;
        message = "No feasible contribution found within the search bounds.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut step = 0;
        while step < config.max_steps {
            step += 1;
            let mid = (lo + hi) * 0.5;
            let eval = evaluate_candidate(inputs, &step_sim, mid);
            steps.push(SolveStep {
                step,
                lower_bound: lo,
                upper_bound: hi,
                candidate: mid,
                success_probability: eval.success_probability,
                ci_half_width: eval.ci_half_width,
            });

            if meets(eval) {
                hi = mid;
            } else {
                lo = mid;
            }

            if hi - lo <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved = Some(hi);
        feasible = true;
        message = if converged {
            "Solved required monthly contribution.".to_string()
        } else {
            "Reached max steps before tolerance was met; returning best estimate.".to_string()
        };
    }
    debug!(
        steps = steps.len(),
        converged,
        feasible,
        "required contribution search finished"
    );

    let final_eval = solved.map(|value| evaluate_candidate(inputs, &final_sim, value));

    Ok(SolveResult {
        target_success: config.target_success,
        search_min: config.search_min,
        search_max: config.search_max,
        solved_contribution: solved,
        achieved_success: final_eval.map(|e| e.success_probability),
        achieved_ci_half_width: final_eval.map(|e| e.ci_half_width),
        steps,
        converged,
        feasible,
        message,
    })
}

fn evaluate_candidate(
    inputs: &ProjectionInputs,
    sim: &SimulationConfig,
    contribution: f64,
) -> CandidateEval {
    let candidate = ProjectionInputs {
        monthly_contribution: contribution,
        ..*inputs
    };
    let result = run_monte_carlo(&candidate, sim);
    CandidateEval {
        success_probability: result.success_probability,
        ci_half_width: binomial_ci_half_width(result.success_probability, result.iterations),
    }
}

/// 95% normal-approximation half-width, in percentage points.
fn binomial_ci_half_width(success_percent: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = (success_percent / 100.0).clamp(0.0, 1.0);
    1.96 * (p * (1.0 - p) / n as f64).sqrt() * 100.0
}

fn validate_config(config: &SolveConfig) -> Result<(), InputError> {
    require_within("targetSuccess", config.target_success, 0.0, 100.0)?;
    require_at_least("searchMin", config.search_min, 0.0)?;
    require_at_least("searchMax", config.search_max, 0.0)?;
    if config.search_max <= config.search_min {
        return Err(InputError::InvertedBounds {
            lower: "searchMin",
            upper: "searchMax",
        });
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(InputError::NotPositive { field: "tolerance" });
    }
    if config.max_steps == 0 {
        return Err(InputError::NotPositive { field: "maxSteps" });
    }
    if config.iterations_per_step == 0 {
        return Err(InputError::NotPositive {
            field: "iterationsPerStep",
        });
    }
    if config.final_iterations == 0 {
        return Err(InputError::NotPositive {
            field: "finalIterations",
        });
    }
    Ok(())
}

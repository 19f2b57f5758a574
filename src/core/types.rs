use std::borrow::Cow;

use serde::{Deserialize, Serialize};

pub const DEFAULT_EXPECTED_RETURN: f64 = 0.12;
pub const DEFAULT_VOLATILITY: f64 = 0.15;
pub const DEFAULT_ITERATIONS: usize = 1000;

/// Parameters of one projection. Rates are annual fractions (0.12 = 12%).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionInputs {
    pub principal: f64,
    pub monthly_contribution: f64,
    pub years: u32,
    pub target: f64,
    pub expected_return: f64,
    pub volatility: f64,
    pub black_swan: bool,
}

impl Default for ProjectionInputs {
    fn default() -> Self {
        Self {
            principal: 0.0,
            monthly_contribution: 0.0,
            years: 10,
            target: 0.0,
            expected_return: DEFAULT_EXPECTED_RETURN,
            volatility: DEFAULT_VOLATILITY,
            black_swan: false,
        }
    }
}

/// Crash-month injection used when `ProjectionInputs::black_swan` is set.
///
/// The defaults are empirical: a 0.1% chance per month of a single-month
/// drop drawn uniformly between -15% and -30%.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrashModel {
    pub monthly_probability: f64,
    pub shallowest_drop: f64,
    pub deepest_drop: f64,
}

impl Default for CrashModel {
    fn default() -> Self {
        Self {
            monthly_probability: 0.001,
            shallowest_drop: -0.15,
            deepest_drop: -0.30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub iterations: usize,
    pub crash: CrashModel,
    /// `None` seeds every run from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            crash: CrashModel::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Percentiles {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

impl Percentiles {
    pub fn as_array(&self) -> [f64; 7] {
        [
            self.p5, self.p10, self.p25, self.p50, self.p75, self.p90, self.p95,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyPath {
    pub year: u32,
    #[serde(flatten)]
    pub bands: Percentiles,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub percentiles: Percentiles,
    /// Share of paths whose final wealth met the target, in percent.
    pub success_probability: f64,
    pub yearly_paths: Vec<YearlyPath>,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub name: Cow<'static, str>,
    #[serde(default)]
    pub description: Cow<'static, str>,
    pub expected_return: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackSwanEvent {
    pub name: Cow<'static, str>,
    #[serde(default)]
    pub description: Cow<'static, str>,
    /// Fractional drop in wealth, e.g. -0.40.
    pub impact: f64,
    pub recovery_years: u32,
    /// Annual likelihood; informational only.
    #[serde(default)]
    pub probability: f64,
}

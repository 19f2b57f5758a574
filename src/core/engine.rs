use rand::Rng;
use serde::ser::{Serialize, Serializer};
use tracing::debug;

use super::sampler::{derive_seed, make_rng, standard_normal};
use super::types::{
    BlackSwanEvent, CrashModel, DEFAULT_EXPECTED_RETURN, DEFAULT_VOLATILITY, Percentiles,
    ProjectionInputs, Scenario, SimulationConfig, SimulationResult, YearlyPath,
};

const MONTHS_PER_YEAR: u32 = 12;
const PERCENTILE_LEVELS: [f64; 7] = [0.05, 0.10, 0.25, 0.50, 0.75, 0.90, 0.95];

/// Monthly step parameters derived once per run.
#[derive(Debug, Clone, Copy)]
struct PathParams {
    principal: f64,
    monthly_mean: f64,
    monthly_vol: f64,
    contribution: f64,
    months: u32,
    crash: Option<CrashModel>,
}

impl PathParams {
    fn new(inputs: &ProjectionInputs, crash: &CrashModel) -> Self {
        Self {
            principal: floor_at_zero(inputs.principal),
            monthly_mean: inputs.expected_return / MONTHS_PER_YEAR as f64,
            monthly_vol: inputs.volatility.max(0.0) / (MONTHS_PER_YEAR as f64).sqrt(),
            contribution: inputs.monthly_contribution,
            months: inputs.years.saturating_mul(MONTHS_PER_YEAR),
            crash: inputs.black_swan.then_some(*crash),
        }
    }
}

pub fn run_monte_carlo(inputs: &ProjectionInputs, config: &SimulationConfig) -> SimulationResult {
    let mut rng = make_rng(config.seed);
    run_monte_carlo_with_rng(inputs, config, &mut rng)
}

pub fn run_monte_carlo_with_rng<R: Rng + ?Sized>(
    inputs: &ProjectionInputs,
    config: &SimulationConfig,
    rng: &mut R,
) -> SimulationResult {
    let params = PathParams::new(inputs, &config.crash);
    let iterations = config.iterations;
    debug!(
        iterations,
        years = inputs.years,
        black_swan = inputs.black_swan,
        "running monte carlo projection"
    );

    let mut finals = Vec::with_capacity(iterations);
    let mut yearly: Vec<Vec<f64>> = (0..=inputs.years)
        .map(|_| Vec::with_capacity(iterations))
        .collect();
    let mut hits = 0_usize;

    for _ in 0..iterations {
        let final_wealth = evolve_path(&params, rng, &mut yearly);
        if final_wealth >= inputs.target {
            hits += 1;
        }
        finals.push(final_wealth);
    }

    finals.sort_by(f64::total_cmp);
    let yearly_paths = yearly
        .iter_mut()
        .enumerate()
        .map(|(year, bucket)| {
            bucket.sort_by(f64::total_cmp);
            YearlyPath {
                year: year as u32,
                bands: percentiles_of_sorted(bucket),
            }
        })
        .collect();

    let stats = FinalStats::from_sorted(&finals);
    let success_probability = if iterations == 0 {
        0.0
    } else {
        hits as f64 / iterations as f64 * 100.0
    };

    SimulationResult {
        percentiles: percentiles_of_sorted(&finals),
        success_probability,
        yearly_paths,
        mean: stats.mean,
        std_dev: stats.std_dev,
        min: stats.min,
        max: stats.max,
        iterations,
    }
}

/// Evolves one path and appends its year-boundary wealth to `yearly`.
fn evolve_path<R: Rng + ?Sized>(params: &PathParams, rng: &mut R, yearly: &mut [Vec<f64>]) -> f64 {
    let mut wealth = params.principal;
    yearly[0].push(wealth);

    for month in 1..=params.months {
        let shock = standard_normal(rng);
        let mut period_return = params.monthly_mean + params.monthly_vol * shock;
        if let Some(crash) = &params.crash {
            if rng.r#gen::<f64>() < crash.monthly_probability {
                period_return = sample_crash_return(crash, rng);
            }
        }

        wealth = floor_at_zero(wealth * (1.0 + period_return) + params.contribution);

        if month % MONTHS_PER_YEAR == 0 {
            yearly[(month / MONTHS_PER_YEAR) as usize].push(wealth);
        }
    }

    wealth
}

fn sample_crash_return<R: Rng + ?Sized>(crash: &CrashModel, rng: &mut R) -> f64 {
    let u: f64 = rng.r#gen();
    crash.shallowest_drop + (crash.deepest_drop - crash.shallowest_drop) * u
}

// NaN passes through so bad inputs stay visible in the output.
fn floor_at_zero(value: f64) -> f64 {
    if value < 0.0 { 0.0 } else { value }
}

/// Nearest-rank percentile over an ascending slice: `floor(n * p)`, clamped.
fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}

fn percentiles_of_sorted(sorted: &[f64]) -> Percentiles {
    let [p5, p10, p25, p50, p75, p90, p95] = PERCENTILE_LEVELS.map(|p| nearest_rank(sorted, p));
    Percentiles {
        p5,
        p10,
        p25,
        p50,
        p75,
        p90,
        p95,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FinalStats {
    mean: f64,
    std_dev: f64,
    min: f64,
    max: f64,
}

impl FinalStats {
    fn from_sorted(sorted: &[f64]) -> Self {
        let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
            return Self::default();
        };
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
        }
    }
}

/// Final wealth with no volatility: monthly compounding at
/// `expected_return / 12` with the contribution added at each month end.
///
/// Assumes the path never hits the zero floor.
pub fn deterministic_final_wealth(
    principal: f64,
    monthly_contribution: f64,
    expected_return: f64,
    years: u32,
) -> f64 {
    let months = years.saturating_mul(MONTHS_PER_YEAR);
    let r = expected_return / MONTHS_PER_YEAR as f64;
    if r == 0.0 {
        return principal + monthly_contribution * f64::from(months);
    }
    let growth = (1.0 + r).powi(i32::try_from(months).unwrap_or(i32::MAX));
    principal * growth + monthly_contribution * (growth - 1.0) / r
}

/// Projection used for the recovery path: start from the post-crash value and
/// aim to get back to the pre-crash principal within `event.recovery_years`.
pub fn recovery_inputs(
    principal: f64,
    monthly_contribution: f64,
    event: &BlackSwanEvent,
) -> ProjectionInputs {
    ProjectionInputs {
        principal: principal * (1.0 + event.impact),
        monthly_contribution,
        years: event.recovery_years,
        target: principal,
        expected_return: DEFAULT_EXPECTED_RETURN,
        volatility: DEFAULT_VOLATILITY,
        black_swan: false,
    }
}

pub fn recovery_path(
    principal: f64,
    monthly_contribution: f64,
    event: &BlackSwanEvent,
    config: &SimulationConfig,
) -> Vec<YearlyPath> {
    let mut rng = make_rng(config.seed);
    recovery_path_with_rng(principal, monthly_contribution, event, config, &mut rng)
}

pub fn recovery_path_with_rng<R: Rng + ?Sized>(
    principal: f64,
    monthly_contribution: f64,
    event: &BlackSwanEvent,
    config: &SimulationConfig,
    rng: &mut R,
) -> Vec<YearlyPath> {
    debug!(event = %event.name, principal, "projecting recovery path");
    let inputs = recovery_inputs(principal, monthly_contribution, event);
    run_monte_carlo_with_rng(&inputs, config, rng).yearly_paths
}

/// Results keyed by scenario name, in the order the scenarios were given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioComparison {
    entries: Vec<(String, SimulationResult)>,
}

impl ScenarioComparison {
    /// A repeated name keeps its first position and takes the latest result.
    fn insert(&mut self, name: &str, result: SimulationResult) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = result,
            None => self.entries.push((name.to_string(), result)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SimulationResult> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, result)| result)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SimulationResult)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ScenarioComparison {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(n, r)| (n, r)))
    }
}

/// Runs `base` once per scenario with that scenario's return and volatility.
///
/// With a configured seed every scenario gets its own derived stream, so the
/// result for one scenario does not depend on which others are compared.
pub fn compare_scenarios(
    base: &ProjectionInputs,
    scenarios: &[Scenario],
    config: &SimulationConfig,
) -> ScenarioComparison {
    let _span = tracing::debug_span!("compare_scenarios", count = scenarios.len()).entered();
    let mut comparison = ScenarioComparison::default();
    for (idx, scenario) in scenarios.iter().enumerate() {
        let mut rng = make_rng(config.seed.map(|seed| derive_seed(seed, idx as u64)));
        let result = run_monte_carlo_with_rng(&scenario_inputs(base, scenario), config, &mut rng);
        comparison.insert(&scenario.name, result);
    }
    comparison
}

/// Same as [`compare_scenarios`] but drawing every scenario from one generator.
pub fn compare_scenarios_with_rng<R: Rng + ?Sized>(
    base: &ProjectionInputs,
    scenarios: &[Scenario],
    config: &SimulationConfig,
    rng: &mut R,
) -> ScenarioComparison {
    let _span = tracing::debug_span!("compare_scenarios", count = scenarios.len()).entered();
    let mut comparison = ScenarioComparison::default();
    for scenario in scenarios {
        let result = run_monte_carlo_with_rng(&scenario_inputs(base, scenario), config, rng);
        comparison.insert(&scenario.name, result);
    }
    comparison
}

fn scenario_inputs(base: &ProjectionInputs, scenario: &Scenario) -> ProjectionInputs {
    ProjectionInputs {
        expected_return: scenario.expected_return,
        volatility: scenario.volatility,
        ..*base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::presets::{BLACK_SWAN_EVENTS, PRESET_SCENARIOS};
    use proptest::prelude::{any, prop_assert, prop_assert_eq, proptest};
    use std::borrow::Cow;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_rel(actual: f64, expected: f64, rel: f64) {
        let tol = rel * expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_inputs() -> ProjectionInputs {
        ProjectionInputs {
            principal: 100_000.0,
            monthly_contribution: 10_000.0,
            years: 5,
            target: 1_000_000.0,
            expected_return: 0.12,
            volatility: 0.15,
            black_swan: false,
        }
    }

    fn seeded(seed: u64) -> SimulationConfig {
        SimulationConfig {
            seed: Some(seed),
            ..SimulationConfig::default()
        }
    }

    fn assert_monotone(bands: &Percentiles, label: &str) {
        let values = bands.as_array();
        for pair in values.windows(2) {
            assert!(pair[0] <= pair[1], "{label}: bands out of order {values:?}");
        }
    }

    fn assert_result_invariants(result: &SimulationResult) {
        assert_monotone(&result.percentiles, "final");
        assert!(result.percentiles.p5 >= 0.0);
        assert!((0.0..=100.0).contains(&result.success_probability));
        assert!(result.min >= 0.0);
        assert!(result.min <= result.percentiles.p5);
        assert!(result.percentiles.p95 <= result.max);
        assert!(result.std_dev >= 0.0);
        for path in &result.yearly_paths {
            assert_monotone(&path.bands, &format!("year {}", path.year));
            assert!(path.bands.p5 >= 0.0, "year {} negative", path.year);
        }
    }

    #[test]
    fn sample_projection_has_expected_shape() {
        let result = run_monte_carlo(&sample_inputs(), &seeded(42));

        assert_eq!(result.iterations, 1000);
        assert_eq!(result.yearly_paths.len(), 6);
        for (idx, path) in result.yearly_paths.iter().enumerate() {
            assert_eq!(path.year as usize, idx);
        }
        assert_result_invariants(&result);
        assert!(
            result.success_probability > 0.0 && result.success_probability < 100.0,
            "success {}",
            result.success_probability
        );
        assert!(
            result.percentiles.p50 > 500_000.0 && result.percentiles.p50 < 1_500_000.0,
            "median {}",
            result.percentiles.p50
        );
    }

    #[test]
    fn year_zero_snapshot_is_the_principal() {
        let result = run_monte_carlo(&sample_inputs(), &seeded(1));
        let year0 = result.yearly_paths[0].bands;
        for band in year0.as_array() {
            assert_approx(band, 100_000.0);
        }
    }

    #[test]
    fn zero_volatility_matches_closed_form_for_every_path() {
        let mut inputs = sample_inputs();
        inputs.volatility = 0.0;
        let result = run_monte_carlo(&inputs, &SimulationConfig::default());

        let expected = deterministic_final_wealth(100_000.0, 10_000.0, 0.12, 5);
        assert_eq!(result.min, result.max);
        assert_eq!(result.percentiles.p5, result.percentiles.p50);
        assert_eq!(result.percentiles.p50, result.percentiles.p95);
        assert_rel(result.percentiles.p50, expected, 1e-9);
        assert!(result.std_dev <= 1e-6 * expected);
    }

    #[test]
    fn negative_volatility_degenerates_to_deterministic_growth() {
        let mut inputs = sample_inputs();
        inputs.volatility = -0.2;
        let result = run_monte_carlo(&inputs, &seeded(5));
        assert_eq!(result.min, result.max);
        assert_rel(
            result.mean,
            deterministic_final_wealth(100_000.0, 10_000.0, 0.12, 5),
            1e-9,
        );
    }

    #[test]
    fn oracle_one_year_closed_form_matches_hand_calculation() {
        // 100 * 1.01^12 + 10 * (1.01^12 - 1) / 0.01
        assert_approx(deterministic_final_wealth(100.0, 10.0, 0.12, 1), 239.507533);
        assert_approx(deterministic_final_wealth(100.0, 10.0, 0.0, 2), 340.0);
        assert_approx(deterministic_final_wealth(100.0, 10.0, 0.12, 0), 100.0);
    }

    #[test]
    fn oracle_certain_crash_every_month_matches_hand_calculation() {
        let inputs = ProjectionInputs {
            principal: 1_000.0,
            monthly_contribution: 0.0,
            years: 1,
            target: 0.0,
            expected_return: 0.12,
            volatility: 0.0,
            black_swan: true,
        };
        let config = SimulationConfig {
            iterations: 10,
            crash: CrashModel {
                monthly_probability: 1.0,
                shallowest_drop: -0.2,
                deepest_drop: -0.2,
            },
            seed: Some(3),
        };
        let result = run_monte_carlo(&inputs, &config);
        assert_approx(result.percentiles.p50, 1_000.0 * 0.8_f64.powi(12));
        assert_eq!(result.success_probability, 100.0);
    }

    #[test]
    fn crash_injection_lowers_the_distribution() {
        let mut inputs = sample_inputs();
        inputs.volatility = 0.0;
        inputs.black_swan = true;
        let config = SimulationConfig {
            crash: CrashModel {
                monthly_probability: 0.05,
                ..CrashModel::default()
            },
            ..seeded(17)
        };
        let crashed = run_monte_carlo(&inputs, &config);
        let ceiling = deterministic_final_wealth(100_000.0, 10_000.0, 0.12, 5);

        assert!(crashed.max <= ceiling * (1.0 + 1e-9));
        assert!(crashed.percentiles.p50 < ceiling);
        assert_result_invariants(&crashed);
    }

    #[test]
    fn wealth_is_floored_at_zero() {
        let inputs = ProjectionInputs {
            principal: 1_000.0,
            monthly_contribution: -500.0,
            years: 2,
            target: 1.0,
            expected_return: 0.0,
            volatility: 0.3,
            black_swan: false,
        };
        let result = run_monte_carlo(&inputs, &seeded(9));
        assert_eq!(result.max, 0.0);
        assert_eq!(result.success_probability, 0.0);
        assert_result_invariants(&result);
    }

    #[test]
    fn non_finite_inputs_propagate_without_panicking() {
        let inputs = ProjectionInputs {
            principal: f64::NAN,
            volatility: f64::INFINITY,
            ..sample_inputs()
        };
        let result = run_monte_carlo(&inputs, &seeded(8));

        assert_eq!(result.iterations, 1000);
        assert_eq!(result.yearly_paths.len(), 6);
        assert!(result.percentiles.as_array().iter().all(|v| v.is_nan()));
        assert!(result.mean.is_nan());
        assert!(result.std_dev.is_nan());
        assert_eq!(result.success_probability, 0.0);
        assert!(result.yearly_paths[0].bands.p50.is_nan());
    }

    #[test]
    fn huge_horizons_saturate_instead_of_overflowing() {
        let inputs = ProjectionInputs {
            years: u32::MAX,
            ..sample_inputs()
        };
        assert_eq!(PathParams::new(&inputs, &CrashModel::default()).months, u32::MAX);

        assert_approx(
            deterministic_final_wealth(100.0, 1.0, 0.0, u32::MAX),
            100.0 + f64::from(u32::MAX),
        );
        let grown = deterministic_final_wealth(100.0, 1.0, 0.12, u32::MAX);
        assert!(grown.is_infinite() && grown > 0.0);
    }

    #[test]
    fn zero_year_horizon_returns_only_initial_snapshot() {
        let mut inputs = sample_inputs();
        inputs.years = 0;
        inputs.target = 100_000.0;
        let result = run_monte_carlo(&inputs, &seeded(2));
        assert_eq!(result.yearly_paths.len(), 1);
        assert_eq!(result.percentiles.p50, 100_000.0);
        assert_eq!(result.success_probability, 100.0);
    }

    #[test]
    fn zero_iterations_yield_empty_but_defined_result() {
        let config = SimulationConfig {
            iterations: 0,
            ..seeded(1)
        };
        let result = run_monte_carlo(&sample_inputs(), &config);
        assert_eq!(result.success_probability, 0.0);
        assert_eq!(result.percentiles, Percentiles::default());
        assert_eq!(result.yearly_paths.len(), 6);
        assert_eq!(result.mean, 0.0);
    }

    #[test]
    fn nearest_rank_indexes_floor_of_n_times_p() {
        let sorted: Vec<f64> = (0..20).map(f64::from).collect();
        assert_eq!(nearest_rank(&sorted, 0.05), 1.0);
        assert_eq!(nearest_rank(&sorted, 0.50), 10.0);
        assert_eq!(nearest_rank(&sorted, 0.95), 19.0);
        assert_eq!(nearest_rank(&sorted, 1.0), 19.0);
        assert_eq!(nearest_rank(&[7.0], 0.95), 7.0);
        assert_eq!(nearest_rank(&[], 0.5), 0.0);
    }

    #[test]
    fn fixed_seed_reruns_are_identical() {
        let a = run_monte_carlo(&sample_inputs(), &seeded(123));
        let b = run_monte_carlo(&sample_inputs(), &seeded(123));
        assert_eq!(a, b);
    }

    #[test]
    fn unseeded_runs_still_satisfy_invariants() {
        let config = SimulationConfig {
            iterations: 200,
            ..SimulationConfig::default()
        };
        assert_result_invariants(&run_monte_carlo(&sample_inputs(), &config));
    }

    #[test]
    fn recovery_path_starts_from_post_crash_value() {
        let event = BlackSwanEvent {
            name: Cow::Borrowed("Test Crash"),
            description: Cow::Borrowed(""),
            impact: -0.40,
            recovery_years: 3,
            probability: 0.01,
        };
        let inputs = recovery_inputs(1_000_000.0, 0.0, &event);
        assert_eq!(inputs.target, 1_000_000.0);
        assert_eq!(inputs.expected_return, DEFAULT_EXPECTED_RETURN);
        assert_eq!(inputs.volatility, DEFAULT_VOLATILITY);

        let paths = recovery_path(1_000_000.0, 0.0, &event, &seeded(8));
        assert_eq!(paths.len(), 4);
        assert!(paths[0].bands.p50 <= 1_000_000.0 * (1.0 - 0.40));
        for path in &paths {
            assert_monotone(&path.bands, "recovery");
        }
    }

    #[test]
    fn recovery_paths_exist_for_every_preset_event() {
        let config = SimulationConfig {
            iterations: 100,
            ..seeded(4)
        };
        for event in BLACK_SWAN_EVENTS {
            let paths = recovery_path(500_000.0, 5_000.0, event, &config);
            assert_eq!(paths.len(), event.recovery_years as usize + 1);
            assert!(paths[0].bands.p50 < 500_000.0);
        }
    }

    #[test]
    fn comparator_returns_every_preset_in_order() {
        let config = SimulationConfig {
            iterations: 300,
            ..seeded(11)
        };
        let comparison = compare_scenarios(&sample_inputs(), PRESET_SCENARIOS, &config);

        assert_eq!(comparison.len(), PRESET_SCENARIOS.len());
        let names: Vec<&str> = comparison.names().collect();
        let expected: Vec<&str> = PRESET_SCENARIOS.iter().map(|s| s.name.as_ref()).collect();
        assert_eq!(names, expected);
        for (_, result) in comparison.iter() {
            assert_result_invariants(result);
        }
        let conservative = comparison.get("Conservative").expect("present");
        let aggressive = comparison.get("Aggressive").expect("present");
        assert!(conservative.std_dev < aggressive.std_dev);
    }

    #[test]
    fn comparator_streams_are_independent_of_other_scenarios() {
        let config = SimulationConfig {
            iterations: 200,
            ..seeded(21)
        };
        let all = compare_scenarios(&sample_inputs(), PRESET_SCENARIOS, &config);
        let first_only = compare_scenarios(&sample_inputs(), &PRESET_SCENARIOS[..1], &config);
        assert_eq!(
            all.get("Conservative"),
            first_only.get("Conservative")
        );
    }

    #[test]
    fn injected_generator_drives_every_operation() {
        let config = SimulationConfig {
            iterations: 40,
            ..SimulationConfig::default()
        };
        let mut a = make_rng(Some(31));
        let mut b = make_rng(Some(31));
        assert_eq!(
            compare_scenarios_with_rng(&sample_inputs(), PRESET_SCENARIOS, &config, &mut a),
            compare_scenarios_with_rng(&sample_inputs(), PRESET_SCENARIOS, &config, &mut b)
        );
        let event = &BLACK_SWAN_EVENTS[0];
        assert_eq!(
            recovery_path_with_rng(800_000.0, 0.0, event, &config, &mut a),
            recovery_path_with_rng(800_000.0, 0.0, event, &config, &mut b)
        );
    }

    #[test]
    fn comparator_keeps_first_position_for_repeated_names() {
        let mut scenarios = PRESET_SCENARIOS[..2].to_vec();
        scenarios.push(Scenario {
            volatility: 0.0,
            ..PRESET_SCENARIOS[0].clone()
        });
        let config = SimulationConfig {
            iterations: 50,
            ..seeded(6)
        };
        let comparison = compare_scenarios(&sample_inputs(), &scenarios, &config);
        assert_eq!(comparison.len(), 2);
        assert_eq!(comparison.names().next(), Some("Conservative"));
        let replaced = comparison.get("Conservative").expect("present");
        assert_eq!(replaced.min, replaced.max);
    }

    #[test]
    fn comparison_serializes_as_ordered_object() {
        let config = SimulationConfig {
            iterations: 10,
            ..seeded(1)
        };
        let mut scenarios = PRESET_SCENARIOS.to_vec();
        scenarios.reverse();
        let comparison = compare_scenarios(&sample_inputs(), &scenarios, &config);
        let json = serde_json::to_string(&comparison).expect("serializes");
        let bear = json.find("\"Bear Market\"").expect("bear key");
        let conservative = json.find("\"Conservative\"").expect("conservative key");
        assert!(bear < conservative);
        assert!(json.contains("\"successProbability\""));
        assert!(json.contains("\"yearlyPaths\""));
        assert!(json.contains("\"p50\""));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(24))]

        #[test]
        fn prop_results_are_monotone_non_negative_and_bounded(
            seed in any::<u64>(),
            principal in 0.0_f64..2_000_000.0,
            contribution in 0.0_f64..50_000.0,
            years in 0_u32..15,
            target in 0.0_f64..5_000_000.0,
            expected_return in -0.10_f64..0.30,
            volatility in 0.0_f64..0.60,
            black_swan in any::<bool>(),
        ) {
            let inputs = ProjectionInputs {
                principal,
                monthly_contribution: contribution,
                years,
                target,
                expected_return,
                volatility,
                black_swan,
            };
            let config = SimulationConfig { iterations: 120, ..seeded(seed) };
            let result = run_monte_carlo(&inputs, &config);

            prop_assert_eq!(result.yearly_paths.len(), years as usize + 1);
            prop_assert!((0.0..=100.0).contains(&result.success_probability));
            for bands in std::iter::once(&result.percentiles)
                .chain(result.yearly_paths.iter().map(|p| &p.bands))
            {
                let values = bands.as_array();
                prop_assert!(values[0] >= 0.0);
                for pair in values.windows(2) {
                    prop_assert!(pair[0] <= pair[1]);
                }
            }
        }

        #[test]
        fn prop_zero_volatility_is_deterministic_and_closed_form(
            seed in any::<u64>(),
            principal in 0.0_f64..1_000_000.0,
            contribution in 0.0_f64..20_000.0,
            years in 0_u32..25,
            expected_return in 0.0_f64..0.25,
        ) {
            let inputs = ProjectionInputs {
                principal,
                monthly_contribution: contribution,
                years,
                target: 0.0,
                expected_return,
                volatility: 0.0,
                black_swan: false,
            };
            let config = SimulationConfig { iterations: 50, ..seeded(seed) };
            let result = run_monte_carlo(&inputs, &config);
            let expected = deterministic_final_wealth(principal, contribution, expected_return, years);

            prop_assert_eq!(result.percentiles.p5, result.percentiles.p95);
            prop_assert!((result.percentiles.p50 - expected).abs() <= 1e-9 * expected.max(1.0));
            prop_assert_eq!(result.success_probability, 100.0);
        }

        #[test]
        fn prop_higher_target_does_not_raise_success(
            seed in any::<u64>(),
            low in 0.0_f64..1_500_000.0,
            extra in 0.0_f64..500_000.0,
        ) {
            let config = SimulationConfig { iterations: 150, ..seeded(seed) };
            let mut inputs = sample_inputs();
            inputs.target = low;
            let easy = run_monte_carlo(&inputs, &config);
            inputs.target = low + extra;
            let hard = run_monte_carlo(&inputs, &config);
            prop_assert!(hard.success_probability <= easy.success_probability);
        }
    }
}

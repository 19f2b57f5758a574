mod engine;
mod error;
mod presets;
mod sampler;
mod solver;
mod types;

pub use engine::{
    ScenarioComparison, compare_scenarios, compare_scenarios_with_rng,
    deterministic_final_wealth, recovery_inputs, recovery_path, recovery_path_with_rng,
    run_monte_carlo, run_monte_carlo_with_rng,
};
pub use error::InputError;
pub(crate) use error::{require_at_least, require_within};
pub use presets::{BLACK_SWAN_EVENTS, PRESET_SCENARIOS, find_black_swan, find_scenario};
pub use sampler::{derive_seed, make_rng, standard_normal};
pub use solver::{SolveConfig, SolveResult, SolveStep, solve_required_contribution};
pub use types::{
    BlackSwanEvent, CrashModel, DEFAULT_EXPECTED_RETURN, DEFAULT_ITERATIONS, DEFAULT_VOLATILITY,
    Percentiles, ProjectionInputs, Scenario, SimulationConfig, SimulationResult, YearlyPath,
};

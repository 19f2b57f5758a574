mod http;

pub use http::{router, run_http_server};

use std::borrow::Cow;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::core::{
    BLACK_SWAN_EVENTS, BlackSwanEvent, CrashModel, InputError, PRESET_SCENARIOS,
    ProjectionInputs, Scenario, ScenarioComparison, SimulationConfig, SimulationResult,
    SolveConfig, SolveResult, YearlyPath, compare_scenarios, deterministic_final_wealth,
    find_black_swan, find_scenario, recovery_path, require_at_least, require_within,
    run_monte_carlo, solve_required_contribution,
};

const MAX_YEARS: u32 = 100;
const MAX_ITERATIONS: usize = 100_000;

#[derive(Parser, Debug)]
#[command(
    name = "wealthcast",
    about = "Monte Carlo wealth projections: percentile bands, target odds and crash recovery"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Project one portfolio and print its percentile bands
    Simulate(ProjectionArgs),
    /// Run the same portfolio under several return/volatility presets
    Compare {
        #[command(flatten)]
        projection: ProjectionArgs,
        #[arg(long = "scenario", help = "Preset name; repeat to compare several (default: all)")]
        scenarios: Vec<String>,
    },
    /// Project the recovery from a black swan drawdown back to the principal
    Recovery {
        #[command(flatten)]
        recovery: RecoveryArgs,
        #[arg(long, help = "Black swan preset name, e.g. \"COVID-19 Crash\"")]
        event: String,
    },
    /// Find the monthly contribution that reaches the target with the requested odds
    Solve {
        #[command(flatten)]
        projection: ProjectionArgs,
        #[command(flatten)]
        solve: SolveArgs,
    },
    /// List the built-in scenarios and black swan events
    Presets,
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ProjectionArgs {
    #[arg(long, default_value_t = 100_000.0)]
    pub principal: f64,
    #[arg(long, default_value_t = 10_000.0, help = "Monthly SIP amount")]
    pub monthly_contribution: f64,
    #[arg(long, default_value_t = 10)]
    pub years: u32,
    #[arg(long, default_value_t = 1_000_000.0, help = "Final wealth to reach")]
    pub target: f64,
    #[arg(
        long,
        default_value_t = 12.0,
        allow_negative_numbers = true,
        help = "Expected annual return in percent"
    )]
    pub expected_return: f64,
    #[arg(long, default_value_t = 15.0, help = "Annual volatility in percent")]
    pub volatility: f64,
    #[arg(long, help = "Inject rare crash months")]
    pub black_swan: bool,
    #[arg(long, default_value_t = 1000)]
    pub iterations: usize,
    #[arg(long, help = "Seed for reproducible runs; random when omitted")]
    pub seed: Option<u64>,
    #[arg(
        long,
        default_value_t = 0.1,
        help = "Chance of a crash month in percent, used with --black-swan"
    )]
    pub crash_probability: f64,
    #[arg(
        long,
        default_value_t = -15.0,
        allow_negative_numbers = true,
        help = "Mildest crash-month return in percent"
    )]
    pub crash_shallowest: f64,
    #[arg(
        long,
        default_value_t = -30.0,
        allow_negative_numbers = true,
        help = "Worst crash-month return in percent"
    )]
    pub crash_deepest: f64,
}

impl Default for ProjectionArgs {
    fn default() -> Self {
        Self {
            principal: 100_000.0,
            monthly_contribution: 10_000.0,
            years: 10,
            target: 1_000_000.0,
            expected_return: 12.0,
            volatility: 15.0,
            black_swan: false,
            iterations: 1000,
            seed: None,
            crash_probability: 0.1,
            crash_shallowest: -15.0,
            crash_deepest: -30.0,
        }
    }
}

/// Recovery runs at the fixed long-run return and volatility over the
/// event's own horizon, so only the starting point and sampling are tunable.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct RecoveryArgs {
    #[arg(long, default_value_t = 100_000.0, help = "Portfolio value before the crash")]
    pub principal: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly SIP kept up during the recovery")]
    pub monthly_contribution: f64,
    #[arg(long, default_value_t = 1000)]
    pub iterations: usize,
    #[arg(long, help = "Seed for reproducible runs; random when omitted")]
    pub seed: Option<u64>,
}

impl Default for RecoveryArgs {
    fn default() -> Self {
        Self {
            principal: 100_000.0,
            monthly_contribution: 0.0,
            iterations: 1000,
            seed: None,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SolveArgs {
    #[arg(long, default_value_t = 90.0, help = "Required success probability in percent")]
    pub target_success: f64,
    #[arg(long, default_value_t = 0.0)]
    pub search_min: f64,
    #[arg(long, default_value_t = 1_000_000.0)]
    pub search_max: f64,
    #[arg(long, default_value_t = 100.0, help = "Stop when the bracket is this narrow")]
    pub tolerance: f64,
    #[arg(long, default_value_t = 40)]
    pub max_steps: u32,
    #[arg(long, default_value_t = 500)]
    pub iterations_per_step: usize,
    #[arg(long, default_value_t = 1000)]
    pub final_iterations: usize,
}

impl Default for SolveArgs {
    fn default() -> Self {
        let defaults = SolveConfig::default();
        Self {
            target_success: defaults.target_success,
            search_min: defaults.search_min,
            search_max: defaults.search_max,
            tolerance: defaults.tolerance,
            max_steps: defaults.max_steps,
            iterations_per_step: defaults.iterations_per_step,
            final_iterations: defaults.final_iterations,
        }
    }
}

impl From<&SolveArgs> for SolveConfig {
    fn from(args: &SolveArgs) -> Self {
        SolveConfig {
            target_success: args.target_success,
            search_min: args.search_min,
            search_max: args.search_max,
            tolerance: args.tolerance,
            max_steps: args.max_steps,
            iterations_per_step: args.iterations_per_step,
            final_iterations: args.final_iterations,
        }
    }
}

/// Validated engine inputs, rates converted from percent to fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionRequest {
    pub inputs: ProjectionInputs,
    pub config: SimulationConfig,
}

pub fn build_request(args: &ProjectionArgs) -> Result<ProjectionRequest, InputError> {
    let principal = require_at_least("principal", args.principal, 0.0)?;
    let monthly_contribution =
        require_at_least("monthlyContribution", args.monthly_contribution, 0.0)?;
    let target = require_at_least("target", args.target, 0.0)?;
    if args.years > MAX_YEARS {
        return Err(InputError::OutOfRange {
            field: "years",
            min: 0.0,
            max: MAX_YEARS as f64,
        });
    }
    let expected_return = require_within("expectedReturn", args.expected_return, -100.0, 100.0)?;
    let volatility = require_within("volatility", args.volatility, 0.0, 200.0)?;
    require_iterations(args.iterations)?;
    let crash_probability =
        require_within("crashProbability", args.crash_probability, 0.0, 100.0)?;
    let crash_shallowest = require_within("crashShallowest", args.crash_shallowest, -100.0, 0.0)?;
    let crash_deepest = require_within("crashDeepest", args.crash_deepest, -100.0, crash_shallowest)?;

    Ok(ProjectionRequest {
        inputs: ProjectionInputs {
            principal,
            monthly_contribution,
            years: args.years,
            target,
            expected_return: expected_return / 100.0,
            volatility: volatility / 100.0,
            black_swan: args.black_swan,
        },
        config: SimulationConfig {
            iterations: args.iterations,
            crash: CrashModel {
                monthly_probability: crash_probability / 100.0,
                shallowest_drop: crash_shallowest / 100.0,
                deepest_drop: crash_deepest / 100.0,
            },
            seed: args.seed,
        },
    })
}

fn require_iterations(iterations: usize) -> Result<usize, InputError> {
    if !(1..=MAX_ITERATIONS).contains(&iterations) {
        return Err(InputError::OutOfRange {
            field: "iterations",
            min: 1.0,
            max: MAX_ITERATIONS as f64,
        });
    }
    Ok(iterations)
}

/// Validated recovery inputs. The crash model is unused: recovery paths
/// never inject further crashes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoveryRequest {
    pub principal: f64,
    pub monthly_contribution: f64,
    pub config: SimulationConfig,
}

pub fn build_recovery_request(args: &RecoveryArgs) -> Result<RecoveryRequest, InputError> {
    Ok(RecoveryRequest {
        principal: require_at_least("principal", args.principal, 0.0)?,
        monthly_contribution: require_at_least(
            "monthlyContribution",
            args.monthly_contribution,
            0.0,
        )?,
        config: SimulationConfig {
            iterations: require_iterations(args.iterations)?,
            seed: args.seed,
            ..SimulationConfig::default()
        },
    })
}

pub fn resolve_scenarios(names: &[String]) -> Result<Vec<Scenario>, InputError> {
    if names.is_empty() {
        return Ok(PRESET_SCENARIOS.to_vec());
    }
    names.iter().map(|name| preset_scenario(name)).collect()
}

fn preset_scenario(name: &str) -> Result<Scenario, InputError> {
    find_scenario(name)
        .cloned()
        .ok_or_else(|| InputError::UnknownPreset {
            kind: "scenario",
            name: name.to_string(),
        })
}

fn preset_event(name: &str) -> Result<BlackSwanEvent, InputError> {
    find_black_swan(name)
        .cloned()
        .ok_or_else(|| InputError::UnknownPreset {
            kind: "event",
            name: name.to_string(),
        })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    principal: Option<f64>,
    monthly_contribution: Option<f64>,
    years: Option<u32>,
    target: Option<f64>,
    expected_return: Option<f64>,
    volatility: Option<f64>,
    black_swan: Option<bool>,
    iterations: Option<usize>,
    seed: Option<u64>,
    crash_probability: Option<f64>,
    crash_shallowest: Option<f64>,
    crash_deepest: Option<f64>,
}

impl ProjectionPayload {
    fn into_args(self) -> ProjectionArgs {
        let mut args = ProjectionArgs::default();
        if let Some(v) = self.principal {
            args.principal = v;
        }
        if let Some(v) = self.monthly_contribution {
            args.monthly_contribution = v;
        }
        if let Some(v) = self.years {
            args.years = v;
        }
        if let Some(v) = self.target {
            args.target = v;
        }
        if let Some(v) = self.expected_return {
            args.expected_return = v;
        }
        if let Some(v) = self.volatility {
            args.volatility = v;
        }
        if let Some(v) = self.black_swan {
            args.black_swan = v;
        }
        if let Some(v) = self.iterations {
            args.iterations = v;
        }
        if self.seed.is_some() {
            args.seed = self.seed;
        }
        if let Some(v) = self.crash_probability {
            args.crash_probability = v;
        }
        if let Some(v) = self.crash_shallowest {
            args.crash_shallowest = v;
        }
        if let Some(v) = self.crash_deepest {
            args.crash_deepest = v;
        }
        args
    }
}

/// A preset by name or an inline definition with rates in percent.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ScenarioRef {
    Preset(String),
    Custom {
        name: String,
        #[serde(default)]
        description: String,
        #[serde(rename = "expectedReturn")]
        expected_return: f64,
        volatility: f64,
    },
}

impl ScenarioRef {
    fn resolve(self) -> Result<Scenario, InputError> {
        match self {
            ScenarioRef::Preset(name) => preset_scenario(&name),
            ScenarioRef::Custom {
                name,
                description,
                expected_return,
                volatility,
            } => Ok(Scenario {
                name: Cow::Owned(name),
                description: Cow::Owned(description),
                expected_return: require_within("expectedReturn", expected_return, -100.0, 100.0)?
                    / 100.0,
                volatility: require_within("volatility", volatility, 0.0, 200.0)? / 100.0,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EventRef {
    Preset(String),
    Custom {
        name: String,
        #[serde(default)]
        description: String,
        impact: f64,
        #[serde(rename = "recoveryYears")]
        recovery_years: u32,
        #[serde(default)]
        probability: f64,
    },
}

impl EventRef {
    fn resolve(self) -> Result<BlackSwanEvent, InputError> {
        match self {
            EventRef::Preset(name) => preset_event(&name),
            EventRef::Custom {
                name,
                description,
                impact,
                recovery_years,
                probability,
            } => {
                if recovery_years > MAX_YEARS {
                    return Err(InputError::OutOfRange {
                        field: "recoveryYears",
                        min: 0.0,
                        max: MAX_YEARS as f64,
                    });
                }
                Ok(BlackSwanEvent {
                    name: Cow::Owned(name),
                    description: Cow::Owned(description),
                    impact: require_within("impact", impact, -100.0, 0.0)? / 100.0,
                    recovery_years,
                    probability: require_within("probability", probability, 0.0, 100.0)? / 100.0,
                })
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    #[serde(flatten)]
    projection: ProjectionPayload,
    scenarios: Option<Vec<ScenarioRef>>,
}

/// Unknown fields are refused rather than silently ignored; the projection
/// knobs of the other endpoints have no meaning here.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
struct RecoveryPayload {
    principal: Option<f64>,
    monthly_contribution: Option<f64>,
    iterations: Option<usize>,
    seed: Option<u64>,
    event: Option<EventRef>,
}

impl RecoveryPayload {
    fn split(self) -> (RecoveryArgs, Option<EventRef>) {
        let mut args = RecoveryArgs::default();
        if let Some(v) = self.principal {
            args.principal = v;
        }
        if let Some(v) = self.monthly_contribution {
            args.monthly_contribution = v;
        }
        if let Some(v) = self.iterations {
            args.iterations = v;
        }
        if self.seed.is_some() {
            args.seed = self.seed;
        }
        (args, self.event)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    #[serde(flatten)]
    projection: ProjectionPayload,
    target_success: Option<f64>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_steps: Option<u32>,
    iterations_per_step: Option<usize>,
    final_iterations: Option<usize>,
}

impl SolvePayload {
    fn split(self) -> (ProjectionArgs, SolveArgs) {
        let mut solve = SolveArgs::default();
        if let Some(v) = self.target_success {
            solve.target_success = v;
        }
        if let Some(v) = self.search_min {
            solve.search_min = v;
        }
        if let Some(v) = self.search_max {
            solve.search_max = v;
        }
        if let Some(v) = self.tolerance {
            solve.tolerance = v;
        }
        if let Some(v) = self.max_steps {
            solve.max_steps = v;
        }
        if let Some(v) = self.iterations_per_step {
            solve.iterations_per_step = v;
        }
        if let Some(v) = self.final_iterations {
            solve.final_iterations = v;
        }
        (self.projection.into_args(), solve)
    }
}

fn compare_request_from_payload(
    payload: ComparePayload,
) -> Result<(ProjectionRequest, Vec<Scenario>), InputError> {
    let request = build_request(&payload.projection.into_args())?;
    let scenarios = match payload.scenarios {
        Some(refs) => refs
            .into_iter()
            .map(ScenarioRef::resolve)
            .collect::<Result<Vec<_>, _>>()?,
        None => PRESET_SCENARIOS.to_vec(),
    };
    Ok((request, scenarios))
}

fn recovery_request_from_payload(
    payload: RecoveryPayload,
) -> Result<(RecoveryRequest, BlackSwanEvent), InputError> {
    let (args, event) = payload.split();
    let request = build_recovery_request(&args)?;
    let event = event
        .ok_or(InputError::Missing { field: "event" })?
        .resolve()?;
    Ok((request, event))
}

fn solve_request_from_payload(
    payload: SolvePayload,
) -> Result<(ProjectionRequest, SolveConfig), InputError> {
    let (projection, solve) = payload.split();
    Ok((build_request(&projection)?, SolveConfig::from(&solve)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResponse {
    /// Final wealth with volatility and crashes switched off.
    pub deterministic_final_wealth: f64,
    #[serde(flatten)]
    pub result: SimulationResult,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub scenarios: ScenarioComparison,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryResponse {
    pub event: EventView,
    pub post_crash_value: f64,
    pub recovery_target: f64,
    pub monthly_contribution: f64,
    pub yearly_paths: Vec<YearlyPath>,
}

/// Scenario as shown to clients, rates in percent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioView {
    pub name: String,
    pub description: String,
    pub expected_return: f64,
    pub volatility: f64,
}

impl From<&Scenario> for ScenarioView {
    fn from(s: &Scenario) -> Self {
        Self {
            name: s.name.to_string(),
            description: s.description.to_string(),
            expected_return: s.expected_return * 100.0,
            volatility: s.volatility * 100.0,
        }
    }
}

/// Black swan event as shown to clients, rates in percent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub name: String,
    pub description: String,
    pub impact: f64,
    pub recovery_years: u32,
    pub probability: f64,
}

impl From<&BlackSwanEvent> for EventView {
    fn from(e: &BlackSwanEvent) -> Self {
        Self {
            name: e.name.to_string(),
            description: e.description.to_string(),
            impact: e.impact * 100.0,
            recovery_years: e.recovery_years,
            probability: e.probability * 100.0,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetsResponse {
    pub scenarios: Vec<ScenarioView>,
    pub black_swan_events: Vec<EventView>,
}

pub fn simulate(request: &ProjectionRequest) -> SimulateResponse {
    let inputs = &request.inputs;
    SimulateResponse {
        deterministic_final_wealth: deterministic_final_wealth(
            inputs.principal,
            inputs.monthly_contribution,
            inputs.expected_return,
            inputs.years,
        ),
        result: run_monte_carlo(inputs, &request.config),
    }
}

pub fn compare(request: &ProjectionRequest, scenarios: &[Scenario]) -> CompareResponse {
    CompareResponse {
        scenarios: compare_scenarios(&request.inputs, scenarios, &request.config),
    }
}

pub fn recovery(request: &RecoveryRequest, event: &BlackSwanEvent) -> RecoveryResponse {
    let principal = request.principal;
    RecoveryResponse {
        event: event.into(),
        post_crash_value: principal * (1.0 + event.impact),
        recovery_target: principal,
        monthly_contribution: request.monthly_contribution,
        yearly_paths: recovery_path(
            principal,
            request.monthly_contribution,
            event,
            &request.config,
        ),
    }
}

pub fn solve(
    request: &ProjectionRequest,
    config: &SolveConfig,
) -> Result<SolveResult, InputError> {
    solve_required_contribution(&request.inputs, config, &request.config)
}

pub fn presets() -> PresetsResponse {
    PresetsResponse {
        scenarios: PRESET_SCENARIOS.iter().map(ScenarioView::from).collect(),
        black_swan_events: BLACK_SWAN_EVENTS.iter().map(EventView::from).collect(),
    }
}

pub async fn run_command(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Simulate(args) => print_json(&simulate(&build_request(&args)?)),
        Command::Compare {
            projection,
            scenarios,
        } => {
            let request = build_request(&projection)?;
            print_json(&compare(&request, &resolve_scenarios(&scenarios)?))
        }
        Command::Recovery { recovery: args, event } => {
            let request = build_recovery_request(&args)?;
            print_json(&recovery(&request, &preset_event(&event)?))
        }
        Command::Solve { projection, solve } => {
            let request = build_request(&projection)?;
            print_json(&self::solve(&request, &SolveConfig::from(&solve))?)
        }
        Command::Presets => print_json(&presets()),
        Command::Serve { port } => run_http_server(port)
            .await
            .with_context(|| format!("HTTP server on port {port} stopped")),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing result")?;
    println!("{json}");
    Ok(())
}

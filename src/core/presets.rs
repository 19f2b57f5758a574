use std::borrow::Cow;

use super::types::{BlackSwanEvent, Scenario};

pub static PRESET_SCENARIOS: &[Scenario] = &[
    Scenario {
        name: Cow::Borrowed("Conservative"),
        description: Cow::Borrowed("Debt-heavy allocation: low return, low swings"),
        expected_return: 0.08,
        volatility: 0.08,
    },
    Scenario {
        name: Cow::Borrowed("Moderate"),
        description: Cow::Borrowed("Balanced equity/debt mix, long-run index average"),
        expected_return: 0.12,
        volatility: 0.15,
    },
    Scenario {
        name: Cow::Borrowed("Aggressive"),
        description: Cow::Borrowed("Mid and small cap tilt: higher return, deeper drawdowns"),
        expected_return: 0.15,
        volatility: 0.22,
    },
    Scenario {
        name: Cow::Borrowed("Bear Market"),
        description: Cow::Borrowed("Prolonged weak returns with elevated volatility"),
        expected_return: 0.04,
        volatility: 0.25,
    },
];

pub static BLACK_SWAN_EVENTS: &[BlackSwanEvent] = &[
    BlackSwanEvent {
        name: Cow::Borrowed("2008 Financial Crisis"),
        description: Cow::Borrowed("Global credit freeze after the Lehman collapse"),
        impact: -0.55,
        recovery_years: 4,
        probability: 0.02,
    },
    BlackSwanEvent {
        name: Cow::Borrowed("COVID-19 Crash"),
        description: Cow::Borrowed("Pandemic lockdown sell-off of March 2020"),
        impact: -0.38,
        recovery_years: 1,
        probability: 0.03,
    },
    BlackSwanEvent {
        name: Cow::Borrowed("Dot-com Bust"),
        description: Cow::Borrowed("Technology bubble unwinding, 2000-2002"),
        impact: -0.45,
        recovery_years: 5,
        probability: 0.02,
    },
    BlackSwanEvent {
        name: Cow::Borrowed("1992 Securities Scam"),
        description: Cow::Borrowed("Domestic market collapse after the Harshad Mehta scam"),
        impact: -0.50,
        recovery_years: 2,
        probability: 0.01,
    },
];

pub fn find_scenario(name: &str) -> Option<&'static Scenario> {
    PRESET_SCENARIOS
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
}

pub fn find_black_swan(name: &str) -> Option<&'static BlackSwanEvent> {
    BLACK_SWAN_EVENTS
        .iter()
        .find(|e| e.name.eq_ignore_ascii_case(name.trim()))
}

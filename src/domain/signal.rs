//! Discrete trading signals and the forward-fill scan.

use std::fmt;

/// Directional instruction for one period.
///
/// `Short` is a real short exposure: a position of `Short` earns the negated
/// period return. `Neutral` means no new instruction (or flat, once lagged
/// into a position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    Short,
    #[default]
    Neutral,
    Long,
}

impl Signal {
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Short => -1,
            Signal::Neutral => 0,
            Signal::Long => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        self.as_i8() as f64
    }

    pub fn is_neutral(self) -> bool {
        self == Signal::Neutral
    }

    /// `Long` when `fast > slow`, `Short` when below, `Neutral` when equal or
    /// when either side is undefined.
    pub fn from_comparison(fast: Option<f64>, slow: Option<f64>) -> Self {
        match (fast, slow) {
            (Some(a), Some(b)) if a > b => Signal::Long,
            (Some(a), Some(b)) if a < b => Signal::Short,
            _ => Signal::Neutral,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}

/// Forward-fill: every `Neutral` inherits the most recent non-neutral signal.
/// Periods before the first trigger stay `Neutral`.
pub fn hold_last_signal(triggers: &[Signal]) -> Vec<Signal> {
    triggers
        .iter()
        .scan(Signal::Neutral, |held, &trigger| {
            if !trigger.is_neutral() {
                *held = trigger;
            }
            Some(*held)
        })
        .collect()
}

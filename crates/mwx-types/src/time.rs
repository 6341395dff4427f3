// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Time Values
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Quantities that are either a fixed number or a time expression.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MwxResult;

/// Evaluates a textual expression of simulation time `t`.
///
/// Implemented by the expression parser in `mwx-math`, or by a bridge to
/// the simulation engine's own parser.
pub trait ExpressionEvaluator {
    fn eval_expression_t(&self, expr: &str, t: f64) -> MwxResult<f64>;
}

/// A voltage, temperature or work function: a number or an expression of `t`.
///
/// Deserializes from either a JSON number or a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Constant(f64),
    Expression(String),
}

impl TimeValue {
    /// Evaluate at time `t`. Constants pass through without touching the
    /// evaluator.
    pub fn evaluate(&self, evaluator: &dyn ExpressionEvaluator, t: f64) -> MwxResult<f64> {
        match self {
            TimeValue::Constant(v) => Ok(*v),
            TimeValue::Expression(expr) => evaluator.eval_expression_t(expr, t),
        }
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self {
            TimeValue::Constant(v) => Some(*v),
            TimeValue::Expression(_) => None,
        }
    }

    pub fn is_time_dependent(&self) -> bool {
        matches!(self, TimeValue::Expression(_))
    }
}

impl Default for TimeValue {
    fn default() -> Self {
        TimeValue::Constant(0.0)
    }
}

impl From<f64> for TimeValue {
    fn from(v: f64) -> Self {
        TimeValue::Constant(v)
    }
}

impl From<&str> for TimeValue {
    fn from(expr: &str) -> Self {
        TimeValue::Expression(expr.to_string())
    }
}

impl From<String> for TimeValue {
    fn from(expr: String) -> Self {
        TimeValue::Expression(expr)
    }
}

/// Renders the value in the engine's expression grammar.
impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeValue::Constant(v) => write!(f, "{v:?}"),
            TimeValue::Expression(expr) => write!(f, "{expr}"),
        }
    }
}

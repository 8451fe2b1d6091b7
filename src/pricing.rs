//! Token pricing for invocation cost measurements.
//!
//! Prices are dollars per 1000 tokens, separately for input and output.
//! The computed total feeds [`OperationalMeasurement::total_cost`](crate::record::OperationalMeasurement).

use crate::error::{Result, ScorecardError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Input/output price per 1000 tokens for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenPrice {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// Cost breakdown for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvocationCost {
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    /// Total cost of 1000 identical invocations.
    pub total_cost_per_1000: f64,
}

/// Known model prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    prices: BTreeMap<String, TokenPrice>,
}

const DEFAULT_PRICES: &[(&str, f64, f64)] = &[
    ("amazon.titan-text-lite-v1", 0.0003, 0.0004),
    ("amazon.titan-text-express-v1", 0.0075, 0.0016),
    ("ai21.j2-mid-v1", 0.0125, 0.0125),
    ("ai21.j2-ultra-v1", 0.0188, 0.0188),
    ("anthropic.claude-instant-v1", 0.0008, 0.0024),
    ("anthropic.claude-v2", 0.008, 0.024),
    ("anthropic.claude-v2:1", 0.008, 0.024),
    ("anthropic.claude-3-sonnet-20240229-v1:0", 0.003, 0.015),
    ("anthropic.claude-3-haiku-20240307-v1:0", 0.00025, 0.00125),
    ("cohere.command-text-v14", 0.0015, 0.002),
    ("cohere.command-light-text-v14", 0.0003, 0.0006),
    ("meta.llama2-13b-chat-v1", 0.00075, 0.001),
    ("meta.llama2-70b-chat-v1", 0.00195, 0.00256),
    ("meta.llama3-8b-instruct-v1:0", 0.0004, 0.0006),
    ("meta.llama3-70b-instruct-v1:0", 0.00265, 0.0035),
    ("mistral.mistral-large-2402-v1:0", 0.008, 0.024),
    ("mistral.mistral-7b-instruct-v0:2", 0.00015, 0.0002),
    ("mistral.mixtral-8x7b-instruct-v0:1", 0.00045, 0.0007),
];

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl Default for PriceTable {
    fn default() -> Self {
        let prices = DEFAULT_PRICES
            .iter()
            .map(|(model, input, output)| {
                (
                    model.to_string(),
                    TokenPrice {
                        input_per_1k: *input,
                        output_per_1k: *output,
                    },
                )
            })
            .collect();
        Self { prices }
    }
}

impl PriceTable {
    /// Create an empty table.
    pub fn empty() -> Self {
        Self {
            prices: BTreeMap::new(),
        }
    }

    /// Add or replace a model's price.
    pub fn set(&mut self, model_id: impl Into<String>, price: TokenPrice) {
        self.prices.insert(model_id.into(), price);
    }

    /// Price for a model.
    pub fn get(&self, model_id: &str) -> Result<TokenPrice> {
        self.prices
            .get(model_id)
            .copied()
            .ok_or_else(|| ScorecardError::UnknownModelPrice(model_id.to_string()))
    }

    /// Known model ids, sorted.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }

    /// Cost of one invocation.
    ///
    /// Per-direction costs are rounded to 8 decimals and the totals to 6.
    pub fn calculate(&self, model_id: &str, input_tokens: u64, output_tokens: u64) -> Result<InvocationCost> {
        let price = self.get(model_id)?;
        let input_cost = round_to(input_tokens as f64 / 1000.0 * price.input_per_1k, 8);
        let output_cost = round_to(output_tokens as f64 / 1000.0 * price.output_per_1k, 8);
        let total_cost = round_to(input_cost + output_cost, 6);
        Ok(InvocationCost {
            input_cost,
            output_cost,
            total_cost,
            total_cost_per_1000: round_to(total_cost * 1000.0, 6),
        })
    }
}

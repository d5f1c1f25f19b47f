//! Published per-token prices for the Gemini models we know about.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// (input, output) USD per token, or `None` for unknown models.
pub fn model_cost(model: &str) -> Option<(Decimal, Decimal)> {
    let model = model.trim().to_ascii_lowercase();
    let cost = if model.starts_with("gemini-2.5-flash-lite") {
        (dec!(0.0000001), dec!(0.0000004))
    } else if model.starts_with("gemini-2.5-flash") {
        (dec!(0.0000003), dec!(0.0000025))
    } else if model.starts_with("gemini-2.5-pro") {
        (dec!(0.00000125), dec!(0.00001))
    } else if model.starts_with("gemini-2.0-flash") {
        (dec!(0.0000001), dec!(0.0000004))
    } else {
        return None;
    };
    Some(cost)
}

/// Estimated USD cost of one call.
pub fn estimate(per_token: (Decimal, Decimal), input_tokens: u32, output_tokens: u32) -> Decimal {
    per_token.0 * Decimal::from(input_tokens) + per_token.1 * Decimal::from(output_tokens)
}

use tads_models::TradeAction;

/// The line the trader is instructed to end with.
pub const PROPOSAL_MARKER: &str = "FINAL TRANSACTION PROPOSAL";

/// Appended to debate turns that were cut to fit the per-turn budget.
pub const TRUNCATION_MARKER: &str = "[truncated]";

/// Extract the trade action from the trader's free-text reply.
///
/// Handles the common reply shapes:
/// - The instructed marker line: `FINAL TRANSACTION PROPOSAL: **BUY**`
/// - Marker without emphasis: `FINAL TRANSACTION PROPOSAL: hold.`
/// - No marker at all: falls back to the last standalone buy/sell/hold
///   keyword anywhere in the reply.
pub fn extract_action(text: &str) -> Option<TradeAction> {
    if let Some(pos) = text.rfind(PROPOSAL_MARKER) {
        let after = &text[pos + PROPOSAL_MARKER.len()..];
        if let Some(action) = after.split_whitespace().find_map(action_keyword) {
            return Some(action);
        }
    }

    text.split_whitespace().filter_map(action_keyword).last()
}

fn action_keyword(token: &str) -> Option<TradeAction> {
    let cleaned = token.trim_matches(|c: char| !c.is_ascii_alphabetic());
    match cleaned.to_ascii_uppercase().as_str() {
        "BUY" => Some(TradeAction::Buy),
        "SELL" => Some(TradeAction::Sell),
        "HOLD" => Some(TradeAction::Hold),
        _ => None,
    }
}

/// Cut `text` to at most `max_chars` characters, appending a visible
/// marker when anything was dropped. Returns the (possibly cut) text and
/// whether truncation happened.
pub fn truncate_with_marker(text: &str, max_chars: usize) -> (String, bool) {
    if text.chars().count() <= max_chars {
        return (text.to_string(), false);
    }
    let cut: String = text.chars().take(max_chars).collect();
    (format!("{cut} {TRUNCATION_MARKER}"), true)
}

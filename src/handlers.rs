pub mod balances;
pub mod expenses;
pub mod health;
pub mod incomes;

use common::DateInput;

/// Query strings only carry text; an all-digit value is a millisecond timestamp.
pub(crate) fn query_date(raw: &str) -> DateInput {
    let raw = raw.trim();
    match raw.parse::<i64>() {
        Ok(millis) if raw.chars().all(|c| c.is_ascii_digit()) => DateInput::Millis(millis),
        _ => DateInput::Text(raw.to_string()),
    }
}

pub mod token;

/// Converts a top-up amount to yuan; other currencies are divided by the configured rate.
pub fn amount_in_cny(amount: f64, currency: &str, cny_to_rub_rate: f64) -> f64 {
    if currency.eq_ignore_ascii_case("CNY") {
        return amount;
    }
    (amount / cny_to_rub_rate * 100.0).round() / 100.0
}

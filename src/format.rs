use rust_decimal::{Decimal, RoundingStrategy};

const POUND: &str = "£";

fn group_int_digits(int_part: &str) -> String {
    // Insert commas every 3 digits.
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3);
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let remaining = len.saturating_sub(i + 1);
        if remaining > 0 && remaining % 3 == 0 {
            out.push(',');
        }
    }
    out
}

/// Format a pound value for display: two decimal places (half away from
/// zero), thousands separators, sign before the symbol.
pub fn format_gbp(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let mut abs = rounded.abs();
    abs.rescale(2);
    let s = abs.to_string();
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(POUND);
    out.push_str(&group_int_digits(int_part));
    out.push('.');
    out.push_str(frac_part);
    out
}

/// Format a signed amount in pence as spend: outgoing (negative) amounts
/// display as positive pounds.
pub fn format_pounds(minor_units: i64) -> String {
    format_gbp(Decimal::new(-minor_units, 2))
}

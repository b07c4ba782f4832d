use thiserror::Error;

/// Money is represented as whole yen. There is no fractional unit.
pub type Yen = i64;

/// Accumulator for sums of many `Yen` values. Wide enough that summing any
/// realistic number of `i64` amounts cannot overflow.
pub type Total = i128;

/// Format an amount as a yen string with digit grouping.
/// Example: 1234567 -> "¥1,234,567", -500 -> "-¥500"
pub fn format_yen(amount: impl Into<Total>) -> String {
    let amount: Total = amount.into();
    let sign = if amount < 0 { "-" } else { "" };
    let digits = amount.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}¥{}", sign, grouped)
}

/// Parse free-text input into whole yen.
/// Accepts an optional sign, an optional leading yen sign and `,` separators.
/// Example: "50000" -> 50000, "¥1,200" -> 1200, "-300" -> -300
pub fn parse_yen(input: &str) -> Result<Yen, ParseYenError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseYenError::Empty);
    }

    let (negative, rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };
    let rest = rest
        .strip_prefix('¥')
        .or_else(|| rest.strip_prefix('￥'))
        .unwrap_or(rest);

    let digits: String = rest.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseYenError::InvalidFormat(input.to_string()));
    }

    // Parse with the sign attached so that i64::MIN is representable
    let signed = if negative {
        format!("-{}", digits)
    } else {
        digits
    };
    signed
        .parse::<Yen>()
        .map_err(|_| ParseYenError::OutOfRange(input.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseYenError {
    #[error("amount is empty")]
    Empty,

    #[error("not a whole yen amount: '{0}'")]
    InvalidFormat(String),

    #[error("amount out of range: '{0}'")]
    OutOfRange(String),
}

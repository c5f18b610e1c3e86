//! Text formatting helpers for report output

/// Format a number with comma thousands separators
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

/// Format minutes as `45m`, `2h` or `2h5m`. Negative values show as `0m`.
pub fn format_minutes(minutes: f64) -> String {
    let total = minutes.max(0.0) as u64;
    if total < 60 {
        return format!("{}m", total);
    }

    let (hours, mins) = (total / 60, total % 60);
    if mins == 0 {
        format!("{}h", hours)
    } else {
        format!("{}h{}m", hours, mins)
    }
}

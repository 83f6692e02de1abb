//! Display helpers for amounts and countdowns.

/// Default thousands separator.
pub const DEFAULT_SEPARATOR: &str = ",";

/// Group the digits of `n` by thousands: `100000` → `"100,000"`.
///
/// `sep` replaces the default `,` separator.
pub fn beautify_number(n: i64, sep: Option<&str>) -> String {
    let sep = sep.unwrap_or(DEFAULT_SEPARATOR);
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * sep.len() + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(sep);
        }
        out.push(c);
    }
    out
}

/// Zero-pad every `:`-separated component of a clock string
/// (`"1:2:33"` → `"01:02:33"`). Eight-character input is returned as is.
pub fn format_time(t: &str) -> String {
    if t.len() == 8 {
        return t.to_string();
    }
    t.split(':')
        .map(|part| if part.len() == 1 { format!("0{part}") } else { part.to_string() })
        .collect::<Vec<_>>()
        .join(":")
}

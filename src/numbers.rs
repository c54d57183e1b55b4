//! Rendering of numeric operands.
//!
//! Content stream operands are printed the way a C `printf` would print them: `%f` for
//! coordinates and colour components, `%g` for the few values that are written in
//! their shortest form (font size, leading, the text origin and the media box). Keeping
//! both renderings in one place is what makes the output byte-stable.

/// Renders a value with six decimals, like `%f`.
pub fn fixed(value: f64) -> String {
    format!("{:.6}", value)
}

/// Renders a value with six significant digits and no trailing zeros, like `%g`.
pub fn general(value: f64) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0".into() } else { "0".into() };
    }
    if !value.is_finite() {
        return format!("{}", value);
    }

    // Rounding to six significant digits first gives the exponent `%g` decides on
    let scientific = format!("{:.5e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some(parts) => parts,
        None => return scientific,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if !(-4..6).contains(&exponent) {
        let mantissa = strip_trailing_zeros(mantissa.to_string());
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (5 - exponent) as usize;
        strip_trailing_zeros(format!("{:.*}", decimals, value))
    }
}

fn strip_trailing_zeros(rendered: String) -> String {
    if !rendered.contains('.') {
        return rendered;
    }
    rendered
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

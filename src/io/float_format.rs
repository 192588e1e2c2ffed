//! printf-style formatting for floating point table values (`%.13f`, `%12.6e`, `%g`, ...).

use super::error::Error;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Fixed,
    Exponent { upper: bool },
    General { upper: bool },
}

/// Parsed `%[flags][width][.precision]conversion` specifier for `f`, `e`, `E`, `g` and `G`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatFormat {
    conversion: Conversion,
    precision: usize,
    width: usize,
    left_align: bool,
    force_sign: bool,
    space_sign: bool,
    zero_pad: bool,
}

impl FloatFormat {
    /// `%.{precision}f`
    pub const fn fixed(precision: usize) -> Self {
        Self::plain(Conversion::Fixed, precision)
    }

    /// `%.{precision}e`
    pub const fn scientific(precision: usize) -> Self {
        Self::plain(Conversion::Exponent { upper: false }, precision)
    }

    const fn plain(conversion: Conversion, precision: usize) -> Self {
        Self {
            conversion,
            precision,
            width: 0,
            left_align: false,
            force_sign: false,
            space_sign: false,
            zero_pad: false,
        }
    }

    pub fn format(&self, value: f64) -> String {
        let body = if value.is_nan() {
            "nan".to_string()
        } else if value.is_infinite() {
            "inf".to_string()
        } else {
            match self.conversion {
                Conversion::Fixed => format!("{:.*}", self.precision, value.abs()),
                Conversion::Exponent { upper } => exponent_notation(value.abs(), self.precision, upper),
                Conversion::General { upper } => general_notation(value.abs(), self.precision, upper),
            }
        };
        let body = match self.conversion {
            Conversion::Exponent { upper: true } | Conversion::General { upper: true } => {
                body.to_uppercase()
            }
            _ => body,
        };

        let sign = if value.is_sign_negative() && !value.is_nan() {
            "-"
        } else if self.force_sign {
            "+"
        } else if self.space_sign {
            " "
        } else {
            ""
        };

        let len = sign.len() + body.len();
        if len >= self.width {
            return format!("{sign}{body}");
        }
        let fill = self.width - len;
        if self.left_align {
            format!("{sign}{body}{}", " ".repeat(fill))
        } else if self.zero_pad && value.is_finite() {
            format!("{sign}{}{body}", "0".repeat(fill))
        } else {
            format!("{}{sign}{body}", " ".repeat(fill))
        }
    }
}

/// `d.ddde±XX` with at least two exponent digits.
fn exponent_notation(value: f64, precision: usize, upper: bool) -> String {
    let rendered = format!("{:.*e}", precision, value);
    let (mantissa, exponent) = rendered
        .split_once('e')
        .unwrap_or((rendered.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let marker = if upper { 'E' } else { 'e' };
    format!("{mantissa}{marker}{sign}{:02}", exponent.abs())
}

fn general_notation(value: f64, precision: usize, upper: bool) -> String {
    let significant = precision.max(1);
    if value == 0.0 {
        return "0".to_string();
    }

    let probe = format!("{:.*e}", significant - 1, value);
    let exponent: i64 = probe
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);

    if exponent < -4 || exponent >= significant as i64 {
        let rendered = exponent_notation(value, significant - 1, upper);
        let marker = if upper { 'E' } else { 'e' };
        match rendered.split_once(marker) {
            Some((mantissa, tail)) => format!("{}{marker}{tail}", trim_fraction(mantissa)),
            None => rendered,
        }
    } else {
        let decimals = (significant as i64 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

impl Default for FloatFormat {
    /// `%.13f`
    fn default() -> Self {
        Self::fixed(13)
    }
}

impl FromStr for FloatFormat {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::invalid_float_format(text, reason);

        let rest = text
            .strip_prefix('%')
            .ok_or_else(|| invalid("must start with '%'"))?;

        let mut format = Self::fixed(6);
        let mut chars = rest.chars().peekable();

        while let Some(&c) = chars.peek() {
            match c {
                '-' => format.left_align = true,
                '+' => format.force_sign = true,
                ' ' => format.space_sign = true,
                '0' => format.zero_pad = true,
                _ => break,
            }
            chars.next();
        }

        let mut width = String::new();
        while let Some(&c) = chars.peek().filter(|c| c.is_ascii_digit()) {
            width.push(c);
            chars.next();
        }
        if !width.is_empty() {
            format.width = width.parse().map_err(|_| invalid("width is too large"))?;
        }

        if chars.peek() == Some(&'.') {
            chars.next();
            let mut precision = String::new();
            while let Some(&c) = chars.peek().filter(|c| c.is_ascii_digit()) {
                precision.push(c);
                chars.next();
            }
            format.precision = if precision.is_empty() {
                0
            } else {
                precision
                    .parse()
                    .map_err(|_| invalid("precision is too large"))?
            };
        }

        format.conversion = match chars.next() {
            Some('f') | Some('F') => Conversion::Fixed,
            Some('e') => Conversion::Exponent { upper: false },
            Some('E') => Conversion::Exponent { upper: true },
            Some('g') => Conversion::General { upper: false },
            Some('G') => Conversion::General { upper: true },
            Some(other) => return Err(invalid(&format!("unsupported conversion '{other}'"))),
            None => return Err(invalid("missing conversion character")),
        };

        if chars.next().is_some() {
            return Err(invalid("unexpected characters after the conversion"));
        }

        Ok(format)
    }
}

impl fmt::Display for FloatFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("%")?;
        for (set, flag) in [
            (self.left_align, '-'),
            (self.force_sign, '+'),
            (self.space_sign, ' '),
            (self.zero_pad, '0'),
        ] {
            if set {
                write!(f, "{flag}")?;
            }
        }
        if self.width > 0 {
            write!(f, "{}", self.width)?;
        }
        let conversion = match self.conversion {
            Conversion::Fixed => 'f',
            Conversion::Exponent { upper: false } => 'e',
            Conversion::Exponent { upper: true } => 'E',
            Conversion::General { upper: false } => 'g',
            Conversion::General { upper: true } => 'G',
        };
        write!(f, ".{}{conversion}", self.precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(pattern: &str, value: f64) -> String {
        pattern.parse::<FloatFormat>().unwrap().format(value)
    }

    #[test]
    fn fixed_matches_printf() {
        assert_eq!(fmt("%.13f", 10.0), "10.0000000000000");
        assert_eq!(fmt("%.3f", -1.23456), "-1.235");
        assert_eq!(fmt("%.0f", 2.4), "2");
        assert_eq!(fmt("%f", 0.5), "0.500000");
    }

    #[test]
    fn exponent_uses_signed_two_digit_exponent() {
        assert_eq!(fmt("%.13e", 10.0), "1.0000000000000e+01");
        assert_eq!(fmt("%.2e", 0.000123), "1.23e-04");
        assert_eq!(fmt("%.3E", -4.5e120), "-4.500E+120");
        assert_eq!(fmt("%.1e", 0.0), "0.0e+00");
    }

    #[test]
    fn general_switches_notation_and_trims_zeros() {
        assert_eq!(fmt("%g", 100000.0), "100000");
        assert_eq!(fmt("%g", 1000000.0), "1e+06");
        assert_eq!(fmt("%g", 0.0001), "0.0001");
        assert_eq!(fmt("%g", 0.00001), "1e-05");
        assert_eq!(fmt("%.3g", 3.14159), "3.14");
        assert_eq!(fmt("%G", 2.5e-7), "2.5E-07");
        assert_eq!(fmt("%g", 0.0), "0");
    }

    #[test]
    fn width_and_flags_pad_output() {
        assert_eq!(fmt("%8.2f", 3.14159), "    3.14");
        assert_eq!(fmt("%-8.2f", 3.14159), "3.14    ");
        assert_eq!(fmt("%08.2f", -3.14159), "-0003.14");
        assert_eq!(fmt("%+.1f", 2.0), "+2.0");
        assert_eq!(fmt("% .1f", 2.0), " 2.0");
    }

    #[test]
    fn non_finite_values_are_spelled_out() {
        assert_eq!(fmt("%.3f", f64::NAN), "nan");
        assert_eq!(fmt("%.3f", f64::NEG_INFINITY), "-inf");
        assert_eq!(fmt("%.3E", f64::INFINITY), "INF");
    }

    #[test]
    fn rejects_invalid_specifiers() {
        for pattern in ["", ".3f", "%", "%.3d", "%.3fx", "%s", "{:.3}"] {
            let err = pattern.parse::<FloatFormat>().unwrap_err();
            assert!(matches!(err, Error::InvalidFloatFormat { .. }), "{pattern}");
        }
    }

    #[test]
    fn display_round_trips_through_parse() {
        for pattern in ["%.13f", "%-12.4e", "%+08.3G"] {
            let format: FloatFormat = pattern.parse().unwrap();
            assert_eq!(format.to_string(), pattern);
            assert_eq!(format.to_string().parse::<FloatFormat>().unwrap(), format);
        }
        assert_eq!(FloatFormat::default().to_string(), "%.13f");
    }
}

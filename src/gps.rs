//! GPS coordinate normalization.
//!
//! EXIF writers encode coordinates in several shapes: a plain decimal, a
//! fraction string like `"40/1"`, a rational numerator/denominator pair, or a
//! degree/minute/second triple whose components are themselves any of the
//! above. Everything funnels through [`normalize`] into signed decimal
//! degrees, with `None` as the "unavailable" sentinel; malformed input never
//! raises.

use exif::Value;

/// A coordinate value as found in the wild, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateValue {
    Decimal(f64),
    Fraction { num: f64, den: f64 },
    Text(String),
    /// Degree/minute/second components (or fewer; missing entries count as 0).
    Components(Vec<CoordinateValue>),
}

impl CoordinateValue {
    /// Collapse to decimal degrees. Zero denominators and non-finite results
    /// yield `None` rather than infinity or a fault.
    pub fn to_decimal(&self) -> Option<f64> {
        let value = match self {
            CoordinateValue::Decimal(v) => *v,
            CoordinateValue::Fraction { num, den } => {
                if *den == 0.0 {
                    return None;
                }
                num / den
            }
            CoordinateValue::Text(s) => parse_numeric_text(s)?,
            CoordinateValue::Components(parts) => {
                let mut resolved = [0.0f64; 3];
                for (i, part) in parts.iter().take(3).enumerate() {
                    resolved[i] = part.to_decimal()?;
                }
                resolved[0] + resolved[1] / 60.0 + resolved[2] / 3600.0
            }
        };
        value.is_finite().then_some(value)
    }
}

/// Parses `"12.5"` or `"459/10"`; empty and malformed strings are unavailable.
fn parse_numeric_text(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den == 0.0 {
            return None;
        }
        return Some(num / den);
    }
    s.parse().ok()
}

/// True when the hemisphere reference points south or west.
fn is_negative_hemisphere(reference: &str) -> bool {
    matches!(
        reference.trim().chars().next().map(|c| c.to_ascii_uppercase()),
        Some('S') | Some('W')
    )
}

/// Normalize a coordinate against its hemisphere reference. The sign of the
/// result encodes the hemisphere; the raw reference string is not needed
/// afterwards.
pub fn normalize(value: &CoordinateValue, reference: Option<&str>) -> Option<f64> {
    let degrees = value.to_decimal()?;
    match reference {
        Some(r) if is_negative_hemisphere(r) => Some(-degrees.abs()),
        _ => Some(degrees),
    }
}

/// Lift a kamadak-exif field value into a [`CoordinateValue`].
pub fn coordinate_from_exif(value: &Value) -> Option<CoordinateValue> {
    match value {
        Value::Rational(parts) if !parts.is_empty() => {
            if parts.len() == 1 {
                Some(CoordinateValue::Fraction {
                    num: parts[0].num as f64,
                    den: parts[0].denom as f64,
                })
            } else {
                Some(CoordinateValue::Components(
                    parts
                        .iter()
                        .map(|r| CoordinateValue::Fraction {
                            num: r.num as f64,
                            den: r.denom as f64,
                        })
                        .collect(),
                ))
            }
        }
        Value::SRational(parts) if !parts.is_empty() => Some(CoordinateValue::Components(
            parts
                .iter()
                .map(|r| CoordinateValue::Fraction {
                    num: r.num as f64,
                    den: r.denom as f64,
                })
                .collect(),
        )),
        Value::Float(parts) if !parts.is_empty() => {
            Some(CoordinateValue::Decimal(parts[0] as f64))
        }
        Value::Double(parts) if !parts.is_empty() => Some(CoordinateValue::Decimal(parts[0])),
        Value::Ascii(lines) if !lines.is_empty() => Some(CoordinateValue::Text(
            String::from_utf8_lossy(&lines[0]).into_owned(),
        )),
        _ => None,
    }
}

/// `40.446111° N, 79.982222° W` to six decimal places.
pub fn format_lat_lng(lat: f64, lng: f64) -> String {
    let hemi_lat = if lat >= 0.0 { 'N' } else { 'S' };
    let hemi_lng = if lng >= 0.0 { 'E' } else { 'W' };
    format!(
        "{:.6}\u{b0} {}, {:.6}\u{b0} {}",
        lat.abs(),
        hemi_lat,
        lng.abs(),
        hemi_lng
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dms(d: f64, m: f64, s: f64) -> CoordinateValue {
        CoordinateValue::Components(vec![
            CoordinateValue::Decimal(d),
            CoordinateValue::Decimal(m),
            CoordinateValue::Decimal(s),
        ])
    }

    #[test]
    fn triple_evaluates_dms_arithmetic() {
        let v = dms(40.0, 26.0, 46.0);
        let got = v.to_decimal().unwrap();
        let want = 40.0 + 26.0 / 60.0 + 46.0 / 3600.0;
        assert!((got - want).abs() < 1e-12);
    }

    #[test]
    fn south_and_west_negate_magnitude() {
        let lat = normalize(&dms(40.0, 26.0, 46.0), Some("S")).unwrap();
        assert!(lat < 0.0);
        let lng = normalize(&dms(79.0, 58.0, 56.0), Some("W")).unwrap();
        assert!(lng < 0.0);
        // Lowercase and longhand references behave the same.
        assert!(normalize(&CoordinateValue::Decimal(1.5), Some("south")).unwrap() < 0.0);
        assert!(normalize(&CoordinateValue::Decimal(1.5), Some("w")).unwrap() < 0.0);
    }

    #[test]
    fn north_and_east_keep_sign() {
        assert_eq!(normalize(&CoordinateValue::Decimal(40.5), Some("N")), Some(40.5));
        assert_eq!(normalize(&CoordinateValue::Decimal(79.9), Some("E")), Some(79.9));
        assert_eq!(normalize(&CoordinateValue::Decimal(40.5), None), Some(40.5));
    }

    #[test]
    fn fraction_string_parses() {
        let v = CoordinateValue::Text("459/10".into());
        assert_eq!(v.to_decimal(), Some(45.9));
        let v = CoordinateValue::Text(" 12.25 ".into());
        assert_eq!(v.to_decimal(), Some(12.25));
    }

    #[test]
    fn zero_denominator_is_unavailable_not_infinite() {
        let v = CoordinateValue::Fraction { num: 40.0, den: 0.0 };
        assert_eq!(v.to_decimal(), None);
        let v = CoordinateValue::Text("40/0".into());
        assert_eq!(v.to_decimal(), None);
        // A zero denominator buried in a triple poisons the whole triple.
        let v = CoordinateValue::Components(vec![
            CoordinateValue::Decimal(40.0),
            CoordinateValue::Fraction { num: 26.0, den: 0.0 },
        ]);
        assert_eq!(v.to_decimal(), None);
    }

    #[test]
    fn malformed_text_is_unavailable() {
        assert_eq!(CoordinateValue::Text("".into()).to_decimal(), None);
        assert_eq!(CoordinateValue::Text("n/a".into()).to_decimal(), None);
        assert_eq!(CoordinateValue::Text("1/2/3".into()).to_decimal(), None);
    }

    #[test]
    fn non_finite_is_unavailable() {
        assert_eq!(CoordinateValue::Decimal(f64::NAN).to_decimal(), None);
        assert_eq!(CoordinateValue::Decimal(f64::INFINITY).to_decimal(), None);
    }

    #[test]
    fn partial_triple_defaults_missing_components_to_zero() {
        let v = CoordinateValue::Components(vec![
            CoordinateValue::Decimal(40.0),
            CoordinateValue::Decimal(30.0),
        ]);
        assert_eq!(v.to_decimal(), Some(40.5));
    }

    #[test]
    fn exif_rational_triple_lifts_to_components() {
        let value = Value::Rational(vec![
            exif::Rational { num: 40, denom: 1 },
            exif::Rational { num: 26, denom: 1 },
            exif::Rational { num: 46, denom: 1 },
        ]);
        let coord = coordinate_from_exif(&value).unwrap();
        let got = normalize(&coord, Some("N")).unwrap();
        assert!((got - 40.446111).abs() < 1e-6);
    }

    #[test]
    fn formats_reference_coordinate_to_six_places() {
        let lat = normalize(&dms(40.0, 26.0, 46.0), Some("N")).unwrap();
        let lng = normalize(&dms(79.0, 58.0, 56.0), Some("W")).unwrap();
        assert_eq!(
            format_lat_lng(lat, lng),
            "40.446111\u{b0} N, 79.982222\u{b0} W"
        );
    }
}

use thiserror::Error;

use crate::constants::CM_PER_INCH;
use crate::models::{Plate, Unit};

/// Problems with a value typed into a dimension or position field.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum InputError {
    #[error("enter a value")]
    Empty,
    #[error("invalid number")]
    InvalidNumber,
    #[error("must be {min}–{max} cm")]
    OutOfRange { min: f64, max: f64 },
    #[error("keep at least 3 cm from the edge")]
    BelowEdgeMinimum,
    #[error("too close to the opposite edge")]
    TooCloseToFarEdge,
    #[error("unknown plate")]
    UnknownPlate,
    #[error("{0}")]
    Placement(#[from] crate::placement::Rejection),
    #[error(transparent)]
    Socket(#[from] crate::store::SocketError),
}

pub fn to_inches(cm: f64) -> f64 {
    cm / CM_PER_INCH
}

pub fn to_cm(inches: f64) -> f64 {
    inches * CM_PER_INCH
}

impl Unit {
    /// Centimeters to this display unit.
    pub fn from_cm(self, cm: f64) -> f64 {
        match self {
            Unit::Cm => cm,
            Unit::In => to_inches(cm),
        }
    }

    /// This display unit to centimeters.
    pub fn to_cm(self, value: f64) -> f64 {
        match self {
            Unit::Cm => value,
            Unit::In => to_cm(value),
        }
    }

    /// Readout used next to drag guides: one decimal for cm, two for inches.
    pub fn label(self, cm: f64) -> String {
        match self {
            Unit::Cm => format!("{cm:.1} cm"),
            Unit::In => format!("{:.2} in", to_inches(cm)),
        }
    }

    pub fn plate_label(self, plate: &Plate) -> String {
        match self {
            Unit::Cm => format!("{:.1} × {:.1} cm", plate.width, plate.height),
            Unit::In => format!(
                "{:.2} × {:.2} in",
                to_inches(plate.width),
                to_inches(plate.height)
            ),
        }
    }

    /// Value shown in an input field, trimmed of trailing zeros.
    pub fn field_text(self, cm: f64) -> String {
        let v = self.from_cm(cm);
        let s = format!("{v:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Whole euros as shown next to a group: `1.240,00 €`.
pub fn format_eur(amount: u32) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("{grouped},00\u{a0}€")
}

/// Parse a user-typed number. Whitespace is ignored and a comma is accepted
/// as the decimal separator. Trailing garbage after a
/// numeric prefix is dropped.
pub fn parse_number(raw: &str) -> Result<f64, InputError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Err(InputError::Empty);
    }
    let prefix_len = numeric_prefix_len(&cleaned);
    cleaned[..prefix_len]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(InputError::InvalidNumber)
}

fn numeric_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        i += 1;
    }
    let mut seen_dot = false;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => {}
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        i += 1;
    }
    i
}

/// Parse a value typed in `unit` and return it in centimeters.
pub fn parse_in_unit(raw: &str, unit: Unit) -> Result<f64, InputError> {
    parse_number(raw).map(|v| unit.to_cm(v))
}

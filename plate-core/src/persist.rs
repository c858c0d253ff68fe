//! Stored JSON shapes and the lenient loaders that sanitise them.
//!
//! Saved state may come from older builds or be hand edited, so loading
//! never fails: anything unreadable falls back to defaults field by field.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{EDGE_MIN_CM, SOCKET_HALF_CM};
use crate::models::{Direction, Plate, SocketGroup, Unit, clamp_count, new_group_id};
use crate::store::{PlatesState, SocketsState, UnitState};

pub const PLATES_KEY: &str = "pg:plates/v1";
pub const SOCKETS_KEY: &str = "pg:sockets/v1";
pub const UNITS_KEY: &str = "pg:units/v1";

/// Socket state as written to storage; the error slot is left out.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSockets {
    pub enabled: bool,
    pub groups: Vec<SocketGroup>,
}

impl From<&SocketsState> for PersistedSockets {
    fn from(s: &SocketsState) -> Self {
        PersistedSockets {
            enabled: s.enabled,
            groups: s.groups.clone(),
        }
    }
}

impl From<PersistedSockets> for SocketsState {
    fn from(p: PersistedSockets) -> Self {
        SocketsState {
            enabled: p.enabled,
            groups: p.groups,
            error: None,
        }
    }
}

/// Everything needed to redraw a configuration off screen.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub plates: PlatesState,
    pub sockets: PersistedSockets,
    #[serde(default)]
    pub unit: Unit,
}

impl ProjectFile {
    /// Parse a project document, sanitising each section.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let v: Value = serde_json::from_str(text)?;
        Ok(ProjectFile {
            plates: plates_from_value(v.get("plates")),
            sockets: sockets_from_value(v.get("sockets")),
            unit: unit_from_value(v.get("unit")),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Number or numeric string; anything else is `None`. Zero counts as
/// missing so an unset position falls back to the default anchor.
fn loose_number(v: Option<&Value>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(true) => 1.0,
        _ => return None,
    };
    (n.is_finite() && n != 0.0).then_some(n)
}

fn parse_or_warn(key: &str, text: Option<&str>) -> Option<Value> {
    let text = text?;
    match serde_json::from_str(text) {
        Ok(v) => Some(v),
        Err(err) => {
            warn!("ignoring unreadable {key}: {err}");
            None
        }
    }
}

/// Load plates from stored text. Accepts the `{plates: [...]}` envelope or a
/// bare array.
pub fn load_plates(text: Option<&str>) -> PlatesState {
    plates_from_value(parse_or_warn(PLATES_KEY, text).as_ref())
}

fn plates_from_value(v: Option<&Value>) -> PlatesState {
    let list = match v {
        Some(Value::Array(a)) => Some(a),
        Some(obj) => obj.get("plates").and_then(Value::as_array),
        None => None,
    };
    let plates = list
        .map(|a| {
            a.iter()
                .map(|p| {
                    let d = Plate::default();
                    Plate::new(
                        loose_number(p.get("width")).unwrap_or(d.width),
                        loose_number(p.get("height")).unwrap_or(d.height),
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    PlatesState { plates }.sanitized()
}

pub fn load_sockets(text: Option<&str>) -> SocketsState {
    sockets_from_value(parse_or_warn(SOCKETS_KEY, text).as_ref()).into()
}

fn sockets_from_value(v: Option<&Value>) -> PersistedSockets {
    let Some(v) = v else {
        return PersistedSockets::default();
    };
    let enabled = match v.get("enabled") {
        Some(Value::Bool(b)) => *b,
        other => loose_number(other).is_some(),
    };
    let groups = v
        .get("groups")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(sanitize_group).collect())
        .unwrap_or_default();
    PersistedSockets { enabled, groups }
}

/// A missing `plateIndex` means plate 0. A present one that is negative or
/// fractional cannot name a plate, so the group is dropped.
fn sanitize_group(g: &Value) -> Option<SocketGroup> {
    let plate_index = match g.get("plateIndex").and_then(Value::as_f64) {
        None => 0,
        Some(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => v as usize,
        Some(v) => {
            warn!("dropping socket group with plateIndex {v}");
            return None;
        }
    };
    let id = match g.get("id") {
        Some(Value::String(s)) => s.clone(),
        _ => new_group_id(),
    };
    let count = loose_number(g.get("count"))
        .map(|c| clamp_count(c.clamp(0.0, u8::MAX as f64) as u8))
        .unwrap_or(3);
    let dir = match g.get("dir").and_then(Value::as_str) {
        Some("v") => Direction::Vertical,
        _ => Direction::Horizontal,
    };
    Some(SocketGroup {
        id,
        plate_index,
        count,
        dir,
        x: loose_number(g.get("x")).unwrap_or(EDGE_MIN_CM + SOCKET_HALF_CM),
        y: loose_number(g.get("y")).unwrap_or(EDGE_MIN_CM),
    })
}

pub fn load_unit(text: Option<&str>) -> UnitState {
    UnitState {
        unit: unit_from_value(parse_or_warn(UNITS_KEY, text).as_ref()),
    }
}

fn unit_from_value(v: Option<&Value>) -> Unit {
    let s = match v {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(obj) => obj.get("unit").and_then(Value::as_str),
        None => None,
    };
    s.and_then(Unit::parse).unwrap_or_default()
}

pub fn save_plates(s: &PlatesState) -> Result<String, serde_json::Error> {
    serde_json::to_string(s)
}

pub fn save_sockets(s: &SocketsState) -> Result<String, serde_json::Error> {
    serde_json::to_string(&PersistedSockets::from(s))
}

pub fn save_unit(s: &UnitState) -> Result<String, serde_json::Error> {
    serde_json::to_string(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_broken_plates_fall_back_to_default() {
        assert_eq!(load_plates(None).plates, vec![Plate::default()]);
        assert_eq!(load_plates(Some("{not json")).plates, vec![Plate::default()]);
        assert_eq!(load_plates(Some(r#"{"plates":[]}"#)).plates, vec![Plate::default()]);
    }

    #[test]
    fn plates_are_clamped_and_coerced() {
        let s = load_plates(Some(
            r#"{"plates":[{"width":"50","height":500},{"width":0,"height":"x"},{"width":5}]}"#,
        ));
        assert_eq!(
            s.plates,
            vec![
                Plate::new(50.0, 128.0),
                Plate::new(120.0, 60.0),
                Plate::new(20.0, 60.0),
            ]
        );
    }

    #[test]
    fn groups_are_sanitised_field_by_field() {
        let s = load_sockets(Some(
            r#"{"enabled":true,"groups":[
                {"id":"a","plateIndex":1,"count":9,"dir":"v","x":20,"y":10},
                {"count":"2","dir":"diagonal"}
            ]}"#,
        ));
        assert!(s.enabled);
        assert_eq!(s.error, None);
        let a = &s.groups[0];
        assert_eq!((a.id.as_str(), a.plate_index, a.count, a.dir), ("a", 1, 5, Direction::Vertical));
        let b = &s.groups[1];
        assert!(!b.id.is_empty());
        assert_eq!((b.plate_index, b.count, b.dir), (0, 2, Direction::Horizontal));
        assert_eq!((b.x, b.y), (6.5, 3.0));
    }

    #[test]
    fn groups_with_unusable_plate_index_are_dropped() {
        let s = load_sockets(Some(
            r#"{"enabled":true,"groups":[
                {"id":"neg","plateIndex":-1},
                {"id":"half","plateIndex":1.5},
                {"id":"ok","plateIndex":2}
            ]}"#,
        ));
        let ids: Vec<&str> = s.groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["ok"]);
        assert_eq!(s.groups[0].plate_index, 2);
    }

    #[test]
    fn unit_defaults_to_centimeters() {
        assert_eq!(load_unit(Some(r#"{"unit":"in"}"#)).unit, Unit::In);
        assert_eq!(load_unit(Some(r#"{"unit":"ft"}"#)).unit, Unit::Cm);
        assert_eq!(load_unit(None).unit, Unit::Cm);
    }

    #[test]
    fn saved_sockets_omit_the_error_slot() {
        let s = SocketsState {
            enabled: true,
            groups: vec![],
            error: Some("x".into()),
        };
        let json = save_sockets(&s).unwrap();
        assert_eq!(json, r#"{"enabled":true,"groups":[]}"#);
        assert_eq!(load_sockets(Some(&json)), SocketsState { error: None, ..s });
    }

    #[test]
    fn project_file_round_trips_through_sanitiser() {
        let text = r#"{
            "plates": {"plates": [{"width": 100, "height": 100}]},
            "sockets": {"enabled": true, "groups": [{"id": "g", "plateIndex": 0, "count": 3, "dir": "h", "x": 10, "y": 3}]},
            "unit": "in"
        }"#;
        let p = ProjectFile::from_json(text).unwrap();
        assert_eq!(p.plates.plates, vec![Plate::new(100.0, 100.0)]);
        assert_eq!(p.sockets.groups.len(), 1);
        assert_eq!(p.unit, Unit::In);
        let again = ProjectFile::from_json(&p.to_json().unwrap()).unwrap();
        assert_eq!(again, p);
        assert!(ProjectFile::from_json("nope").is_err());
    }
}

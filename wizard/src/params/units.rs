//! Capacity unit helpers
//!
//! Values such as `"30MB"` or `"8G"` are handled at string level: these
//! helpers find, strip and replace the unit token and never convert
//! magnitudes between units.

use serde::{Deserialize, Serialize};

/// Single-letter unit aliases
const ALIAS_UNITS: &[&str] = &["g", "G", "m", "M", "k", "K"];

/// Two-letter units
const FULL_UNITS: &[&str] = &["gb", "GB", "mb", "MB", "kb", "KB"];

/// Capacity unit offered when editing a capacity value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapacityUnit {
    KB,
    MB,
    GB,
}

impl CapacityUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapacityUnit::KB => "KB",
            CapacityUnit::MB => "MB",
            CapacityUnit::GB => "GB",
        }
    }
}

impl std::fmt::Display for CapacityUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_magnitude(s: &str) -> bool {
    let mut digits = 0;
    let mut dots = 0;
    for c in s.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

/// Split a value into its magnitude and recognized unit
fn split_unit(value: &str) -> Option<(&str, &str)> {
    FULL_UNITS
        .iter()
        .chain(ALIAS_UNITS.iter())
        .find_map(|unit| {
            value
                .strip_suffix(unit)
                .filter(|magnitude| is_magnitude(magnitude))
                .map(|magnitude| (magnitude, *unit))
        })
}

/// Whether the value is a magnitude followed by a recognized unit
pub fn is_take_unit(value: &str) -> bool {
    split_unit(value).is_some()
}

/// The trailing unit of a value (`"G"` for `"8G"`, `"MB"` for `"30MB"`)
pub fn get_unit(value: &str) -> Option<&str> {
    split_unit(value).map(|(_, unit)| unit)
}

/// The value without its unit; unchanged when no unit is recognized
pub fn get_no_unit_value(value: Option<&str>) -> String {
    match value {
        None | Some("") => String::new(),
        Some(v) => match split_unit(v) {
            Some((magnitude, _)) => magnitude.to_string(),
            None => v.to_string(),
        },
    }
}

/// Replace the trailing unit of `target` with `unit`, or append it
pub fn take_new_unit(target: &str, unit: &str) -> String {
    match split_unit(target) {
        Some((magnitude, _)) => format!("{}{}", magnitude, unit),
        None => format!("{}{}", target, unit),
    }
}

/// Unit to preselect for a value, `GB` when nothing matches
pub fn change_unit(value: Option<&str>) -> CapacityUnit {
    let lower = value.unwrap_or("GB").to_lowercase();
    if lower.contains('k') {
        CapacityUnit::KB
    } else if lower.contains('m') {
        CapacityUnit::MB
    } else {
        CapacityUnit::GB
    }
}

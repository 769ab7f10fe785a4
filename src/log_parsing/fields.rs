use chrono::{DateTime, NaiveDateTime, Utc};
use glam::{Vec3, Vec4};
use thiserror::Error;

use crate::world_state::{ActionId, ActionType};

#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("missing field {index}")]
    Missing { index: usize },
    #[error("field {index} is not a valid integer: '{value}'")]
    BadInteger { index: usize, value: String },
    #[error("field {index} is not a valid number: '{value}'")]
    BadFloat { index: usize, value: String },
    #[error("field {index} is not a valid boolean: '{value}'")]
    BadBool { index: usize, value: String },
    #[error("field {index} has unknown {kind} '{value}'")]
    UnknownName {
        index: usize,
        kind: &'static str,
        value: String,
    },
    #[error("field {index} has malformed composite value '{value}'")]
    BadComposite { index: usize, value: String },
    #[error("unparseable timestamp '{0}'")]
    BadTimestamp(String),
}

pub(crate) fn field<'a>(fields: &[&'a str], index: usize) -> Result<&'a str, FieldError> {
    fields
        .get(index)
        .copied()
        .ok_or(FieldError::Missing { index })
}

pub(crate) fn hex_u32(fields: &[&str], index: usize) -> Result<u32, FieldError> {
    let value = field(fields, index)?;
    parse_hex_u32(value).ok_or_else(|| bad_integer(index, value))
}

pub(crate) fn hex_u16(fields: &[&str], index: usize) -> Result<u16, FieldError> {
    let value = field(fields, index)?;
    u16::from_str_radix(strip_hex_prefix(value), 16).map_err(|_| bad_integer(index, value))
}

pub(crate) fn hex_u8(fields: &[&str], index: usize) -> Result<u8, FieldError> {
    let value = field(fields, index)?;
    u8::from_str_radix(strip_hex_prefix(value), 16).map_err(|_| bad_integer(index, value))
}

pub(crate) fn hex_u64(fields: &[&str], index: usize) -> Result<u64, FieldError> {
    let value = field(fields, index)?;
    u64::from_str_radix(strip_hex_prefix(value), 16).map_err(|_| bad_integer(index, value))
}

pub(crate) fn dec_u32(fields: &[&str], index: usize) -> Result<u32, FieldError> {
    let value = field(fields, index)?;
    value.trim().parse::<u32>().map_err(|_| bad_integer(index, value))
}

pub(crate) fn dec_u16(fields: &[&str], index: usize) -> Result<u16, FieldError> {
    let value = field(fields, index)?;
    value.trim().parse::<u16>().map_err(|_| bad_integer(index, value))
}

pub(crate) fn float(fields: &[&str], index: usize) -> Result<f32, FieldError> {
    let value = field(fields, index)?;
    parse_float(value).ok_or_else(|| FieldError::BadFloat {
        index,
        value: value.to_string(),
    })
}

pub(crate) fn boolean(fields: &[&str], index: usize) -> Result<bool, FieldError> {
    let value = field(fields, index)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(FieldError::BadBool {
            index,
            value: value.to_string(),
        }),
    }
}

pub(crate) fn named<T>(
    fields: &[&str],
    index: usize,
    kind: &'static str,
    from_name: impl Fn(&str) -> Option<T>,
) -> Result<T, FieldError> {
    let value = field(fields, index)?;
    from_name(value.trim()).ok_or_else(|| FieldError::UnknownName {
        index,
        kind,
        value: value.to_string(),
    })
}

pub(crate) fn actor_id(fields: &[&str], index: usize) -> Result<u32, FieldError> {
    let value = field(fields, index)?;
    let id_part = value.split('/').next().unwrap_or(value);
    parse_hex_u32(id_part).ok_or_else(|| bad_integer(index, value))
}

pub(crate) fn vec3(fields: &[&str], index: usize) -> Result<Vec3, FieldError> {
    let value = field(fields, index)?;
    let parts = value
        .split('/')
        .map(parse_float)
        .collect::<Option<Vec<f32>>>()
        .ok_or_else(|| bad_composite(index, value))?;

    match parts.as_slice() {
        [x, y, z, ..] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(bad_composite(index, value)),
    }
}

/// `Type id` pair, e.g. `Spell 31000`; a missing id defaults to zero.
pub(crate) fn action(fields: &[&str], index: usize) -> Result<ActionId, FieldError> {
    let value = field(fields, index)?;
    let mut parts = value.split(' ').filter(|part| !part.is_empty());
    let action_type = match parts.next() {
        Some(type_name) => {
            ActionType::from_name(type_name).ok_or_else(|| FieldError::UnknownName {
                index,
                kind: "action type",
                value: value.to_string(),
            })?
        }
        None => ActionType::None,
    };
    let id = match parts.next() {
        Some(id) => id.parse::<u32>().map_err(|_| bad_composite(index, value))?,
        None => 0,
    };
    Ok(ActionId::new(action_type, id))
}

/// Position and rotation stored as four consecutive fields in `x, depth, height, rotation`
/// order; an empty first field means the line carries no position.
pub(crate) fn pos_rot(fields: &[&str], start_index: usize) -> Result<Option<Vec4>, FieldError> {
    if field(fields, start_index)?.trim().is_empty() {
        return Ok(None);
    }

    let x = float(fields, start_index)?;
    let depth = float(fields, start_index + 1)?;
    let height = float(fields, start_index + 2)?;
    let rotation = float(fields, start_index + 3)?;
    Ok(Some(Vec4::new(x, height, depth, rotation)))
}

pub(crate) fn timestamp(fields: &[&str], index: usize) -> Result<DateTime<Utc>, FieldError> {
    let value = field(fields, index)?;
    parse_timestamp(value).ok_or_else(|| FieldError::BadTimestamp(value.to_string()))
}

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(with_offset.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
}

pub(crate) fn degrees_to_radians(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

fn parse_hex_u32(value: &str) -> Option<u32> {
    u32::from_str_radix(strip_hex_prefix(value), 16).ok()
}

fn parse_float(value: &str) -> Option<f32> {
    value.trim().parse::<f32>().ok()
}

fn strip_hex_prefix(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
}

fn bad_integer(index: usize, value: &str) -> FieldError {
    FieldError::BadInteger {
        index,
        value: value.to_string(),
    }
}

fn bad_composite(index: usize, value: &str) -> FieldError {
    FieldError::BadComposite {
        index,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{action, actor_id, parse_timestamp, pos_rot, vec3, FieldError};
    use crate::world_state::{ActionId, ActionType};
    use chrono::{TimeZone, Utc};
    use glam::{Vec3, Vec4};

    #[test]
    fn actor_id_reads_leading_hex_of_composite() {
        let fields = ["ts", "ACT+", "4000A1B2/2C3D/Boss/Enemy/100/0/100/90"];
        assert_eq!(actor_id(&fields, 2), Ok(0x4000_A1B2));
        assert_eq!(actor_id(&["1001"], 0), Ok(0x1001));
    }

    #[test]
    fn vec3_rejects_short_composites() {
        assert_eq!(vec3(&["1/2/3"], 0), Ok(Vec3::new(1.0, 2.0, 3.0)));
        assert!(matches!(
            vec3(&["1/2"], 0),
            Err(FieldError::BadComposite { index: 0, .. })
        ));
    }

    #[test]
    fn action_parses_type_and_id() {
        assert_eq!(
            action(&["Spell 31000"], 0),
            Ok(ActionId::new(ActionType::Spell, 31000))
        );
        assert_eq!(action(&["Item"], 0), Ok(ActionId::new(ActionType::Item, 0)));
        assert!(matches!(
            action(&["Bogus 1"], 0),
            Err(FieldError::UnknownName { .. })
        ));
    }

    #[test]
    fn pos_rot_swizzles_depth_and_height() {
        let fields = ["100.5", "95.25", "-1", "1.57"];
        assert_eq!(
            pos_rot(&fields, 0),
            Ok(Some(Vec4::new(100.5, -1.0, 95.25, 1.57)))
        );
        assert_eq!(pos_rot(&["", "", "", ""], 0), Ok(None));
    }

    #[test]
    fn parses_offset_and_naive_timestamps() {
        let expected = Utc.with_ymd_and_hms(2023, 5, 1, 17, 0, 0).unwrap();
        assert_eq!(
            parse_timestamp("2023-05-01T20:00:00.0000000+03:00"),
            Some(expected)
        );
        assert_eq!(parse_timestamp("2023-05-01 17:00:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}

use crate::spatial::BlockPos;
use crate::target::TargetSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// One configured value: the data plus the target restriction under which it
/// applies. A default (empty blacklist) target restricts nobody.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettingValue {
    pub data: SettingData,
    pub target: TargetSet,
}

impl SettingValue {
    pub fn unrestricted(data: SettingData) -> Self {
        Self {
            data,
            target: TargetSet::new(),
        }
    }

    pub fn targeted(data: SettingData, target: TargetSet) -> Self {
        Self { data, target }
    }
}

/// Closed set of value shapes a setting can carry.
///
/// `State` is a boolean that reads as "allow"/"deny" everywhere it is shown
/// or stored; `Bool` is a plain true/false toggle. Keeping the shapes as a
/// tagged union keeps parsing, defaulting, and serialization exhaustive
/// instead of relying on downcasts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SettingData {
    Bool(bool),
    State(bool),
    Int(i64),
    Vec3(BlockPos),
    Str(String),
    StrSet(BTreeSet<String>),
    Text(String),
}

impl SettingData {
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::State(_) => "state",
            Self::Int(_) => "int",
            Self::Vec3(_) => "vec3",
            Self::Str(_) => "string",
            Self::StrSet(_) => "string-set",
            Self::Text(_) => "text",
        }
    }

    /// The boolean payload, if this is a `Bool` or `State`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) | Self::State(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<BlockPos> {
        match self {
            Self::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

/// Declared type of a catalog key. `Choice` keys store a `Str` payload
/// validated against a fixed allowed list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingType {
    Bool,
    State,
    Int,
    Vec3,
    Str,
    StrSet,
    Text,
    Choice(&'static [&'static str]),
}

impl SettingType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::State => "state",
            Self::Int => "int",
            Self::Vec3 => "vec3",
            Self::Str => "string",
            Self::StrSet => "string-set",
            Self::Text => "text",
            Self::Choice(_) => "choice",
        }
    }

    /// Suggested literal inputs for operator completion, where the type has
    /// a small closed vocabulary.
    pub fn parsable(&self) -> Option<Vec<&'static str>> {
        match self {
            Self::Bool => Some(vec!["true", "false"]),
            Self::State => Some(vec!["allow", "deny"]),
            Self::Choice(allowed) => Some(allowed.to_vec()),
            _ => None,
        }
    }

    fn accepts(&self, data: &SettingData) -> bool {
        match (self, data) {
            (Self::Bool, SettingData::Bool(_)) => true,
            (Self::State, SettingData::State(_)) => true,
            (Self::Int, SettingData::Int(_)) => true,
            (Self::Vec3, SettingData::Vec3(_)) => true,
            (Self::Str, SettingData::Str(_)) => true,
            (Self::StrSet, SettingData::StrSet(_)) => true,
            (Self::Text, SettingData::Text(_)) => true,
            (Self::Choice(allowed), SettingData::Str(value)) => {
                allowed.iter().any(|a| a == value)
            }
            _ => false,
        }
    }
}

/// Sorting/listing category for a key. Display metadata only; resolution
/// never consults it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Blocks,
    Entities,
    Movement,
    Global,
    Misc,
}

/// Immutable catalog entry describing one named setting.
#[derive(Clone, Debug)]
pub struct SettingKey {
    pub id: &'static str,
    pub ty: SettingType,
    pub default: SettingData,
    pub blurb: &'static str,
    pub description: &'static str,
    pub category: Category,
    /// Only assignable on the global host.
    pub global: bool,
    /// Marks keys whose non-default value restricts players; used for
    /// display grouping, never for resolution.
    pub restrictive: bool,
}

impl SettingKey {
    pub fn new(id: &'static str, ty: SettingType, default: SettingData, blurb: &'static str) -> Self {
        debug_assert!(ty.accepts(&default), "default shape mismatch for {id}");
        Self {
            id,
            ty,
            default,
            blurb,
            description: "",
            category: Category::Misc,
            global: false,
            restrictive: false,
        }
    }

    pub fn state(id: &'static str, default: bool, blurb: &'static str) -> Self {
        Self::new(id, SettingType::State, SettingData::State(default), blurb)
    }

    pub fn boolean(id: &'static str, default: bool, blurb: &'static str) -> Self {
        Self::new(id, SettingType::Bool, SettingData::Bool(default), blurb)
    }

    pub fn integer(id: &'static str, default: i64, blurb: &'static str) -> Self {
        Self::new(id, SettingType::Int, SettingData::Int(default), blurb)
    }

    pub fn vec3(id: &'static str, default: BlockPos, blurb: &'static str) -> Self {
        Self::new(id, SettingType::Vec3, SettingData::Vec3(default), blurb)
    }

    pub fn string(id: &'static str, default: &str, blurb: &'static str) -> Self {
        Self::new(id, SettingType::Str, SettingData::Str(default.to_string()), blurb)
    }

    pub fn string_set(id: &'static str, blurb: &'static str) -> Self {
        Self::new(id, SettingType::StrSet, SettingData::StrSet(BTreeSet::new()), blurb)
    }

    pub fn text(id: &'static str, default: &str, blurb: &'static str) -> Self {
        Self::new(id, SettingType::Text, SettingData::Text(default.to_string()), blurb)
    }

    pub fn choice(
        id: &'static str,
        allowed: &'static [&'static str],
        default: &'static str,
        blurb: &'static str,
    ) -> Self {
        Self::new(
            id,
            SettingType::Choice(allowed),
            SettingData::Str(default.to_string()),
            blurb,
        )
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Mark the key as only assignable on the global host.
    pub fn global(mut self) -> Self {
        self.global = true;
        self.category = Category::Global;
        self
    }

    pub fn restrictive(mut self) -> Self {
        self.restrictive = true;
        self
    }

    /// Does a data payload have the shape this key declares?
    pub fn accepts(&self, data: &SettingData) -> bool {
        self.ty.accepts(data)
    }

    /// Encode a payload of this key's shape as a JSON value. `State`
    /// payloads encode as "allow"/"deny" strings.
    pub fn data_to_json(&self, data: &SettingData) -> Value {
        match data {
            SettingData::Bool(v) => Value::Bool(*v),
            SettingData::State(v) => Value::String(if *v { "allow" } else { "deny" }.to_string()),
            SettingData::Int(v) => Value::from(*v),
            SettingData::Vec3(v) => Value::from(v.to_vec()),
            SettingData::Str(v) | SettingData::Text(v) => Value::String(v.clone()),
            SettingData::StrSet(v) => Value::from(v.iter().cloned().collect::<Vec<_>>()),
        }
    }

    /// Decode a stored JSON value into this key's payload shape.
    pub fn data_from_json(&self, value: &Value) -> Result<SettingData, SettingParseError> {
        let wrong_shape = || SettingParseError::WrongShape {
            key: self.id.to_string(),
            expected: self.ty.name(),
            found: value.to_string(),
        };
        match self.ty {
            SettingType::Bool => value.as_bool().map(SettingData::Bool).ok_or_else(wrong_shape),
            SettingType::State => {
                let raw = value.as_str().ok_or_else(wrong_shape)?;
                parse_state(raw).map(SettingData::State)
            }
            SettingType::Int => value.as_i64().map(SettingData::Int).ok_or_else(wrong_shape),
            SettingType::Vec3 => {
                let parts = value.as_array().ok_or_else(wrong_shape)?;
                if parts.len() != 3 {
                    return Err(wrong_shape());
                }
                let mut pos = [0i32; 3];
                for (axis, part) in parts.iter().enumerate() {
                    let v = part.as_i64().ok_or_else(wrong_shape)?;
                    pos[axis] = i32::try_from(v).map_err(|_| wrong_shape())?;
                }
                Ok(SettingData::Vec3(pos))
            }
            SettingType::Str => value
                .as_str()
                .map(|s| SettingData::Str(s.to_string()))
                .ok_or_else(wrong_shape),
            SettingType::Text => value
                .as_str()
                .map(|s| SettingData::Text(s.to_string()))
                .ok_or_else(wrong_shape),
            SettingType::StrSet => {
                let parts = value.as_array().ok_or_else(wrong_shape)?;
                let mut set = BTreeSet::new();
                for part in parts {
                    set.insert(part.as_str().ok_or_else(wrong_shape)?.to_string());
                }
                Ok(SettingData::StrSet(set))
            }
            SettingType::Choice(allowed) => {
                let raw = value.as_str().ok_or_else(wrong_shape)?;
                if allowed.contains(&raw) {
                    Ok(SettingData::Str(raw.to_string()))
                } else {
                    Err(SettingParseError::InvalidChoice {
                        raw: raw.to_string(),
                        allowed,
                    })
                }
            }
        }
    }

    /// Parse operator text input into this key's payload shape.
    pub fn parse_data(&self, raw: &str) -> Result<SettingData, SettingParseError> {
        match self.ty {
            SettingType::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" => Ok(SettingData::Bool(true)),
                "false" => Ok(SettingData::Bool(false)),
                _ => Err(SettingParseError::InvalidBool { raw: raw.to_string() }),
            },
            SettingType::State => parse_state(raw).map(SettingData::State),
            SettingType::Int => raw
                .parse::<i64>()
                .map(SettingData::Int)
                .map_err(|_| SettingParseError::InvalidInt { raw: raw.to_string() }),
            SettingType::Vec3 => {
                let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
                if parts.len() != 3 {
                    return Err(SettingParseError::InvalidVec3 { raw: raw.to_string() });
                }
                let mut pos = [0i32; 3];
                for (axis, part) in parts.iter().enumerate() {
                    pos[axis] = part
                        .parse::<i32>()
                        .map_err(|_| SettingParseError::InvalidVec3 { raw: raw.to_string() })?;
                }
                Ok(SettingData::Vec3(pos))
            }
            SettingType::Str => Ok(SettingData::Str(raw.to_string())),
            SettingType::Text => Ok(SettingData::Text(raw.to_string())),
            SettingType::StrSet => Ok(SettingData::StrSet(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            SettingType::Choice(allowed) => {
                if allowed.contains(&raw) {
                    Ok(SettingData::Str(raw.to_string()))
                } else {
                    Err(SettingParseError::InvalidChoice {
                        raw: raw.to_string(),
                        allowed,
                    })
                }
            }
        }
    }
}

/// "allow"/"true" and "deny"/"false" are both accepted on input; output is
/// always "allow"/"deny".
fn parse_state(raw: &str) -> Result<bool, SettingParseError> {
    match raw.to_ascii_lowercase().as_str() {
        "allow" | "true" => Ok(true),
        "deny" | "false" => Ok(false),
        _ => Err(SettingParseError::InvalidState { raw: raw.to_string() }),
    }
}

/// A stored or typed setting payload could not be decoded into the key's
/// declared shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingParseError {
    InvalidBool { raw: String },
    InvalidState { raw: String },
    InvalidInt { raw: String },
    InvalidVec3 { raw: String },
    InvalidChoice { raw: String, allowed: &'static [&'static str] },
    WrongShape { key: String, expected: &'static str, found: String },
}

impl fmt::Display for SettingParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBool { raw } => {
                write!(f, "invalid boolean: expected true or false, was: {raw}")
            }
            Self::InvalidState { raw } => {
                write!(f, "invalid state: expected allow or deny, was: {raw}")
            }
            Self::InvalidInt { raw } => write!(f, "invalid integer: {raw}"),
            Self::InvalidVec3 { raw } => {
                write!(f, "invalid position: expected x,y,z integers, was: {raw}")
            }
            Self::InvalidChoice { raw, allowed } => write!(
                f,
                "invalid choice '{raw}': expected one of {}",
                allowed.join(", ")
            ),
            Self::WrongShape { key, expected, found } => {
                write!(f, "setting '{key}' expects a {expected} value, found {found}")
            }
        }
    }
}

impl std::error::Error for SettingParseError {}

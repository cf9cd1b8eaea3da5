//! Tagged property values

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::id::EntityId;

/// Opaque key of an entity property
pub type PropertyId = u32;

/// A heterogeneous property value with an explicit type discriminant
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    /// No value
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f32),
    Vec3(Vec3),
    /// Handle to another entity
    Entity(EntityId),
    Text(String),
}

impl PropertyValue {
    /// Name of the contained type
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Vec3(_) => "vec3",
            Self::Entity(_) => "entity",
            Self::Text(_) => "text",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; ints are widened
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Self::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<Vec3> for PropertyValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<EntityId> for PropertyValue {
    fn from(v: EntityId) -> Self {
        Self::Entity(v)
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let v: PropertyValue = 3i64.into();
        assert_eq!(v.as_int(), Some(3));
        assert_eq!(v.as_float(), Some(3.0));
        assert_eq!(v.as_vec3(), None);
        assert_eq!(v.type_name(), "int");

        let p = PropertyValue::from(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.as_vec3(), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert!(PropertyValue::default().is_none());
    }

    #[test]
    fn test_serde_tagged() {
        let v = PropertyValue::Float(1.5);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"type":"float","value":1.5}"#);
        let back: PropertyValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}

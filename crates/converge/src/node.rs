//! Configuration tree values
//!
//! A [`ConfigNode`] is the common shape both the desired document and the
//! device facts are normalized into before they are compared.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A leaf value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Scalar {
    /// Name of the scalar type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "str",
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Str(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// A node of a configuration document
///
/// Absent fields are simply missing from an [`ConfigNode::Object`]; an empty
/// list or object is an explicit-empty value and is kept as such.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigNode {
    Scalar(Scalar),
    List(Vec<ConfigNode>),
    Object(BTreeMap<String, ConfigNode>),
}

impl ConfigNode {
    /// Create an object with no fields
    pub fn empty_object() -> Self {
        Self::Object(BTreeMap::new())
    }

    /// Create a list with no items
    pub fn empty_list() -> Self {
        Self::List(Vec::new())
    }

    /// The scalar value, if this is a leaf
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Fields of an object node
    pub fn as_object(&self) -> Option<&BTreeMap<String, ConfigNode>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Mutable fields of an object node
    pub fn as_object_mut(&mut self) -> Option<&mut BTreeMap<String, ConfigNode>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Items of a list node (keyed entities or set members)
    pub fn as_list(&self) -> Option<&[ConfigNode]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Mutable items of a list node
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<ConfigNode>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a field of an object node
    pub fn get(&self, field: &str) -> Option<&ConfigNode> {
        self.as_object().and_then(|map| map.get(field))
    }

    /// True for an empty list or an empty object
    pub fn is_empty_container(&self) -> bool {
        match self {
            Self::List(items) => items.is_empty(),
            Self::Object(map) => map.is_empty(),
            Self::Scalar(_) => false,
        }
    }

    /// Drop explicit-empty sub-trees, treating them as absent
    ///
    /// List items are kept even when they prune down to nothing, since an
    /// item always names an entity. The node itself is never removed.
    pub fn prune_empty(&self) -> Self {
        match self {
            Self::Object(map) => Self::Object(
                map.iter()
                    .filter_map(|(k, v)| {
                        let pruned = v.prune_empty();
                        (!pruned.is_empty_container()).then(|| (k.clone(), pruned))
                    })
                    .collect(),
            ),
            Self::List(items) => Self::List(items.iter().map(Self::prune_empty).collect()),
            Self::Scalar(_) => self.clone(),
        }
    }

    /// Convert back to a plain JSON value
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(s) => s.to_json(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Scalar> for ConfigNode {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<BTreeMap<String, ConfigNode>> for ConfigNode {
    fn from(value: BTreeMap<String, ConfigNode>) -> Self {
        Self::Object(value)
    }
}

impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s}"),
            _ => write!(f, "{}", self.to_json()),
        }
    }
}

/// The identity of a keyed list entity: its identity fields and their values,
/// in KeySpec order
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(pub Vec<(String, ConfigNode)>);

impl Identity {
    /// Extract the identity of `node`, or `None` if any identity field is absent
    pub fn of(node: &ConfigNode, fields: &[String]) -> Option<Self> {
        let map = node.as_object()?;
        fields
            .iter()
            .map(|f| map.get(f).map(|v| (f.clone(), v.clone())))
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }

    /// Identity fields absent from `node`
    pub fn missing_fields(node: &ConfigNode, fields: &[String]) -> Vec<String> {
        fields
            .iter()
            .filter(|f| node.get(f).is_none())
            .cloned()
            .collect()
    }

    /// Names of the identity fields, in order
    pub fn field_names(&self) -> Vec<String> {
        self.0.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Whether `node` carries exactly this identity
    pub fn matches(&self, node: &ConfigNode) -> bool {
        self.0.iter().all(|(k, v)| node.get(k) == Some(v))
    }

    /// The identity as the fields of an object node
    pub fn to_object(&self) -> BTreeMap<String, ConfigNode> {
        self.0.iter().cloned().collect()
    }

    /// Whether `field` is one of the identity fields
    pub fn contains_field(&self, field: &str) -> bool {
        self.0.iter().any(|(k, _)| k == field)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

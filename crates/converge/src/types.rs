//! Core types shared by the differ, planner and emitter

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::node::{ConfigNode, Identity};

/// How a desired document is converged onto the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvergenceMode {
    /// Add and update what is given, leave everything else alone
    Merged,
    /// Fully replace the named entities
    Replaced,
    /// Make the whole resource equal to the desired document
    Overridden,
    /// Remove what is given, or everything when nothing is given
    Deleted,
}

impl ConvergenceMode {
    pub const ALL: [Self; 4] = [Self::Merged, Self::Replaced, Self::Overridden, Self::Deleted];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merged => "merged",
            Self::Replaced => "replaced",
            Self::Overridden => "overridden",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ConvergenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConvergenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("invalid state '{s}', expected one of: merged, replaced, overridden, deleted")
            })
    }
}

/// One step of an [`EntityPath`]: a field name and, for keyed list items,
/// the identity of the item
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Segment {
    pub field: String,
    pub identity: Option<Identity>,
}

/// Location of an entity inside a resource, starting at the resource name
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityPath(pub Vec<Segment>);

impl EntityPath {
    pub fn root(resource: &str, identity: Option<Identity>) -> Self {
        Self(vec![Segment {
            field: resource.to_string(),
            identity,
        }])
    }

    /// Path of a nested object or list item below this one
    pub fn child(&self, field: &str, identity: Option<Identity>) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment {
            field: field.to_string(),
            identity,
        });
        Self(segments)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    pub fn parent(&self) -> Option<Self> {
        (self.0.len() > 1).then(|| Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Identity of the entity this path points at, if it is a list item
    pub fn identity(&self) -> Option<&Identity> {
        self.last().and_then(|s| s.identity.as_ref())
    }
}

impl fmt::Display for EntityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.field)?;
            if let Some(identity) = &segment.identity {
                write!(f, "[{identity}]")?;
            }
        }
        Ok(())
    }
}

/// Kind of a resolved operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Create an entity with the payload fields
    Add,
    /// Set the payload fields on an existing entity (set members are added)
    Modify,
    /// Remove the whole entity and everything below it
    Remove,
    /// Remove the payload fields (or set members) from an existing entity
    RemoveFields,
}

impl OpKind {
    pub fn is_removal(self) -> bool {
        matches!(self, Self::Remove | Self::RemoveFields)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "ADD",
            Self::Modify => "MODIFY",
            Self::Remove => "REMOVE",
            Self::RemoveFields => "REMOVE-FIELDS",
        };
        f.write_str(s)
    }
}

/// A mode-resolved action on one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub kind: OpKind,
    pub path: EntityPath,
    /// Leaf fields (scalars and sets) of the entity, without its identity
    pub payload: BTreeMap<String, ConfigNode>,
    /// Part of a destroy-and-recreate pair
    pub recreate: bool,
    /// The state that produced this operation
    pub state: ConvergenceMode,
}

impl Operation {
    pub fn new(kind: OpKind, path: EntityPath, state: ConvergenceMode) -> Self {
        Self {
            kind,
            path,
            payload: BTreeMap::new(),
            recreate: false,
            state,
        }
    }

    pub fn with_payload(mut self, payload: BTreeMap<String, ConfigNode>) -> Self {
        self.payload = payload;
        self
    }

    pub fn recreating(mut self) -> Self {
        self.recreate = true;
        self
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.path.identity()
    }

    pub fn depth(&self) -> usize {
        self.path.depth()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path)?;
        if !self.payload.is_empty() {
            let fields: Vec<String> = self
                .payload
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, " {{{}}}", fields.join(", "))?;
        }
        Ok(())
    }
}

/// Request method of a rendered command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patch => f.write_str("PATCH"),
            Self::Delete => f.write_str("DELETE"),
        }
    }
}

/// A device command, opaque to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub method: Method,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if let Some(body) = &self.body {
            write!(f, " {body}")?;
        }
        Ok(())
    }
}

/// Operation counts by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OperationSummary {
    pub adds: usize,
    pub modifies: usize,
    pub removes: usize,
    pub field_removals: usize,
}

impl OperationSummary {
    pub fn from_operations(ops: &[Operation]) -> Self {
        let mut summary = Self::default();
        for op in ops {
            summary.add_operation(op);
        }
        summary
    }

    pub fn add_operation(&mut self, op: &Operation) {
        match op.kind {
            OpKind::Add => self.adds += 1,
            OpKind::Modify => self.modifies += 1,
            OpKind::Remove => self.removes += 1,
            OpKind::RemoveFields => self.field_removals += 1,
        }
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &Self) {
        self.adds += other.adds;
        self.modifies += other.modifies;
        self.removes += other.removes;
        self.field_removals += other.field_removals;
    }

    pub fn total(&self) -> usize {
        self.adds + self.modifies + self.removes + self.field_removals
    }

    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Outcome of one reconciliation call
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResult {
    pub resource: String,
    pub state: ConvergenceMode,
    pub before: Value,
    pub after: Value,
    pub commands: Vec<String>,
    /// True iff at least one operation survived mode resolution
    pub changed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<Operation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl ReconcileResult {
    pub fn summary(&self) -> OperationSummary {
        OperationSummary::from_operations(&self.operations)
    }
}

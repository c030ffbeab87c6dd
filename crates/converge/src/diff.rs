//! Structural diff between a desired and a current tree
//!
//! The differ is mode-agnostic: it records every difference it finds and
//! leaves the decision of what to do about it to the [planner](crate::planner).

use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{DifferError, ImmutableFieldConflict, Side};
use crate::node::{ConfigNode, Identity};
use crate::schema::{ObjectSchema, ResourceSchema, Schema};
use crate::types::EntityPath;

/// What happened to an entity between current and desired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaKind {
    /// Only in desired
    Add,
    /// Only in current; a removal candidate
    Remove,
    /// In both, with differing leaf fields
    Modify,
    /// In both, with an immutable field changed
    Recreate,
    /// In both, own leaf fields equal (children may still differ)
    Unchanged,
}

/// How a collection is mentioned in the desired document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Absent,
    Empty,
    Populated,
}

impl Presence {
    pub fn of(node: Option<&ConfigNode>) -> Self {
        match node {
            None => Self::Absent,
            Some(n) if n.is_empty_container() => Self::Empty,
            Some(_) => Self::Populated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub old: Option<ConfigNode>,
    pub new: Option<ConfigNode>,
}

/// Difference of one entity (a list item or a nested object)
#[derive(Debug, Clone, Serialize)]
pub struct EntityDelta {
    pub path: EntityPath,
    pub identity: Option<Identity>,
    pub kind: DeltaKind,
    pub desired: Option<ConfigNode>,
    pub current: Option<ConfigNode>,
    /// Leaf fields given in desired whose value differs from current
    pub field_diffs: BTreeMap<String, FieldDiff>,
    /// Leaf fields set on the device to a non-default value but not given in desired
    pub unmentioned: BTreeMap<String, ConfigNode>,
    pub children: BTreeMap<String, ChildDelta>,
    pub immutable_conflicts: Vec<String>,
}

impl EntityDelta {
    /// True if anything in this entity or below it differs
    pub fn has_changes(&self) -> bool {
        self.kind != DeltaKind::Unchanged || self.children.values().any(ChildDelta::has_changes)
    }
}

/// Difference of a keyed list
#[derive(Debug, Clone, Serialize)]
pub struct ListDelta {
    pub presence: Presence,
    /// Entity deltas ordered by identity
    pub entities: Vec<EntityDelta>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildDelta {
    Object(Box<EntityDelta>),
    List(ListDelta),
}

impl ChildDelta {
    pub fn has_changes(&self) -> bool {
        match self {
            Self::Object(entity) => entity.has_changes(),
            Self::List(list) => list.entities.iter().any(EntityDelta::has_changes),
        }
    }
}

/// The differ's output for one resource
#[derive(Debug, Clone, Serialize)]
pub struct Patch {
    pub resource: String,
    pub root: ChildDelta,
    pub notices: Vec<ImmutableFieldConflict>,
}

impl Patch {
    pub fn has_changes(&self) -> bool {
        self.root.has_changes()
    }
}

/// Compute the patch between two normalized trees
pub fn diff(
    desired: &ConfigNode,
    current: &ConfigNode,
    schema: &ResourceSchema,
) -> Result<Patch, DifferError> {
    let mut differ = Differ {
        resource: &schema.name,
        notices: Vec::new(),
    };
    let root = match &schema.root {
        Schema::List(item) => {
            ChildDelta::List(differ.list(Some(desired), Some(current), item, None, &schema.name)?)
        }
        _ => {
            let empty = ObjectSchema::default();
            let object = schema.root_object().unwrap_or(&empty);
            let path = EntityPath::root(&schema.name, None);
            ChildDelta::Object(Box::new(differ.entity(
                Some(desired),
                Some(current),
                object,
                path,
                None,
            )?))
        }
    };
    debug!(
        "{}: diff computed, {} immutable conflict(s)",
        schema.name,
        differ.notices.len()
    );
    Ok(Patch {
        resource: schema.name.clone(),
        root,
        notices: differ.notices,
    })
}

struct Differ<'a> {
    resource: &'a str,
    notices: Vec<ImmutableFieldConflict>,
}

/// Absent sets compare equal to empty ones
fn set_members(node: Option<&ConfigNode>) -> &[ConfigNode] {
    node.and_then(ConfigNode::as_list).unwrap_or_default()
}

impl Differ<'_> {
    fn entity(
        &mut self,
        desired: Option<&ConfigNode>,
        current: Option<&ConfigNode>,
        schema: &ObjectSchema,
        path: EntityPath,
        identity: Option<Identity>,
    ) -> Result<EntityDelta, DifferError> {
        let mut delta = EntityDelta {
            path,
            identity,
            kind: DeltaKind::Unchanged,
            desired: desired.cloned(),
            current: current.cloned(),
            field_diffs: BTreeMap::new(),
            unmentioned: BTreeMap::new(),
            children: BTreeMap::new(),
            immutable_conflicts: Vec::new(),
        };

        let Some(desired) = desired else {
            delta.kind = DeltaKind::Remove;
            return Ok(delta);
        };

        for (name, field_schema) in &schema.fields {
            if schema.keys.is_identity(name) {
                continue;
            }
            let want = desired.get(name);
            let have = current.and_then(|c| c.get(name));

            match field_schema {
                Schema::Scalar(spec) => {
                    let default = spec.default.clone().map(ConfigNode::Scalar);
                    let effective = have.or(default.as_ref());
                    if let Some(want) = want
                        && Some(want) != effective
                    {
                        if have.is_some() && schema.keys.is_immutable(name) {
                            delta.immutable_conflicts.push(name.clone());
                        }
                        delta.field_diffs.insert(
                            name.clone(),
                            FieldDiff {
                                old: have.cloned(),
                                new: Some(want.clone()),
                            },
                        );
                    } else if want.is_none()
                        && let Some(have) = have
                        && Some(have) != default.as_ref()
                    {
                        delta.unmentioned.insert(name.clone(), have.clone());
                    }
                }
                Schema::Set(_) => {
                    if let Some(want) = want
                        && set_members(Some(want)) != set_members(have)
                    {
                        if have.is_some() && schema.keys.is_immutable(name) {
                            delta.immutable_conflicts.push(name.clone());
                        }
                        delta.field_diffs.insert(
                            name.clone(),
                            FieldDiff {
                                old: have.cloned(),
                                new: Some(want.clone()),
                            },
                        );
                    } else if want.is_none()
                        && let Some(have) = have
                        && !set_members(Some(have)).is_empty()
                    {
                        delta.unmentioned.insert(name.clone(), have.clone());
                    }
                }
                Schema::Object(child_schema) => {
                    if want.is_none() && have.is_none() {
                        continue;
                    }
                    let child = self.entity(
                        want,
                        have,
                        child_schema,
                        delta.path.child(name, None),
                        None,
                    )?;
                    delta
                        .children
                        .insert(name.clone(), ChildDelta::Object(Box::new(child)));
                }
                Schema::List(item) => {
                    if want.is_none() && have.is_none() {
                        continue;
                    }
                    let list = self.list(want, have, item, Some(&delta.path), name)?;
                    delta.children.insert(name.clone(), ChildDelta::List(list));
                }
            }
        }

        delta.kind = if current.is_none() {
            DeltaKind::Add
        } else if !delta.immutable_conflicts.is_empty() {
            let notice = ImmutableFieldConflict {
                path: delta.path.to_string(),
                fields: delta.immutable_conflicts.clone(),
            };
            debug!("{notice}");
            self.notices.push(notice);
            DeltaKind::Recreate
        } else if !delta.field_diffs.is_empty() {
            DeltaKind::Modify
        } else {
            DeltaKind::Unchanged
        };
        Ok(delta)
    }

    fn index<'n>(
        node: Option<&'n ConfigNode>,
        item: &ObjectSchema,
        path: &str,
        side: Side,
    ) -> Result<BTreeMap<Identity, &'n ConfigNode>, DifferError> {
        let mut index = BTreeMap::new();
        for entity in node.and_then(ConfigNode::as_list).unwrap_or_default() {
            let Some(identity) = Identity::of(entity, &item.keys.identity_fields) else {
                let field = Identity::missing_fields(entity, &item.keys.identity_fields)
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                return Err(DifferError::MissingIdentity {
                    path: path.to_string(),
                    field,
                });
            };
            if index.contains_key(&identity) {
                return Err(DifferError::DuplicateIdentity {
                    path: path.to_string(),
                    identity: identity.to_string(),
                    side,
                });
            }
            index.insert(identity, entity);
        }
        Ok(index)
    }

    fn list(
        &mut self,
        desired: Option<&ConfigNode>,
        current: Option<&ConfigNode>,
        item: &ObjectSchema,
        parent: Option<&EntityPath>,
        field: &str,
    ) -> Result<ListDelta, DifferError> {
        let list_path = parent.map_or_else(|| self.resource.to_string(), |p| format!("{p}.{field}"));
        let want = Self::index(desired, item, &list_path, Side::Desired)?;
        let mut have = Self::index(current, item, &list_path, Side::Current)?;

        let mut entities = Vec::with_capacity(want.len().max(have.len()));
        let path_of = |identity: &Identity| match parent {
            Some(p) => p.child(field, Some(identity.clone())),
            None => EntityPath::root(field, Some(identity.clone())),
        };

        for (identity, node) in &want {
            let existing = have.remove(identity);
            let path = path_of(identity);
            entities.push(self.entity(Some(*node), existing, item, path, Some(identity.clone()))?);
        }
        for (identity, node) in have {
            let path = path_of(&identity);
            entities.push(self.entity(None, Some(node), item, path, Some(identity))?);
        }
        entities.sort_by(|a, b| a.identity.cmp(&b.identity));

        Ok(ListDelta {
            presence: Presence::of(desired),
            entities,
        })
    }
}

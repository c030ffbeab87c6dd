//! Mode resolution: turning a [`Patch`] into ordered [`Operation`]s
//!
//! The four convergence modes only differ here:
//!
//! - `merged` adds what is missing and sets the fields it is given. Nothing
//!   is ever removed, except an entity that must be recreated because an
//!   immutable field changed.
//! - `replaced` does the same, but a *named* entity (a list item, and
//!   everything below it) is replaced as a whole: leaf fields it does not
//!   mention revert to their default, and nested objects and list items it
//!   does not mention are removed. Current-only entities at the top of the
//!   resource are left alone.
//! - `overridden` makes the resource equal to the desired document.
//! - `deleted` removes what the desired document selects: an entity given
//!   by identity alone is removed whole, listed fields are removed when their
//!   value matches, an explicit-empty collection removes everything in it,
//!   and an empty document removes everything.
//!
//! Removals come first, deepest first; adds and modifications follow,
//! shallowest first.

use log::debug;
use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::diff::{ChildDelta, DeltaKind, EntityDelta, ListDelta, Patch, Presence};
use crate::error::{ImmutableFieldConflict, IncompleteEntityError};
use crate::node::{ConfigNode, Identity};
use crate::schema::{ObjectSchema, ResourceSchema, Schema};
use crate::types::{ConvergenceMode, EntityPath, OpKind, Operation};

/// The planner's output
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub operations: Vec<Operation>,
    /// Entities recreated because an immutable field changed
    pub notices: Vec<ImmutableFieldConflict>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Resolve a patch into the operations `mode` calls for
///
/// Fails as a whole if any entity to be created lacks a field required to
/// create it.
pub fn resolve(
    patch: &Patch,
    schema: &ResourceSchema,
    mode: ConvergenceMode,
) -> Result<Resolution, IncompleteEntityError> {
    let mut planner = Planner {
        mode,
        removals: Vec::new(),
        upserts: Vec::new(),
        notices: Vec::new(),
    };

    match (&patch.root, &schema.root) {
        (ChildDelta::List(list), Schema::List(item)) => planner.root_list(list, item)?,
        (ChildDelta::Object(entity), Schema::Object(object)) => match mode {
            ConvergenceMode::Merged => planner.merge_entity(entity, object)?,
            ConvergenceMode::Replaced | ConvergenceMode::Overridden => {
                planner.replace_entity(entity, object, false)?;
            }
            ConvergenceMode::Deleted => planner.delete_entity(entity, object),
        },
        _ => debug!("{}: patch does not match the schema root", schema.name),
    }

    Ok(planner.finish(&schema.name))
}

struct Planner {
    mode: ConvergenceMode,
    removals: Vec<Operation>,
    upserts: Vec<Operation>,
    notices: Vec<ImmutableFieldConflict>,
}

fn child_schema<'s>(schema: &'s ObjectSchema, field: &str) -> Option<&'s ObjectSchema> {
    schema.get(field).and_then(Schema::as_object)
}

fn members(node: Option<&ConfigNode>) -> &[ConfigNode] {
    node.and_then(ConfigNode::as_list).unwrap_or_default()
}

/// Members of `a` missing from `b`
fn difference(a: &[ConfigNode], b: &[ConfigNode]) -> Vec<ConfigNode> {
    a.iter().filter(|m| !b.contains(*m)).cloned().collect()
}

/// Whether a current-only entity holds anything worth removing
fn holds_config(delta: &EntityDelta) -> bool {
    delta
        .current
        .as_ref()
        .is_some_and(|c| !c.is_empty_container())
}

/// Leaf fields of an entity, identity excluded
fn leaf_payload(node: &ConfigNode, schema: &ObjectSchema) -> BTreeMap<String, ConfigNode> {
    node.as_object()
        .into_iter()
        .flatten()
        .filter(|(name, _)| {
            !schema.keys.is_identity(name) && schema.get(name).is_some_and(Schema::is_leaf)
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Overlay `desired` onto `current`: scalars are replaced, sets are united,
/// objects and keyed lists are merged recursively
pub fn merge_nodes(current: &ConfigNode, desired: &ConfigNode, schema: &ObjectSchema) -> ConfigNode {
    let mut out = current.as_object().cloned().unwrap_or_default();
    for (name, value) in desired.as_object().into_iter().flatten() {
        let existing = out.get(name);
        let merged = match schema.get(name) {
            Some(Schema::Set(_)) => {
                let mut union = members(existing).to_vec();
                union.extend(members(Some(value)).iter().cloned());
                union.sort();
                union.dedup();
                ConfigNode::List(union)
            }
            Some(Schema::Object(o)) => {
                let base = existing.cloned().unwrap_or_else(ConfigNode::empty_object);
                merge_nodes(&base, value, o)
            }
            Some(Schema::List(item)) => merge_lists(existing, value, item),
            _ => value.clone(),
        };
        out.insert(name.clone(), merged);
    }
    ConfigNode::Object(out)
}

fn merge_lists(current: Option<&ConfigNode>, desired: &ConfigNode, item: &ObjectSchema) -> ConfigNode {
    let fields = &item.keys.identity_fields;
    let mut items = members(current).to_vec();
    for entity in members(Some(desired)) {
        let identity = Identity::of(entity, fields);
        match items.iter().position(|c| Identity::of(c, fields) == identity) {
            Some(pos) => {
                let merged = merge_nodes(&items[pos], entity, item);
                items[pos] = merged;
            }
            None => items.push(entity.clone()),
        }
    }
    items.sort_by_cached_key(|n| Identity::of(n, fields));
    ConfigNode::List(items)
}

impl Planner {
    fn push(&mut self, op: Operation) {
        if op.kind.is_removal() {
            self.removals.push(op);
        } else {
            self.upserts.push(op);
        }
    }

    fn remove(&mut self, path: &EntityPath) {
        self.push(Operation::new(OpKind::Remove, path.clone(), self.mode));
    }

    fn finish(mut self, resource: &str) -> Resolution {
        self.removals.sort_by_key(|op| Reverse(op.depth()));
        self.upserts.sort_by_key(Operation::depth);
        let mut operations = self.removals;
        operations.append(&mut self.upserts);
        debug!(
            "{resource}: {} resolved {} operation(s)",
            self.mode,
            operations.len()
        );
        Resolution {
            operations,
            notices: self.notices,
        }
    }

    fn root_list(&mut self, list: &ListDelta, item: &ObjectSchema) -> Result<(), IncompleteEntityError> {
        for entity in &list.entities {
            match self.mode {
                ConvergenceMode::Merged => self.merge_entity(entity, item)?,
                ConvergenceMode::Replaced | ConvergenceMode::Overridden => match entity.kind {
                    DeltaKind::Add => self.add_entity(entity, item, true)?,
                    DeltaKind::Remove => {
                        if self.mode == ConvergenceMode::Overridden {
                            self.remove(&entity.path);
                        }
                    }
                    _ => self.replace_entity(entity, item, true)?,
                },
                ConvergenceMode::Deleted => {
                    if list.presence == Presence::Populated {
                        self.delete_entity(entity, item);
                    } else if entity.current.is_some() {
                        self.remove(&entity.path);
                    }
                }
            }
        }
        Ok(())
    }

    fn add_entity(
        &mut self,
        delta: &EntityDelta,
        schema: &ObjectSchema,
        list_item: bool,
    ) -> Result<(), IncompleteEntityError> {
        match &delta.desired {
            Some(desired) => self.add_tree(desired, schema, &delta.path, list_item, false),
            None => Ok(()),
        }
    }

    /// Add an entity and everything below it
    ///
    /// Plain objects without leaf fields get no operation of their own; the
    /// emitter creates them on the way to their children.
    fn add_tree(
        &mut self,
        node: &ConfigNode,
        schema: &ObjectSchema,
        path: &EntityPath,
        list_item: bool,
        recreate: bool,
    ) -> Result<(), IncompleteEntityError> {
        let missing: Vec<String> = schema
            .keys
            .required_for_create
            .iter()
            .filter(|f| node.get(f).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(IncompleteEntityError {
                path: path.to_string(),
                missing,
            });
        }

        let payload = leaf_payload(node, schema);
        if list_item || !payload.is_empty() {
            let mut op = Operation::new(OpKind::Add, path.clone(), self.mode).with_payload(payload);
            op.recreate = recreate;
            self.push(op);
        }

        for (name, field_schema) in &schema.fields {
            let Some(child) = node.get(name) else {
                continue;
            };
            match field_schema {
                Schema::Object(o) => {
                    self.add_tree(child, o, &path.child(name, None), false, recreate)?;
                }
                Schema::List(item) => {
                    for entity in members(Some(child)) {
                        let Some(identity) = Identity::of(entity, &item.keys.identity_fields) else {
                            return Err(IncompleteEntityError {
                                path: format!("{path}.{name}"),
                                missing: Identity::missing_fields(entity, &item.keys.identity_fields),
                            });
                        };
                        self.add_tree(entity, item, &path.child(name, Some(identity)), true, recreate)?;
                    }
                }
                Schema::Scalar(_) | Schema::Set(_) => {}
            }
        }
        Ok(())
    }

    /// Destroy an entity and build `target` in its place
    fn recreate(
        &mut self,
        delta: &EntityDelta,
        schema: &ObjectSchema,
        target: &ConfigNode,
    ) -> Result<(), IncompleteEntityError> {
        if !delta.immutable_conflicts.is_empty() {
            self.notices.push(ImmutableFieldConflict {
                path: delta.path.to_string(),
                fields: delta.immutable_conflicts.clone(),
            });
        }
        debug!("{}: recreating", delta.path);
        self.push(Operation::new(OpKind::Remove, delta.path.clone(), self.mode).recreating());
        self.add_tree(target, schema, &delta.path, delta.identity.is_some(), true)
    }

    /// Whether merging `delta` really changes one of its immutable fields
    ///
    /// A set only grows under `merged`; a desired set already contained in
    /// the current one leaves it as it is.
    fn merge_conflicts(delta: &EntityDelta, schema: &ObjectSchema) -> bool {
        delta.immutable_conflicts.iter().any(|name| {
            let Some(field) = delta.field_diffs.get(name) else {
                return true;
            };
            match schema.get(name) {
                Some(Schema::Set(_)) => {
                    !difference(members(field.new.as_ref()), members(field.old.as_ref())).is_empty()
                }
                _ => true,
            }
        })
    }

    fn merge_entity(&mut self, delta: &EntityDelta, schema: &ObjectSchema) -> Result<(), IncompleteEntityError> {
        match delta.kind {
            DeltaKind::Add => return self.add_entity(delta, schema, delta.identity.is_some()),
            DeltaKind::Remove => return Ok(()),
            DeltaKind::Recreate if Self::merge_conflicts(delta, schema) => {
                let empty = ConfigNode::empty_object();
                let current = delta.current.as_ref().unwrap_or(&empty);
                let desired = delta.desired.as_ref().unwrap_or(&empty);
                return self.recreate(delta, schema, &merge_nodes(current, desired, schema));
            }
            DeltaKind::Recreate | DeltaKind::Modify | DeltaKind::Unchanged => {}
        }

        let mut set = BTreeMap::new();
        for (name, field) in &delta.field_diffs {
            let Some(new) = &field.new else {
                continue;
            };
            if matches!(schema.get(name), Some(Schema::Set(_))) {
                let added = difference(members(Some(new)), members(field.old.as_ref()));
                if !added.is_empty() {
                    set.insert(name.clone(), ConfigNode::List(added));
                }
            } else {
                set.insert(name.clone(), new.clone());
            }
        }
        if !set.is_empty() {
            self.push(Operation::new(OpKind::Modify, delta.path.clone(), self.mode).with_payload(set));
        }

        for (name, child) in &delta.children {
            let Some(child_schema) = child_schema(schema, name) else {
                continue;
            };
            match child {
                ChildDelta::Object(entity) => self.merge_entity(entity, child_schema)?,
                ChildDelta::List(list) => {
                    for entity in &list.entities {
                        self.merge_entity(entity, child_schema)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// What an entity is rebuilt as when it has to be recreated under a
    /// replacing mode
    fn replace_target(delta: &EntityDelta, schema: &ObjectSchema, full: bool) -> ConfigNode {
        let empty = ConfigNode::empty_object();
        let current = delta.current.as_ref().unwrap_or(&empty);
        let desired = delta.desired.as_ref().unwrap_or(&empty);
        if full {
            desired.clone()
        } else {
            merge_nodes(current, desired, schema)
        }
    }

    /// Converge an entity present on both sides under `replaced` or
    /// `overridden`
    ///
    /// `named` is true for list items and everything below them; unnamed
    /// levels (the resource root object and plain objects directly below
    /// it) are only fully replaced under `overridden`.
    fn replace_entity(
        &mut self,
        delta: &EntityDelta,
        schema: &ObjectSchema,
        named: bool,
    ) -> Result<(), IncompleteEntityError> {
        let full = named || self.mode == ConvergenceMode::Overridden;

        let stuck = full
            && delta
                .unmentioned
                .keys()
                .any(|f| !schema.keys.is_deletable(f) && schema.default_of(f).is_none());
        if delta.kind == DeltaKind::Recreate || stuck {
            let target = Self::replace_target(delta, schema, full);
            return self.recreate(delta, schema, &target);
        }

        let mut set = BTreeMap::new();
        let mut clear = BTreeMap::new();
        for (name, field) in &delta.field_diffs {
            let Some(new) = &field.new else {
                continue;
            };
            if matches!(schema.get(name), Some(Schema::Set(_))) {
                let want = members(Some(new));
                let have = members(field.old.as_ref());
                let added = difference(want, have);
                let extra = difference(have, want);
                if !added.is_empty() {
                    set.insert(name.clone(), ConfigNode::List(added));
                }
                if !extra.is_empty() {
                    clear.insert(name.clone(), ConfigNode::List(extra));
                }
            } else {
                set.insert(name.clone(), new.clone());
            }
        }
        if full {
            for (name, value) in &delta.unmentioned {
                if schema.keys.is_deletable(name) {
                    clear.insert(name.clone(), value.clone());
                } else if let Some(default) = schema.default_of(name) {
                    set.insert(name.clone(), ConfigNode::Scalar(default.clone()));
                }
            }
        }
        if !clear.is_empty() {
            self.push(
                Operation::new(OpKind::RemoveFields, delta.path.clone(), self.mode).with_payload(clear),
            );
        }
        if !set.is_empty() {
            self.push(Operation::new(OpKind::Modify, delta.path.clone(), self.mode).with_payload(set));
        }

        // below a named entity, whatever desired leaves out goes
        for (name, child) in &delta.children {
            let Some(child_schema) = child_schema(schema, name) else {
                continue;
            };
            match child {
                ChildDelta::Object(entity) => match entity.kind {
                    DeltaKind::Add => self.add_entity(entity, child_schema, false)?,
                    DeltaKind::Remove => {
                        if full && holds_config(entity) {
                            self.remove(&entity.path);
                        }
                    }
                    _ => self.replace_entity(entity, child_schema, named)?,
                },
                ChildDelta::List(list) => {
                    for entity in &list.entities {
                        match entity.kind {
                            DeltaKind::Add => self.add_entity(entity, child_schema, true)?,
                            DeltaKind::Remove => {
                                if full {
                                    self.remove(&entity.path);
                                }
                            }
                            _ => self.replace_entity(entity, child_schema, true)?,
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Remove what the desired side of `delta` selects
    fn delete_entity(&mut self, delta: &EntityDelta, schema: &ObjectSchema) {
        let (Some(want), Some(have)) = (&delta.desired, &delta.current) else {
            return;
        };
        if have.is_empty_container() {
            return;
        }

        let Some(fields) = want.as_object() else {
            return;
        };
        if fields.keys().all(|f| schema.keys.is_identity(f)) {
            self.remove(&delta.path);
            return;
        }

        let mut clear = BTreeMap::new();
        for (name, value) in fields {
            if schema.keys.is_identity(name) {
                continue;
            }
            let selected = match schema.get(name) {
                Some(Schema::Scalar(_)) => have.get(name).filter(|h| *h == value).cloned(),
                Some(Schema::Set(_)) => {
                    let existing = members(have.get(name));
                    let picked: Vec<ConfigNode> = if value.is_empty_container() {
                        existing.to_vec()
                    } else {
                        existing
                            .iter()
                            .filter(|m| members(Some(value)).contains(*m))
                            .cloned()
                            .collect()
                    };
                    (!picked.is_empty()).then_some(ConfigNode::List(picked))
                }
                _ => None,
            };
            if let Some(selected) = selected {
                if schema.keys.is_deletable(name) {
                    clear.insert(name.clone(), selected);
                } else {
                    debug!("{}: '{name}' cannot be deleted, skipping", delta.path);
                }
            }
        }
        if !clear.is_empty() {
            self.push(
                Operation::new(OpKind::RemoveFields, delta.path.clone(), self.mode).with_payload(clear),
            );
        }

        for (name, child) in &delta.children {
            let Some(child_schema) = child_schema(schema, name) else {
                continue;
            };
            match child {
                ChildDelta::Object(entity) => self.delete_entity(entity, child_schema),
                ChildDelta::List(list) => match list.presence {
                    Presence::Empty => {
                        for entity in list.entities.iter().filter(|e| e.current.is_some()) {
                            self.remove(&entity.path);
                        }
                    }
                    Presence::Populated => {
                        for entity in &list.entities {
                            self.delete_entity(entity, child_schema);
                        }
                    }
                    Presence::Absent => {}
                },
            }
        }
    }
}

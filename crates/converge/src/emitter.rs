//! Command emission and `after` materialization

use log::trace;

use crate::node::{ConfigNode, Identity};
use crate::schema::{ResourceSchema, ScalarSpec, Schema};
use crate::template::CommandTemplate;
use crate::types::{Command, EntityPath, OpKind, Operation, Segment};

/// Commands for an operation batch and the configuration they lead to
#[derive(Debug, Clone)]
pub struct Emission {
    pub commands: Vec<Command>,
    pub after: ConfigNode,
}

/// Apply `operations` to a copy of `current` and render them through `template`
///
/// Operations must already be in send order; they are applied in that order.
pub fn emit(
    operations: &[Operation],
    current: &ConfigNode,
    schema: &ResourceSchema,
    template: &dyn CommandTemplate,
) -> Emission {
    let mut after = current.clone();
    let mut commands = Vec::new();
    for op in operations {
        apply(&mut after, op, schema);
        let rendered = template.render(op);
        for command in &rendered {
            trace!("{op} -> {command}");
        }
        commands.extend(rendered);
    }
    Emission { commands, after }
}

fn apply(tree: &mut ConfigNode, op: &Operation, schema: &ResourceSchema) {
    match op.kind {
        OpKind::Add => {
            if let Some(entity) = locate(tree, &op.path, true)
                && let Some(map) = entity.as_object_mut()
            {
                for (field, value) in &op.payload {
                    map.insert(field.clone(), value.clone());
                }
            }
        }
        OpKind::Modify => {
            if let Some(entity) = locate(tree, &op.path, true)
                && let Some(map) = entity.as_object_mut()
            {
                for (field, value) in &op.payload {
                    match (map.get_mut(field), value) {
                        (Some(ConfigNode::List(existing)), ConfigNode::List(added)) => {
                            existing.extend(added.iter().cloned());
                            existing.sort();
                            existing.dedup();
                        }
                        _ => {
                            map.insert(field.clone(), value.clone());
                        }
                    }
                }
            }
        }
        OpKind::RemoveFields => {
            let object = schema.object_at(&op.path);
            let Some(map) = locate(tree, &op.path, false).and_then(ConfigNode::as_object_mut) else {
                return;
            };
            for (field, value) in &op.payload {
                let field_schema = object.and_then(|o| o.get(field));
                match (field_schema, value) {
                    (Some(Schema::Set(_)), ConfigNode::List(removed)) => {
                        if let Some(ConfigNode::List(existing)) = map.get_mut(field) {
                            existing.retain(|m| !removed.contains(m));
                            if existing.is_empty() {
                                map.remove(field);
                            }
                        }
                    }
                    (
                        Some(Schema::Scalar(ScalarSpec {
                            default: Some(default),
                            ..
                        })),
                        _,
                    ) => {
                        map.insert(field.clone(), ConfigNode::Scalar(default.clone()));
                    }
                    _ => {
                        map.remove(field);
                    }
                }
            }
        }
        OpKind::Remove => remove(tree, &op.path),
    }
}

fn remove(tree: &mut ConfigNode, path: &EntityPath) {
    let Some(last) = path.last() else {
        return;
    };
    let Some(parent) = path.parent() else {
        // the resource itself
        match (&last.identity, tree) {
            (Some(identity), ConfigNode::List(items)) => items.retain(|n| !identity.matches(n)),
            (None, tree) => *tree = ConfigNode::empty_object(),
            _ => {}
        }
        return;
    };
    let Some(map) = locate(tree, &parent, false).and_then(ConfigNode::as_object_mut) else {
        return;
    };
    match &last.identity {
        Some(identity) => {
            if let Some(ConfigNode::List(items)) = map.get_mut(&last.field) {
                items.retain(|n| !identity.matches(n));
                if items.is_empty() {
                    map.remove(&last.field);
                }
            }
        }
        None => {
            map.remove(&last.field);
        }
    }
}

/// Find the entity `path` points at, creating it (and plain objects and
/// lists on the way) when `create` is set
fn locate<'t>(tree: &'t mut ConfigNode, path: &EntityPath, create: bool) -> Option<&'t mut ConfigNode> {
    let (first, rest) = path.segments().split_first()?;
    let mut node = match &first.identity {
        Some(identity) => list_item(tree.as_list_mut()?, identity, create)?,
        None => tree,
    };
    for segment in rest {
        node = descend(node, segment, create)?;
    }
    Some(node)
}

fn descend<'t>(node: &'t mut ConfigNode, segment: &Segment, create: bool) -> Option<&'t mut ConfigNode> {
    let map = node.as_object_mut()?;
    if !create && !map.contains_key(&segment.field) {
        return None;
    }
    match &segment.identity {
        None => Some(
            map.entry(segment.field.clone())
                .or_insert_with(ConfigNode::empty_object),
        ),
        Some(identity) => {
            let list = map
                .entry(segment.field.clone())
                .or_insert_with(ConfigNode::empty_list)
                .as_list_mut()?;
            list_item(list, identity, create)
        }
    }
}

/// The item of a keyed list with `identity`; a new item is inserted in
/// identity order
fn list_item<'t>(
    items: &'t mut Vec<ConfigNode>,
    identity: &Identity,
    create: bool,
) -> Option<&'t mut ConfigNode> {
    if let Some(pos) = items.iter().position(|n| identity.matches(n)) {
        return items.get_mut(pos);
    }
    if !create {
        return None;
    }
    let fields = identity.field_names();
    let pos = items.partition_point(|n| Identity::of(n, &fields).as_ref() < Some(identity));
    items.insert(pos, ConfigNode::Object(identity.to_object()));
    items.get_mut(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Scalar;
    use crate::schema::ObjectSchema;
    use crate::template::RestTemplate;
    use crate::types::ConvergenceMode;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn schema() -> ResourceSchema {
        ResourceSchema::list(
            "ports",
            ObjectSchema::new()
                .field("name", ScalarSpec::str())
                .field("mtu", ScalarSpec::int().default_value(9100))
                .field("speed", ScalarSpec::str())
                .field("vlans", Schema::set(ScalarSpec::int()))
                .field(
                    "counters",
                    Schema::object(ObjectSchema::new().field("interval", ScalarSpec::int())),
                )
                .identity(&["name"]),
        )
    }

    fn name(value: &str) -> Identity {
        Identity(vec![("name".to_string(), ConfigNode::Scalar(Scalar::from(value)))])
    }

    fn payload(value: serde_json::Value) -> BTreeMap<String, ConfigNode> {
        match serde_json::from_value(value).unwrap() {
            ConfigNode::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn run(ops: &[Operation], current: serde_json::Value) -> Emission {
        let current = serde_json::from_value(current).unwrap();
        emit(ops, &current, &schema(), &RestTemplate::new("ports"))
    }

    #[test]
    fn test_add_inserts_in_identity_order() {
        let op = Operation::new(
            OpKind::Add,
            EntityPath::root("ports", Some(name("Eth2"))),
            ConvergenceMode::Merged,
        )
        .with_payload(payload(json!({"speed": "10G"})));
        let emission = run(&[op], json!([{"name": "Eth1"}, {"name": "Eth3"}]));
        assert_eq!(
            emission.after.to_json(),
            json!([{"name": "Eth1"}, {"name": "Eth2", "speed": "10G"}, {"name": "Eth3"}])
        );
        assert_eq!(
            emission.commands[0].to_string(),
            r#"PATCH ports=Eth2 {"name":"Eth2","speed":"10G"}"#
        );
    }

    #[test]
    fn test_modify_creates_plain_objects_and_unites_sets() {
        let entity = EntityPath::root("ports", Some(name("Eth1")));
        let ops = [
            Operation::new(OpKind::Modify, entity.clone(), ConvergenceMode::Merged)
                .with_payload(payload(json!({"vlans": [20]}))),
            Operation::new(OpKind::Add, entity.child("counters", None), ConvergenceMode::Merged)
                .with_payload(payload(json!({"interval": 30}))),
        ];
        let emission = run(&ops, json!([{"name": "Eth1", "vlans": [10]}]));
        assert_eq!(
            emission.after.to_json(),
            json!([{"name": "Eth1", "vlans": [10, 20], "counters": {"interval": 30}}])
        );
    }

    #[test]
    fn test_remove_fields_resets_defaults() {
        let op = Operation::new(
            OpKind::RemoveFields,
            EntityPath::root("ports", Some(name("Eth1"))),
            ConvergenceMode::Deleted,
        )
        .with_payload(payload(json!({"mtu": 1500, "speed": "10G", "vlans": [10]})));
        let emission = run(
            &[op],
            json!([{"name": "Eth1", "mtu": 1500, "speed": "10G", "vlans": [10, 20]}]),
        );
        assert_eq!(
            emission.after.to_json(),
            json!([{"name": "Eth1", "mtu": 9100, "vlans": [20]}])
        );
        assert_eq!(emission.commands.len(), 3);
    }

    #[test]
    fn test_remove_entity_and_nested_object() {
        let ops = [
            Operation::new(
                OpKind::Remove,
                EntityPath::root("ports", Some(name("Eth1"))).child("counters", None),
                ConvergenceMode::Overridden,
            ),
            Operation::new(
                OpKind::Remove,
                EntityPath::root("ports", Some(name("Eth2"))),
                ConvergenceMode::Overridden,
            ),
        ];
        let emission = run(
            &ops,
            json!([{"name": "Eth1", "counters": {"interval": 5}}, {"name": "Eth2"}]),
        );
        assert_eq!(emission.after.to_json(), json!([{"name": "Eth1"}]));
        assert_eq!(
            emission
                .commands
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            vec!["DELETE ports=Eth1/counters", "DELETE ports=Eth2"]
        );
    }

    #[test]
    fn test_operations_on_missing_entities_are_ignored() {
        let op = Operation::new(
            OpKind::RemoveFields,
            EntityPath::root("ports", Some(name("Eth9"))),
            ConvergenceMode::Deleted,
        )
        .with_payload(payload(json!({"speed": "10G"})));
        let emission = run(&[op], json!([{"name": "Eth1"}]));
        assert_eq!(emission.after.to_json(), json!([{"name": "Eth1"}]));
    }
}

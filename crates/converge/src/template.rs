//! Command templates
//!
//! Rendering an [`Operation`] into device commands is outside the diff
//! algorithm; every resource supplies a [`CommandTemplate`]. [`RestTemplate`]
//! covers the common case of a REST-style management interface where each
//! entity has its own URL.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::node::{ConfigNode, Identity};
use crate::types::{Command, EntityPath, Method, OpKind, Operation};

/// Renders operations into device commands
pub trait CommandTemplate: Send + Sync {
    /// Commands for one operation, in the order they must be sent
    fn render(&self, op: &Operation) -> Vec<Command>;
}

/// REST-style rendering: `PATCH` to create or update, `DELETE` to remove
///
/// The URL of an entity is the resource base followed by one path element per
/// nested field, with list items addressed as `field=key1,key2`. Field names
/// are sent in kebab-case unless renamed.
#[derive(Debug, Clone)]
pub struct RestTemplate {
    base: String,
    renames: BTreeMap<String, String>,
}

impl RestTemplate {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            renames: BTreeMap::new(),
        }
    }

    /// Send `field` as `wire` instead of its kebab-case form
    #[must_use]
    pub fn rename(mut self, field: &str, wire: &str) -> Self {
        self.renames.insert(field.to_string(), wire.to_string());
        self
    }

    fn wire(&self, field: &str) -> String {
        self.renames
            .get(field)
            .cloned()
            .unwrap_or_else(|| field.replace('_', "-"))
    }

    pub fn url(&self, path: &EntityPath) -> String {
        let mut url = self.base.clone();
        for (i, segment) in path.segments().iter().enumerate() {
            if i > 0 {
                url.push('/');
                url.push_str(&self.wire(&segment.field));
            }
            if let Some(identity) = &segment.identity {
                url.push('=');
                url.push_str(&key_values(identity));
            }
        }
        url
    }

    fn body(&self, op: &Operation) -> Value {
        let mut body = Map::new();
        if let Some(identity) = op.identity() {
            for (field, value) in &identity.0 {
                body.insert(self.wire(field), self.json(value));
            }
        }
        for (field, value) in &op.payload {
            body.insert(self.wire(field), self.json(value));
        }
        Value::Object(body)
    }

    /// JSON with wire field names
    fn json(&self, node: &ConfigNode) -> Value {
        match node {
            ConfigNode::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (self.wire(k), self.json(v)))
                    .collect(),
            ),
            ConfigNode::List(items) => Value::Array(items.iter().map(|n| self.json(n)).collect()),
            ConfigNode::Scalar(s) => s.to_json(),
        }
    }
}

impl CommandTemplate for RestTemplate {
    fn render(&self, op: &Operation) -> Vec<Command> {
        let url = self.url(&op.path);
        match op.kind {
            OpKind::Add | OpKind::Modify => vec![Command {
                method: Method::Patch,
                path: url,
                body: Some(self.body(op)),
            }],
            OpKind::Remove => vec![Command {
                method: Method::Delete,
                path: url,
                body: None,
            }],
            OpKind::RemoveFields => op
                .payload
                .iter()
                .flat_map(|(field, value)| {
                    let field_url = format!("{url}/{}", self.wire(field));
                    match value {
                        ConfigNode::List(members) => members
                            .iter()
                            .map(|m| delete(format!("{field_url}={}", encode(&m.to_string()))))
                            .collect(),
                        _ => vec![delete(field_url)],
                    }
                })
                .collect(),
        }
    }
}

fn delete(path: String) -> Command {
    Command {
        method: Method::Delete,
        path,
        body: None,
    }
}

fn key_values(identity: &Identity) -> String {
    let mut values = Vec::new();
    for (_, value) in &identity.0 {
        match value {
            ConfigNode::Object(map) => values.extend(map.values().map(|v| encode(&v.to_string()))),
            other => values.push(encode(&other.to_string())),
        }
    }
    values.join(",")
}

/// Percent-encode the characters that are structural in a key path
fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' | '/' | ' ' | ',' | '=' | '?' | '#' => {
                let _ = write!(out, "%{:02X}", c as u32);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Scalar;
    use crate::types::ConvergenceMode;
    use serde_json::json;

    fn str_id(field: &str, value: &str) -> Identity {
        Identity(vec![(field.to_string(), ConfigNode::Scalar(Scalar::from(value)))])
    }

    fn template() -> RestTemplate {
        RestTemplate::new("data/openconfig-network-instance:network-instances/network-instance")
            .rename("static_list", "static")
    }

    #[test]
    fn test_url_encodes_keys() {
        let path = EntityPath::root("static_routes", Some(str_id("vrf_name", "default")))
            .child("static_list", Some(str_id("prefix", "10.0.0.0/8")));
        assert_eq!(
            template().url(&path),
            "data/openconfig-network-instance:network-instances/network-instance=default/static=10.0.0.0%2F8"
        );
    }

    #[test]
    fn test_render_add_and_remove_fields() {
        let path = EntityPath::root("static_routes", Some(str_id("vrf_name", "Vrf_1")));
        let mut payload = BTreeMap::new();
        payload.insert("max_paths".to_string(), ConfigNode::Scalar(Scalar::Int(4)));
        let add = Operation::new(OpKind::Add, path.clone(), ConvergenceMode::Merged)
            .with_payload(payload);
        let cmds = template().render(&add);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].method, Method::Patch);
        assert_eq!(
            cmds[0].body,
            Some(json!({"vrf-name": "Vrf_1", "max-paths": 4}))
        );

        let mut payload = BTreeMap::new();
        payload.insert(
            "source_interfaces".to_string(),
            ConfigNode::List(vec![
                ConfigNode::Scalar(Scalar::from("Ethernet0")),
                ConfigNode::Scalar(Scalar::from("Ethernet4")),
            ]),
        );
        payload.insert("max_paths".to_string(), ConfigNode::Scalar(Scalar::Int(4)));
        let clear = Operation::new(OpKind::RemoveFields, path, ConvergenceMode::Deleted)
            .with_payload(payload);
        let rendered: Vec<String> = template()
            .render(&clear)
            .iter()
            .map(ToString::to_string)
            .collect();
        let base = "data/openconfig-network-instance:network-instances/network-instance=Vrf_1";
        assert_eq!(
            rendered,
            vec![
                format!("DELETE {base}/max-paths"),
                format!("DELETE {base}/source-interfaces=Ethernet0"),
                format!("DELETE {base}/source-interfaces=Ethernet4"),
            ]
        );
    }

    #[test]
    fn test_object_identity_key() {
        let index = ConfigNode::Object(
            [
                ("blackhole".to_string(), ConfigNode::Scalar(Scalar::Bool(false))),
                ("next_hop".to_string(), ConfigNode::Scalar(Scalar::from("10.0.0.1"))),
            ]
            .into(),
        );
        let id = Identity(vec![("index".to_string(), index)]);
        let path = EntityPath::root("r", None).child("next_hops", Some(id));
        assert_eq!(RestTemplate::new("base").url(&path), "base/next-hops=false,10.0.0.1");
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("a b/c,d"), "a%20b%2Fc%2Cd");
        assert_eq!(encode("00:00:5e:00:53:af"), "00:00:5e:00:53:af");
    }
}

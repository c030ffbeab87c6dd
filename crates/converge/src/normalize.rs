//! Normalization of raw documents into [`ConfigNode`] trees
//!
//! Both the desired document and the device facts pass through [`normalize`]
//! so that they can be compared structurally: values are coerced to their
//! declared types, rewritten to canonical form, and keyed lists are sorted by
//! identity.

use log::trace;
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::SchemaError;
use crate::node::{ConfigNode, Identity, Scalar};
use crate::schema::{Canonical, ObjectSchema, ResourceSchema, ScalarSpec, ScalarType, Schema};

/// Normalize a raw document against a resource schema
///
/// A `null` document (or a missing one) normalizes to an empty container of
/// the root kind. Fields set to `null` are treated as absent; explicit-empty
/// lists and objects are kept.
pub fn normalize(raw: &Value, schema: &ResourceSchema) -> Result<ConfigNode, SchemaError> {
    let path = schema.name.as_str();
    let node = match (&schema.root, raw) {
        (Schema::List(_), Value::Null) => ConfigNode::empty_list(),
        (Schema::Object(_), Value::Null) => ConfigNode::empty_object(),
        (Schema::List(item), _) => normalize_list(raw, item, path)?,
        (Schema::Object(object), _) => normalize_object(raw, object, path)?,
        (other, _) => {
            return Err(SchemaError::TypeMismatch {
                path: path.to_string(),
                expected: "object or list root".to_string(),
                found: other.kind().to_string(),
            });
        }
    };
    trace!("normalized {path}: {node}");
    Ok(node)
}

/// Normalize device facts
///
/// Facts must name every keyed entity once; a repeated identity makes the
/// document malformed.
pub fn normalize_facts(raw: &Value, schema: &ResourceSchema) -> Result<ConfigNode, SchemaError> {
    let node = normalize(raw, schema)?;
    match &schema.root {
        Schema::List(item) => unique_list(&node, item, &schema.name)?,
        Schema::Object(object) => unique_object(&node, object, &schema.name)?,
        _ => {}
    }
    Ok(node)
}

fn unique_object(node: &ConfigNode, schema: &ObjectSchema, path: &str) -> Result<(), SchemaError> {
    for (name, field_schema) in &schema.fields {
        let Some(child) = node.get(name) else {
            continue;
        };
        let child_path = format!("{path}.{name}");
        match field_schema {
            Schema::Object(object) => unique_object(child, object, &child_path)?,
            Schema::List(item) => unique_list(child, item, &child_path)?,
            Schema::Scalar(_) | Schema::Set(_) => {}
        }
    }
    Ok(())
}

/// Normalized lists are sorted by identity, so duplicates are neighbours
fn unique_list(node: &ConfigNode, item: &ObjectSchema, path: &str) -> Result<(), SchemaError> {
    let items = node.as_list().unwrap_or_default();
    let fields = &item.keys.identity_fields;
    for pair in items.windows(2) {
        if let Some(identity) = Identity::of(&pair[1], fields)
            && Identity::of(&pair[0], fields).as_ref() == Some(&identity)
        {
            return Err(SchemaError::DuplicateIdentity {
                path: path.to_string(),
                identity: identity.to_string(),
            });
        }
    }
    for (i, entity) in items.iter().enumerate() {
        unique_object(entity, item, &format!("{path}[{i}]"))?;
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn mismatch(path: &str, expected: &str, value: &Value) -> SchemaError {
    SchemaError::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found: json_kind(value).to_string(),
    }
}

fn normalize_node(raw: &Value, schema: &Schema, path: &str) -> Result<ConfigNode, SchemaError> {
    match schema {
        Schema::Scalar(spec) => normalize_scalar(raw, spec, path).map(ConfigNode::Scalar),
        Schema::Set(spec) => normalize_set(raw, spec, path),
        Schema::Object(object) => normalize_object(raw, object, path),
        Schema::List(item) => normalize_list(raw, item, path),
    }
}

fn normalize_object(
    raw: &Value,
    schema: &ObjectSchema,
    path: &str,
) -> Result<ConfigNode, SchemaError> {
    let Value::Object(fields) = raw else {
        return Err(mismatch(path, "object", raw));
    };

    let mut map = BTreeMap::new();
    for (name, value) in fields {
        let Some(field_schema) = schema.get(name) else {
            return Err(SchemaError::UnknownField {
                path: path.to_string(),
                field: name.clone(),
            });
        };
        if value.is_null() {
            continue;
        }
        let child_path = format!("{path}.{name}");
        let mut node = normalize_node(value, field_schema, &child_path)?;
        if schema.keys.is_identity(name)
            && let Schema::Object(identity_schema) = field_schema
        {
            fill_defaults(&mut node, identity_schema);
        }
        map.insert(name.clone(), node);
    }
    for name in &schema.keys.identity_fields {
        if let Some(default) = schema.default_of(name) {
            map.entry(name.clone())
                .or_insert_with(|| ConfigNode::Scalar(default.clone()));
        }
    }
    Ok(ConfigNode::Object(map))
}

/// Identity sub-objects compare with their defaults filled in
fn fill_defaults(node: &mut ConfigNode, schema: &ObjectSchema) {
    if let Some(map) = node.as_object_mut() {
        for (name, field_schema) in &schema.fields {
            if let Schema::Scalar(spec) = field_schema
                && let Some(default) = &spec.default
            {
                map.entry(name.clone())
                    .or_insert_with(|| ConfigNode::Scalar(default.clone()));
            }
        }
    }
}

fn normalize_list(raw: &Value, item: &ObjectSchema, path: &str) -> Result<ConfigNode, SchemaError> {
    let Value::Array(values) = raw else {
        return Err(mismatch(path, "list", raw));
    };

    let mut items = Vec::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        let item_path = format!("{path}[{i}]");
        let node = normalize_object(value, item, &item_path)?;
        if let Some(field) = Identity::missing_fields(&node, &item.keys.identity_fields)
            .into_iter()
            .next()
        {
            return Err(SchemaError::MissingIdentity {
                path: item_path,
                field,
            });
        }
        items.push(node);
    }
    let identity_fields = &item.keys.identity_fields;
    items.sort_by_cached_key(|n| Identity::of(n, identity_fields));
    Ok(ConfigNode::List(items))
}

fn normalize_set(raw: &Value, spec: &ScalarSpec, path: &str) -> Result<ConfigNode, SchemaError> {
    let Value::Array(values) = raw else {
        return Err(mismatch(path, "list", raw));
    };

    let mut members = values
        .iter()
        .enumerate()
        .map(|(i, v)| normalize_scalar(v, spec, &format!("{path}[{i}]")).map(ConfigNode::Scalar))
        .collect::<Result<Vec<_>, _>>()?;
    members.sort();
    members.dedup();
    Ok(ConfigNode::List(members))
}

fn normalize_scalar(raw: &Value, spec: &ScalarSpec, path: &str) -> Result<Scalar, SchemaError> {
    let scalar = coerce(raw, spec.ty, path)?;
    let scalar = match scalar {
        Scalar::Str(s) => Scalar::Str(canonicalize(&s, spec.canonical, path)?),
        other => other,
    };

    if !spec.choices.is_empty() && !spec.choices.contains(&scalar) {
        return Err(SchemaError::InvalidChoice {
            path: path.to_string(),
            value: scalar.to_string(),
            choices: spec.choices.iter().map(ToString::to_string).collect(),
        });
    }
    if let (Some((min, max)), Scalar::Int(value)) = (spec.range, &scalar)
        && !(min..=max).contains(value)
    {
        return Err(SchemaError::OutOfRange {
            path: path.to_string(),
            value: *value,
            min,
            max,
        });
    }
    Ok(scalar)
}

fn coerce(raw: &Value, ty: ScalarType, path: &str) -> Result<Scalar, SchemaError> {
    match (ty, raw) {
        (ScalarType::Str, Value::String(s)) => Ok(Scalar::Str(s.clone())),
        (ScalarType::Str, Value::Number(n)) => Ok(Scalar::Str(n.to_string())),
        (ScalarType::Str, Value::Bool(b)) => Ok(Scalar::Str(b.to_string())),
        (ScalarType::Int, Value::Number(n)) => n
            .as_i64()
            .map(Scalar::Int)
            .ok_or_else(|| mismatch(path, "int", raw)),
        (ScalarType::Int, Value::String(s)) => s
            .trim()
            .parse()
            .map(Scalar::Int)
            .map_err(|_| mismatch(path, "int", raw)),
        (ScalarType::Bool, Value::Bool(b)) => Ok(Scalar::Bool(*b)),
        (ScalarType::Bool, Value::String(s)) => {
            parse_bool(s).map(Scalar::Bool).ok_or_else(|| mismatch(path, "bool", raw))
        }
        (ScalarType::Bool, Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(Scalar::Bool(false)),
            Some(1) => Ok(Scalar::Bool(true)),
            _ => Err(mismatch(path, "bool", raw)),
        },
        (ty, _) => Err(mismatch(path, ty.name(), raw)),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn canonicalize(value: &str, rule: Canonical, path: &str) -> Result<String, SchemaError> {
    match rule {
        Canonical::Verbatim => Ok(value.to_string()),
        Canonical::Lowercase => Ok(value.to_ascii_lowercase()),
        Canonical::Uppercase => Ok(value.to_ascii_uppercase()),
        Canonical::Address => {
            canonical_address(value.trim()).ok_or_else(|| invalid_address(path, value, "address"))
        }
        Canonical::Prefix => {
            canonical_prefix(value.trim()).ok_or_else(|| invalid_address(path, value, "prefix"))
        }
        Canonical::DottedQuad => {
            dotted_quad(value.trim()).ok_or_else(|| invalid_address(path, value, "dotted-quad id"))
        }
    }
}

fn invalid_address(path: &str, value: &str, kind: &'static str) -> SchemaError {
    SchemaError::InvalidAddress {
        path: path.to_string(),
        value: value.to_string(),
        kind,
    }
}

/// An address, optionally with a prefix length; host bits are kept
fn canonical_address(value: &str) -> Option<String> {
    let Some((addr, len)) = value.split_once('/') else {
        return value.parse::<IpAddr>().ok().map(|addr| addr.to_string());
    };
    let addr = addr.parse::<IpAddr>().ok()?;
    let len: u32 = len.parse().ok()?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    (len <= max).then(|| format!("{addr}/{len}"))
}

/// `2` -> `0.0.0.2`
fn dotted_quad(value: &str) -> Option<String> {
    let id = match value.parse::<u32>() {
        Ok(n) => Ipv4Addr::from(n),
        Err(_) => value.parse::<Ipv4Addr>().ok()?,
    };
    Some(id.to_string())
}

/// `10.1.1.5/24` -> `10.1.1.0/24`, `2001:DB8::1/32` -> `2001:db8::/32`
fn canonical_prefix(value: &str) -> Option<String> {
    let (addr, len) = value.split_once('/')?;
    let len: u32 = len.parse().ok()?;
    match addr.parse::<IpAddr>().ok()? {
        IpAddr::V4(v4) => {
            if len > 32 {
                return None;
            }
            let mask = u32::MAX.checked_shl(32 - len).unwrap_or(0);
            Some(format!("{}/{len}", Ipv4Addr::from(u32::from(v4) & mask)))
        }
        IpAddr::V6(v6) => {
            if len > 128 {
                return None;
            }
            let mask = u128::MAX.checked_shl(128 - len).unwrap_or(0);
            Some(format!("{}/{len}", Ipv6Addr::from(u128::from(v6) & mask)))
        }
    }
}

impl ConfigNode {
    /// Canonical view of a normalized tree: leaf fields equal to their
    /// default are dropped (identity fields excepted), then empty sub-trees
    /// are pruned
    ///
    /// Two documents that configure the same device state have the same
    /// canonical view.
    pub fn strip_defaults(&self, schema: &ResourceSchema) -> Self {
        let stripped = match &schema.root {
            Schema::List(item) => strip_list(self, item),
            Schema::Object(object) => strip_object(self, object),
            _ => self.clone(),
        };
        stripped.prune_empty()
    }
}

fn strip_list(node: &ConfigNode, item: &ObjectSchema) -> ConfigNode {
    match node {
        ConfigNode::List(items) => {
            ConfigNode::List(items.iter().map(|n| strip_object(n, item)).collect())
        }
        other => other.clone(),
    }
}

fn strip_object(node: &ConfigNode, schema: &ObjectSchema) -> ConfigNode {
    let Some(map) = node.as_object() else {
        return node.clone();
    };
    let mut out = BTreeMap::new();
    for (name, value) in map {
        if schema.keys.is_identity(name) {
            out.insert(name.clone(), value.clone());
            continue;
        }
        match schema.get(name) {
            Some(Schema::Scalar(spec)) => {
                if spec.default.as_ref() != value.as_scalar() {
                    out.insert(name.clone(), value.clone());
                }
            }
            Some(Schema::Object(o)) => {
                out.insert(name.clone(), strip_object(value, o));
            }
            Some(Schema::List(o)) => {
                out.insert(name.clone(), strip_list(value, o));
            }
            _ => {
                out.insert(name.clone(), value.clone());
            }
        }
    }
    ConfigNode::Object(out)
}

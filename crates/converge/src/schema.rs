//! Declarative resource schemas
//!
//! Every resource describes its document with a [`ResourceSchema`]: a tree of
//! [`Schema`] nodes whose object levels carry a [`KeySpec`]. The differ,
//! planner and emitter are generic over this metadata; no resource carries
//! its own comparison code.
//!
//! ```
//! use converge::schema::{ObjectSchema, ResourceSchema, Schema, ScalarSpec};
//!
//! let schema = ResourceSchema::list(
//!     "vlans",
//!     ObjectSchema::new()
//!         .field("vlan_id", ScalarSpec::int().range(1, 4094))
//!         .field("name", ScalarSpec::str())
//!         .identity(&["vlan_id"]),
//! );
//! assert!(schema.problems().is_empty());
//! ```

use std::collections::BTreeSet;

use crate::node::Scalar;
use crate::types::EntityPath;

/// Type of a leaf value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Str,
    Int,
    Bool,
}

impl ScalarType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Bool => "bool",
        }
    }
}

/// Canonical form a string value is rewritten to before comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Canonical {
    #[default]
    Verbatim,
    /// Hex strings, MAC addresses
    Lowercase,
    Uppercase,
    /// An IPv4/IPv6 address, optionally `address/len`
    Address,
    /// `address/len` with the host bits cleared
    Prefix,
    /// A 32-bit identifier written `A.B.C.D` or as a plain integer
    DottedQuad,
}

/// Schema of a leaf value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarSpec {
    pub ty: ScalarType,
    pub default: Option<Scalar>,
    pub choices: Vec<Scalar>,
    pub range: Option<(i64, i64)>,
    pub canonical: Canonical,
}

impl ScalarSpec {
    fn of(ty: ScalarType) -> Self {
        Self {
            ty,
            default: None,
            choices: Vec::new(),
            range: None,
            canonical: Canonical::Verbatim,
        }
    }

    /// Create a string scalar
    pub fn str() -> Self {
        Self::of(ScalarType::Str)
    }

    /// Create an integer scalar
    pub fn int() -> Self {
        Self::of(ScalarType::Int)
    }

    /// Create a boolean scalar
    pub fn bool() -> Self {
        Self::of(ScalarType::Bool)
    }

    /// Value the device reports when the field is not configured
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Scalar>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Restrict the field to a fixed set of values
    #[must_use]
    pub fn choices<S: Into<Scalar>>(mut self, choices: impl IntoIterator<Item = S>) -> Self {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Inclusive integer range
    #[must_use]
    pub const fn range(mut self, min: i64, max: i64) -> Self {
        self.range = Some((min, max));
        self
    }

    /// Rewrite values to this canonical form during normalization
    #[must_use]
    pub const fn canonical(mut self, canonical: Canonical) -> Self {
        self.canonical = canonical;
        self
    }
}

/// Identity and mutability metadata of one object level
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpec {
    /// Ordered fields that uniquely name an item of a keyed list
    pub identity_fields: Vec<String>,
    /// Fields the device refuses to remove individually; every other
    /// non-identity field is deletable
    pub undeletable_fields: BTreeSet<String>,
    /// Fields that cannot change once set; changing one recreates the entity
    pub immutable_fields: BTreeSet<String>,
    /// Fields an entity must carry to be created
    pub required_for_create: BTreeSet<String>,
}

impl KeySpec {
    /// Whether `field` is part of the identity
    pub fn is_identity(&self, field: &str) -> bool {
        self.identity_fields.iter().any(|f| f == field)
    }

    /// Whether `field` may be removed on its own
    pub fn is_deletable(&self, field: &str) -> bool {
        !self.is_identity(field) && !self.undeletable_fields.contains(field)
    }

    /// Whether changing `field` requires recreating the entity
    pub fn is_immutable(&self, field: &str) -> bool {
        self.immutable_fields.contains(field)
    }
}

/// Schema of one object level: its fields in declaration order and its keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectSchema {
    pub fields: Vec<(String, Schema)>,
    pub keys: KeySpec,
}

fn names<'a>(fields: &'a [&str]) -> impl Iterator<Item = String> + 'a {
    fields.iter().map(|f| (*f).to_string())
}

impl ObjectSchema {
    /// Create an object level with no fields
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field; declaration order is the display order
    #[must_use]
    pub fn field(mut self, name: &str, schema: impl Into<Schema>) -> Self {
        self.fields.push((name.to_string(), schema.into()));
        self
    }

    /// Set the fields that name an item when this level is a keyed list
    #[must_use]
    pub fn identity(mut self, fields: &[&str]) -> Self {
        self.keys.identity_fields = names(fields).collect();
        self
    }

    /// Mark fields the device refuses to remove individually
    #[must_use]
    pub fn undeletable(mut self, fields: &[&str]) -> Self {
        self.keys.undeletable_fields.extend(names(fields));
        self
    }

    /// Mark fields that cannot change once set
    #[must_use]
    pub fn immutable(mut self, fields: &[&str]) -> Self {
        self.keys.immutable_fields.extend(names(fields));
        self
    }

    /// Mark fields a new entity must carry
    #[must_use]
    pub fn required(mut self, fields: &[&str]) -> Self {
        self.keys.required_for_create.extend(names(fields));
        self
    }

    /// Schema of a field
    pub fn get(&self, field: &str) -> Option<&Schema> {
        self.fields.iter().find(|(n, _)| n == field).map(|(_, s)| s)
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Default of a scalar field, if it has one
    pub fn default_of(&self, field: &str) -> Option<&Scalar> {
        match self.get(field)? {
            Schema::Scalar(spec) => spec.default.as_ref(),
            _ => None,
        }
    }

    /// Fields that are neither identity nor undeletable
    pub fn deletable_fields(&self) -> Vec<&str> {
        self.field_names()
            .filter(|f| self.keys.is_deletable(f))
            .collect()
    }
}

/// Schema of a document node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schema {
    Scalar(ScalarSpec),
    /// Unordered list of scalars; a member is its own identity
    Set(ScalarSpec),
    Object(ObjectSchema),
    /// Keyed list of records
    List(ObjectSchema),
}

impl Schema {
    /// Create a set of scalars
    pub fn set(spec: ScalarSpec) -> Self {
        Self::Set(spec)
    }

    /// Create a nested object
    pub fn object(schema: ObjectSchema) -> Self {
        Self::Object(schema)
    }

    /// Create a keyed list of `schema` items
    pub fn list(schema: ObjectSchema) -> Self {
        Self::List(schema)
    }

    /// Scalars and sets are leaves; they travel in operation payloads
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Set(_))
    }

    /// Human-readable kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(spec) => spec.ty.name(),
            Self::Set(_) => "list of scalars",
            Self::Object(_) => "object",
            Self::List(_) => "list",
        }
    }

    /// The object level of an object or of a list's items
    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            Self::Object(o) | Self::List(o) => Some(o),
            _ => None,
        }
    }
}

impl From<ScalarSpec> for Schema {
    fn from(spec: ScalarSpec) -> Self {
        Self::Scalar(spec)
    }
}

/// The schema of a whole resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSchema {
    pub name: String,
    /// Either a keyed list or an object
    pub root: Schema,
}

impl ResourceSchema {
    /// Create a resource whose document is a keyed list of `item`
    pub fn list(name: &str, item: ObjectSchema) -> Self {
        Self {
            name: name.to_string(),
            root: Schema::List(item),
        }
    }

    /// Create a resource whose document is a single object
    pub fn object(name: &str, root: ObjectSchema) -> Self {
        Self {
            name: name.to_string(),
            root: Schema::Object(root),
        }
    }

    /// Object schema of the root object or of the root list's items
    pub fn root_object(&self) -> Option<&ObjectSchema> {
        self.root.as_object()
    }

    /// Whether the document is a keyed list
    pub fn is_list_root(&self) -> bool {
        matches!(self.root, Schema::List(_))
    }

    /// Object schema of the entity `path` points at
    pub fn object_at(&self, path: &EntityPath) -> Option<&ObjectSchema> {
        let (first, rest) = path.segments().split_first()?;
        if first.field != self.name {
            return None;
        }
        let mut object = self.root_object()?;
        for segment in rest {
            object = object.get(&segment.field)?.as_object()?;
        }
        Some(object)
    }

    /// Consistency problems of the schema definition itself
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        match &self.root {
            Schema::List(item) => check_object(item, &self.name, true, &mut problems),
            Schema::Object(object) => check_object(object, &self.name, false, &mut problems),
            other => problems.push(format!(
                "{}: root must be an object or a list, not {}",
                self.name,
                other.kind()
            )),
        }
        problems
    }
}

fn check_object(object: &ObjectSchema, path: &str, keyed: bool, problems: &mut Vec<String>) {
    let keys = &object.keys;
    if keyed && keys.identity_fields.is_empty() {
        problems.push(format!("{path}: keyed list has no identity fields"));
    }
    if !keyed && !keys.identity_fields.is_empty() {
        problems.push(format!("{path}: only list items can have identity fields"));
    }
    let declared = keys
        .identity_fields
        .iter()
        .chain(&keys.undeletable_fields)
        .chain(&keys.immutable_fields)
        .chain(&keys.required_for_create);
    for field in declared {
        if object.get(field).is_none() {
            problems.push(format!("{path}: key metadata names unknown field '{field}'"));
        }
    }
    for field in &keys.identity_fields {
        if let Some(schema) = object.get(field)
            && !matches!(schema, Schema::Scalar(_) | Schema::Object(_))
        {
            problems.push(format!("{path}.{field}: identity field must be a scalar or object"));
        }
        if keys.immutable_fields.contains(field) || keys.undeletable_fields.contains(field) {
            problems.push(format!("{path}.{field}: identity field cannot carry other key metadata"));
        }
    }
    let mut seen = BTreeSet::new();
    for (name, schema) in &object.fields {
        if !seen.insert(name) {
            problems.push(format!("{path}: field '{name}' declared twice"));
        }
        let child = format!("{path}.{name}");
        match schema {
            Schema::Object(o) => check_object(o, &child, false, problems),
            Schema::List(o) => check_object(o, &child, true, problems),
            Schema::Scalar(spec) | Schema::Set(spec) => check_scalar(spec, &child, problems),
        }
    }
}

fn check_scalar(spec: &ScalarSpec, path: &str, problems: &mut Vec<String>) {
    if let Some(default) = &spec.default {
        let matches_type = matches!(
            (spec.ty, default),
            (ScalarType::Str, Scalar::Str(_))
                | (ScalarType::Int, Scalar::Int(_))
                | (ScalarType::Bool, Scalar::Bool(_))
        );
        if !matches_type {
            problems.push(format!("{path}: default does not match type {}", spec.ty.name()));
        }
        if !spec.choices.is_empty() && !spec.choices.contains(default) {
            problems.push(format!("{path}: default is not one of the choices"));
        }
    }
    if let Some((min, max)) = spec.range
        && (spec.ty != ScalarType::Int || min > max)
    {
        problems.push(format!("{path}: invalid range {min}..={max}"));
    }
}

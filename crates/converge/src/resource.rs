//! Resource trait for schema-driven configuration
//!
//! A Resource is one configuration area of the device (NTP, static routes,
//! VRRP, ...). It carries no comparison logic of its own: it only declares
//! the shape of its document and how operations become commands.

use std::fmt;

use crate::schema::ResourceSchema;
use crate::template::{CommandTemplate, RestTemplate};
use crate::types::ConvergenceMode;

/// Core trait for reconcilable resources
///
/// # Example
///
/// ```
/// use converge::schema::{ObjectSchema, ResourceSchema, ScalarSpec};
/// use converge::{CommandTemplate, Resource, RestTemplate};
///
/// #[derive(Debug)]
/// struct Vlans {
///     schema: ResourceSchema,
///     template: RestTemplate,
/// }
///
/// impl Resource for Vlans {
///     fn name(&self) -> &str {
///         &self.schema.name
///     }
///
///     fn description(&self) -> String {
///         "VLAN configuration".into()
///     }
///
///     fn schema(&self) -> &ResourceSchema {
///         &self.schema
///     }
///
///     fn template(&self) -> &dyn CommandTemplate {
///         &self.template
///     }
/// }
///
/// let vlans = Vlans {
///     schema: ResourceSchema::list(
///         "vlans",
///         ObjectSchema::new()
///             .field("vlan_id", ScalarSpec::int())
///             .identity(&["vlan_id"]),
///     ),
///     template: RestTemplate::new("data/sonic-vlan:sonic-vlan/VLAN/VLAN_LIST"),
/// };
/// assert_eq!(vlans.name(), "vlans");
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Name of the resource, also the first segment of every entity path
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> String;

    fn schema(&self) -> &ResourceSchema;

    fn template(&self) -> &dyn CommandTemplate;

    /// States this resource accepts
    ///
    /// Some device areas only support adding and deleting; override to
    /// restrict.
    fn supported_modes(&self) -> &[ConvergenceMode] {
        &ConvergenceMode::ALL
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Extension trait for working with resources
pub trait ResourceExt {
    fn supports(&self, mode: ConvergenceMode) -> bool;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn supports(&self, mode: ConvergenceMode) -> bool {
        self.supported_modes().contains(&mode)
    }
}

/// A resource fully described by a schema and a REST template
#[derive(Debug, Clone)]
pub struct DeclaredResource {
    pub schema: ResourceSchema,
    pub template: RestTemplate,
    pub description: String,
    pub modes: Vec<ConvergenceMode>,
}

impl DeclaredResource {
    pub fn new(schema: ResourceSchema, template: RestTemplate, description: &str) -> Self {
        Self {
            schema,
            template,
            description: description.to_string(),
            modes: ConvergenceMode::ALL.to_vec(),
        }
    }

    #[must_use]
    pub fn with_modes(mut self, modes: &[ConvergenceMode]) -> Self {
        self.modes = modes.to_vec();
        self
    }
}

impl Resource for DeclaredResource {
    fn name(&self) -> &str {
        &self.schema.name
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn template(&self) -> &dyn CommandTemplate {
        &self.template
    }

    fn supported_modes(&self) -> &[ConvergenceMode] {
        &self.modes
    }
}

//! # Converge
//!
//! A state-reconciliation engine for schema-described device configuration.
//!
//! Given the desired configuration of a resource, the configuration the
//! device currently holds, and a convergence mode, the engine computes the
//! minimal ordered set of commands that brings the device to the desired
//! state, along with the configuration the device will hold afterwards.
//!
//! ## Core Concepts
//!
//! - **ConfigNode**: A normalized configuration tree (scalars, keyed lists, objects)
//! - **ResourceSchema**: The shape of a resource plus the identity and mutability
//!   metadata of every object level
//! - **Patch**: Entity-level differences between desired and current
//! - **Operation**: One ordered step chosen by the convergence mode
//! - **CommandTemplate**: Renders operations into device commands
//!
//! ## Pipeline
//!
//! ```text
//! desired, current ──normalize──▶ ConfigNode ──diff──▶ Patch
//!     ──resolve(mode)──▶ Operations ──emit──▶ Commands + after
//! ```
//!
//! ## Example
//!
//! ```
//! use converge::schema::{ObjectSchema, ResourceSchema, ScalarSpec};
//! use converge::{ConvergenceMode, DeclaredResource, RestTemplate, reconcile};
//! use serde_json::json;
//!
//! let mac = DeclaredResource::new(
//!     ResourceSchema::object(
//!         "mac",
//!         ObjectSchema::new().field("aging_time", ScalarSpec::int().default_value(600)),
//!     ),
//!     RestTemplate::new("data/openconfig-network-instance:network-instances/network-instance=default/fdb"),
//!     "MAC table",
//! );
//!
//! let result = reconcile(
//!     &mac,
//!     &json!({"aging_time": 50}),
//!     &json!({"aging_time": 600}),
//!     ConvergenceMode::Merged,
//! )?;
//! assert!(result.changed);
//! assert_eq!(result.after, json!({"aging_time": 50}));
//! # Ok::<(), converge::Error>(())
//! ```
//!
//! ## Provider Traits
//!
//! The engine never talks to a device:
//!
//! - [`FactsProvider`]: Supplies the current configuration
//! - [`CommandSink`]: Receives the commands to push
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations

pub mod context;
pub mod diff;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod node;
pub mod normalize;
pub mod planner;
pub mod report;
pub mod resource;
pub mod schema;
pub mod template;
pub mod types;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, CommandSink, ConfirmCallback, FactsProvider,
    NoProgress, NoSink, ProgressCallback, RecordingSink, StaticFacts,
};
pub use diff::{Patch, diff};
pub use emitter::{Emission, emit};
pub use engine::{Convergence, Task, converge, reconcile, reconcile_batch};
pub use error::{
    DifferError, Error, ImmutableFieldConflict, IncompleteEntityError, Result, SchemaError,
};
pub use node::{ConfigNode, Identity, Scalar};
pub use normalize::{normalize, normalize_facts};
pub use planner::{Resolution, resolve};
pub use resource::{BoxedResource, DeclaredResource, Resource, ResourceExt};
pub use template::{CommandTemplate, RestTemplate};
pub use types::{
    Command, ConvergenceMode, EntityPath, Method, OpKind, Operation, OperationSummary,
    ReconcileResult,
};

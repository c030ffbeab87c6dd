//! QoS classification and queue maps
//!
//! Every map is a named list of entries keyed by the value it maps from.

use converge::schema::{ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

fn dscp() -> ScalarSpec {
    ScalarSpec::int().range(0, 63)
}

fn class() -> ScalarSpec {
    ScalarSpec::int().range(0, 7)
}

/// Forwarding groups are names on the device even though they look numeric
fn fwd_group() -> ScalarSpec {
    ScalarSpec::str().choices(["0", "1", "2", "3", "4", "5", "6", "7"])
}

fn map(from: &str, from_spec: ScalarSpec, to: &str, to_spec: ScalarSpec) -> Schema {
    let entries = ObjectSchema::new()
        .field(from, from_spec)
        .field(to, to_spec)
        .identity(&[from]);
    Schema::list(
        ObjectSchema::new()
            .field("name", ScalarSpec::str())
            .field("entries", Schema::list(entries))
            .identity(&["name"]),
    )
}

pub fn resource() -> DeclaredResource {
    let root = ObjectSchema::new()
        .field("dscp_maps", map("dscp", dscp(), "fwd_group", fwd_group()))
        .field("dot1p_maps", map("dot1p", class(), "fwd_group", fwd_group()))
        .field("fwd_group_queue_maps", map("fwd_group", fwd_group(), "queue_index", class()))
        .field("fwd_group_dscp_maps", map("fwd_group", fwd_group(), "dscp", dscp()))
        .field("fwd_group_dot1p_maps", map("fwd_group", fwd_group(), "dot1p", class()))
        .field("fwd_group_pg_maps", map("fwd_group", fwd_group(), "pg_index", class()))
        .field("pfc_priority_queue_maps", map("dot1p", class(), "queue_index", class()))
        .field("pfc_priority_pg_maps", map("dot1p", class(), "pg_index", class()));

    DeclaredResource::new(
        ResourceSchema::object("qos_maps", root),
        RestTemplate::new("data/openconfig-qos:qos/openconfig-qos-maps-ext:maps")
            .rename("dscp_maps", "dscp-maps/dscp-map")
            .rename("dot1p_maps", "dot1p-maps/dot1p-map")
            .rename("fwd_group_queue_maps", "forwarding-group-queue-maps/forwarding-group-queue-map")
            .rename("fwd_group_dscp_maps", "forwarding-group-dscp-maps/forwarding-group-dscp-map")
            .rename("fwd_group_dot1p_maps", "forwarding-group-dot1p-maps/forwarding-group-dot1p-map")
            .rename("fwd_group_pg_maps", "forwarding-group-priority-group-maps/forwarding-group-priority-group-map")
            .rename("pfc_priority_queue_maps", "pfc-priority-queue-maps/pfc-priority-queue-map")
            .rename("pfc_priority_pg_maps", "pfc-priority-priority-group-maps/pfc-priority-priority-group-map")
            .rename("entries", "entries/entry"),
        "QoS DSCP, DOT1P, forwarding group and PFC priority maps",
    )
}

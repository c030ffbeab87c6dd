//! RADIUS global settings and servers
//!
//! The device only supports adding and deleting RADIUS configuration.

use converge::schema::{ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{ConvergenceMode, DeclaredResource, RestTemplate};

const AUTH_TYPES: [&str; 3] = ["pap", "chap", "mschapv2"];

pub fn resource() -> DeclaredResource {
    let host = ObjectSchema::new()
        .field("name", ScalarSpec::str())
        .field("auth_type", ScalarSpec::str().choices(AUTH_TYPES))
        .field("key", ScalarSpec::str())
        .field("priority", ScalarSpec::int().range(1, 64))
        .field("port", ScalarSpec::int().range(1, 65535))
        .field("timeout", ScalarSpec::int().range(1, 60))
        .field("retransmit", ScalarSpec::int().range(0, 10))
        .field("source_interface", ScalarSpec::str())
        .field("vrf", ScalarSpec::str())
        .identity(&["name"]);

    let root = ObjectSchema::new()
        .field("auth_type", ScalarSpec::str().choices(AUTH_TYPES).default_value("pap"))
        .field("key", ScalarSpec::str())
        .field("nas_ip", ScalarSpec::str())
        .field("statistics", ScalarSpec::bool())
        .field("timeout", ScalarSpec::int().range(1, 60))
        .field("retransmit", ScalarSpec::int().range(0, 10))
        .field(
            "servers",
            Schema::object(ObjectSchema::new().field("host", Schema::list(host))),
        );

    DeclaredResource::new(
        ResourceSchema::object("radius_server", root),
        RestTemplate::new("data/openconfig-system:system/aaa/server-groups/server-group=RADIUS")
            .rename("host", "server"),
        "RADIUS servers",
    )
    .with_modes(&[ConvergenceMode::Merged, ConvergenceMode::Deleted])
}

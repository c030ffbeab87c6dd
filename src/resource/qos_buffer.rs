//! QoS buffer pools and profiles
//!
//! Buffer settings are only ever added or deleted; the device rejects
//! rewriting them wholesale.

use converge::schema::{ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{ConvergenceMode, DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    let pools = ObjectSchema::new()
        .field("name", ScalarSpec::str().choices(["ingress_lossless_pool"]))
        .field("xoff", ScalarSpec::int())
        .identity(&["name"])
        .required(&["xoff"]);

    let profiles = ObjectSchema::new()
        .field("name", ScalarSpec::str())
        .field(
            "pool",
            ScalarSpec::str().choices(["ingress_lossless_pool", "egress_lossless_pool", "egress_lossy_pool"]),
        )
        .field("size", ScalarSpec::int())
        .field("static_threshold", ScalarSpec::int())
        .field("dynamic_threshold", ScalarSpec::int().range(-6, 3))
        .field("pause_threshold", ScalarSpec::int().range(46_080, 8_388_608))
        .identity(&["name"])
        .required(&["pool", "size"]);

    DeclaredResource::new(
        ResourceSchema::object(
            "qos_buffer",
            ObjectSchema::new()
                .field("buffer_init", ScalarSpec::bool())
                .field("buffer_pools", Schema::list(pools))
                .field("buffer_profiles", Schema::list(profiles)),
        ),
        RestTemplate::new("data/openconfig-qos:qos/openconfig-qos-buffer:buffer")
            .rename("buffer_pools", "buffer-pools/buffer-pool")
            .rename("buffer_profiles", "buffer-profiles/buffer-profile"),
        "QoS buffer pools and profiles",
    )
    .with_modes(&[ConvergenceMode::Merged, ConvergenceMode::Deleted])
}

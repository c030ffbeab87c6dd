//! OSPFv2 interface settings
//!
//! An authentication password cannot be changed in place: the
//! authentication settings are deleted and created again.

use converge::schema::{Canonical, ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    let md_authentication = ObjectSchema::new()
        .field("key_id", ScalarSpec::int().range(1, 255))
        .field("md5key", ScalarSpec::str())
        .field("encrypted", ScalarSpec::bool().default_value(false))
        .identity(&["key_id"]);

    let authentication = ObjectSchema::new()
        .field("password", ScalarSpec::str())
        .field("encrypted", ScalarSpec::bool().default_value(false))
        .immutable(&["password"])
        .required(&["password"]);

    let attributes = ObjectSchema::new()
        .field("address", ScalarSpec::str().canonical(Canonical::Address))
        .field("area_id", ScalarSpec::str())
        .field(
            "authentication_type",
            ScalarSpec::str().canonical(Canonical::Uppercase).choices(["MD5HMAC", "NONE", "TEXT"]),
        )
        .field("authentication", Schema::object(authentication))
        .field("cost", ScalarSpec::int().range(1, 65535))
        .field("dead_interval", ScalarSpec::int().range(1, 65535))
        .field("hello_multiplier", ScalarSpec::int().range(1, 10))
        .field("hello_interval", ScalarSpec::int().range(1, 65535))
        .field("md_authentication", Schema::list(md_authentication))
        .field("mtu_ignore", ScalarSpec::bool())
        .field("priority", ScalarSpec::int().range(0, 255))
        .field("retransmit_interval", ScalarSpec::int().range(1, 65535))
        .field("transmit_delay", ScalarSpec::int().range(1, 65535))
        .identity(&["address"]);

    let bfd = ObjectSchema::new()
        .field("enable", ScalarSpec::bool())
        .field("bfd_profile", ScalarSpec::str())
        .required(&["enable"]);

    DeclaredResource::new(
        ResourceSchema::list(
            "ospfv2_interfaces",
            ObjectSchema::new()
                .field("name", ScalarSpec::str())
                .field("ospf_attributes", Schema::list(attributes))
                .field("bfd", Schema::object(bfd))
                .field(
                    "network",
                    ScalarSpec::str().choices(["broadcast", "point_to_point"]),
                )
                .identity(&["name"]),
        ),
        RestTemplate::new("data/openconfig-interfaces:interfaces/interface")
            .rename("ospf_attributes", "subinterfaces/subinterface=0/ipv4/ospfv2/if-addresses"),
        "OSPFv2 interface attributes",
    )
}

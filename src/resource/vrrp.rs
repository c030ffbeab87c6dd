//! VRRP groups per interface

use converge::schema::{Canonical, ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    let virtual_address = ObjectSchema::new()
        .field("address", ScalarSpec::str().canonical(Canonical::Address))
        .identity(&["address"]);

    let track_interface = ObjectSchema::new()
        .field("interface", ScalarSpec::str())
        .field("priority_increment", ScalarSpec::int().range(0, 254))
        .identity(&["interface"]);

    let group = ObjectSchema::new()
        .field("virtual_router_id", ScalarSpec::int().range(1, 255))
        .field("afi", ScalarSpec::str().canonical(Canonical::Lowercase).choices(["ipv4", "ipv6"]))
        .field("virtual_address", Schema::list(virtual_address))
        .field("advertisement_interval", ScalarSpec::int().range(1, 254).default_value(1))
        .field("preempt", ScalarSpec::bool().default_value(true))
        .field("priority", ScalarSpec::int().range(1, 254).default_value(100))
        .field("track_interface", Schema::list(track_interface))
        .field("use_v2_checksum", ScalarSpec::bool().default_value(false))
        .field("version", ScalarSpec::int().choices([2, 3]).default_value(2))
        .identity(&["virtual_router_id", "afi"]);

    DeclaredResource::new(
        ResourceSchema::list(
            "vrrp",
            ObjectSchema::new()
                .field("name", ScalarSpec::str())
                .field("group", Schema::list(group))
                .identity(&["name"]),
        ),
        RestTemplate::new("data/openconfig-interfaces:interfaces/interface")
            .rename("group", "subinterfaces/subinterface=0/vrrp/vrrp-group"),
        "VRRP and VRRP6 groups",
    )
}

//! IPv4/IPv6 addressing of layer 3 interfaces

use converge::schema::{Canonical, ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    let v4_addresses = ObjectSchema::new()
        .field("address", ScalarSpec::str().canonical(Canonical::Address))
        .field("secondary", ScalarSpec::bool().default_value(false))
        .identity(&["address"]);

    let v6_addresses = ObjectSchema::new()
        .field("address", ScalarSpec::str().canonical(Canonical::Address))
        .field("eui64", ScalarSpec::bool().default_value(false))
        .identity(&["address"]);

    let ipv4 = ObjectSchema::new()
        .field("addresses", Schema::list(v4_addresses))
        .field("anycast_addresses", Schema::set(ScalarSpec::str().canonical(Canonical::Address)));

    let ipv6 = ObjectSchema::new()
        .field("addresses", Schema::list(v6_addresses))
        .field("enabled", ScalarSpec::bool().default_value(false))
        .field("autoconf", ScalarSpec::bool().default_value(false))
        .field(
            "dad",
            ScalarSpec::str()
                .canonical(Canonical::Uppercase)
                .choices(["ENABLE", "DISABLE", "DISABLE_IPV6_ON_FAILURE"])
                .default_value("DISABLE"),
        );

    DeclaredResource::new(
        ResourceSchema::list(
            "l3_interfaces",
            ObjectSchema::new()
                .field("name", ScalarSpec::str())
                .field("ipv4", Schema::object(ipv4))
                .field("ipv6", Schema::object(ipv6))
                .identity(&["name"]),
        ),
        RestTemplate::new("data/openconfig-interfaces:interfaces/interface")
            .rename("ipv4", "subinterfaces/subinterface=0/openconfig-if-ip:ipv4")
            .rename("ipv6", "subinterfaces/subinterface=0/openconfig-if-ip:ipv6")
            .rename("addresses", "addresses/address"),
        "Layer 3 interface addresses",
    )
}

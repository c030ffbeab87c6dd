//! Static routes per VRF
//!
//! A next hop has no name of its own: it is identified by the combination of
//! its `index` fields (blackhole, interface, next-hop VRF and address).

use converge::schema::{Canonical, ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    let index = ObjectSchema::new()
        .field("blackhole", ScalarSpec::bool().default_value(false))
        .field("interface", ScalarSpec::str())
        .field("nexthop_vrf", ScalarSpec::str())
        .field("next_hop", ScalarSpec::str().canonical(Canonical::Address));

    let next_hops = ObjectSchema::new()
        .field("index", Schema::object(index))
        .field("metric", ScalarSpec::int().range(1, 255))
        .field("track", ScalarSpec::int().range(1, 1024))
        .field("tag", ScalarSpec::int())
        .identity(&["index"]);

    let routes = ObjectSchema::new()
        .field("prefix", ScalarSpec::str().canonical(Canonical::Prefix))
        .field("next_hops", Schema::list(next_hops))
        .identity(&["prefix"]);

    DeclaredResource::new(
        ResourceSchema::list(
            "static_routes",
            ObjectSchema::new()
                .field("vrf_name", ScalarSpec::str())
                .field("static_list", Schema::list(routes))
                .identity(&["vrf_name"]),
        ),
        RestTemplate::new("data/openconfig-network-instance:network-instances/network-instance")
            .rename("static_list", "protocols/protocol=STATIC,static/static-routes/static")
            .rename("next_hops", "next-hops/next-hop"),
        "Static IPv4/IPv6 routes",
    )
}

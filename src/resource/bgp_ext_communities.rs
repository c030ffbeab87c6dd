//! BGP extended community lists

use converge::schema::{ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    let members = ObjectSchema::new()
        .field("regex", Schema::set(ScalarSpec::str()))
        .field("route_target", Schema::set(ScalarSpec::str()))
        .field("route_origin", Schema::set(ScalarSpec::str()));

    DeclaredResource::new(
        ResourceSchema::list(
            "bgp_ext_communities",
            ObjectSchema::new()
                .field("name", ScalarSpec::str())
                .field(
                    "type",
                    ScalarSpec::str().choices(["standard", "expanded"]).default_value("standard"),
                )
                .field("permit", ScalarSpec::bool())
                .field("members", Schema::object(members))
                .field("match", ScalarSpec::str().choices(["all", "any"]).default_value("any"))
                .identity(&["name"])
                // a standard list cannot become an expanded one in place
                .immutable(&["type"]),
        ),
        RestTemplate::new(
            "data/openconfig-routing-policy:routing-policy/defined-sets/openconfig-bgp-policy:bgp-defined-sets/ext-community-sets/ext-community-set",
        )
        .rename("match", "match-set-options"),
        "BGP extended community lists",
    )
}

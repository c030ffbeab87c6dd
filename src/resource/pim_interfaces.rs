//! PIM settings of interfaces

use converge::schema::{ObjectSchema, ResourceSchema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    DeclaredResource::new(
        ResourceSchema::list(
            "pim_interfaces",
            ObjectSchema::new()
                .field("name", ScalarSpec::str())
                .field("sparse_mode", ScalarSpec::bool())
                .field("drpriority", ScalarSpec::int().range(1, 4_294_967_295))
                .field("hello_interval", ScalarSpec::int().range(1, 255))
                .field("bfd_enable", ScalarSpec::bool())
                .field("bfd_profile", ScalarSpec::str())
                .identity(&["name"]),
        ),
        RestTemplate::new(
            "data/openconfig-network-instance:network-instances/network-instance=default/protocols/protocol=PIM,pim/pim/interfaces/interface",
        )
        .rename("sparse_mode", "mode")
        .rename("drpriority", "dr-priority")
        .rename("bfd_enable", "enable-bfd")
        .rename("bfd_profile", "bfd-profile-name"),
        "PIM interface settings",
    )
}

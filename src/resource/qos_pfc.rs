//! PFC watchdog polling

use converge::schema::{ObjectSchema, ResourceSchema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    DeclaredResource::new(
        ResourceSchema::object(
            "qos_pfc",
            ObjectSchema::new()
                .field("counter_poll", ScalarSpec::bool().default_value(true))
                .field("poll_interval", ScalarSpec::int().range(100, 3000)),
        ),
        RestTemplate::new("data/openconfig-qos:qos/openconfig-qos-ext:pfc-watchdog")
            .rename("counter_poll", "flex/config/counter-poll")
            .rename("poll_interval", "poll/config/poll-interval"),
        "PFC watchdog settings",
    )
}

//! QoS scheduler policies

use converge::schema::{ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    let rate = || ScalarSpec::int().range(0, 400_000_000_000);
    let burst = || ScalarSpec::int().range(0, 125_000_000);

    let schedulers = ObjectSchema::new()
        // 0-7 interface queues, 0-47 CPU queues, 255 the port itself
        .field("sequence", ScalarSpec::int().range(0, 255))
        .field("scheduler_type", ScalarSpec::str().choices(["dwrr", "wrr", "strict"]))
        .field("weight", ScalarSpec::int().range(1, 100))
        .field("meter_type", ScalarSpec::str().choices(["packets", "bytes"]))
        .field("cir", rate())
        .field("pir", rate())
        .field("cbs", burst())
        .field("pbs", burst())
        .identity(&["sequence"]);

    DeclaredResource::new(
        ResourceSchema::list(
            "qos_scheduler",
            ObjectSchema::new()
                .field("name", ScalarSpec::str())
                .field("schedulers", Schema::list(schedulers))
                .identity(&["name"]),
        ),
        RestTemplate::new("data/openconfig-qos:qos/scheduler-policies/scheduler-policy")
            .rename("schedulers", "schedulers/scheduler")
            .rename("scheduler_type", "priority"),
        "QoS scheduler policies",
    )
}

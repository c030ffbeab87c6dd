//! Power over Ethernet: global, per-card and per-port settings

use converge::schema::{ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

const POWER_MODELS: [&str; 5] = ["dynamic", "dynamic-priority", "static", "static-priority", "class"];

fn power_settings() -> ObjectSchema {
    ObjectSchema::new()
        .field("power_mgmt_model", ScalarSpec::str().choices(POWER_MODELS))
        .field("usage_threshold", ScalarSpec::int().range(0, 99))
        .field("auto_reset", ScalarSpec::bool())
}

pub fn resource() -> DeclaredResource {
    let cards = power_settings()
        .field("card_id", ScalarSpec::int().range(0, 7))
        .identity(&["card_id"]);

    let interfaces = ObjectSchema::new()
        .field("name", ScalarSpec::str())
        .field("enabled", ScalarSpec::bool())
        .field("priority", ScalarSpec::str().choices(["low", "medium", "high", "critical"]))
        .field(
            "detection",
            ScalarSpec::str().choices([
                "2pt-dot3af",
                "2pt-dot3af+legacy",
                "4pt-dot3af",
                "4pt-dot3af+legacy",
                "dot3bt",
                "dot3bt+legacy",
                "legacy",
            ]),
        )
        .field(
            "power_up_mode",
            ScalarSpec::str().choices([
                "dot3af",
                "dot3at",
                "dot3bt",
                "dot3bt-type3",
                "dot3bt-type4",
                "high-inrush",
                "pre-dot3at",
                "pre-dot3bt",
            ]),
        )
        .field("power_pairs", ScalarSpec::str().choices(["signal", "spare"]))
        .field("power_limit_type", ScalarSpec::str().choices(["class-based", "user-defined"]))
        .field("power_limit", ScalarSpec::int().range(0, 99_900))
        .field("high_power", ScalarSpec::bool())
        .field("disconnect_type", ScalarSpec::str().choices(["ac", "dc"]))
        .field("four_pair", ScalarSpec::bool())
        .field("use_spare_pair", ScalarSpec::bool())
        .field("power_classification", ScalarSpec::str().choices(["normal", "bypass"]))
        .identity(&["name"]);

    DeclaredResource::new(
        ResourceSchema::object(
            "poe",
            ObjectSchema::new()
                .field("global", Schema::object(power_settings()))
                .field("cards", Schema::list(cards))
                .field("interfaces", Schema::list(interfaces)),
        ),
        RestTemplate::new("data/openconfig-poe:poe")
            .rename("cards", "cards/card")
            .rename("interfaces", "interfaces/interface"),
        "PoE power management",
    )
}

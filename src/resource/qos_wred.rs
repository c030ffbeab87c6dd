//! QoS WRED profiles

use converge::schema::{ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    let threshold = || ScalarSpec::int().range(1000, 12_480_000);

    let green = ObjectSchema::new()
        .field("enable", ScalarSpec::bool())
        .field("min_threshold", threshold())
        .field("max_threshold", threshold())
        .field("drop_probability", ScalarSpec::int().range(0, 100));

    DeclaredResource::new(
        ResourceSchema::list(
            "qos_wred",
            ObjectSchema::new()
                .field("name", ScalarSpec::str())
                .field("ecn", ScalarSpec::str().choices(["green"]))
                .field("green", Schema::object(green))
                .identity(&["name"]),
        ),
        RestTemplate::new("data/openconfig-qos:qos/wred-profiles/wred-profile")
            .rename("ecn", "config/ecn")
            .rename("enable", "wred-green-enable")
            .rename("min_threshold", "green-min-threshold")
            .rename("max_threshold", "green-max-threshold")
            .rename("drop_probability", "green-drop-probability"),
        "QoS WRED profiles",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::{ConvergenceMode, reconcile};
    use serde_json::json;

    fn current() -> serde_json::Value {
        json!([
            {"name": "profile1", "ecn": "green",
             "green": {"enable": true, "min_threshold": 1000, "max_threshold": 2000, "drop_probability": 10}},
            {"name": "profile2", "green": {"enable": false}}
        ])
    }

    #[test]
    fn test_replaced_profile_drops_green_settings() {
        let result = reconcile(
            &resource(),
            &json!([{"name": "profile1", "ecn": "green"}]),
            &current(),
            ConvergenceMode::Replaced,
        )
        .unwrap();
        assert_eq!(
            result.commands,
            vec!["DELETE data/openconfig-qos:qos/wred-profiles/wred-profile=profile1/green"]
        );
        assert_eq!(result.after[0], json!({"name": "profile1", "ecn": "green"}));
        assert_eq!(result.after[1], current()[1]);
    }

    #[test]
    fn test_threshold_range() {
        let err = reconcile(
            &resource(),
            &json!([{"name": "profile1", "green": {"min_threshold": 10}}]),
            &current(),
            ConvergenceMode::Merged,
        )
        .unwrap_err();
        assert!(err.to_string().contains("min_threshold"), "{err}");
    }
}

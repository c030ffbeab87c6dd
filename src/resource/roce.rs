//! RoCEv2 default buffer configuration
//!
//! Enabling RoCE rewrites the buffer and QoS defaults of the switch, so it
//! can only be merged in.

use converge::schema::{ObjectSchema, ResourceSchema, ScalarSpec};
use converge::{ConvergenceMode, DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    DeclaredResource::new(
        ResourceSchema::object(
            "roce",
            ObjectSchema::new()
                .field("roce_enable", ScalarSpec::bool())
                // two priorities 0-7, e.g. "3,4"
                .field("pfc_priority", ScalarSpec::str()),
        ),
        RestTemplate::new("data/openconfig-qos:qos/openconfig-qos-ext:roce")
            .rename("roce_enable", "config/roce-enable")
            .rename("pfc_priority", "config/pfc-priority"),
        "RoCEv2 QoS defaults",
    )
    .with_modes(&[ConvergenceMode::Merged])
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::{Error, reconcile};
    use serde_json::json;

    #[test]
    fn test_merged_is_the_only_mode() {
        for mode in [ConvergenceMode::Deleted, ConvergenceMode::Replaced, ConvergenceMode::Overridden] {
            let err = reconcile(&resource(), &json!({"roce_enable": true}), &json!({}), mode)
                .unwrap_err();
            assert!(matches!(err, Error::UnsupportedMode { .. }), "{mode}");
        }
    }

    #[test]
    fn test_merged_enables_roce() {
        let result = reconcile(
            &resource(),
            &json!({"roce_enable": true, "pfc_priority": "3,4"}),
            &json!({"roce_enable": false}),
            ConvergenceMode::Merged,
        )
        .unwrap();
        assert_eq!(result.after, json!({"roce_enable": true, "pfc_priority": "3,4"}));
        assert_eq!(result.commands.len(), 1);
        assert!(result.commands[0].starts_with("PATCH data/openconfig-qos:qos/openconfig-qos-ext:roce "));
    }
}

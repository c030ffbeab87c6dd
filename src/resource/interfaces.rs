//! Ethernet, loopback and port-channel interface attributes
//!
//! Physical ports cannot go away; deleting an attribute hands it back to the
//! device default.

use converge::schema::{Canonical, ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

const SPEEDS: [&str; 13] = [
    "SPEED_10MB",
    "SPEED_100MB",
    "SPEED_1GB",
    "SPEED_2500MB",
    "SPEED_5GB",
    "SPEED_10GB",
    "SPEED_20GB",
    "SPEED_25GB",
    "SPEED_40GB",
    "SPEED_50GB",
    "SPEED_100GB",
    "SPEED_200GB",
    "SPEED_400GB",
];

pub fn resource() -> DeclaredResource {
    let upper = || ScalarSpec::str().canonical(Canonical::Uppercase);

    DeclaredResource::new(
        ResourceSchema::list(
            "interfaces",
            ObjectSchema::new()
                .field("name", ScalarSpec::str())
                .field("description", ScalarSpec::str())
                .field("enabled", ScalarSpec::bool().default_value(true))
                .field("mtu", ScalarSpec::int().range(1312, 9216).default_value(9100))
                .field("speed", upper().choices(SPEEDS))
                .field("auto_negotiate", ScalarSpec::bool().default_value(false))
                .field("advertised_speed", Schema::set(ScalarSpec::str()))
                .field(
                    "fec",
                    upper().choices(["FEC_RS", "FEC_FC", "FEC_DISABLED", "FEC_DEFAULT", "FEC_AUTO"]),
                )
                .field(
                    "unreliable_los",
                    upper().choices([
                        "UNRELIABLE_LOS_MODE_ON",
                        "UNRELIABLE_LOS_MODE_OFF",
                        "UNRELIABLE_LOS_MODE_AUTO",
                    ]),
                )
                .identity(&["name"]),
        ),
        RestTemplate::new("data/openconfig-interfaces:interfaces/interface")
            .rename("speed", "openconfig-if-ethernet:ethernet/config/port-speed")
            .rename("auto_negotiate", "openconfig-if-ethernet:ethernet/config/auto-negotiate")
            .rename("advertised_speed", "openconfig-if-ethernet:ethernet/config/advertised-speed")
            .rename("fec", "openconfig-if-ethernet:ethernet/config/port-fec"),
        "Interface description, admin state, MTU and link settings",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::{ConvergenceMode, reconcile};
    use serde_json::json;

    fn current() -> serde_json::Value {
        json!([
            {"name": "Ethernet8", "enabled": false, "mtu": 9100, "speed": "SPEED_100GB"},
            {"name": "Ethernet12", "enabled": false},
            {"name": "Ethernet16", "description": "Ethernet Sixteen", "mtu": 3500, "speed": "SPEED_40GB"}
        ])
    }

    #[test]
    fn test_merged_sets_only_what_changed() {
        let result = reconcile(
            &resource(),
            &json!([
                {"name": "Ethernet8", "fec": "fec_auto"},
                {"name": "Ethernet12", "description": "Ethernet Twelve", "auto_negotiate": true},
                {"name": "Ethernet16", "mtu": 3500}
            ]),
            &current(),
            ConvergenceMode::Merged,
        )
        .unwrap();
        let ops: Vec<String> = result.operations.iter().map(ToString::to_string).collect();
        assert_eq!(
            ops,
            vec![
                "MODIFY interfaces[name=Ethernet12] {auto_negotiate=true, description=Ethernet Twelve}",
                "MODIFY interfaces[name=Ethernet8] {fec=FEC_AUTO}",
            ]
        );
        // sorted by name: Ethernet12, Ethernet16, Ethernet8
        assert_eq!(result.after[2]["fec"], "FEC_AUTO");
        assert_eq!(result.after[1], current()[2]);
    }

    #[test]
    fn test_deleted_mtu_reverts_to_default() {
        let result = reconcile(
            &resource(),
            &json!([{"name": "Ethernet16", "mtu": 3500, "description": "Ethernet Sixteen"}]),
            &current(),
            ConvergenceMode::Deleted,
        )
        .unwrap();
        assert_eq!(
            result.after[1],
            json!({"name": "Ethernet16", "mtu": 9100, "speed": "SPEED_40GB"})
        );
        assert_eq!(
            result.commands,
            vec![
                "DELETE data/openconfig-interfaces:interfaces/interface=Ethernet16/description",
                "DELETE data/openconfig-interfaces:interfaces/interface=Ethernet16/mtu",
            ]
        );
    }

    #[test]
    fn test_unknown_speed_is_rejected() {
        let err = reconcile(
            &resource(),
            &json!([{"name": "Ethernet8", "speed": "SPEED_1TB"}]),
            &current(),
            ConvergenceMode::Merged,
        )
        .unwrap_err();
        assert!(err.to_string().contains("SPEED_1TB"), "{err}");
    }
}

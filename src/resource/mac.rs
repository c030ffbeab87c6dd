//! MAC table: aging, dampening and static entries per VRF

use converge::schema::{Canonical, ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    let entries = ObjectSchema::new()
        .field("mac_address", ScalarSpec::str().canonical(Canonical::Lowercase))
        .field("vlan_id", ScalarSpec::int().range(1, 4094))
        .field("interface", ScalarSpec::str())
        .identity(&["mac_address", "vlan_id"]);

    let mac = ObjectSchema::new()
        .field("aging_time", ScalarSpec::int().default_value(600))
        .field("dampening_interval", ScalarSpec::int().default_value(5))
        .field("dampening_threshold", ScalarSpec::int().default_value(5))
        .field("mac_table_entries", Schema::list(entries));

    DeclaredResource::new(
        ResourceSchema::list(
            "mac",
            ObjectSchema::new()
                .field("vrf_name", ScalarSpec::str().default_value("default"))
                .field("mac", Schema::object(mac))
                .identity(&["vrf_name"]),
        ),
        RestTemplate::new("data/openconfig-network-instance:network-instances/network-instance")
            .rename("mac", "fdb")
            .rename("mac_table_entries", "mac-table/entries/entry"),
        "MAC aging, dampening and static MAC entries",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::{ConvergenceMode, reconcile};
    use serde_json::json;

    #[test]
    fn test_deleted_aging_time_reverts_to_default() {
        let result = reconcile(
            &resource(),
            &json!([{"mac": {"aging_time": 50}}]),
            &json!([{"vrf_name": "default", "mac": {"aging_time": 50, "dampening_interval": 20}}]),
            ConvergenceMode::Deleted,
        )
        .unwrap();
        assert_eq!(
            result.after,
            json!([{"vrf_name": "default", "mac": {"aging_time": 600, "dampening_interval": 20}}])
        );
        assert_eq!(
            result.commands,
            vec!["DELETE data/openconfig-network-instance:network-instances/network-instance=default/fdb/aging-time"]
        );
    }

    #[test]
    fn test_mac_addresses_compare_case_insensitively() {
        let result = reconcile(
            &resource(),
            &json!([{"mac": {"mac_table_entries": [{"mac_address": "00:00:5E:00:53:AF", "vlan_id": 1}]}}]),
            &json!([{"vrf_name": "default", "mac": {"mac_table_entries": [
                {"mac_address": "00:00:5e:00:53:af", "vlan_id": 1, "interface": "Eth1/1"}
            ]}}]),
            ConvergenceMode::Merged,
        )
        .unwrap();
        assert!(!result.changed);
    }
}

//! NTP: global settings, servers and authentication keys

use converge::schema::{Canonical, ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    let servers = ObjectSchema::new()
        .field("address", ScalarSpec::str().canonical(Canonical::Lowercase))
        .field("key_id", ScalarSpec::int().range(1, 65535))
        .field("minpoll", ScalarSpec::int().range(3, 17))
        .field("maxpoll", ScalarSpec::int().range(3, 17))
        .field("prefer", ScalarSpec::bool())
        .identity(&["address"])
        // the device rejects deleting these once a server exists
        .undeletable(&["key_id", "minpoll", "maxpoll", "prefer"]);

    let keys = ObjectSchema::new()
        .field("key_id", ScalarSpec::int().range(1, 65535))
        .field(
            "key_type",
            ScalarSpec::str().choices(["NTP_AUTH_SHA1", "NTP_AUTH_MD5", "NTP_AUTH_SHA2_256"]),
        )
        .field("key_value", ScalarSpec::str())
        .field("encrypted", ScalarSpec::bool())
        .identity(&["key_id"])
        .undeletable(&["key_type", "key_value", "encrypted"])
        .required(&["key_type", "key_value"]);

    let root = ObjectSchema::new()
        .field("source_interfaces", Schema::set(ScalarSpec::str()))
        .field("enable_ntp_auth", ScalarSpec::bool())
        .field("trusted_keys", Schema::set(ScalarSpec::int().range(1, 65535)))
        .field("vrf", ScalarSpec::str())
        .field("servers", Schema::list(servers))
        .field("ntp_keys", Schema::list(keys));

    DeclaredResource::new(
        ResourceSchema::object("ntp", root),
        RestTemplate::new("data/openconfig-system:system/ntp")
            .rename("servers", "servers/server")
            .rename("ntp_keys", "ntp-keys/ntp-key")
            .rename("vrf", "config/network-instance"),
        "NTP servers, keys and global settings",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::{ConvergenceMode, reconcile};
    use serde_json::json;

    fn current() -> serde_json::Value {
        json!({
            "enable_ntp_auth": true,
            "source_interfaces": ["Eth1/1", "Eth1/2"],
            "trusted_keys": [10],
            "servers": [
                {"address": "10.11.0.1", "minpoll": 6, "maxpoll": 10},
                {"address": "10.11.0.2", "key_id": 10, "minpoll": 5, "maxpoll": 9}
            ],
            "ntp_keys": [{"key_id": 10, "key_type": "NTP_AUTH_MD5", "key_value": "abc", "encrypted": false}]
        })
    }

    #[test]
    fn test_replaced_keeps_unlisted_servers() {
        let result = reconcile(
            &resource(),
            &json!({"servers": [{"address": "10.11.0.2", "key_id": 10, "minpoll": 6, "maxpoll": 9}]}),
            &current(),
            ConvergenceMode::Replaced,
        )
        .unwrap();
        assert!(result.changed);
        let servers = result.after["servers"].as_array().unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0]["address"], "10.11.0.1");
        assert_eq!(servers[1]["minpoll"], 6);
        assert_eq!(result.after["source_interfaces"], json!(["Eth1/1", "Eth1/2"]));
    }

    #[test]
    fn test_replaced_recreates_server_losing_undeletable_field() {
        let result = reconcile(
            &resource(),
            &json!({"servers": [{"address": "10.11.0.2", "minpoll": 5, "maxpoll": 9}]}),
            &current(),
            ConvergenceMode::Replaced,
        )
        .unwrap();
        let ops: Vec<String> = result.operations.iter().map(ToString::to_string).collect();
        assert_eq!(
            ops,
            vec![
                "REMOVE ntp.servers[address=10.11.0.2]",
                "ADD ntp.servers[address=10.11.0.2] {maxpoll=9, minpoll=5}",
            ]
        );
    }

    #[test]
    fn test_new_key_requires_type_and_value() {
        let err = reconcile(
            &resource(),
            &json!({"ntp_keys": [{"key_id": 20, "key_type": "NTP_AUTH_SHA1"}]}),
            &current(),
            ConvergenceMode::Merged,
        )
        .unwrap_err();
        assert!(err.to_string().contains("key_value"), "{err}");
    }

    #[test]
    fn test_deleted_cannot_remove_server_settings() {
        let result = reconcile(
            &resource(),
            &json!({"servers": [{"address": "10.11.0.1", "minpoll": 6}], "trusted_keys": [10]}),
            &current(),
            ConvergenceMode::Deleted,
        )
        .unwrap();
        let ops: Vec<String> = result.operations.iter().map(ToString::to_string).collect();
        assert_eq!(ops, vec!["REMOVE-FIELDS ntp {trusted_keys=[10]}"]);
    }
}

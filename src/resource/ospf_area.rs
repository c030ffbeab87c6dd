//! OSPFv2 areas: authentication, stub settings, ranges, networks and
//! virtual links

use converge::schema::{Canonical, ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

fn interval() -> ScalarSpec {
    ScalarSpec::int().range(1, 65535)
}

fn virtual_link() -> ObjectSchema {
    let authentication = ObjectSchema::new()
        .field("auth_type", ScalarSpec::str().choices(["message_digest", "text", "none"]))
        .field("key", ScalarSpec::str())
        .field("key_encrypted", ScalarSpec::bool().default_value(false));

    let digest = ObjectSchema::new()
        .field("key_id", ScalarSpec::int().range(1, 255))
        .field("key", ScalarSpec::str())
        .field("key_encrypted", ScalarSpec::bool().default_value(false))
        .identity(&["key_id"])
        .required(&["key"]);

    ObjectSchema::new()
        .field("router_id", ScalarSpec::str().canonical(Canonical::DottedQuad))
        .field("enabled", ScalarSpec::bool())
        .field("dead_interval", interval())
        .field("hello_interval", interval())
        .field("retransmit_interval", interval())
        .field("transmit_delay", interval())
        .field("authentication", Schema::object(authentication))
        .field("message_digest_list", Schema::list(digest))
        .identity(&["router_id"])
}

pub fn resource() -> DeclaredResource {
    let ranges = ObjectSchema::new()
        .field("prefix", ScalarSpec::str().canonical(Canonical::Prefix))
        .field("advertise", ScalarSpec::bool())
        .field("cost", ScalarSpec::int().range(0, 16_777_215))
        .field("substitute", ScalarSpec::str().canonical(Canonical::Prefix))
        .identity(&["prefix"]);

    let stub = ObjectSchema::new()
        .field("enabled", ScalarSpec::bool())
        .field("no_summary", ScalarSpec::bool());

    DeclaredResource::new(
        ResourceSchema::list(
            "ospf_area",
            ObjectSchema::new()
                .field("vrf_name", ScalarSpec::str().default_value("default"))
                .field("area_id", ScalarSpec::str().canonical(Canonical::DottedQuad))
                .field("authentication_type", ScalarSpec::str().choices(["message_digest", "text"]))
                .field("default_cost", ScalarSpec::int().range(0, 16_777_215))
                .field("filter_list_in", ScalarSpec::str())
                .field("filter_list_out", ScalarSpec::str())
                .field("networks", Schema::set(ScalarSpec::str().canonical(Canonical::Prefix)))
                .field("ranges", Schema::list(ranges))
                .field("shortcut", ScalarSpec::str().choices(["default", "disable", "enable"]))
                .field("stub", Schema::object(stub))
                .field("virtual_links", Schema::list(virtual_link()))
                .identity(&["vrf_name", "area_id"]),
        ),
        RestTemplate::new("data/openconfig-network-instance:network-instances/network-instance")
            .rename("ranges", "openconfig-ospfv2-ext:ranges/range")
            .rename("networks", "openconfig-ospfv2-ext:networks/network")
            .rename("virtual_links", "virtual-links/virtual-link")
            .rename("message_digest_list", "md-authentications/md-authentication"),
        "OSPFv2 area settings",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::{ConvergenceMode, Error, reconcile};
    use serde_json::json;

    fn current() -> serde_json::Value {
        json!([
            {"vrf_name": "default", "area_id": "0.0.0.2", "authentication_type": "text",
             "networks": ["10.1.1.0/24"],
             "ranges": [{"prefix": "1.1.1.0/24", "cost": 10, "advertise": true}],
             "stub": {"enabled": true}},
            {"vrf_name": "Vrf1", "area_id": "0.0.0.3", "shortcut": "enable"}
        ])
    }

    #[test]
    fn test_numeric_area_id_matches_dotted_form() {
        let result = reconcile(
            &resource(),
            &json!([{"area_id": 2, "networks": ["10.1.1.5/24"], "stub": {"enabled": true}}]),
            &current(),
            ConvergenceMode::Merged,
        )
        .unwrap();
        assert!(!result.changed, "{:?}", result.commands);
    }

    #[test]
    fn test_replaced_area_clears_ranges() {
        let result = reconcile(
            &resource(),
            &json!([{"area_id": "0.0.0.2", "stub": {"enabled": true, "no_summary": true}}]),
            &current(),
            ConvergenceMode::Replaced,
        )
        .unwrap();
        let ops: Vec<String> = result.operations.iter().map(ToString::to_string).collect();
        assert!(
            ops.contains(&"REMOVE ospf_area[vrf_name=default,area_id=0.0.0.2].ranges[prefix=1.1.1.0/24]".to_string()),
            "{ops:?}"
        );
        // sorted by identity: Vrf1 before default
        assert_eq!(
            result.after[1],
            json!({"vrf_name": "default", "area_id": "0.0.0.2", "stub": {"enabled": true, "no_summary": true}})
        );
        assert_eq!(result.after[0], current()[1]);
    }

    #[test]
    fn test_new_digest_key_needs_a_password() {
        let err = reconcile(
            &resource(),
            &json!([{"area_id": "0.0.0.2", "virtual_links": [
                {"router_id": "10.0.0.9", "message_digest_list": [{"key_id": 3}]}
            ]}]),
            &current(),
            ConvergenceMode::Merged,
        )
        .unwrap_err();
        assert!(
            matches!(&err, Error::IncompleteEntity(e) if e.missing == ["key"]),
            "{err}"
        );
    }
}

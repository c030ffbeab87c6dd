//! Route map statements, keyed by map name and sequence number

use converge::schema::{Canonical, ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

const ORIGINS: [&str; 3] = ["egp", "igp", "incomplete"];

fn u32_value() -> ScalarSpec {
    ScalarSpec::int().range(0, 4_294_967_295)
}

fn match_conditions() -> ObjectSchema {
    let evpn = ObjectSchema::new()
        .field("default_route", ScalarSpec::bool())
        .field("route_type", ScalarSpec::str().choices(["macip", "multicast", "prefix"]))
        .field("vni", ScalarSpec::int().range(1, 16_777_215));

    let ip = ObjectSchema::new()
        .field("address", ScalarSpec::str())
        .field("next_hop", ScalarSpec::str());

    let peer = ObjectSchema::new()
        .field("ip", ScalarSpec::str().canonical(Canonical::Address))
        .field("ipv6", ScalarSpec::str().canonical(Canonical::Address))
        .field("interface", ScalarSpec::str());

    ObjectSchema::new()
        .field("as_path", ScalarSpec::str())
        .field("community", ScalarSpec::str())
        .field("evpn", Schema::object(evpn))
        .field("ext_comm", ScalarSpec::str())
        .field("interface", ScalarSpec::str())
        .field("ip", Schema::object(ip))
        .field("ipv6", Schema::object(ObjectSchema::new().field("address", ScalarSpec::str())))
        .field("local_preference", u32_value())
        .field("metric", u32_value())
        .field("origin", ScalarSpec::str().choices(ORIGINS))
        .field("peer", Schema::object(peer))
        .field("source_protocol", ScalarSpec::str().choices(["bgp", "connected", "ospf", "static"]))
        .field("source_vrf", ScalarSpec::str())
        .field("tag", ScalarSpec::int().range(1, 4_294_967_295))
}

fn set_actions() -> ObjectSchema {
    let community = ObjectSchema::new()
        .field("community_number", Schema::set(ScalarSpec::str()))
        .field(
            "community_attributes",
            Schema::set(ScalarSpec::str().choices([
                "local_as",
                "no_advertise",
                "no_export",
                "no_peer",
                "additive",
            ])),
        );

    let extcommunity = ObjectSchema::new()
        .field("rt", Schema::set(ScalarSpec::str()))
        .field("soo", Schema::set(ScalarSpec::str()));

    let ip_next_hop = ObjectSchema::new()
        .field("address", ScalarSpec::str().canonical(Canonical::Address))
        .field("native", ScalarSpec::bool());

    let ipv6_next_hop = ObjectSchema::new()
        .field("global_addr", ScalarSpec::str().canonical(Canonical::Address))
        .field("prefer_global", ScalarSpec::bool())
        .field("native", ScalarSpec::bool());

    let metric = ObjectSchema::new()
        .field("value", u32_value())
        .field("rtt_action", ScalarSpec::str().choices(["set", "add", "subtract"]));

    ObjectSchema::new()
        .field("as_path_prepend", ScalarSpec::str())
        .field("comm_list_delete", ScalarSpec::str())
        .field("community", Schema::object(community))
        .field("extcommunity", Schema::object(extcommunity))
        .field("ip_next_hop", Schema::object(ip_next_hop))
        .field("ipv6_next_hop", Schema::object(ipv6_next_hop))
        .field("local_preference", u32_value())
        .field("metric", Schema::object(metric))
        .field("origin", ScalarSpec::str().choices(ORIGINS))
        .field("weight", u32_value())
        .field("tag", ScalarSpec::int().range(1, 4_294_967_295))
}

pub fn resource() -> DeclaredResource {
    DeclaredResource::new(
        ResourceSchema::list(
            "route_maps",
            ObjectSchema::new()
                .field("map_name", ScalarSpec::str())
                .field("sequence_num", ScalarSpec::int().range(1, 65535))
                .field("action", ScalarSpec::str().choices(["permit", "deny"]))
                .field("match", Schema::object(match_conditions()))
                .field("set", Schema::object(set_actions()))
                .field("call", ScalarSpec::str())
                .identity(&["map_name", "sequence_num"])
                .required(&["action"]),
        ),
        RestTemplate::new("data/openconfig-routing-policy:routing-policy/policy-definitions/policy-definition")
            .rename("match", "conditions")
            .rename("set", "actions")
            .rename("call", "conditions/config/call-policy"),
        "Route map statements",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::{ConvergenceMode, Error, reconcile};
    use serde_json::json;

    fn current() -> serde_json::Value {
        json!([
            {"map_name": "rm1", "sequence_num": 80, "action": "permit",
             "match": {"as_path": "bgp_as2", "tag": 7284, "peer": {"interface": "PortChannel14"}},
             "set": {"community": {"community_number": ["35:58", "79:150"], "community_attributes": ["no_export"]},
                     "metric": {"rtt_action": "add"}}},
            {"map_name": "rm1", "sequence_num": 3047, "action": "deny", "call": "rm3"}
        ])
    }

    #[test]
    fn test_new_statement_needs_action() {
        let err = reconcile(
            &resource(),
            &json!([{"map_name": "rm2", "sequence_num": 10, "match": {"metric": 400}}]),
            &current(),
            ConvergenceMode::Merged,
        )
        .unwrap_err();
        assert!(
            matches!(&err, Error::IncompleteEntity(e) if e.path == "route_maps[map_name=rm2,sequence_num=10]"),
            "{err}"
        );
    }

    #[test]
    fn test_deleted_community_member() {
        let result = reconcile(
            &resource(),
            &json!([{"map_name": "rm1", "sequence_num": 80,
                     "set": {"community": {"community_number": ["79:150"]}}}]),
            &current(),
            ConvergenceMode::Deleted,
        )
        .unwrap();
        assert_eq!(
            result.commands,
            vec!["DELETE data/openconfig-routing-policy:routing-policy/policy-definitions/policy-definition=rm1,80/actions/community/community-number=79:150"]
        );
        assert_eq!(
            result.after[0]["set"]["community"],
            json!({"community_number": ["35:58"], "community_attributes": ["no_export"]})
        );
    }

    #[test]
    fn test_merged_adds_match_condition_to_existing_statement() {
        let result = reconcile(
            &resource(),
            &json!([{"map_name": "rm1", "sequence_num": 3047, "match": {"origin": "egp"}}]),
            &current(),
            ConvergenceMode::Merged,
        )
        .unwrap();
        let ops: Vec<String> = result.operations.iter().map(ToString::to_string).collect();
        assert_eq!(
            ops,
            vec!["ADD route_maps[map_name=rm1,sequence_num=3047].match {origin=egp}"]
        );
        assert_eq!(result.after[1]["action"], "deny");
    }
}

//! ACL bindings of interfaces

use converge::schema::{Canonical, ObjectSchema, ResourceSchema, Schema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    let acls = ObjectSchema::new()
        .field("name", ScalarSpec::str())
        .field(
            "direction",
            ScalarSpec::str().canonical(Canonical::Lowercase).choices(["in", "out"]),
        )
        .identity(&["name", "direction"]);

    let access_groups = ObjectSchema::new()
        .field(
            "type",
            ScalarSpec::str().canonical(Canonical::Lowercase).choices(["mac", "ipv4", "ipv6"]),
        )
        .field("acls", Schema::list(acls))
        .identity(&["type"]);

    DeclaredResource::new(
        ResourceSchema::list(
            "acl_interfaces",
            ObjectSchema::new()
                .field("name", ScalarSpec::str())
                .field("access_groups", Schema::list(access_groups))
                .identity(&["name"]),
        ),
        RestTemplate::new("data/openconfig-acl:acl/interfaces/interface")
            .rename("access_groups", "acl-type")
            .rename("acls", "acl-set"),
        "ACLs applied to interfaces",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::{ConvergenceMode, reconcile};
    use serde_json::json;

    fn current() -> serde_json::Value {
        json!([
            {"name": "Eth1/1", "access_groups": [
                {"type": "ipv4", "acls": [
                    {"name": "test-acl", "direction": "in"},
                    {"name": "test-acl-1", "direction": "out"}
                ]},
                {"type": "mac", "acls": [{"name": "mac-acl", "direction": "in"}]}
            ]},
            {"name": "Vlan100", "access_groups": [
                {"type": "ipv6", "acls": [{"name": "v6-acl", "direction": "in"}]}
            ]}
        ])
    }

    #[test]
    fn test_replaced_interface_drops_other_bindings() {
        let desired = json!([{"name": "Eth1/1", "access_groups": [
            {"type": "IPv4", "acls": [{"name": "test-acl", "direction": "IN"}]}
        ]}]);
        let result = reconcile(&resource(), &desired, &current(), ConvergenceMode::Replaced).unwrap();
        assert_eq!(
            result.after,
            json!([
                {"name": "Eth1/1", "access_groups": [
                    {"type": "ipv4", "acls": [{"name": "test-acl", "direction": "in"}]}
                ]},
                current()[1]
            ])
        );
        assert_eq!(
            result.commands,
            vec![
                "DELETE data/openconfig-acl:acl/interfaces/interface=Eth1%2F1/acl-type=ipv4/acl-set=test-acl-1,out",
                "DELETE data/openconfig-acl:acl/interfaces/interface=Eth1%2F1/acl-type=mac",
            ]
        );
    }

    #[test]
    fn test_deleted_interface_by_name_removes_all_bindings() {
        let result = reconcile(
            &resource(),
            &json!([{"name": "Vlan100"}]),
            &current(),
            ConvergenceMode::Deleted,
        )
        .unwrap();
        assert_eq!(result.after.as_array().unwrap().len(), 1);
        assert_eq!(
            result.commands,
            vec!["DELETE data/openconfig-acl:acl/interfaces/interface=Vlan100"]
        );
    }
}

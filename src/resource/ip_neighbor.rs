//! IP neighbor (ARP/ND) global timers

use converge::schema::{ObjectSchema, ResourceSchema, ScalarSpec};
use converge::{DeclaredResource, RestTemplate};

pub fn resource() -> DeclaredResource {
    DeclaredResource::new(
        ResourceSchema::object(
            "ip_neighbor",
            ObjectSchema::new()
                .field("ipv4_arp_timeout", ScalarSpec::int().range(60, 14400).default_value(180))
                .field("ipv6_nd_cache_expiry", ScalarSpec::int().range(60, 14400).default_value(180))
                .field("num_local_neigh", ScalarSpec::int().range(0, 32000).default_value(0))
                .field(
                    "ipv4_drop_neighbor_aging_time",
                    ScalarSpec::int().range(60, 14400).default_value(300),
                )
                .field(
                    "ipv6_drop_neighbor_aging_time",
                    ScalarSpec::int().range(60, 14400).default_value(300),
                ),
        ),
        RestTemplate::new("data/openconfig-neighbor:neighbor-globals/neighbor-global=Values/config"),
        "ARP and neighbor discovery timers",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::{ConvergenceMode, reconcile};
    use serde_json::json;

    #[test]
    fn test_overridden_resets_unmentioned_timers() {
        let current = json!({"ipv4_arp_timeout": 1200, "ipv6_nd_cache_expiry": 1200, "num_local_neigh": 0});
        let result = reconcile(
            &resource(),
            &json!({"ipv4_arp_timeout": 600}),
            &current,
            ConvergenceMode::Overridden,
        )
        .unwrap();
        assert_eq!(
            result.after,
            json!({"ipv4_arp_timeout": 600, "ipv6_nd_cache_expiry": 180, "num_local_neigh": 0})
        );

        // replaced leaves the unmentioned timer alone at the top level
        let result = reconcile(
            &resource(),
            &json!({"ipv4_arp_timeout": 600}),
            &current,
            ConvergenceMode::Replaced,
        )
        .unwrap();
        assert_eq!(result.after["ipv6_nd_cache_expiry"], 1200);
    }

    #[test]
    fn test_out_of_range_timer_is_rejected() {
        let err = reconcile(
            &resource(),
            &json!({"ipv4_arp_timeout": 5}),
            &json!({}),
            ConvergenceMode::Merged,
        )
        .unwrap_err();
        assert!(err.to_string().contains("ipv4_arp_timeout"), "{err}");
    }
}

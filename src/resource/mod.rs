//! Resource catalogue
//!
//! Every configuration area the tool can converge, looked up by name.

mod acl_interfaces;
mod bgp_ext_communities;
mod interfaces;
mod ip_neighbor;
mod l3_interfaces;
mod mac;
mod ntp;
mod ospf_area;
mod ospfv2_interfaces;
mod pim_interfaces;
mod poe;
mod qos_buffer;
mod qos_maps;
mod qos_pfc;
mod qos_scheduler;
mod qos_wred;
mod radius_server;
mod roce;
mod route_maps;
mod static_routes;
mod vrrp;

use converge::{BoxedResource, Error, Resource};

/// All known resources, sorted by name
pub fn all() -> Vec<BoxedResource> {
    vec![
        Box::new(acl_interfaces::resource()),
        Box::new(bgp_ext_communities::resource()),
        Box::new(interfaces::resource()),
        Box::new(ip_neighbor::resource()),
        Box::new(l3_interfaces::resource()),
        Box::new(mac::resource()),
        Box::new(ntp::resource()),
        Box::new(ospf_area::resource()),
        Box::new(ospfv2_interfaces::resource()),
        Box::new(pim_interfaces::resource()),
        Box::new(poe::resource()),
        Box::new(qos_buffer::resource()),
        Box::new(qos_maps::resource()),
        Box::new(qos_pfc::resource()),
        Box::new(qos_scheduler::resource()),
        Box::new(qos_wred::resource()),
        Box::new(radius_server::resource()),
        Box::new(roce::resource()),
        Box::new(route_maps::resource()),
        Box::new(static_routes::resource()),
        Box::new(vrrp::resource()),
    ]
}

/// Find a resource by name
pub fn find(name: &str) -> Result<BoxedResource, Error> {
    all()
        .into_iter()
        .find(|r| r.name() == name)
        .ok_or_else(|| Error::UnknownResource(name.to_string()))
}

//! Coverage network wiring

use crate::config::{CoverageConfig, NetworkConfig, ProjectConfig};

/// Make sure the selected network exists and points at the coverage node
///
/// Fields the project already set are kept, except the port: it always
/// follows the coverage configuration so the node and the build tool agree.
pub fn set_network(project: &mut ProjectConfig, coverage: &CoverageConfig) {
    let name = project.network_name().to_string();
    let entry = project
        .networks
        .entry(name.clone())
        .or_insert_with(NetworkConfig::default);

    if let Some(port) = entry.port.filter(|port| *port != coverage.port) {
        tracing::warn!(
            network = %name,
            configured = port,
            using = coverage.port,
            "network port differs from coverage port; using coverage port"
        );
    }

    entry.port = Some(coverage.port);
    entry.host.get_or_insert_with(|| coverage.host.clone());
    entry
        .network_id
        .get_or_insert_with(|| coverage.network_id.clone());
    entry.gas.get_or_insert(coverage.gas);
    entry.gas_price.get_or_insert(coverage.gas_price);
}

/// Default the sender of the selected network to the node's first account
pub fn set_network_from(project: &mut ProjectConfig, accounts: &[String]) {
    let name = project.network_name().to_string();
    let Some(entry) = project.networks.get_mut(&name) else {
        return;
    };
    if entry.from.is_none() {
        entry.from = accounts.first().cloned();
    }
}

/// Extract the version segment of a `web3_clientVersion` string
///
/// `EthereumJS TestRPC/v2.13.2/ethereum-js` becomes `v2.13.2`; strings
/// without a `/` are returned as-is.
#[must_use]
pub fn node_version(client_version: &str) -> &str {
    client_version
        .split('/')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .unwrap_or(client_version)
}

//! Point-in-time view of one running container, decoupled from the Docker API
//! types so the record builder can be exercised without a daemon.

use std::collections::BTreeMap;

use bollard::models::ContainerSummary;

/// Length of the abbreviated container id Docker shows in `docker ps`.
pub const SHORT_ID_LEN: usize = 12;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerSnapshot {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub image_id: String,
    pub ports: Vec<PortMapping>,
    pub labels: BTreeMap<String, String>,
    /// Unix seconds, as reported by the runtime.
    pub created: Option<i64>,
    pub networks: Vec<NetworkAttachment>,
    pub mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: Option<u16>,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkAttachment {
    pub name: String,
    pub ipv4_address: Option<String>,
    pub ipv6_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeMount {
    pub name: String,
    pub source: String,
    pub destination: String,
}

impl ContainerSnapshot {
    /// Name shown in metadata: the first declared name without Docker's
    /// leading `/`, or the short id when the runtime reported no usable name.
    pub fn display_name(&self) -> String {
        self.names
            .iter()
            .map(|name| name.trim_start_matches('/'))
            .find(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.short_id())
    }

    pub fn short_id(&self) -> String {
        self.id.chars().take(SHORT_ID_LEN).collect()
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names
            .iter()
            .any(|candidate| candidate.trim_start_matches('/') == name)
    }

    /// True when any attached network assigned `address` to this container.
    pub fn has_address(&self, address: &str) -> bool {
        self.networks.iter().any(|network| {
            network.ipv4_address.as_deref() == Some(address)
                || network.ipv6_address.as_deref() == Some(address)
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl From<ContainerSummary> for ContainerSnapshot {
    fn from(summary: ContainerSummary) -> Self {
        let ports = summary
            .ports
            .unwrap_or_default()
            .into_iter()
            .map(|port| PortMapping {
                container_port: port.private_port,
                host_port: port.public_port,
                protocol: port.typ.map(|t| t.to_string()).unwrap_or_default(),
            })
            .collect();

        // Docker reports networks as a map; order them by name so repeated
        // queries produce the same document.
        let mut networks: Vec<NetworkAttachment> = summary
            .network_settings
            .and_then(|settings| settings.networks)
            .unwrap_or_default()
            .into_iter()
            .map(|(name, endpoint)| NetworkAttachment {
                name,
                ipv4_address: non_empty(endpoint.ip_address),
                ipv6_address: non_empty(endpoint.global_ipv6_address),
            })
            .collect();
        networks.sort_by(|a, b| a.name.cmp(&b.name));

        let mounts = summary
            .mounts
            .unwrap_or_default()
            .into_iter()
            .map(|mount| VolumeMount {
                name: mount.name.unwrap_or_default(),
                source: mount.source.unwrap_or_default(),
                destination: mount.destination.unwrap_or_default(),
            })
            .collect();

        Self {
            id: summary.id.unwrap_or_default(),
            names: summary.names.unwrap_or_default(),
            image: summary.image.unwrap_or_default(),
            image_id: summary.image_id.unwrap_or_default(),
            ports,
            labels: summary.labels.unwrap_or_default().into_iter().collect(),
            created: summary.created,
            networks,
            mounts,
        }
    }
}

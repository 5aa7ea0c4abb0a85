//! Discovered cluster endpoints consumed by interpreter reconciliation.

use serde::Deserialize;

/// Snapshot of the cluster endpoints discovered by the hosting platform.
///
/// Every field is optional: an integration whose endpoints are unknown is
/// simply left untouched during reconciliation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterTopology {
    /// Host of the SQL engine server, when one is deployed.
    #[serde(default)]
    pub hive_server_host: Option<String>,
    /// Port of the SQL engine server.
    #[serde(default = "default_hive_server_port")]
    pub hive_server_port: u16,
    /// Comma-separated ZooKeeper quorum of the secondary store.
    #[serde(default)]
    pub zookeeper_quorum: Option<String>,
    /// Root znode of the secondary store inside ZooKeeper.
    #[serde(default)]
    pub zookeeper_znode_parent: Option<String>,
}

fn default_hive_server_port() -> u16 {
    10000
}

impl Default for ClusterTopology {
    fn default() -> Self {
        Self {
            hive_server_host: None,
            hive_server_port: default_hive_server_port(),
            zookeeper_quorum: None,
            zookeeper_znode_parent: None,
        }
    }
}

impl ClusterTopology {
    /// JDBC URL of the SQL engine server, when its host is known.
    #[must_use]
    pub fn hive_jdbc_url(&self) -> Option<String> {
        self.hive_server_host
            .as_deref()
            .map(|host| format!("jdbc:hive2://{host}:{}", self.hive_server_port))
    }

    /// JDBC URL of the secondary store, when quorum and znode are known.
    #[must_use]
    pub fn phoenix_jdbc_url(&self) -> Option<String> {
        match (
            self.zookeeper_quorum.as_deref(),
            self.zookeeper_znode_parent.as_deref(),
        ) {
            (Some(quorum), Some(znode)) => Some(format!("jdbc:phoenix:{quorum}:{znode}")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hive_url_requires_host() {
        assert_eq!(ClusterTopology::default().hive_jdbc_url(), None);
        let topology = ClusterTopology {
            hive_server_host: Some("h1".into()),
            ..ClusterTopology::default()
        };
        assert_eq!(
            topology.hive_jdbc_url().as_deref(),
            Some("jdbc:hive2://h1:10000")
        );
    }

    #[test]
    fn phoenix_url_requires_quorum_and_znode() {
        let partial = ClusterTopology {
            zookeeper_quorum: Some("zk1,zk2".into()),
            ..ClusterTopology::default()
        };
        assert_eq!(partial.phoenix_jdbc_url(), None);
        let topology = ClusterTopology {
            zookeeper_quorum: Some("zk1,zk2".into()),
            zookeeper_znode_parent: Some("/hbase".into()),
            ..ClusterTopology::default()
        };
        assert_eq!(
            topology.phoenix_jdbc_url().as_deref(),
            Some("jdbc:phoenix:zk1,zk2:/hbase")
        );
    }
}

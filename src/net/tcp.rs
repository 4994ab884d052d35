//! TCP backends and a connect-based prober.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time;

use crate::error::NodeError;
use crate::load_balancer::Prober;

/// A backend reachable over TCP.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TcpNode {
    pub name: String,
    pub addr: SocketAddr,
}

impl TcpNode {
    pub fn new(name: impl Into<String>, addr: SocketAddr) -> Self {
        Self {
            name: name.into(),
            addr,
        }
    }
}

impl fmt::Display for TcpNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.addr)
    }
}

/// Probes a node by opening and dropping a TCP connection.
///
/// A refused or reset connection is a communication error. A connect that
/// does not complete within the request timeout is a missing answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober<TcpNode> for TcpProber {
    async fn probe(&self, node: &TcpNode, request_timeout: Duration) -> Result<(), NodeError> {
        match time::timeout(request_timeout, TcpStream::connect(node.addr)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(NodeError::Communication(format!("{}: {}", node.addr, e))),
            Err(_) => Err(NodeError::NoAnswer(format!(
                "{}: no connection within {:?}",
                node.addr, request_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tokio::net::TcpListener;

    #[test]
    fn test_display() {
        let node = TcpNode::new("db-1", "127.0.0.1:5432".parse().unwrap());
        assert_eq!(node.to_string(), "db-1@127.0.0.1:5432");
    }

    #[tokio::test]
    async fn test_probe_listening_node() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let node = TcpNode::new("up", listener.local_addr().unwrap());

        let result = TcpProber.probe(&node, Duration::from_secs(1)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_probe_closed_port_is_communication_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = TcpProber
            .probe(&TcpNode::new("gone", addr), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Communication);
    }
}

//! In-memory fakes for driving the control logic without a network

use crate::rpc::{JsonRpcRequest, JsonRpcResponse, RpcClient, RpcTransport, TransportError};
use crate::sequencer::Sequencer;
use crate::network::Network;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Scripted answer for one (url, method) pair
#[derive(Debug, Clone)]
pub enum Reply {
    Response(JsonRpcResponse),
    Unreachable,
    Status(u16),
}

impl Reply {
    pub fn result(value: Value) -> Self {
        Reply::Response(JsonRpcResponse {
            result: Some(value),
            ..Default::default()
        })
    }

    pub fn error(value: Value) -> Self {
        Reply::Response(JsonRpcResponse {
            error: Some(serde_json::from_value(value).expect("valid error payload")),
            ..Default::default()
        })
    }

    pub fn ok() -> Self {
        Reply::result(Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub request: JsonRpcRequest,
}

/// Transport that answers from a script and records every request.
///
/// Pairs without a scripted reply are treated as unreachable.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<(String, String), Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, url: &str, method: &str, reply: Reply) {
        self.replies
            .lock()
            .insert((url.to_string(), method.to_string()), reply);
    }

    pub fn client(self: &Arc<Self>) -> RpcClient {
        RpcClient::from_arc(self.clone())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// `(url, method, params)` of every call, in order
    pub fn call_log(&self) -> Vec<(String, String, Vec<Value>)> {
        self.calls
            .lock()
            .iter()
            .map(|c| (c.url.clone(), c.request.method.clone(), c.request.params.clone()))
            .collect()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn post(
        &self,
        url: &str,
        request: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, TransportError> {
        self.calls.lock().push(RecordedCall {
            url: url.to_string(),
            request: request.clone(),
        });

        let reply = self
            .replies
            .lock()
            .get(&(url.to_string(), request.method.clone()))
            .cloned();

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Status(code)) => Err(TransportError::Status(code)),
            Some(Reply::Unreachable) | None => Err(TransportError::Unreachable(format!(
                "connection refused: {}",
                url
            ))),
        }
    }
}

pub fn conductor_url(id: &str) -> String {
    format!("http://{}-conductor:8547", id)
}

pub fn node_url(id: &str) -> String {
    format!("http://{}-node:9545", id)
}

pub fn raft_addr(id: &str) -> String {
    format!("{}:50050", id)
}

/// Unrefreshed snapshot with the conventional fake endpoints
pub fn sequencer(id: &str, voting: bool) -> Sequencer {
    Sequencer::new(id, &conductor_url(id), &node_url(id), &raft_addr(id), voting)
}

/// Live state scripted for one fake sequencer
#[derive(Debug, Clone, Copy)]
pub struct FakeState {
    pub leader: bool,
    pub healthy: bool,
}

impl FakeState {
    pub fn follower() -> Self {
        Self {
            leader: false,
            healthy: true,
        }
    }

    pub fn leader() -> Self {
        Self {
            leader: true,
            healthy: true,
        }
    }
}

/// Script every refresh call for `id`
pub fn script_sequencer(mock: &MockTransport, id: &str, state: FakeState) {
    let conductor = conductor_url(id);
    let node = node_url(id);
    mock.on(&conductor, "conductor_active", Reply::result(json!(true)));
    mock.on(&conductor, "conductor_leader", Reply::result(json!(state.leader)));
    mock.on(&conductor, "conductor_sequencerHealthy", Reply::result(json!(state.healthy)));
    mock.on(&node, "admin_sequencerActive", Reply::result(json!(state.leader)));
    mock.on(
        &node,
        "optimism_syncStatus",
        Reply::result(json!({
            "unsafe_l2": {"number": 1024, "hash": format!("0x{:0>64}", id.len())},
            "safe_l2": {"number": 1000, "hash": "0x00"}
        })),
    );
}

/// Script the leader's membership listing
pub fn script_membership(mock: &MockTransport, leader_id: &str, servers: &[(&str, u8)]) {
    let servers: Vec<Value> = servers
        .iter()
        .map(|(id, suffrage)| json!({"id": id, "addr": raft_addr(id), "suffrage": suffrage}))
        .collect();
    mock.on(
        &conductor_url(leader_id),
        "conductor_clusterMembership",
        Reply::result(json!({"servers": servers, "version": 3})),
    );
}

/// Build and refresh a network, then forget the refresh calls
pub async fn refreshed_network(
    mock: &Arc<MockTransport>,
    name: &str,
    sequencers: Vec<Sequencer>,
) -> Network {
    let mut network = Network::new(name, sequencers);
    network.update(&mock.client()).await;
    mock.clear_calls();
    network
}

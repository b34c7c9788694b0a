//! CrossContextBridge: tagged request/response calls awaited as futures.
//!
//! [`CrossContextBridge::invoke`] allocates an id, records the caller in the
//! pending table and queues the serialized request before returning, so the
//! call is in flight even if the returned [`PendingCall`] is awaited later.
//! Responses are matched purely by id; unknown or late ids are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::BridgeError;

use super::protocol::{self, Request, Response};

type Reply = Result<JsonValue, BridgeError>;

/// Bridge settings.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfig {
    /// Reject calls that have not been answered within this deadline.
    pub timeout: Option<Duration>,
}

impl BridgeConfig {
    /// Reject calls unanswered after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Default)]
struct PendingTable {
    next_id: u64,
    calls: HashMap<String, oneshot::Sender<Reply>>,
}

/// The privileged context's end of the transport.
#[derive(Debug)]
pub struct HostEndpoint {
    /// Serialized [`Request`]s from the bridge.
    pub requests: mpsc::UnboundedReceiver<String>,
    /// Serialized [`Response`]s back to the bridge.
    pub responses: mpsc::UnboundedSender<String>,
}

/// Responses arriving from the privileged context, fed to
/// [`CrossContextBridge::pump`].
#[derive(Debug)]
pub struct ResponseInbox {
    rx: mpsc::UnboundedReceiver<String>,
}

impl ResponseInbox {
    /// Next serialized response, or `None` once the host side closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// A response that already arrived, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

/// Build a bridge together with both ends of its transport.
pub fn connect(config: BridgeConfig) -> (CrossContextBridge, HostEndpoint, ResponseInbox) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::unbounded_channel();
    let bridge = CrossContextBridge {
        pending: Arc::new(Mutex::new(PendingTable::default())),
        outbound: request_tx,
        config,
    };
    (
        bridge,
        HostEndpoint {
            requests: request_rx,
            responses: response_tx,
        },
        ResponseInbox { rx: response_rx },
    )
}

/// Sends calls to the privileged context and routes answers back by id.
#[derive(Clone)]
pub struct CrossContextBridge {
    pending: Arc<Mutex<PendingTable>>,
    outbound: mpsc::UnboundedSender<String>,
    config: BridgeConfig,
}

impl CrossContextBridge {
    /// Issue a call. Never blocks.
    pub fn invoke(&self, action: &str, payload: JsonValue) -> PendingCall {
        self.dispatch(action, payload, None)
    }

    /// Issue a call that rejects with [`BridgeError::Cancelled`] once `token`
    /// is cancelled.
    pub fn invoke_with_cancel(
        &self,
        action: &str,
        payload: JsonValue,
        token: CancellationToken,
    ) -> PendingCall {
        self.dispatch(action, payload, Some(token))
    }

    fn dispatch(
        &self,
        action: &str,
        payload: JsonValue,
        cancel: Option<CancellationToken>,
    ) -> PendingCall {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut table = self.pending.lock();
            table.next_id += 1;
            let id = table.next_id.to_string();
            table.calls.insert(id.clone(), tx);
            id
        };

        let request = Request {
            id: id.clone(),
            action: action.to_owned(),
            payload,
        };
        let sent = protocol::encode(&request).and_then(|raw| {
            self.outbound
                .send(raw)
                .map_err(|_| BridgeError::ChannelClosed)
        });

        let early = match sent {
            Ok(()) => {
                debug!(%id, action, "bridge call sent");
                None
            }
            Err(err) => {
                self.pending.lock().calls.remove(&id);
                warn!(%id, action, error = %err, "bridge call not sent");
                Some(err)
            }
        };

        PendingCall {
            id,
            rx,
            deadline: self
                .config
                .timeout
                .map(|after| (after, Instant::now() + after)),
            cancel,
            pending: Arc::clone(&self.pending),
            early,
        }
    }

    /// Feed one serialized response. Returns whether it matched a pending call.
    pub fn receive(&self, raw: &str) -> Result<bool, BridgeError> {
        let response = protocol::decode_response(raw)?;
        Ok(self.handle_response(response))
    }

    /// Resolve or reject the call `response` answers.
    pub fn handle_response(&self, response: Response) -> bool {
        let sender = self.pending.lock().calls.remove(response.id());
        let Some(sender) = sender else {
            debug!(id = response.id(), "dropping response for unknown call");
            return false;
        };

        let reply = match response {
            Response::Success { result, .. } => Ok(result),
            Response::Failure { id, error } => Err(BridgeError::Remote { id, message: error }),
        };
        if sender.send(reply).is_err() {
            trace!("caller stopped waiting before the response arrived");
        }
        true
    }

    /// Route every response from `inbox` until the host side closes.
    pub async fn pump(&self, mut inbox: ResponseInbox) {
        while let Some(raw) = inbox.recv().await {
            if let Err(err) = self.receive(&raw) {
                warn!(error = %err, "discarding malformed response");
            }
        }
        debug!(pending = self.pending_count(), "response inbox closed");
    }

    /// Number of calls awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().calls.len()
    }

    /// Whether call `id` still awaits a response.
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.lock().calls.contains_key(id)
    }

    /// Settings the bridge was connected with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

/// An in-flight call. Await [`wait`](Self::wait) for the result.
///
/// The deadline, if any, counts from the moment the call was issued, not from
/// the first poll of [`wait`](Self::wait). Dropping it without waiting leaves
/// the pending entry in place until the response arrives.
#[derive(Debug)]
pub struct PendingCall {
    id: String,
    rx: oneshot::Receiver<Reply>,
    /// Configured timeout and the instant it expires.
    deadline: Option<(Duration, Instant)>,
    cancel: Option<CancellationToken>,
    pending: Arc<Mutex<PendingTable>>,
    early: Option<BridgeError>,
}

impl PendingCall {
    /// The request id this call was sent under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the response, the deadline or cancellation, whichever is first.
    pub async fn wait(self) -> Result<JsonValue, BridgeError> {
        let PendingCall {
            id,
            rx,
            deadline,
            cancel,
            pending,
            early,
        } = self;

        if let Some(err) = early {
            return Err(err);
        }

        let cancelled = async {
            match &cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match deadline {
                Some((_, at)) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            reply = rx => reply.unwrap_or(Err(BridgeError::ChannelClosed)),
            () = cancelled => {
                pending.lock().calls.remove(&id);
                debug!(%id, "bridge call cancelled");
                Err(BridgeError::Cancelled { id })
            }
            () = expired => {
                pending.lock().calls.remove(&id);
                warn!(%id, "bridge call timed out");
                Err(BridgeError::Timeout {
                    id,
                    after: deadline.map(|(after, _)| after).unwrap_or_default(),
                })
            }
        }
    }
}

impl std::fmt::Debug for PendingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTable")
            .field("next_id", &self.next_id)
            .field("calls", &self.calls.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answer(bridge: &CrossContextBridge, host: &mut HostEndpoint, result: JsonValue) -> String {
        let raw = host.requests.try_recv().unwrap();
        let request = protocol::decode_request(&raw).unwrap();
        let response = protocol::encode(&Response::success(request.id.clone(), result)).unwrap();
        assert!(bridge.receive(&response).unwrap());
        request.id
    }

    #[tokio::test]
    async fn invoke_resolves_on_matching_response() {
        let (bridge, mut host, _inbox) = connect(BridgeConfig::default());
        let call = bridge.invoke("measure", json!({"targetId": "a"}));
        assert_eq!(bridge.pending_count(), 1);

        let id = answer(&bridge, &mut host, json!({"top": 1}));
        assert_eq!(id, call.id());
        assert_eq!(call.wait().await.unwrap(), json!({"top": 1}));
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn responses_match_by_id_not_order() {
        let (bridge, mut host, _inbox) = connect(BridgeConfig::default());
        let first = bridge.invoke("echo", json!(1));
        let second = bridge.invoke("echo", json!(2));
        let r1 = protocol::decode_request(&host.requests.try_recv().unwrap()).unwrap();
        let r2 = protocol::decode_request(&host.requests.try_recv().unwrap()).unwrap();
        assert_ne!(r1.id, r2.id);

        bridge.handle_response(Response::success(r2.id, json!("two")));
        bridge.handle_response(Response::success(r1.id, json!("one")));

        assert_eq!(second.wait().await.unwrap(), json!("two"));
        assert_eq!(first.wait().await.unwrap(), json!("one"));
    }

    #[tokio::test]
    async fn remote_failure_rejects() {
        let (bridge, _host, _inbox) = connect(BridgeConfig::default());
        let call = bridge.invoke("measure", json!({}));
        let id = call.id().to_owned();
        bridge.handle_response(Response::failure(id.clone(), "no such node"));
        assert_eq!(
            call.wait().await.unwrap_err(),
            BridgeError::Remote {
                id,
                message: "no such node".into()
            }
        );
    }

    #[test]
    fn unknown_ids_are_dropped() {
        let (bridge, _host, _inbox) = connect(BridgeConfig::default());
        let _call = bridge.invoke("measure", json!({}));
        assert!(!bridge.receive(r#"{"id":"999","result":{}}"#).unwrap());
        assert_eq!(bridge.pending_count(), 1);
    }

    #[test]
    fn an_id_is_consumed_once() {
        let (bridge, _host, _inbox) = connect(BridgeConfig::default());
        let call = bridge.invoke("measure", json!({}));
        let id = call.id().to_owned();
        assert!(bridge.handle_response(Response::success(id.clone(), json!(1))));
        assert!(!bridge.handle_response(Response::success(id, json!(2))));
        assert_eq!(tokio_test::block_on(call.wait()).unwrap(), json!(1));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_rejects_and_clears_entry() {
        let config = BridgeConfig::default().with_timeout(Duration::from_millis(10));
        let (bridge, _host, _inbox) = connect(config);
        let call = bridge.invoke("measure", json!({}));
        let id = call.id().to_owned();

        let err = call.wait().await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::Timeout {
                id: id.clone(),
                after: Duration::from_millis(10)
            }
        );
        assert!(!bridge.is_pending(&id));
        // a late answer is just dropped
        assert!(!bridge.handle_response(Response::success(id, json!(null))));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_counts_from_invoke_not_from_wait() {
        let config = BridgeConfig::default().with_timeout(Duration::from_millis(50));
        let (bridge, _host, _inbox) = connect(config);
        let call = bridge.invoke("measure", json!({}));

        tokio::time::sleep(Duration::from_millis(40)).await;
        let waited = Instant::now();
        assert!(matches!(
            call.wait().await,
            Err(BridgeError::Timeout { after, .. }) if after == Duration::from_millis(50)
        ));
        assert!(waited.elapsed() < Duration::from_millis(50));
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn cancellation_rejects_and_clears_entry() {
        let (bridge, _host, _inbox) = connect(BridgeConfig::default());
        let token = CancellationToken::new();
        let call = bridge.invoke_with_cancel("measure", json!({}), token.clone());
        let id = call.id().to_owned();
        token.cancel();

        assert_eq!(
            call.wait().await.unwrap_err(),
            BridgeError::Cancelled { id: id.clone() }
        );
        assert!(!bridge.is_pending(&id));
    }

    #[tokio::test]
    async fn closed_transport_fails_immediately() {
        let (bridge, host, _inbox) = connect(BridgeConfig::default());
        drop(host);
        let call = bridge.invoke("measure", json!({}));
        assert_eq!(call.wait().await.unwrap_err(), BridgeError::ChannelClosed);
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn pump_routes_until_closed() {
        let (bridge, mut host, inbox) = connect(BridgeConfig::default());
        let call = bridge.invoke("echo", json!("hi"));
        let request = protocol::decode_request(&host.requests.try_recv().unwrap()).unwrap();

        host.responses.send("garbage".into()).unwrap();
        host.responses
            .send(protocol::encode(&Response::success(request.id, request.payload)).unwrap())
            .unwrap();
        drop(host);

        bridge.pump(inbox).await;
        assert_eq!(call.wait().await.unwrap(), json!("hi"));
    }
}

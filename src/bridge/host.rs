//! The privileged context's side of the bridge.
//!
//! A [`ContextHost`] decodes requests, hands each to its [`ActionHandler`]
//! and encodes the answer with the same id.

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::BridgeError;

use super::call::HostEndpoint;
use super::protocol::{self, Response};

/// Answers actions inside the privileged context.
pub trait ActionHandler {
    /// Handle one action. `Err` carries the message sent back as `error`.
    fn handle(&mut self, action: &str, payload: &JsonValue) -> Result<JsonValue, String>;
}

impl<F> ActionHandler for F
where
    F: FnMut(&str, &JsonValue) -> Result<JsonValue, String>,
{
    fn handle(&mut self, action: &str, payload: &JsonValue) -> Result<JsonValue, String> {
        self(action, payload)
    }
}

/// Serves bridge requests with an [`ActionHandler`].
#[derive(Debug)]
pub struct ContextHost<H> {
    handler: H,
}

impl<H: ActionHandler> ContextHost<H> {
    /// Serve requests with `handler`.
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// The handler answering requests.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Mutable access to the handler, e.g. to change layout between calls.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Answer one serialized request.
    ///
    /// Requests that cannot be decoded have no id to answer, so they are
    /// reported as [`BridgeError::Malformed`] instead of producing a response.
    pub fn respond(&mut self, raw: &str) -> Result<String, BridgeError> {
        let request = protocol::decode_request(raw)?;
        let response = match self.handler.handle(&request.action, &request.payload) {
            Ok(result) => Response::success(request.id, result),
            Err(message) => {
                debug!(id = %request.id, action = %request.action, %message, "action failed");
                Response::failure(request.id, message)
            }
        };
        protocol::encode(&response)
    }

    /// Serve requests until either side of `endpoint` closes, then hand the
    /// handler back.
    pub async fn serve(mut self, endpoint: HostEndpoint) -> H {
        let HostEndpoint {
            mut requests,
            responses,
        } = endpoint;
        while let Some(raw) = requests.recv().await {
            match self.respond(&raw) {
                Ok(answer) => {
                    if responses.send(answer).is_err() {
                        debug!("bridge side closed, host stopping");
                        break;
                    }
                }
                Err(err) => warn!(error = %err, "dropping undecodable request"),
            }
        }
        self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::call::{connect, BridgeConfig};
    use serde_json::json;

    fn echo(action: &str, payload: &JsonValue) -> Result<JsonValue, String> {
        match action {
            "echo" => Ok(payload.clone()),
            other => Err(format!("unsupported action `{other}`")),
        }
    }

    #[test]
    fn respond_keeps_request_id() {
        let mut host = ContextHost::new(echo);
        let answer = host
            .respond(r#"{"id":"7","action":"echo","payload":[1,2]}"#)
            .unwrap();
        insta::assert_snapshot!(answer, @r#"{"id":"7","result":[1,2]}"#);
    }

    #[test]
    fn handler_errors_become_failures() {
        let mut host = ContextHost::new(echo);
        let answer = host
            .respond(r#"{"id":"8","action":"explode","payload":null}"#)
            .unwrap();
        insta::assert_snapshot!(answer, @r#"{"id":"8","error":"unsupported action `explode`"}"#);
    }

    #[test]
    fn undecodable_request_is_an_error() {
        let mut host = ContextHost::new(echo);
        assert!(matches!(host.respond("{}"), Err(BridgeError::Malformed(_))));
    }

    #[tokio::test]
    async fn serve_and_pump_round_trip() {
        let (bridge, endpoint, inbox) = connect(BridgeConfig::default());
        let host = tokio::spawn(ContextHost::new(echo).serve(endpoint));
        let pump = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.pump(inbox).await })
        };

        let good = bridge.invoke("echo", json!({"k": "v"}));
        let bad = bridge.invoke("nope", json!(null));
        assert_eq!(good.wait().await.unwrap(), json!({"k": "v"}));
        assert!(matches!(
            bad.wait().await,
            Err(BridgeError::Remote { message, .. }) if message == "unsupported action `nope`"
        ));

        assert_eq!(bridge.pending_count(), 0);
        host.abort();
        pump.abort();
    }
}

//! Login (`L0#`).

use super::to_json;
use crate::context::ServerContext;
use crate::messaging::{Envelope, HandlerError, OpcodeHandler, Reply};
use async_trait::async_trait;
use bitrealm_engine::LoginOutcome;
use bitrealm_protocol::{parse_field, split_fields, Packet};
use tracing::info;

pub const LOGIN: &str = "L0#";
pub const LOGIN_SUCCESS: &str = "LS#";
pub const LOGIN_FAILURE: &str = "LF#";

/// Checks credentials and answers with the start level.
///
/// A successful login is cached under the account it authenticated. A
/// rejection is sent once and never cached, since there is no account to
/// file it under.
pub struct LoginHandler;

#[async_trait]
impl OpcodeHandler for LoginHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let [request_id, username, password] = split_fields::<3>(payload)?;
        let envelope = Envelope::anonymous(parse_field("request_id", request_id)?);

        let outcome = ctx
            .store_call("verify_login", ctx.store().verify_login(username, password))
            .await
            .map_err(|e| HandlerError::from(e).for_request(envelope))?;

        let account_id = match outcome {
            LoginOutcome::Accepted(account_id) => account_id,
            LoginOutcome::Rejected(message) => {
                info!("🔒 Rejected login for {}", username);
                return Ok(Reply::Transient(Packet::simple(
                    envelope.request_id,
                    LOGIN_FAILURE,
                    "LOGIN",
                    message,
                )));
            }
        };

        let envelope = Envelope {
            account_id: Some(account_id),
            ..envelope
        };
        let start_level = &ctx.config().start_level;
        let level = ctx.catalog().level(start_level).ok_or_else(|| {
            HandlerError::NotFound(format!("start level {start_level} not found"))
                .for_request(envelope)
        })?;
        let content = to_json(&level).map_err(|e| e.for_request(envelope))?;

        info!("🔓 {} logged in as account {}", username, account_id);
        Ok(envelope.reply(Packet::chained(
            envelope.request_id,
            LOGIN_SUCCESS,
            "LSP",
            &content,
        )))
    }
}

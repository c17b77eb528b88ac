//! Connectivity checks: echo (`TT#`) and greeting (`XX#`).

use crate::context::ServerContext;
use crate::messaging::{HandlerError, OpcodeHandler, Reply};
use async_trait::async_trait;
use bitrealm_protocol::split_fields;

pub const ECHO: &str = "TT#";
pub const HELLO: &str = "XX#";

pub const GREETING: &str = "Hello Client - FROM SERVER";

/// Echoes the first field of the payload back as a raw frame.
pub struct EchoHandler;

#[async_trait]
impl OpcodeHandler for EchoHandler {
    async fn handle(&self, payload: &str, _ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let [message] = split_fields::<1>(payload)?;
        Ok(Reply::Raw(format!("Server response to : {message}")))
    }
}

pub struct HelloHandler;

#[async_trait]
impl OpcodeHandler for HelloHandler {
    async fn handle(&self, _payload: &str, _ctx: &ServerContext) -> Result<Reply, HandlerError> {
        Ok(Reply::Raw(GREETING.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::handlers::tests::test_context;

    #[tokio::test]
    async fn test_echo_and_greeting() {
        let (ctx, _) = test_context().await;
        assert_eq!(
            EchoHandler.handle("ping", &ctx).await.unwrap(),
            Reply::Raw("Server response to : ping".to_string())
        );
        assert_eq!(
            HelloHandler.handle("", &ctx).await.unwrap(),
            Reply::Raw(GREETING.to_string())
        );
    }

    #[tokio::test]
    async fn test_echo_ignores_trailing_fields() {
        let (ctx, _) = test_context().await;
        assert_eq!(
            EchoHandler.handle("ping?extra?fields", &ctx).await.unwrap(),
            Reply::Raw("Server response to : ping".to_string())
        );
        assert_eq!(
            EchoHandler.handle("", &ctx).await.unwrap(),
            Reply::Raw("Server response to : ".to_string())
        );
    }
}

//! Profile (`PR#`), level (`LL#`) and region (`RLL#`) lookups.

use super::to_json;
use crate::context::ServerContext;
use crate::messaging::{Envelope, HandlerError, OpcodeHandler, Reply};
use async_trait::async_trait;
use bitrealm_protocol::{split_fields, Packet};

pub const PROFILE: &str = "PR#";
pub const LEVEL: &str = "LL#";
pub const REGION: &str = "RLL#";

pub struct ProfileHandler;

#[async_trait]
impl OpcodeHandler for ProfileHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let [request_id, account_id] = split_fields::<2>(payload)?;
        let envelope = Envelope::parse(request_id, account_id)?;
        let fail = |e: HandlerError| e.for_request(envelope);

        let account_id = envelope
            .account_id
            .ok_or_else(|| fail(HandlerError::NotFound("profile without account".to_string())))?;
        let profile = ctx
            .store_call("find_profile", ctx.store().find_profile(account_id))
            .await
            .map_err(|e| fail(e.into()))?;
        let content = to_json(&profile).map_err(fail)?;

        Ok(envelope.reply(Packet::chained(
            envelope.request_id,
            PROFILE,
            "PROFILE",
            &content,
        )))
    }
}

/// Sends a level with its residents.
pub struct LevelHandler;

#[async_trait]
impl OpcodeHandler for LevelHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let [request_id, account_id, level_id] = split_fields::<3>(payload)?;
        let envelope = Envelope::parse(request_id, account_id)?;
        let fail = |e: HandlerError| e.for_request(envelope);

        let level_id = level_id.trim();
        let data = ctx
            .catalog()
            .level_data(level_id)
            .ok_or_else(|| fail(HandlerError::NotFound(format!("level {level_id} not found"))))?;
        let content = to_json(&data).map_err(fail)?;

        Ok(envelope.reply(Packet::chained(
            envelope.request_id,
            LEVEL,
            "LEVEL",
            &content,
        )))
    }
}

/// Sends a region together with the level the player enters it through.
pub struct RegionHandler;

#[async_trait]
impl OpcodeHandler for RegionHandler {
    async fn handle(&self, payload: &str, ctx: &ServerContext) -> Result<Reply, HandlerError> {
        let [request_id, account_id, region_id, level_id] = split_fields::<4>(payload)?;
        let envelope = Envelope::parse(request_id, account_id)?;
        let fail = |e: HandlerError| e.for_request(envelope);

        let (region_id, level_id) = (region_id.trim(), level_id.trim());
        let data = ctx.catalog().region_data(region_id, level_id).ok_or_else(|| {
            fail(HandlerError::NotFound(format!(
                "region {region_id} with level {level_id} not found"
            )))
        })?;
        let content = to_json(&data).map_err(fail)?;

        Ok(envelope.reply(Packet::chained(
            envelope.request_id,
            REGION,
            "REGION",
            &content,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::handlers::tests::{chained_json, delivered, test_context};
    use bitrealm_protocol::RequestId;

    #[tokio::test]
    async fn test_profile_is_sent_chained() {
        let (ctx, account) = test_context().await;

        let reply = ProfileHandler
            .handle(&format!("{}?{account}", RequestId::new()), &ctx)
            .await
            .unwrap();

        let packet = delivered(reply, account);
        assert_eq!(packet.service_tag, "PROFILE");
        let content = chained_json(&packet);
        assert_eq!(content["uuid"], account.to_string());
        assert_eq!(content["level"], 1);
    }

    #[tokio::test]
    async fn test_level_includes_residents() {
        let (ctx, account) = test_context().await;

        let reply = LevelHandler
            .handle(&format!("{}?{account}?00001", RequestId::new()), &ctx)
            .await
            .unwrap();

        let content = chained_json(&delivered(reply, account));
        assert_eq!(content["level"]["level_name"], "Meadow");
        assert_eq!(content["residents"][0]["npc_name"], "Ferris");
    }

    #[tokio::test]
    async fn test_region_with_unknown_level_fails() {
        let (ctx, account) = test_context().await;

        let err = RegionHandler
            .handle(&format!("{}?{account}?R1?00404", RequestId::new()), &ctx)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "region R1 with level 00404 not found");
    }

    #[tokio::test]
    async fn test_region_lookup() {
        let (ctx, account) = test_context().await;

        let reply = RegionHandler
            .handle(&format!("{}?{account}?R1?00001", RequestId::new()), &ctx)
            .await
            .unwrap();

        let content = chained_json(&delivered(reply, account));
        assert_eq!(content["region"]["region_name"], "Lowlands");
        assert_eq!(content["level_data"]["level"]["level_id"], "00001");
    }
}

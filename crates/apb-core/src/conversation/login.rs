use crate::Result;

use super::{ConversationEngine, Ctx, FlowState};

impl ConversationEngine {
    pub(super) async fn start_login(&self, ctx: Ctx) -> Result<Option<FlowState>> {
        if self.admins.is_authenticated(ctx.user_id).await {
            self.say(ctx, "You are already logged in as admin.").await?;
            return Ok(None);
        }
        self.say(
            ctx,
            "Please enter the <b>admin master password</b> to gain access to admin features.",
        )
        .await?;
        Ok(Some(FlowState::AdminLogin))
    }

    pub(super) async fn login_step(&self, ctx: Ctx, text: &str) -> Result<Option<FlowState>> {
        if !self.admins.login(ctx.user_id, text).await {
            tracing::warn!(user_id = ctx.user_id.0, "admin login rejected");
            self.say(
                ctx,
                "❌ Incorrect password. Please try again or type /cancel to stop.",
            )
            .await?;
            return Ok(Some(FlowState::AdminLogin));
        }

        tracing::info!(user_id = ctx.user_id.0, "admin logged in");
        self.say(
            ctx,
            "✅ <b>Admin access granted!</b>\nYou can now use: /add_airdrop, /edit_airdrop, /delete_airdrop.",
        )
        .await?;
        Ok(None)
    }
}

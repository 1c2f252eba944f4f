use crate::{
    domain::ListingId,
    formatting::escape_html,
    messaging::types::{CallbackQuery, InlineButton, InlineKeyboard},
    payload::CallbackAction,
    Result,
};

use super::{ConversationEngine, Ctx, DeleteState, FlowState};

impl ConversationEngine {
    pub(super) async fn start_delete(&self, ctx: Ctx) -> Result<Option<FlowState>> {
        if !self.admins.is_authenticated(ctx.user_id).await {
            self.say(
                ctx,
                "You need <b>admin access</b> to delete airdrops. Please use /admin_login first.",
            )
            .await?;
            return Ok(None);
        }
        self.say(
            ctx,
            "Please enter the <b>ID</b> of the airdrop you want to delete:",
        )
        .await?;
        Ok(Some(FlowState::Delete(DeleteState::AwaitId)))
    }

    pub(super) async fn delete_step(
        &self,
        ctx: Ctx,
        state: DeleteState,
        text: &str,
    ) -> Result<Option<FlowState>> {
        match state {
            DeleteState::AwaitId => {
                let id = ListingId::from(text.trim());
                let Some(listing) = self.catalog.find_by_id(&id).await else {
                    let msg = format!(
                        "❌ Airdrop with ID '<b>{}</b>' not found. Please enter a valid ID or type /cancel.",
                        escape_html(id.as_str())
                    );
                    self.say(ctx, &msg).await?;
                    return Ok(Some(FlowState::Delete(DeleteState::AwaitId)));
                };
                let msg = format!(
                    "Found airdrop: '<b>{}</b>'.\nPlease enter the <b>delete password</b> to continue:",
                    escape_html(&listing.title)
                );
                self.say(ctx, &msg).await?;
                Ok(Some(FlowState::Delete(DeleteState::AwaitSecret {
                    id,
                    title: listing.title,
                })))
            }
            DeleteState::AwaitSecret { id, title } => {
                if !self.secrets.delete.matches(text) {
                    tracing::warn!(user_id = ctx.user_id.0, listing_id = %id, "delete password rejected");
                    self.say(
                        ctx,
                        "❌ Incorrect delete password. Please try again or type /cancel to stop.",
                    )
                    .await?;
                    return Ok(Some(FlowState::Delete(DeleteState::AwaitSecret { id, title })));
                }

                let msg = format!(
                    "⚠️ Are you sure you want to permanently delete '<b>{}</b>' (ID: {})?\nThis cannot be undone.",
                    escape_html(&title),
                    escape_html(id.as_str())
                );
                self.messenger
                    .send_inline_keyboard(ctx.chat_id, &msg, confirm_menu(&id))
                    .await?;
                Ok(None)
            }
        }
    }

    pub(super) async fn confirm_delete(&self, q: &CallbackQuery, id: &ListingId) -> Result<()> {
        if !self.admins.is_authenticated(q.user_id).await {
            tracing::warn!(user_id = q.user_id.0, listing_id = %id, "delete confirmation without admin session");
            self.messenger
                .answer_callback_query(
                    &q.callback_id,
                    Some("You need admin access to delete airdrops."),
                )
                .await?;
            return Ok(());
        }

        self.messenger
            .answer_callback_query(&q.callback_id, None)
            .await?;

        match self.catalog.remove(id).await {
            Some(listing) => {
                tracing::info!(user_id = q.user_id.0, listing_id = %id, "airdrop deleted");
                let msg = format!(
                    "✅ Airdrop '<b>{}</b>' successfully deleted.",
                    escape_html(&listing.title)
                );
                self.reply_in_place(q, &msg, None).await
            }
            None => {
                tracing::warn!(listing_id = %id, "delete confirmed for missing listing");
                self.reply_in_place(q, "❌ Airdrop not found or already deleted.", None)
                    .await
            }
        }
    }

    pub(super) async fn cancel_delete(&self, q: &CallbackQuery) -> Result<()> {
        self.messenger
            .answer_callback_query(&q.callback_id, None)
            .await?;
        self.reply_in_place(q, "Deletion cancelled.", None).await
    }
}

fn confirm_menu(id: &ListingId) -> InlineKeyboard {
    InlineKeyboard::new(vec![vec![
        InlineButton::callback(
            "Yes, Delete Permanently",
            CallbackAction::ConfirmDelete(id.clone()).encode(),
        ),
        InlineButton::callback("No, Cancel", CallbackAction::CancelDelete.encode()),
    ]])
}

#[cfg(test)]
mod tests {
    use crate::conversation::{
        testing::{Harness, DELETE},
        FlowKind,
    };
    use crate::domain::UserId;
    use crate::messaging::testing::Sent;

    async fn reach_confirmation(h: &Harness, user: i64, id: &str) {
        h.command(user, "delete_airdrop", "").await;
        h.text(user, id).await;
        h.text(user, DELETE).await;
    }

    #[tokio::test]
    async fn delete_requires_admin_session() {
        let h = Harness::new();
        h.command(1, "delete_airdrop", "").await;
        assert!(h.messenger.last_html().contains("admin access"));
        assert_eq!(h.engine.active_flow(UserId(1)).await, None);
    }

    #[tokio::test]
    async fn confirmation_menu_then_delete() {
        let h = Harness::new();
        let l = h.seed("Gone", "https://gone.io", "", 1).await;
        h.login(1).await;
        reach_confirmation(&h, 1, l.id.as_str()).await;

        let last = h.messenger.last().unwrap();
        assert!(last.html().contains("permanently delete"));
        let kb = last.keyboard().unwrap();
        assert_eq!(kb.rows.len(), 1);
        assert_eq!(
            kb.callback_data(),
            vec![format!("confirmdelete_{}", l.id), "canceldelete".to_string()]
        );
        assert_eq!(h.engine.active_flow(UserId(1)).await, None);

        h.press(1, &format!("confirmdelete_{}", l.id)).await;
        assert!(h.catalog.is_empty().await);
        assert!(h.messenger.last_html().contains("successfully deleted"));
    }

    #[tokio::test]
    async fn replayed_confirmation_reports_missing() {
        let h = Harness::new();
        let l = h.seed("Gone", "https://gone.io", "", 1).await;
        let other = h.seed("Stays", "https://stays.io", "", 2).await;
        h.login(1).await;
        reach_confirmation(&h, 1, l.id.as_str()).await;

        h.press(1, &format!("confirmdelete_{}", l.id)).await;
        h.press(1, &format!("confirmdelete_{}", l.id)).await;
        assert!(h.messenger.last_html().contains("already deleted"));
        assert_eq!(h.catalog.list().await, vec![other]);
    }

    #[tokio::test]
    async fn wrong_secret_reprompts() {
        let h = Harness::new();
        let l = h.seed("Kept", "https://kept.io", "", 1).await;
        h.login(1).await;
        h.command(1, "delete_airdrop", "").await;
        h.text(1, l.id.as_str()).await;
        h.text(1, "guess").await;

        assert!(h.messenger.last_html().contains("Incorrect delete password"));
        assert_eq!(h.engine.active_flow(UserId(1)).await, Some(FlowKind::Delete));
        assert_eq!(h.catalog.len().await, 1);
    }

    #[tokio::test]
    async fn cancel_button_keeps_listing() {
        let h = Harness::new();
        let l = h.seed("Kept", "https://kept.io", "", 1).await;
        h.login(1).await;
        reach_confirmation(&h, 1, l.id.as_str()).await;

        h.press(1, "canceldelete").await;
        assert!(matches!(
            h.messenger.last().unwrap(),
            Sent::Edit { ref html, keyboard: None, .. } if html == "Deletion cancelled."
        ));
        assert!(h.catalog.find_by_id(&l.id).await.is_some());
    }

    #[tokio::test]
    async fn confirmation_needs_admin_session() {
        let h = Harness::new();
        let l = h.seed("Kept", "https://kept.io", "", 1).await;
        h.press(2, &format!("confirmdelete_{}", l.id)).await;

        assert!(matches!(
            h.messenger.last().unwrap(),
            Sent::Answer { text: Some(ref t), .. } if t.contains("admin access")
        ));
        assert_eq!(h.catalog.len().await, 1);
    }
}

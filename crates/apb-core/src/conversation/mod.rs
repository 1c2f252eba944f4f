//! Conversation engine: routes gateway updates to per-identity admin flows
//! (login, add, edit, delete) and to the stateless read-only views.

mod add;
mod delete;
mod edit;
mod login;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    admin::{AdminRegistry, AdminSecrets},
    catalog::CatalogStore,
    domain::{ChatId, ListingId, UserId},
    formatting::{
        escape_html, listing_details, listing_index, referral_html, shorten, welcome_html,
    },
    messaging::{
        port::MessagingPort,
        types::{CallbackQuery, Command, IncomingUpdate, InlineKeyboard, TextMessage},
    },
    payload::CallbackAction,
    Result,
};

pub use state::{AddState, DeleteState, EditState, FlowKind, FlowState};

/// Who is talking and where to answer.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Ctx {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

/// Longest slice of a search query echoed back to the user.
const QUERY_ECHO_MAX: usize = 64;

/// Serializes update handling per identity.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub async fn lock_user(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(user_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop the entry for `user_id` once nobody holds or waits on it.
    /// Call after the guard from `lock_user` has been released.
    pub async fn release(&self, user_id: UserId) {
        let mut map = self.inner.lock().await;
        if map
            .get(&user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&user_id);
        }
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}

pub struct ConversationEngine {
    catalog: Arc<CatalogStore>,
    admins: Arc<AdminRegistry>,
    secrets: AdminSecrets,
    messenger: Arc<dyn MessagingPort>,
    flows: Mutex<HashMap<UserId, FlowState>>,
    user_locks: UserLocks,
}

impl ConversationEngine {
    pub fn new(
        catalog: Arc<CatalogStore>,
        admins: Arc<AdminRegistry>,
        secrets: AdminSecrets,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            catalog,
            admins,
            secrets,
            messenger,
            flows: Mutex::new(HashMap::new()),
            user_locks: UserLocks::default(),
        }
    }

    /// Kind of flow currently active for `user_id`, if any.
    pub async fn active_flow(&self, user_id: UserId) -> Option<FlowKind> {
        self.flows.lock().await.get(&user_id).map(FlowState::kind)
    }

    /// Handle one inbound update.
    ///
    /// A step's flow state is taken out before the step runs and only put back
    /// when the step succeeds, so an `Err` here always leaves the identity with
    /// no active flow.
    pub async fn handle(&self, update: IncomingUpdate) -> Result<()> {
        let user_id = update.user_id();
        let guard = self.user_locks.lock_user(user_id).await;
        let res = match update {
            IncomingUpdate::Command(cmd) => self.on_command(cmd).await,
            IncomingUpdate::Text(msg) => self.on_text(msg).await,
            IncomingUpdate::Callback(q) => self.on_callback(q).await,
        };
        drop(guard);
        self.user_locks.release(user_id).await;
        res
    }

    async fn on_command(&self, cmd: Command) -> Result<()> {
        let ctx = Ctx {
            chat_id: cmd.chat_id,
            user_id: cmd.user_id,
        };

        match cmd.name.as_str() {
            "start" | "help" => {
                self.say(ctx, &welcome_html()).await?;
            }
            "list" => self.show_list(ctx).await?,
            "search" => self.show_search(ctx, &cmd.args).await?,
            "admin_login" => {
                self.clear_flow(ctx.user_id).await;
                let next = self.start_login(ctx).await?;
                self.put_flow(ctx.user_id, next).await;
            }
            "add_airdrop" => {
                self.clear_flow(ctx.user_id).await;
                let next = self.start_add(ctx).await?;
                self.put_flow(ctx.user_id, next).await;
            }
            "edit_airdrop" => {
                self.clear_flow(ctx.user_id).await;
                let next = self.start_edit(ctx).await?;
                self.put_flow(ctx.user_id, next).await;
            }
            "delete_airdrop" => {
                self.clear_flow(ctx.user_id).await;
                let next = self.start_delete(ctx).await?;
                self.put_flow(ctx.user_id, next).await;
            }
            "admin_logout" => self.logout(ctx).await?,
            "cancel" => {
                self.clear_flow(ctx.user_id).await;
                self.say(
                    ctx,
                    "🚫 Operation cancelled. Your data has been cleared for this process.",
                )
                .await?;
            }
            other => {
                let msg = format!(
                    "Unknown command: /{}. Use /start to see what I can do.",
                    escape_html(other)
                );
                self.say(ctx, &msg).await?;
            }
        }
        Ok(())
    }

    async fn on_text(&self, msg: TextMessage) -> Result<()> {
        let ctx = Ctx {
            chat_id: msg.chat_id,
            user_id: msg.user_id,
        };
        let Some(state) = self.take_flow(ctx.user_id).await else {
            tracing::debug!(user_id = ctx.user_id.0, "ignoring text outside of a flow");
            return Ok(());
        };

        let next = match state {
            FlowState::AdminLogin => self.login_step(ctx, &msg.text).await?,
            FlowState::Add(s) => self.add_step(ctx, s, &msg.text).await?,
            FlowState::Edit(s) => self.edit_step(ctx, s, &msg.text).await?,
            FlowState::Delete(s) => self.delete_step(ctx, s, &msg.text).await?,
        };
        self.put_flow(ctx.user_id, next).await;
        Ok(())
    }

    async fn on_callback(&self, q: CallbackQuery) -> Result<()> {
        let Some(action) = CallbackAction::parse(&q.data) else {
            tracing::debug!(data = %q.data, "ignoring unknown callback payload");
            self.messenger
                .answer_callback_query(&q.callback_id, None)
                .await?;
            return Ok(());
        };

        match action {
            CallbackAction::Details(id) => self.show_details(&q, &id).await,
            CallbackAction::CopyReferral(id) => self.send_referral(&q, &id).await,
            CallbackAction::EditField(choice) => self.edit_field_chosen(&q, choice).await,
            CallbackAction::ConfirmDelete(id) => self.confirm_delete(&q, &id).await,
            CallbackAction::CancelDelete => self.cancel_delete(&q).await,
        }
    }

    async fn logout(&self, ctx: Ctx) -> Result<()> {
        self.clear_flow(ctx.user_id).await;
        if self.admins.logout(ctx.user_id).await {
            tracing::info!(user_id = ctx.user_id.0, "admin logged out");
            self.say(
                ctx,
                "You have been logged out as admin. Admin features are now disabled.",
            )
            .await
        } else {
            self.say(ctx, "You are not currently logged in as admin.")
                .await
        }
    }

    async fn show_list(&self, ctx: Ctx) -> Result<()> {
        let listings = self.catalog.list().await;
        if listings.is_empty() {
            return self
                .say(
                    ctx,
                    "No airdrops found yet. Use /add_airdrop (as admin) to add some!",
                )
                .await;
        }
        self.send_index(ctx, "<b>🚀 Current Airdrops:</b>", &listings)
            .await
    }

    async fn show_search(&self, ctx: Ctx, args: &str) -> Result<()> {
        let query = args.split_whitespace().collect::<Vec<_>>().join(" ");
        if query.is_empty() {
            return self
                .say(
                    ctx,
                    "Please provide a search query. Usage: <code>/search &lt;query&gt;</code> (e.g. <code>/search defi</code>)",
                )
                .await;
        }

        let results = self.catalog.search(&query).await;
        let shown = escape_html(&shorten(&query, QUERY_ECHO_MAX));
        if results.is_empty() {
            return self
                .say(ctx, &format!("No airdrops found matching '<i>{shown}</i>'."))
                .await;
        }
        let header = format!("<b>🔎 Search Results for '<i>{shown}</i>':</b>");
        self.send_index(ctx, &header, &results).await
    }

    async fn send_index(
        &self,
        ctx: Ctx,
        header: &str,
        listings: &[crate::listing::Listing],
    ) -> Result<()> {
        let max_len = self.messenger.capabilities().max_message_len;
        let (text, keyboard) = listing_index(header, listings, max_len);
        if keyboard.rows.is_empty() {
            return self.say(ctx, &text).await;
        }
        self.messenger
            .send_inline_keyboard(ctx.chat_id, &text, keyboard)
            .await?;
        Ok(())
    }

    async fn show_details(&self, q: &CallbackQuery, id: &ListingId) -> Result<()> {
        self.messenger
            .answer_callback_query(&q.callback_id, None)
            .await?;
        match self.catalog.find_by_id(id).await {
            Some(listing) => {
                let (text, keyboard) = listing_details(&listing);
                self.reply_in_place(q, &text, Some(keyboard)).await
            }
            None => {
                self.reply_in_place(q, "Airdrop not found or might have been deleted.", None)
                    .await
            }
        }
    }

    async fn send_referral(&self, q: &CallbackQuery, id: &ListingId) -> Result<()> {
        let referral = self
            .catalog
            .find_by_id(id)
            .await
            .map(|l| l.referral)
            .filter(|r| !r.is_empty());
        let Some(code) = referral else {
            self.messenger
                .answer_callback_query(&q.callback_id, Some("Referral code not available."))
                .await?;
            return Ok(());
        };

        self.messenger
            .answer_callback_query(&q.callback_id, Some("Referral code sent! Tap to copy."))
            .await?;
        self.messenger
            .send_html(q.chat_id, &referral_html(&code))
            .await?;
        Ok(())
    }

    /// Edit the message that carried the pressed button, or send a new one if unknown.
    async fn reply_in_place(
        &self,
        q: &CallbackQuery,
        html: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()> {
        match (q.message, keyboard) {
            (Some(msg), Some(kb)) => self.messenger.edit_inline_keyboard(msg, html, kb).await,
            (Some(msg), None) => self.messenger.edit_html(msg, html).await,
            (None, Some(kb)) => self
                .messenger
                .send_inline_keyboard(q.chat_id, html, kb)
                .await
                .map(|_| ()),
            (None, None) => self.messenger.send_html(q.chat_id, html).await.map(|_| ()),
        }
    }

    async fn say(&self, ctx: Ctx, html: &str) -> Result<()> {
        self.messenger.send_html(ctx.chat_id, html).await?;
        Ok(())
    }

    async fn take_flow(&self, user_id: UserId) -> Option<FlowState> {
        self.flows.lock().await.remove(&user_id)
    }

    async fn put_flow(&self, user_id: UserId, state: Option<FlowState>) {
        if let Some(state) = state {
            self.flows.lock().await.insert(user_id, state);
        }
    }

    async fn clear_flow(&self, user_id: UserId) {
        if let Some(prev) = self.take_flow(user_id).await {
            tracing::debug!(user_id = user_id.0, flow = ?prev.kind(), "discarding active flow");
        }
    }
}

/// `skip` sentinel for optional fields (case-insensitive).
fn is_skip(input: &str) -> bool {
    input.eq_ignore_ascii_case("skip")
}

fn skip_to_empty(input: &str) -> String {
    if is_skip(input) {
        String::new()
    } else {
        input.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Harness;
    use super::*;
    use crate::messaging::testing::Sent;

    #[tokio::test]
    async fn start_sends_welcome() {
        let h = Harness::new();
        h.command(1, "start", "").await;
        assert!(h.messenger.last_html().contains("Welcome"));
    }

    #[tokio::test]
    async fn list_when_empty_gives_hint() {
        let h = Harness::new();
        h.command(1, "list", "").await;
        assert!(h.messenger.last_html().contains("No airdrops found yet"));
    }

    #[tokio::test]
    async fn list_renders_keyboard_newest_first() {
        let h = Harness::new();
        h.seed("Old", "https://old.com", "", 100).await;
        h.seed("New", "https://new.com", "", 200).await;

        h.command(1, "list", "").await;
        let last = h.messenger.last().unwrap();
        let kb = last.keyboard().expect("index has buttons");
        assert_eq!(kb.callback_data(), vec!["details_2", "details_1"]);
        assert!(last.html().find("New").unwrap() < last.html().find("Old").unwrap());
    }

    #[tokio::test]
    async fn search_requires_query() {
        let h = Harness::new();
        h.command(1, "search", "   ").await;
        assert!(h.messenger.last_html().contains("Please provide a search query"));
    }

    #[tokio::test]
    async fn search_reports_matches_and_misses() {
        let h = Harness::new();
        h.seed("DeFi Farm", "https://a.com", "", 1).await;
        h.seed("NFT Drop", "https://b.com", "", 2).await;

        h.command(1, "search", "defi").await;
        let last = h.messenger.last().unwrap();
        assert!(last.html().contains("DeFi Farm"));
        assert!(!last.html().contains("NFT Drop"));

        h.command(1, "search", "<none>").await;
        assert!(h
            .messenger
            .last_html()
            .contains("No airdrops found matching '<i>&lt;none&gt;</i>'"));
    }

    #[tokio::test]
    async fn search_collapses_inner_whitespace() {
        let h = Harness::new();
        h.seed("DeFi farm", "https://a.com", "", 1).await;

        h.command(1, "search", "DeFi \t  farm").await;
        let last = h.messenger.last().unwrap();
        assert!(last.keyboard().is_some());
        assert!(last.html().contains("Search Results for '<i>DeFi farm</i>'"));
    }

    #[tokio::test]
    async fn long_search_queries_stay_within_message_limit() {
        let h = Harness::new();
        let query = "q".repeat(5000);

        h.command(1, "search", &query).await;
        let miss = h.messenger.last_html();
        assert!(miss.contains("No airdrops found matching"));
        assert!(miss.len() <= 4096);

        h.seed(&query, "https://a.com", "", 1).await;
        h.command(1, "search", &query).await;
        let hit = h.messenger.last_html();
        assert!(hit.contains("…"));
        assert!(hit.len() <= 4096);
    }

    #[tokio::test]
    async fn user_locks_are_pruned_after_handling() {
        let h = Harness::new();
        for user in 1..=3 {
            h.command(user, "list", "").await;
        }
        assert_eq!(h.engine.user_locks.tracked().await, 0);
    }

    #[tokio::test]
    async fn details_button_edits_message_into_card() {
        let h = Harness::new();
        let l = h.seed("Card", "https://card.io", "REF1", 1).await;

        h.press(1, &format!("details_{}", l.id)).await;
        match h.messenger.last().unwrap() {
            Sent::Edit { html, keyboard, .. } => {
                assert!(html.contains("Card"));
                assert!(html.contains("<code>REF1</code>"));
                let kb = keyboard.unwrap();
                assert_eq!(kb.callback_data(), vec![format!("copyref_{}", l.id)]);
            }
            other => panic!("expected edit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn details_for_deleted_listing_reports_missing() {
        let h = Harness::new();
        h.press(1, "details_99").await;
        assert!(h.messenger.last_html().contains("not found"));
    }

    #[tokio::test]
    async fn copy_referral_sends_code() {
        let h = Harness::new();
        let l = h.seed("Card", "https://card.io", "CODE<1>", 1).await;
        h.press(1, &format!("copyref_{}", l.id)).await;

        let sent = h.messenger.sent();
        assert!(sent.iter().any(|s| matches!(
            s,
            Sent::Answer { text: Some(t), .. } if t.contains("Referral code sent")
        )));
        assert!(h.messenger.last_html().contains("<code>CODE&lt;1&gt;</code>"));
    }

    #[tokio::test]
    async fn unknown_payload_is_only_acknowledged() {
        let h = Harness::new();
        h.press(1, "askuser:1:2").await;
        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0], Sent::Answer { text: None, .. }));
    }

    #[tokio::test]
    async fn text_outside_flow_is_ignored() {
        let h = Harness::new();
        h.text(1, "hello").await;
        assert!(h.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn unknown_command_is_reported() {
        let h = Harness::new();
        h.command(1, "frobnicate", "").await;
        assert!(h.messenger.last_html().contains("Unknown command: /frobnicate"));
    }

    #[tokio::test]
    async fn cancel_discards_any_flow() {
        let h = Harness::new();
        h.login(1).await;
        h.command(1, "add_airdrop", "").await;
        h.text(1, "Half done").await;
        assert_eq!(h.engine.active_flow(UserId(1)).await, Some(FlowKind::Add));

        h.command(1, "cancel", "").await;
        assert_eq!(h.engine.active_flow(UserId(1)).await, None);
        assert!(h.messenger.last_html().contains("Operation cancelled"));

        // Subsequent text does not resume the old flow.
        h.text(1, "https://a.com").await;
        assert!(h.catalog.is_empty().await);
    }

    #[tokio::test]
    async fn read_only_commands_keep_flow_state() {
        let h = Harness::new();
        h.login(1).await;
        h.command(1, "add_airdrop", "").await;
        h.command(1, "list", "").await;
        assert_eq!(h.engine.active_flow(UserId(1)).await, Some(FlowKind::Add));
    }

    #[tokio::test]
    async fn starting_a_flow_supersedes_the_previous_one() {
        let h = Harness::new();
        h.login(1).await;
        h.command(1, "add_airdrop", "").await;
        h.text(1, "Stale title").await;

        h.command(1, "add_airdrop", "").await;
        h.text(1, "Fresh").await;
        h.text(1, "https://fresh.com").await;
        h.text(1, "skip").await;
        h.text(1, "skip").await;
        h.text(1, "skip").await;

        let all = h.catalog.list().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Fresh");

        h.command(1, "edit_airdrop", "").await;
        assert_eq!(h.engine.active_flow(UserId(1)).await, Some(FlowKind::Edit));
        h.command(1, "delete_airdrop", "").await;
        assert_eq!(h.engine.active_flow(UserId(1)).await, Some(FlowKind::Delete));
    }

    #[tokio::test]
    async fn logout_drops_session_and_flow() {
        let h = Harness::new();
        h.login(1).await;
        h.command(1, "edit_airdrop", "").await;

        h.command(1, "admin_logout", "").await;
        assert!(h.messenger.last_html().contains("logged out"));
        assert_eq!(h.engine.active_flow(UserId(1)).await, None);

        h.command(1, "admin_logout", "").await;
        assert!(h.messenger.last_html().contains("not currently logged in"));
    }

    #[tokio::test]
    async fn flows_are_isolated_per_identity() {
        let h = Harness::new();
        h.login(1).await;
        h.command(1, "add_airdrop", "").await;

        h.text(2, "not my flow").await;
        assert_eq!(h.engine.active_flow(UserId(2)).await, None);
        assert_eq!(h.engine.active_flow(UserId(1)).await, Some(FlowKind::Add));

        h.command(2, "cancel", "").await;
        assert_eq!(h.engine.active_flow(UserId(1)).await, Some(FlowKind::Add));
    }

    #[tokio::test]
    async fn gateway_failure_clears_flow_state() {
        let h = Harness::new();
        h.login(1).await;
        h.command(1, "add_airdrop", "").await;

        h.messenger.set_failing(true);
        let res = h.engine.handle(h.text_update(1, "Title")).await;
        assert!(res.is_err());
        assert_eq!(h.engine.active_flow(UserId(1)).await, None);
    }
}

use crate::{
    domain::ListingId,
    formatting::escape_html,
    listing::{is_absolute_url, EditableField},
    messaging::types::{CallbackQuery, InlineButton, InlineKeyboard},
    payload::{CallbackAction, FieldChoice},
    Result,
};

use super::{is_skip, ConversationEngine, Ctx, EditState, FlowState};

impl ConversationEngine {
    pub(super) async fn start_edit(&self, ctx: Ctx) -> Result<Option<FlowState>> {
        if !self.admins.is_authenticated(ctx.user_id).await {
            self.say(
                ctx,
                "You need <b>admin access</b> to edit airdrops. Please use /admin_login first.",
            )
            .await?;
            return Ok(None);
        }
        self.say(
            ctx,
            "Please enter the <b>ID</b> of the airdrop you want to edit (see the ID shown when it was added):",
        )
        .await?;
        Ok(Some(FlowState::Edit(EditState::AwaitId)))
    }

    pub(super) async fn edit_step(
        &self,
        ctx: Ctx,
        state: EditState,
        text: &str,
    ) -> Result<Option<FlowState>> {
        let next = match state {
            EditState::AwaitId => {
                let id = ListingId::from(text.trim());
                match self.catalog.find_by_id(&id).await {
                    Some(listing) => {
                        let msg = format!(
                            "Found airdrop: '<b>{}</b>'.\nPlease enter the <b>edit password</b> to continue:",
                            escape_html(&listing.title)
                        );
                        self.say(ctx, &msg).await?;
                        EditState::AwaitSecret {
                            id,
                            title: listing.title,
                        }
                    }
                    None => {
                        let msg = format!(
                            "❌ Airdrop with ID '<b>{}</b>' not found. Please enter a valid ID or type /cancel.",
                            escape_html(id.as_str())
                        );
                        self.say(ctx, &msg).await?;
                        EditState::AwaitId
                    }
                }
            }
            EditState::AwaitSecret { id, title } => {
                if !self.secrets.edit.matches(text) {
                    tracing::warn!(user_id = ctx.user_id.0, listing_id = %id, "edit password rejected");
                    self.say(
                        ctx,
                        "❌ Incorrect edit password. Please try again or type /cancel to stop.",
                    )
                    .await?;
                    EditState::AwaitSecret { id, title }
                } else {
                    // The listing may have been deleted while we waited for the password.
                    let Some(listing) = self.catalog.find_by_id(&id).await else {
                        self.say(ctx, "❌ Airdrop not found. It might have been deleted.")
                            .await?;
                        return Ok(None);
                    };
                    let msg = format!(
                        "Which field of '<b>{}</b>' would you like to edit?",
                        escape_html(&listing.title)
                    );
                    self.messenger
                        .send_inline_keyboard(ctx.chat_id, &msg, field_menu())
                        .await?;
                    EditState::AwaitFieldChoice {
                        id,
                        title: listing.title,
                    }
                }
            }
            state @ EditState::AwaitFieldChoice { .. } => {
                self.say(
                    ctx,
                    "Please use the inline buttons to select a field, or type /cancel to stop.",
                )
                .await?;
                state
            }
            EditState::AwaitNewValue { id, field } => {
                return self.commit_edit(ctx, id, field, text.trim()).await;
            }
        };

        Ok(Some(FlowState::Edit(next)))
    }

    async fn commit_edit(
        &self,
        ctx: Ctx,
        id: ListingId,
        field: EditableField,
        input: &str,
    ) -> Result<Option<FlowState>> {
        let value = if is_skip(input) || input.eq_ignore_ascii_case("null") {
            String::new()
        } else {
            input.to_string()
        };

        if field == EditableField::Url && !is_absolute_url(&value) {
            self.say(
                ctx,
                "❌ Invalid URL. Please enter a <b>valid URL</b> starting with <code>http://</code> or <code>https://</code>:",
            )
            .await?;
            return Ok(Some(FlowState::Edit(EditState::AwaitNewValue { id, field })));
        }

        match self.catalog.update(&id, field, value).await {
            Some(listing) => {
                tracing::info!(
                    user_id = ctx.user_id.0,
                    listing_id = %id,
                    field = field.key(),
                    "airdrop updated"
                );
                let msg = format!(
                    "✅ Airdrop '<b>{}</b>' updated successfully! <b>{}</b> changed.",
                    escape_html(&listing.title),
                    field.label()
                );
                self.say(ctx, &msg).await?;
            }
            None => {
                tracing::warn!(listing_id = %id, "listing vanished before edit commit");
                self.say(
                    ctx,
                    "❌ Airdrop not found during update. It might have been deleted by someone else.",
                )
                .await?;
            }
        }
        Ok(None)
    }

    pub(super) async fn edit_field_chosen(
        &self,
        q: &CallbackQuery,
        choice: FieldChoice,
    ) -> Result<()> {
        let (id, title) = match self.take_flow(q.user_id).await {
            Some(FlowState::Edit(EditState::AwaitFieldChoice { id, title })) => (id, title),
            other => {
                self.put_flow(q.user_id, other).await;
                self.messenger
                    .answer_callback_query(&q.callback_id, Some("This menu is no longer active."))
                    .await?;
                return Ok(());
            }
        };

        self.messenger
            .answer_callback_query(&q.callback_id, None)
            .await?;

        let field = match choice {
            FieldChoice::Cancel => {
                return self
                    .reply_in_place(q, "Edit operation cancelled.", None)
                    .await;
            }
            FieldChoice::Field(field) => field,
        };

        let msg = format!(
            "Enter the new value for <b>{}</b> of '<b>{}</b>' (or type <code>skip</code> to clear it):",
            field.label(),
            escape_html(&title)
        );
        self.reply_in_place(q, &msg, None).await?;
        self.put_flow(
            q.user_id,
            Some(FlowState::Edit(EditState::AwaitNewValue { id, field })),
        )
        .await;
        Ok(())
    }
}

fn field_menu() -> InlineKeyboard {
    let mut buttons: Vec<InlineButton> = EditableField::ALL
        .iter()
        .map(|f| {
            InlineButton::callback(
                f.label(),
                CallbackAction::EditField(FieldChoice::Field(*f)).encode(),
            )
        })
        .collect();
    buttons.push(InlineButton::callback(
        "Cancel Edit",
        CallbackAction::EditField(FieldChoice::Cancel).encode(),
    ));
    InlineKeyboard::one_per_row(buttons)
}

use crate::{
    formatting::escape_html,
    listing::{is_absolute_url, ListingFields},
    Result,
};

use super::{is_skip, skip_to_empty, AddState, ConversationEngine, Ctx, FlowState};

const URL_PROMPT: &str = "Great! Now, enter the <b>URL</b> for the airdrop (e.g. <code>https://example.com/airdrop</code>):";
const ICON_PROMPT: &str = "Optional: Enter the <b>Icon URL</b> (e.g. <code>https://example.com/logo.png</code>) or type <code>skip</code>:";
const DESCRIPTION_PROMPT: &str =
    "Optional: Enter a short <b>Description</b> for the airdrop (or type <code>skip</code>):";
const REFERRAL_PROMPT: &str = "Optional: Enter a <b>Referral Code</b> (or type <code>skip</code>):";

impl ConversationEngine {
    pub(super) async fn start_add(&self, ctx: Ctx) -> Result<Option<FlowState>> {
        if !self.admins.is_authenticated(ctx.user_id).await {
            self.say(
                ctx,
                "You need <b>admin access</b> to add airdrops. Please use /admin_login first.",
            )
            .await?;
            return Ok(None);
        }
        self.say(
            ctx,
            "Alright, let's add a new airdrop!\nEnter the <b>Title</b> for the airdrop:",
        )
        .await?;
        Ok(Some(FlowState::Add(AddState::Title)))
    }

    pub(super) async fn add_step(
        &self,
        ctx: Ctx,
        state: AddState,
        text: &str,
    ) -> Result<Option<FlowState>> {
        let input = text.trim();

        let next = match state {
            AddState::Title => {
                self.say(ctx, URL_PROMPT).await?;
                AddState::Url {
                    title: input.to_string(),
                }
            }
            AddState::Url { title } => {
                if !is_absolute_url(input) {
                    self.say(
                        ctx,
                        "❌ Invalid URL. Please enter a <b>valid URL</b> starting with <code>http://</code> or <code>https://</code>:",
                    )
                    .await?;
                    AddState::Url { title }
                } else {
                    self.say(ctx, ICON_PROMPT).await?;
                    AddState::Icon {
                        title,
                        url: input.to_string(),
                    }
                }
            }
            AddState::Icon { title, url } => {
                if !is_skip(input) && !is_absolute_url(input) {
                    self.say(
                        ctx,
                        "❌ Invalid Icon URL. Enter a <b>valid Icon URL</b> or type <code>skip</code>:",
                    )
                    .await?;
                    AddState::Icon { title, url }
                } else {
                    self.say(ctx, DESCRIPTION_PROMPT).await?;
                    AddState::Description {
                        title,
                        url,
                        icon: skip_to_empty(input),
                    }
                }
            }
            AddState::Description { title, url, icon } => {
                self.say(ctx, REFERRAL_PROMPT).await?;
                AddState::Referral {
                    title,
                    url,
                    icon,
                    description: skip_to_empty(input),
                }
            }
            AddState::Referral {
                title,
                url,
                icon,
                description,
            } => {
                let fields = ListingFields {
                    title: Some(title),
                    url: Some(url),
                    icon: Some(icon),
                    description: Some(description),
                    referral: Some(skip_to_empty(input)),
                    timestamp: None,
                };
                self.commit_add(ctx, fields).await?;
                return Ok(None);
            }
        };

        Ok(Some(FlowState::Add(next)))
    }

    async fn commit_add(&self, ctx: Ctx, fields: ListingFields) -> Result<()> {
        match self.catalog.create(fields).await {
            Ok(listing) => {
                tracing::info!(
                    user_id = ctx.user_id.0,
                    listing_id = %listing.id,
                    title = %listing.title,
                    "airdrop added"
                );
                let msg = format!(
                    "✅ Airdrop '<b>{}</b>' added successfully!\n<i>ID: {}</i>",
                    escape_html(&listing.title),
                    escape_html(listing.id.as_str())
                );
                self.say(ctx, &msg).await
            }
            Err(e) => {
                tracing::error!(user_id = ctx.user_id.0, error = %e, "failed to add airdrop");
                self.say(ctx, "❌ Failed to add airdrop. Please try again later.")
                    .await
            }
        }
    }
}

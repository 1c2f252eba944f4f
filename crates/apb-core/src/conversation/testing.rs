//! Test harness: an engine wired to a recording messenger and known secrets.

use std::sync::Arc;

use crate::{
    admin::{AdminRegistry, AdminSecrets, Secret},
    catalog::CatalogStore,
    conversation::ConversationEngine,
    domain::{ChatId, MessageId, MessageRef, UserId},
    listing::{Listing, ListingFields},
    messaging::{
        testing::FakeMessenger,
        types::{CallbackQuery, Command, IncomingUpdate, TextMessage},
    },
};

pub const MASTER: &str = "master-pw";
pub const EDIT: &str = "edit-pw";
pub const DELETE: &str = "delete-pw";

/// Message id the fake gateway reports for pressed buttons.
pub const MENU_MESSAGE: MessageId = MessageId(999);

pub struct Harness {
    pub engine: Arc<ConversationEngine>,
    pub messenger: Arc<FakeMessenger>,
    pub catalog: Arc<CatalogStore>,
    pub admins: Arc<AdminRegistry>,
}

impl Harness {
    pub fn new() -> Self {
        let secrets = AdminSecrets {
            master: Secret::new(MASTER),
            edit: Secret::new(EDIT),
            delete: Secret::new(DELETE),
        };
        let messenger = Arc::new(FakeMessenger::default());
        let catalog = Arc::new(CatalogStore::new());
        let admins = Arc::new(AdminRegistry::new(secrets.master.clone()));
        let engine = Arc::new(ConversationEngine::new(
            catalog.clone(),
            admins.clone(),
            secrets,
            messenger.clone(),
        ));
        Self {
            engine,
            messenger,
            catalog,
            admins,
        }
    }

    pub fn command_update(&self, user: i64, name: &str, args: &str) -> IncomingUpdate {
        IncomingUpdate::Command(Command {
            chat_id: ChatId(user),
            user_id: UserId(user),
            username: None,
            name: name.to_string(),
            args: args.to_string(),
        })
    }

    pub fn text_update(&self, user: i64, text: &str) -> IncomingUpdate {
        IncomingUpdate::Text(TextMessage {
            chat_id: ChatId(user),
            user_id: UserId(user),
            username: None,
            text: text.to_string(),
        })
    }

    pub fn callback_update(&self, user: i64, data: &str) -> IncomingUpdate {
        IncomingUpdate::Callback(CallbackQuery {
            chat_id: ChatId(user),
            user_id: UserId(user),
            username: None,
            callback_id: format!("cb-{user}"),
            data: data.to_string(),
            message: Some(MessageRef {
                chat_id: ChatId(user),
                message_id: MENU_MESSAGE,
            }),
        })
    }

    pub async fn command(&self, user: i64, name: &str, args: &str) {
        self.engine
            .handle(self.command_update(user, name, args))
            .await
            .unwrap();
    }

    pub async fn text(&self, user: i64, text: &str) {
        self.engine
            .handle(self.text_update(user, text))
            .await
            .unwrap();
    }

    pub async fn press(&self, user: i64, data: &str) {
        self.engine
            .handle(self.callback_update(user, data))
            .await
            .unwrap();
    }

    pub async fn login(&self, user: i64) {
        self.command(user, "admin_login", "").await;
        self.text(user, MASTER).await;
        assert!(self.admins.is_authenticated(UserId(user)).await);
    }

    pub async fn seed(&self, title: &str, url: &str, referral: &str, ts: i64) -> Listing {
        self.catalog
            .create(ListingFields {
                title: Some(title.to_string()),
                url: Some(url.to_string()),
                referral: Some(referral.to_string()),
                timestamp: Some(ts),
                ..Default::default()
            })
            .await
            .unwrap()
    }
}

use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use apb_core::{
    admin::AdminRegistry, catalog::CatalogStore, config::Config,
    conversation::ConversationEngine, messaging::port::MessagingPort,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversationEngine>,
    pub messenger: Arc<dyn MessagingPort>,
}

impl AppState {
    /// Wire the conversation engine to `messenger` over a shared catalog.
    pub fn new(cfg: &Config, catalog: Arc<CatalogStore>, messenger: Arc<dyn MessagingPort>) -> Self {
        let admins = Arc::new(AdminRegistry::new(cfg.secrets.master.clone()));
        let engine = Arc::new(ConversationEngine::new(
            catalog,
            admins,
            cfg.secrets.clone(),
            messenger.clone(),
        ));
        Self { engine, messenger }
    }
}

pub async fn run_polling(cfg: Arc<Config>, catalog: Arc<CatalogStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "airdrop bot started"),
        Err(e) => anyhow::bail!("telegram getMe failed: {e}"),
    }
    tracing::info!(listings = catalog.len().await, "catalog ready");

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let state = Arc::new(AppState::new(&cfg, catalog, messenger));

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    tracing::info!("airdrop bot stopped");
    Ok(())
}

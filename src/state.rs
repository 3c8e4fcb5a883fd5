use std::sync::Arc;

use crate::config::Config;
use crate::db::database::Database;
use crate::telegram::client::BotApi;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub bot: Arc<dyn BotApi>,
}

impl AppState {
    pub fn new(config: Config, db: Database, bot: Arc<dyn BotApi>) -> Self {
        AppState {
            config: Arc::new(config),
            db,
            bot,
        }
    }
}

use sea_orm::DatabaseConnection;

use crate::checkin::{CheckInFeed, TokenSigner};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub signer: TokenSigner,
    pub feed: CheckInFeed,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        let signer = TokenSigner::new(config.checkin.token_secret.as_deref());
        let feed = CheckInFeed::new(config.checkin.feed_capacity);
        Self {
            db,
            config,
            signer,
            feed,
        }
    }
}

use sqlx::{Pool, Postgres};

use crate::{config::Config, error::Error, jwt::SessionKeys, media::MediaStore};

/// Shared handles passed to every route.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub keys: SessionKeys,
    pub media: MediaStore,
}

impl AppState {
    pub fn new(pool: Pool<Postgres>, config: &Config) -> Result<Self, Error> {
        Ok(Self {
            pool,
            keys: SessionKeys::new(&config.secret, config.token_ttl_hours)?,
            media: MediaStore::new(&config.media_root, &config.media_url),
        })
    }
}

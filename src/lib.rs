mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod media;
    pub mod pagination;
    pub mod schema;
    pub mod serializers;
    pub mod shopping_list;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod api;
pub mod config;
mod constants;
pub mod state;

pub use authentication::*;
pub use constants::*;
pub use database::*;

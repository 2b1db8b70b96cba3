pub mod ingredients;
pub mod recipes;
pub mod shopping;
pub mod subscriptions;
pub mod tags;
pub mod users;

pub use ingredients::*;
pub use recipes::*;
pub use shopping::*;
pub use subscriptions::*;
pub use tags::*;
pub use users::*;

pub mod lists;
pub mod recipes;
pub mod shopping_list;
pub mod short_link;
pub mod subscriptions;
pub mod users;

pub use short_link::{short_url, ShortCodeAllocator};

mod cache;
mod email;
mod search;

pub use cache::cmd_cache_purge;
pub use email::cmd_email_results;
pub use search::{cmd_search, render_results};

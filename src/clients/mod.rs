pub mod reddit;
pub mod stackexchange;

pub use reddit::RedditClient;
pub use stackexchange::StackExchangeClient;

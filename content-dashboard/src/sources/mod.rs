pub mod mock;
pub mod news_api;

pub use mock::MockArticleSource;
pub use news_api::NewsApiSource;

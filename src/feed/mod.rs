mod fetcher;

pub use fetcher::{FeedContent, FeedFetcher, FeedItem};

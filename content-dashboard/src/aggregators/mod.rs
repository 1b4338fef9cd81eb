pub mod time_bucket;

pub use time_bucket::TimeBucketAggregator;

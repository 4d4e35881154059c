pub mod aggregation;
pub mod association;
pub mod category;
pub mod churn;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod filter;
pub mod insights;
pub mod record;
pub mod resolver;
pub mod rng;
pub mod store;
pub mod synthetic;
pub mod types;

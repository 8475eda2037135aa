pub mod stats_queries;

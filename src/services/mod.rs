pub mod context;
pub mod db_source;
pub mod excel;
pub mod profiler;
pub mod stats_cache;

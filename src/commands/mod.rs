pub mod collect;
pub mod query;
pub mod serve;

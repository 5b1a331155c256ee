pub mod config;
pub mod error;
pub mod db;
pub mod embeddings;
pub mod graph;
pub mod query;
pub mod search;

pub use config::Config;
pub use db::Db;
pub use error::{Result, VecgraphError};
pub use graph::{Direction, Edge, HopResult, Node, PathStep, TraverseOptions};
pub use query::{GraphQuery, Query, SearchTraversal};
pub use search::SeedHit;

pub mod condition;
pub mod legacy;
pub mod planner;
pub mod resolver;

pub use condition::JsonConditionBuilder;
pub use planner::JsonPlanner;
pub use resolver::{InMemoryPathCatalog, JsonFieldResolver, PathTypeCatalog};

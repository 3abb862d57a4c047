//! The `get` pipeline.
//!
//! Data flows strictly downward:
//!
//! ```text
//! decode -> normalize -> plan -> execute/materialize -> resolve relations
//!        -> project -> finalize
//! ```
//!
//! Relation resolution re-enters the pipeline (normalize is done up front
//! for the whole option tree) for each related entity kind.

pub mod decode;
pub mod executor;
pub mod finalizer;
pub mod normalizer;
pub mod plan;
pub mod planner;
pub mod projector;
pub mod relation_map;
pub mod resolver;

pub use decode::decode_options;
pub use executor::{materialize, Fetched};
pub use finalizer::finalize;
pub use normalizer::{
    GroupColumn, NormalizedQuery, Normalizer, RelationRequest, ResultMode, SearchSpec,
};
pub use plan::{
    escape_like, like_match, OrderTerm, Predicate, QueryPlan, SelectExpr, SelectItem, LIKE_ESCAPE,
};
pub use planner::QueryPlanner;
pub use projector::project;
pub use relation_map::RelationMap;
pub use resolver::RelationResolver;

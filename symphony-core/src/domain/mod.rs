//! Domain types shared across the engine: node identity, the aligned price
//! table, and the date-indexed output matrix.

pub mod ids;
pub mod matrix;
pub mod prices;

pub use ids::NodeId;
pub use matrix::TimeMatrix;
pub use prices::PriceTable;

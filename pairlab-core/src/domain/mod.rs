//! Domain types for PairLab

pub mod bar;
pub mod fill;
pub mod ids;
pub mod order;
pub mod portfolio;
pub mod position;

pub use bar::Bar;
pub use fill::{Fill, Side};
pub use ids::{IdGen, OrderId, PairId};
pub use order::{IntentReason, OrderIntent, OrderStatus, OrderTarget};
pub use portfolio::PortfolioSnapshot;
pub use position::{Position, QTY_EPSILON};

/// Symbol type alias
pub type Symbol = String;

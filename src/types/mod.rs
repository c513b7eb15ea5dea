pub mod chart;
pub mod metrics;
pub mod price;

pub use chart::*;
pub use metrics::*;
pub use price::*;

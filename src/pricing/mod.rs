//! Price resolution: support matching, amortization, and margin policy

pub mod amortization;
pub mod margin;
pub mod resolver;
pub mod summary;

pub use margin::{Margin, DEFAULT_MARGIN_RATE, MIN_MARGIN_AMOUNT};
pub use resolver::{PriceResolver, PriceRow, Resolved, Unresolved};
pub use summary::{SummaryRow, KOREAN_HEADERS};

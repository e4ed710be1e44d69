pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod live;
pub mod models;
pub mod search;
pub mod view;

pub use catalog::Catalog;
pub use config::Config;
pub use error::{PulseError, PulseResult};
pub use live::{LiveTokens, Subscription, SubscriptionRegistry};
pub use view::{derive_view, DerivedView, FilterCriteria, SortKey};

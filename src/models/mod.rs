pub mod token;
pub mod market;

// Re-export commonly used types
pub use market::{FieldSet, MarketState, PreviousValues, TokenField, Trend, UpdateEvent, UpdateType};
pub use token::{Section, TokenRecord};

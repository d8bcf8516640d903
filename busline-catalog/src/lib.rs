pub mod store;
pub mod seed;
pub mod layout;

pub use store::{CatalogError, CatalogStore};
pub use layout::{Deck, SeatPosition};

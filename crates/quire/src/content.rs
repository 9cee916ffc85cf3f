mod collections;
mod front_matter;
mod page;
mod store;

pub use collections::*;
pub use front_matter::*;
pub use page::*;
pub use store::*;

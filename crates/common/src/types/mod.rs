mod criteria;
mod listing;
mod payload;

pub use criteria::*;
pub use listing::*;
pub use payload::*;

//! Listing search: criteria normalization, the listing API round trip, and
//! text rendering of results.

mod client;
mod format;
mod normalize;

pub use client::{search_url, ListingClient};
pub use format::{format_price, format_text};
pub use normalize::normalize;

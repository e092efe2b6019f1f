//! Domain model types.
//!
//! These types represent validated domain objects separate from database row
//! types. Row structs live next to the repositories that read them; views are
//! the JSON shapes the API serializes.

pub mod listing;
pub mod profile;
pub mod wishlist;

pub use listing::{Listing, ListingView, NewListing};
pub use profile::{Profile, ProfileView};
pub use wishlist::WishlistItem;

//! Documents exchanged between the server and its clients.
//!
//! IDs serialize as `_id` and timestamps as `createdAt`/`updatedAt` so the
//! JSON matches what existing storefront front-ends already consume.

pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use category::Category;
pub use order::{Buyer, Order};
pub use product::Product;
pub use user::{User, UserSummary};

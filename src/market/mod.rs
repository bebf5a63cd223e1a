//! Market primitives: the vocabulary every other module builds on.

pub mod dir;
pub mod dirpair;
pub mod hand;
pub mod order;
pub mod price;
pub mod size;
pub mod suit;
pub mod username;

pub use dir::Dir;
pub use dirpair::DirPair;
pub use hand::{Hand, PartialHand};
pub use order::{Order, OrderId, RestingOrder};
pub use price::Price;
pub use size::Size;
pub use suit::Suit;
pub use username::Username;

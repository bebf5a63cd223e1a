//! `Dir`: order direction.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dir {
    Buy,
    Sell,
}

impl Dir {
    pub fn other(self) -> Dir {
        match self {
            Dir::Buy => Dir::Sell,
            Dir::Sell => Dir::Buy,
        }
    }
}

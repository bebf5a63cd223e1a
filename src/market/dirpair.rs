//! `DirPair<T>`: a pair of `T` indexed by `Dir`. `get`/`get_mut`/`modify` are
//! the only accessors.

use serde::{Deserialize, Serialize};

use super::dir::Dir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirPair<T> {
    pub buy: T,
    pub sell: T,
}

impl<T> DirPair<T> {
    pub fn new(buy: T, sell: T) -> Self {
        Self { buy, sell }
    }

    pub fn get(&self, dir: Dir) -> &T {
        match dir {
            Dir::Buy => &self.buy,
            Dir::Sell => &self.sell,
        }
    }

    pub fn get_mut(&mut self, dir: Dir) -> &mut T {
        match dir {
            Dir::Buy => &mut self.buy,
            Dir::Sell => &mut self.sell,
        }
    }

    pub fn modify(&mut self, dir: Dir, f: impl FnOnce(&mut T)) {
        f(self.get_mut(dir));
    }
}

impl<T: Default> Default for DirPair<T> {
    fn default() -> Self {
        Self {
            buy: T::default(),
            sell: T::default(),
        }
    }
}

use std::collections::BTreeMap;

use log::debug;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::Direction;

const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyMapError {
    #[error("key pool has {0} keys, at least 4 are needed to bind every direction")]
    PoolTooSmall(usize),
    #[error("every key in the pool is already bound, nothing to remap to")]
    PoolExhausted,
    #[error("key {0:?} is not bound to a direction")]
    Unbound(char),
    #[error("key {0:?} cannot be used, only ASCII letters and digits are allowed")]
    InvalidKey(char),
}

/// How the bindings change after a mapped key is pressed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RemapMode {
    /// Only the pressed key moves to a fresh, unused key.
    #[default]
    PerKey,
    /// All four bindings are drawn again.
    Whole,
}

/// Candidate keys the bindings are drawn from. Lowercase, no repeats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPool {
    keys: Vec<char>,
}

impl KeyPool {
    pub fn letters() -> Self {
        Self { keys: LETTERS.chars().collect() }
    }

    pub fn letters_and_digits() -> Self {
        Self { keys: LETTERS.chars().chain(DIGITS.chars()).collect() }
    }

    pub fn new(keys: impl IntoIterator<Item = char>) -> Result<Self, KeyMapError> {
        let mut pool: Vec<char> = Vec::new();
        for key in keys {
            if !key.is_ascii_alphanumeric() {
                return Err(KeyMapError::InvalidKey(key));
            }
            let key = key.to_ascii_lowercase();
            if !pool.contains(&key) {
                pool.push(key);
            }
        }
        Ok(Self { keys: pool })
    }

    pub fn keys(&self) -> &[char] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// A single binding can only be moved if a key is left over once all
    /// four directions are bound.
    pub fn supports_remap(&self) -> bool {
        self.keys.len() > Direction::ALL.len()
    }
}

/// Bijection between four keys and the four directions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMap {
    bindings: BTreeMap<char, Direction>,
}

impl KeyMap {
    /// Draws four distinct keys and deals the shuffled directions onto them.
    pub fn generate<R: Rng + ?Sized>(pool: &KeyPool, rng: &mut R) -> Result<Self, KeyMapError> {
        if pool.len() < Direction::ALL.len() {
            return Err(KeyMapError::PoolTooSmall(pool.len()));
        }

        let mut directions = Direction::ALL;
        directions.shuffle(rng);

        let bindings = pool
            .keys()
            .choose_multiple(rng, Direction::ALL.len())
            .copied()
            .zip(directions)
            .collect();
        Ok(Self { bindings })
    }

    pub fn resolve(&self, key: char) -> Option<Direction> {
        self.bindings.get(&key).copied()
    }

    pub fn key_for(&self, direction: Direction) -> Option<char> {
        self.bindings
            .iter()
            .find(|(_, bound)| **bound == direction)
            .map(|(key, _)| *key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, Direction)> + '_ {
        self.bindings.iter().map(|(key, direction)| (*key, *direction))
    }

    /// Moves the direction bound to `used` onto a random key that is not
    /// bound yet. The other three bindings are left alone.
    ///
    /// On error the map is unchanged.
    pub fn remap_one<R: Rng + ?Sized>(
        &mut self,
        used: char,
        pool: &KeyPool,
        rng: &mut R,
    ) -> Result<char, KeyMapError> {
        let direction = self.resolve(used).ok_or(KeyMapError::Unbound(used))?;

        let free: Vec<char> = pool
            .keys()
            .iter()
            .copied()
            .filter(|key| !self.bindings.contains_key(key))
            .collect();
        let replacement = *free.choose(rng).ok_or(KeyMapError::PoolExhausted)?;

        self.bindings.remove(&used);
        self.bindings.insert(replacement, direction);
        debug!("{} moved from {:?} to {:?}", direction.label(), used, replacement);
        Ok(replacement)
    }

    /// Applies the configured reshuffle after `used` was pressed.
    pub fn reshuffle<R: Rng + ?Sized>(
        &mut self,
        used: char,
        mode: RemapMode,
        pool: &KeyPool,
        rng: &mut R,
    ) -> Result<(), KeyMapError> {
        match mode {
            RemapMode::PerKey => self.remap_one(used, pool, rng).map(|_| ()),
            RemapMode::Whole => {
                *self = Self::generate(pool, rng)?;
                debug!("bindings redrawn: {:?}", self.bindings);
                Ok(())
            }
        }
    }
}

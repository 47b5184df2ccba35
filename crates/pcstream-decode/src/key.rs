//! Hierarchy node keys.

use std::fmt;

use crate::error::{DecodeError, DecodeResult};

/// An octree cell address: depth plus integer cell coordinates at that depth.
///
/// Ordering is depth-first, so sorting keys puts the root ahead of
/// every other node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub depth: u32,
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl NodeKey {
    /// The root node `0-0-0-0`.
    pub const ROOT: Self = Self::new(0, 0, 0, 0);

    #[must_use]
    pub const fn new(depth: u32, x: u32, y: u32, z: u32) -> Self {
        Self { depth, x, y, z }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }

    /// Build a key from signed components, as stored in COPC hierarchy pages.
    pub fn from_signed(depth: i32, x: i32, y: i32, z: i32) -> DecodeResult<Self> {
        let convert = |v: i32| {
            u32::try_from(v).map_err(|_| DecodeError::InvalidKey(format!("{depth}-{x}-{y}-{z}")))
        };
        Ok(Self::new(convert(depth)?, convert(x)?, convert(y)?, convert(z)?))
    }

    /// The child in octant `index` (bit 2 = x, bit 1 = y, bit 0 = z).
    #[must_use]
    pub fn child(&self, index: u8) -> Self {
        Self::new(
            self.depth + 1,
            (self.x << 1) | u32::from((index >> 2) & 1),
            (self.y << 1) | u32::from((index >> 1) & 1),
            (self.z << 1) | u32::from(index & 1),
        )
    }

    /// Parse the dash-joined `d-x-y-z` form.
    pub fn parse_dashed(s: &str) -> DecodeResult<Self> {
        let invalid = || DecodeError::InvalidKey(s.to_string());
        let mut parts = s.split('-').map(|p| p.parse::<u32>().map_err(|_| invalid()));
        let key = Self::new(
            parts.next().ok_or_else(invalid)??,
            parts.next().ok_or_else(invalid)??,
            parts.next().ok_or_else(invalid)??,
            parts.next().ok_or_else(invalid)??,
        );
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(key)
    }

    /// Parse a Morton chain: the root marker `r` followed by one octant digit
    /// (`0`-`7`) per level, so the depth is the chain length minus one.
    pub fn parse_chain(s: &str) -> DecodeResult<Self> {
        let Some(digits) = s.strip_prefix('r') else {
            return Err(DecodeError::InvalidKey(s.to_string()));
        };
        digits.chars().try_fold(Self::ROOT, |key, c| match c.to_digit(8) {
            Some(octant) => Ok(key.child(octant as u8)),
            None => Err(DecodeError::InvalidKey(s.to_string())),
        })
    }

    /// Format as a Morton chain rooted at `r`.
    #[must_use]
    pub fn to_chain(&self) -> String {
        let mut chain = String::with_capacity(self.depth as usize + 1);
        chain.push('r');
        for level in (0..self.depth).rev() {
            let bit = |v: u32| ((v >> level) & 1) as u8;
            let octant = (bit(self.x) << 2) | (bit(self.y) << 1) | bit(self.z);
            chain.push(char::from(b'0' + octant));
        }
        chain
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}-{}", self.depth, self.x, self.y, self.z)
    }
}

/// How a hierarchy key string encodes its depth.
///
/// Chosen once per dataset and used for every key of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDialect {
    /// `d-x-y-z`, depth is the leading field.
    Explicit,
    /// Octant digit chain, depth is the chain length minus one.
    MortonChain,
}

impl KeyDialect {
    pub fn parse(self, s: &str) -> DecodeResult<NodeKey> {
        match self {
            Self::Explicit => NodeKey::parse_dashed(s),
            Self::MortonChain => NodeKey::parse_chain(s),
        }
    }

    #[must_use]
    pub fn format(self, key: &NodeKey) -> String {
        match self {
            Self::Explicit => key.to_string(),
            Self::MortonChain => key.to_chain(),
        }
    }
}

//! Stable 128-bit transport identifiers derived from names.
//!
//! `identifier(name)` is the well-known override for `name` when one
//! exists, otherwise the first 16 bytes of SHA-256 over the UTF-8 name.
//! The digest is used only for its fixed, well-distributed output; there
//! is no security property attached.

use core::fmt;

/// Formatted identifier: `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
pub type UuidString = heapless::String<36>;

/// 128-bit identifier, most significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uuid(pub [u8; 16]);

impl Uuid {
    pub const fn from_u128(v: u128) -> Self {
        Self(v.to_be_bytes())
    }

    pub const fn as_u128(self) -> u128 {
        u128::from_be_bytes(self.0)
    }

    /// Least-significant-byte-first layout, as the Bluetooth stack expects.
    pub fn to_le_bytes(self) -> [u8; 16] {
        self.as_u128().to_le_bytes()
    }

    pub fn to_heapless(self) -> UuidString {
        let mut s = UuidString::new();
        use core::fmt::Write;
        let _ = write!(s, "{self}");
        s
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Names with pre-assigned identifiers.
pub const WELL_KNOWN: &[(&str, u128)] = &[
    // Star Trek ship lights
    ("Warp", 0xcd7ce55d_019d_4204_ad2e_a4d1464e3840),
    ("Bussard", 0x529d6059_5633_4868_84a5_bfdef04296dd),
    ("Deflector", 0xe38f4a08_6b53_4826_937d_d62183f02d1b),
    ("Impulse", 0x45864431_5197_4c89_9c52_30e8ec7ac523),
    // Infinity stones
    ("Mind Stone", 0x1dd3cff4_ee45_452c_a8c6_d3bd3a7986b3),
    ("Soul Stone", 0x13e55e6a_1663_4272_ac08_e12617b2c822),
    ("Reality Stone", 0x46c628e6_4a1d_48c3_ba76_412eff75ad6f),
    ("Space Stone", 0x269e55e4_0daf_47a9_86cc_ea8a5c680dd5),
    ("Power Stone", 0x492a89d2_bcb8_4a3e_9b96_31000df7a3aa),
    ("Time Stone", 0x03c7757e_be1c_42ef_9b58_c4be71fd3a7d),
];

pub fn well_known(name: &str) -> Option<Uuid> {
    WELL_KNOWN
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| Uuid::from_u128(*v))
}

/// Digest-derived identifier, ignoring the well-known table.
pub fn hashed(name: &str) -> Uuid {
    let digest = hmac_sha256::Hash::hash(name.as_bytes());
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    Uuid(out)
}

pub fn identifier(name: &str) -> Uuid {
    well_known(name).unwrap_or_else(|| hashed(name))
}

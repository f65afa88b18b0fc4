use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Largest power of ten that fits in a `u64`. Decimal rendering peels off
/// 19 digits per division.
const DECIMAL_CHUNK: u64 = 10_000_000_000_000_000_000;
const DECIMAL_CHUNK_DIGITS: usize = 19;

/// A 256-bit unsigned integer.
///
/// This is the value type handed out by [`NumberPool`]. It is stored as four
/// little-endian `u64` limbs (`limbs[0]` is the least significant) and is
/// `Copy`, hashable and totally ordered so it can be used directly as a set
/// key.
///
/// The canonical text form is base-10 without leading zeros, which is also
/// the form used on the wire. Consumers with narrow integer types can carry
/// the string without losing precision.
///
/// # Example
/// ```
/// use randstream::U256;
///
/// let n: U256 = "18446744073709551616".parse().unwrap();
/// assert_eq!(n, U256::from(1_u128 << 64));
/// assert_eq!(n.to_string(), "18446744073709551616");
/// ```
///
/// [`NumberPool`]: crate::NumberPool
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256([u64; 4]);

impl U256 {
    /// Number of bits in the value.
    pub const BITS: u32 = 256;
    /// Number of bytes in the big-endian encoding.
    pub const BYTES: usize = 32;
    /// Maximum number of decimal digits (`2^256 - 1` has 78).
    pub const MAX_DECIMAL_DIGITS: usize = 78;

    pub const ZERO: Self = Self([0; 4]);
    pub const ONE: Self = Self([1, 0, 0, 0]);
    pub const MAX: Self = Self([u64::MAX; 4]);

    /// Builds a value from little-endian limbs.
    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self(limbs)
    }

    /// Returns the little-endian limbs.
    pub const fn to_limbs(self) -> [u64; 4] {
        self.0
    }

    /// Decodes a value from its 32-byte big-endian representation.
    ///
    /// Every byte pattern maps to exactly one value, so uniformly random
    /// bytes give a uniformly random value over the full range.
    pub fn from_be_bytes(bytes: [u8; Self::BYTES]) -> Self {
        let mut limbs = [0_u64; 4];
        for (i, chunk) in bytes.chunks_exact(8).enumerate() {
            let mut word = [0_u8; 8];
            word.copy_from_slice(chunk);
            limbs[3 - i] = u64::from_be_bytes(word);
        }
        Self(limbs)
    }

    /// Encodes the value as 32 big-endian bytes.
    pub fn to_be_bytes(self) -> [u8; Self::BYTES] {
        let mut bytes = [0_u8; Self::BYTES];
        for (i, chunk) in bytes.chunks_exact_mut(8).enumerate() {
            chunk.copy_from_slice(&self.0[3 - i].to_be_bytes());
        }
        bytes
    }

    pub const fn is_zero(&self) -> bool {
        self.0[0] == 0 && self.0[1] == 0 && self.0[2] == 0 && self.0[3] == 0
    }

    /// Divides by a non-zero `u64`, returning the quotient and remainder.
    ///
    /// # Panics
    /// Panics if `divisor` is zero.
    pub fn div_rem_u64(self, divisor: u64) -> (Self, u64) {
        assert!(divisor != 0, "division by zero");
        let divisor = u128::from(divisor);
        let mut quotient = [0_u64; 4];
        let mut rem = 0_u128;
        for i in (0..4).rev() {
            let acc = (rem << 64) | u128::from(self.0[i]);
            quotient[i] = (acc / divisor) as u64;
            rem = acc % divisor;
        }
        (Self(quotient), rem as u64)
    }

    /// Multiplies by a `u64`, returning `None` on overflow.
    pub fn checked_mul_u64(self, rhs: u64) -> Option<Self> {
        let rhs = u128::from(rhs);
        let mut limbs = [0_u64; 4];
        let mut carry = 0_u128;
        for (out, limb) in limbs.iter_mut().zip(self.0) {
            let acc = u128::from(limb) * rhs + carry;
            *out = acc as u64;
            carry = acc >> 64;
        }
        (carry == 0).then_some(Self(limbs))
    }

    /// Adds a `u64`, returning `None` on overflow.
    pub fn checked_add_u64(self, rhs: u64) -> Option<Self> {
        let mut limbs = self.0;
        let mut carry = rhs;
        for limb in &mut limbs {
            if carry == 0 {
                break;
            }
            let (sum, overflow) = limb.overflowing_add(carry);
            *limb = sum;
            carry = u64::from(overflow);
        }
        (carry == 0).then_some(Self(limbs))
    }
}

impl From<u64> for U256 {
    fn from(value: u64) -> Self {
        Self([value, 0, 0, 0])
    }
}

impl From<u128> for U256 {
    fn from(value: u128) -> Self {
        Self([value as u64, (value >> 64) as u64, 0, 0])
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use core::fmt::Write;

        // Least significant chunk first.
        let mut chunks = [0_u64; 5];
        let mut len = 0;
        let mut n = *self;
        loop {
            let (q, r) = n.div_rem_u64(DECIMAL_CHUNK);
            chunks[len] = r;
            len += 1;
            n = q;
            if n.is_zero() {
                break;
            }
        }

        let mut buf = String::with_capacity(Self::MAX_DECIMAL_DIGITS);
        write!(buf, "{}", chunks[len - 1])?;
        for chunk in chunks[..len - 1].iter().rev() {
            write!(buf, "{chunk:0width$}", width = DECIMAL_CHUNK_DIGITS)?;
        }
        f.pad(&buf)
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({self})")
    }
}

/// Errors returned when parsing a [`U256`] from a decimal string.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ParseU256Error {
    #[error("cannot parse integer from empty string")]
    Empty,

    #[error("invalid decimal digit at position {position}")]
    InvalidDigit { position: usize },

    /// The number is greater than `2^256 - 1`.
    #[error("number too large to fit in 256 bits")]
    Overflow,
}

impl FromStr for U256 {
    type Err = ParseU256Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseU256Error::Empty);
        }

        let mut value = Self::ZERO;
        for (position, byte) in s.bytes().enumerate() {
            let digit = match byte {
                b'0'..=b'9' => u64::from(byte - b'0'),
                _ => return Err(ParseU256Error::InvalidDigit { position }),
            };
            value = value
                .checked_mul_u64(10)
                .and_then(|v| v.checked_add_u64(digit))
                .ok_or(ParseU256Error::Overflow)?;
        }
        Ok(value)
    }
}

impl Serialize for U256 {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for U256 {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DecimalVisitor;

        impl serde::de::Visitor<'_> for DecimalVisitor {
            type Value = U256;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a decimal string holding a 256-bit unsigned integer")
            }

            #[inline]
            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(serde::de::Error::custom)
            }
        }

        d.deserialize_str(DecimalVisitor)
    }
}

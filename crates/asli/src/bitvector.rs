//! Fixed-width bitvectors over arbitrary-precision words.
//!
//! ASL bitvectors have an exact width that is part of the value: `'00'`
//! and `'0000'` are different values even though both are zero. Widths are
//! unbounded, so the payload is a [`BigUint`] kept normalized to the
//! declared width.

use std::fmt;

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{AslError, AslErrorKind};

/// A bitvector value: `length` bits stored least-significant-first in
/// `data`, with all bits above `length` clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitvector {
    length: usize,
    data: BigUint,
}

impl Bitvector {
    /// Builds a bitvector of `length` bits from `data`, discarding any bits
    /// above the width.
    #[must_use]
    pub fn new(length: usize, data: BigUint) -> Self {
        Self {
            length,
            data: data & mask(length),
        }
    }

    /// The all-zeros bitvector of the given width.
    #[must_use]
    pub fn zeros(length: usize) -> Self {
        Self {
            length,
            data: BigUint::zero(),
        }
    }

    /// The all-ones bitvector of the given width.
    #[must_use]
    pub fn ones(length: usize) -> Self {
        Self {
            length,
            data: mask(length),
        }
    }

    /// Parses a literal such as `'1010'`, most significant bit first.
    /// Whitespace and underscores are ignored. Returns `None` on any other
    /// character.
    #[must_use]
    pub fn from_bit_str(s: &str) -> Option<Self> {
        let mut data = BigUint::zero();
        let mut length = 0usize;
        for c in s.chars() {
            match c {
                '0' => {
                    data <<= 1;
                    length += 1;
                }
                '1' => {
                    data <<= 1;
                    data |= BigUint::one();
                    length += 1;
                }
                ' ' | '_' => {}
                _ => return None,
            }
        }
        Some(Self { length, data })
    }

    /// The width in bits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// True for the zero-width bitvector `''`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The unsigned integer the bits denote.
    #[must_use]
    pub fn to_unsigned(&self) -> BigInt {
        BigInt::from(self.data.clone())
    }

    /// The two's-complement signed integer the bits denote.
    #[must_use]
    pub fn to_signed(&self) -> BigInt {
        if self.length == 0 {
            return BigInt::zero();
        }
        let sign_bit = BigUint::one() << (self.length - 1);
        if (&self.data & &sign_bit).is_zero() {
            BigInt::from(self.data.clone())
        } else {
            BigInt::from(self.data.clone()) - (BigInt::one() << self.length)
        }
    }

    /// Reads the bit at `position` (0 = least significant).
    #[must_use]
    pub fn bit(&self, position: usize) -> bool {
        !((&self.data >> position) & BigUint::one()).is_zero()
    }

    /// Extracts `length` bits starting at bit `offset`.
    ///
    /// Fails when the slice reaches past the width.
    pub fn extract(&self, offset: usize, length: usize) -> Result<Self, AslError> {
        if offset + length > self.length {
            return Err(AslError::no_pos(AslErrorKind::OperationFailed(format!(
                "bitvector slice [{}:{}] out of range for width {}",
                offset + length - 1,
                offset,
                self.length
            ))));
        }
        Ok(Self {
            length,
            data: (&self.data >> offset) & mask(length),
        })
    }

    /// Returns a copy with `src` written over `length` bits starting at
    /// `offset`. `src` must have exactly `length` bits.
    pub fn write(&self, offset: usize, length: usize, src: &Self) -> Result<Self, AslError> {
        if src.length != length {
            return Err(AslError::no_pos(AslErrorKind::OperationFailed(format!(
                "cannot write {} bits into a {length}-bit slice",
                src.length
            ))));
        }
        if offset + length > self.length {
            return Err(AslError::no_pos(AslErrorKind::OperationFailed(format!(
                "bitvector slice [{}:{}] out of range for width {}",
                offset + length - 1,
                offset,
                self.length
            ))));
        }
        let hole = mask(self.length) ^ (mask(length) << offset);
        let data = (&self.data & hole) | (&src.data << offset);
        Ok(Self {
            length: self.length,
            data,
        })
    }

    /// Concatenates bitvectors, the first argument most significant.
    #[must_use]
    pub fn concat(parts: &[Self]) -> Self {
        let mut data = BigUint::zero();
        let mut length = 0usize;
        for part in parts {
            data <<= part.length;
            data |= &part.data;
            length += part.length;
        }
        Self { length, data }
    }

    /// Repeats this bitvector `count` times.
    #[must_use]
    pub fn replicate(&self, count: usize) -> Self {
        let mut data = BigUint::zero();
        for _ in 0..count {
            data <<= self.length;
            data |= &self.data;
        }
        Self {
            length: self.length * count,
            data,
        }
    }

    /// Bitwise AND; the widths must match.
    pub fn and(&self, other: &Self) -> Result<Self, AslError> {
        let (length, data) = Self::zip(self, other, "AND")?;
        Ok(Self {
            length,
            data: data.0 & data.1,
        })
    }

    /// Bitwise OR; the widths must match.
    pub fn or(&self, other: &Self) -> Result<Self, AslError> {
        let (length, data) = Self::zip(self, other, "OR")?;
        Ok(Self {
            length,
            data: data.0 | data.1,
        })
    }

    /// Bitwise exclusive OR; the widths must match.
    pub fn xor(&self, other: &Self) -> Result<Self, AslError> {
        let (length, data) = Self::zip(self, other, "EOR")?;
        Ok(Self {
            length,
            data: data.0 ^ data.1,
        })
    }

    /// Bitwise complement.
    #[must_use]
    pub fn not(&self) -> Self {
        Self {
            length: self.length,
            data: mask(self.length) ^ &self.data,
        }
    }

    /// Modular addition, wrapping at the width. Negative amounts subtract.
    #[must_use]
    pub fn wrapping_add(&self, amount: &BigInt) -> Self {
        use num_integer::Integer;
        let modulus = BigInt::one() << self.length.max(1);
        let sum = (self.to_unsigned() + amount).mod_floor(&modulus);
        Self::new(self.length, sum.to_biguint().unwrap_or_default())
    }

    fn zip<'a>(a: &'a Self, b: &'a Self, op: &str) -> Result<(usize, (&'a BigUint, &'a BigUint)), AslError> {
        if a.length != b.length {
            return Err(AslError::no_pos(AslErrorKind::OperationFailed(format!(
                "bitvector width mismatch in {op}: {} vs {}",
                a.length, b.length
            ))));
        }
        Ok((a.length, (&a.data, &b.data)))
    }
}

/// All-ones value of the given width.
fn mask(length: usize) -> BigUint {
    (BigUint::one() << length) - BigUint::one()
}

impl fmt::Display for Bitvector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("'")?;
        for i in (0..self.length).rev() {
            f.write_str(if self.bit(i) { "1" } else { "0" })?;
        }
        f.write_str("'")
    }
}

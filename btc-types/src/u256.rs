use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::ops::{Div, Shl, Shr};

/// Unsigned 256-bit integer used for difficulty targets and chainwork.
///
/// Stored as a (high, low) pair of `u128`s. Only the operations the oracle
/// core needs are implemented.
#[derive(
    BorshDeserialize,
    BorshSerialize,
    Serialize,
    Deserialize,
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
)]
pub struct U256(u128, u128);

impl U256 {
    pub const ZERO: U256 = U256(0, 0);

    pub const ONE: U256 = U256(0, 1);

    pub const fn new(high: u128, low: u128) -> Self {
        U256(high, low)
    }

    /// Creates a `U256` from a big-endian array of `u8`s.
    #[must_use]
    pub fn from_be_bytes(bytes: &[u8; 32]) -> U256 {
        let (high, low) = split_in_half(bytes);
        U256(u128::from_be_bytes(high), u128::from_be_bytes(low))
    }

    /// Creates a `U256` from a little-endian array of `u8`s.
    #[must_use]
    pub fn from_le_bytes(bytes: &[u8; 32]) -> U256 {
        let (low, high) = split_in_half(bytes);
        U256(u128::from_le_bytes(high), u128::from_le_bytes(low))
    }

    /// Converts `U256` to a big-endian array of `u8`s.
    #[must_use]
    pub fn to_be_bytes(self) -> [u8; 32] {
        let mut out = [0; 32];
        out[..16].copy_from_slice(&self.0.to_be_bytes());
        out[16..].copy_from_slice(&self.1.to_be_bytes());
        out
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == 0 && self.1 == 0
    }

    /// Encodes this value as Bitcoin compact bits, normalizing the top bit
    /// the way Bitcoin Core's `GetCompact` does.
    #[must_use]
    pub fn target_to_bits(&self) -> u32 {
        let mut size = (self.bits() + 7) / 8;
        #[allow(clippy::as_conversions)]
        let mut compact: u32 = if size <= 3 {
            (self.1 as u32) << (8 * (3 - size))
        } else {
            let shifted = *self >> (8 * (size - 3));
            (shifted.1 & 0x00ff_ffff) as u32
        };

        // The mantissa is signed; shift a set top bit into the exponent.
        if compact & 0x0080_0000 != 0 {
            compact >>= 8;
            size += 1;
        }

        compact | (size << 24)
    }

    /// Least number of bits needed to represent the value.
    fn bits(&self) -> u32 {
        if self.0 > 0 {
            256 - self.0.leading_zeros()
        } else {
            128 - self.1.leading_zeros()
        }
    }

    /// Calculates `self` + `rhs`, with an arithmetic-overflow flag.
    #[must_use = "this returns the result of the operation, without modifying the original"]
    pub fn overflowing_add(self, rhs: Self) -> (Self, bool) {
        let (low, low_carry) = self.1.overflowing_add(rhs.1);
        let (high, high_overflow) = self.0.overflowing_add(rhs.0);
        if low_carry {
            let (high, carry_overflow) = high.overflowing_add(1);
            (U256(high, low), high_overflow | carry_overflow)
        } else {
            (U256(high, low), high_overflow)
        }
    }

    /// Calculates `self` * `rhs` for a 64-bit scalar, with an overflow flag.
    #[must_use = "this returns the result of the operation, without modifying the original"]
    pub fn overflowing_mul(self, rhs: u64) -> (Self, bool) {
        let scalar = u128::from(rhs);
        let low_half = (self.1 & 0xffff_ffff_ffff_ffff) * scalar;
        let high_half = (self.1 >> 64) * scalar;

        let (low, carry) = low_half.overflowing_add(high_half << 64);
        let carry = (high_half >> 64) + u128::from(carry);

        let (high, mul_overflow) = self.0.overflowing_mul(scalar);
        let (high, add_overflow) = high.overflowing_add(carry);

        (U256(high, low), mul_overflow | add_overflow)
    }

    /// `self - rhs`, clamped at zero.
    #[must_use = "this returns the result of the operation, without modifying the original"]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        if rhs >= self {
            U256::ZERO
        } else {
            self.wrapping_sub(rhs)
        }
    }

    fn wrapping_sub(self, rhs: Self) -> Self {
        let (low, borrow) = self.1.overflowing_sub(rhs.1);
        let high = self.0.wrapping_sub(rhs.0).wrapping_sub(u128::from(borrow));
        U256(high, low)
    }

    /// Quotient and remainder by bitwise long division.
    ///
    /// # Panics
    ///
    /// If `rhs` is zero.
    fn div_rem(self, rhs: Self) -> (Self, Self) {
        assert!(!rhs.is_zero(), "attempted to divide by zero");

        let my_bits = self.bits();
        let your_bits = rhs.bits();
        if my_bits < your_bits {
            return (U256::ZERO, self);
        }

        let mut remainder = self;
        let mut shift = my_bits - your_bits;
        let mut divisor = rhs << shift;
        let mut quotient = [0u128; 2];

        loop {
            if remainder >= divisor {
                #[allow(clippy::as_conversions)]
                {
                    quotient[1 - (shift / 128) as usize] |= 1 << (shift % 128);
                }
                remainder = remainder.wrapping_sub(divisor);
            }
            if shift == 0 {
                break;
            }
            divisor = divisor >> 1;
            shift -= 1;
        }

        (U256(quotient[0], quotient[1]), remainder)
    }

    /// Panic-free shift-left; the shift amount is masked to the type width.
    fn wrapping_shl(self, rhs: u32) -> Self {
        let shift = rhs & 0x0000_00ff;
        let bit_shift = shift % 128;

        if shift >= 128 {
            U256(self.1 << bit_shift, 0)
        } else {
            let mut high = self.0 << bit_shift;
            if bit_shift > 0 {
                high |= self.1 >> (128 - bit_shift);
            }
            U256(high, self.1 << bit_shift)
        }
    }

    /// Panic-free shift-right; the shift amount is masked to the type width.
    fn wrapping_shr(self, rhs: u32) -> Self {
        let shift = rhs & 0x0000_00ff;
        let bit_shift = shift % 128;

        if shift >= 128 {
            U256(0, self.0 >> bit_shift)
        } else {
            let mut low = self.1 >> bit_shift;
            if bit_shift > 0 {
                low |= self.0 << (128 - bit_shift);
            }
            U256(self.0 >> bit_shift, low)
        }
    }
}

/// Splits a 32 byte array into two 16 byte arrays.
fn split_in_half(bytes: &[u8; 32]) -> ([u8; 16], [u8; 16]) {
    let mut first = [0u8; 16];
    let mut second = [0u8; 16];
    first.copy_from_slice(&bytes[..16]);
    second.copy_from_slice(&bytes[16..]);
    (first, second)
}

impl<T: Into<u128>> From<T> for U256 {
    fn from(x: T) -> Self {
        U256(0, x.into())
    }
}

impl Div for U256 {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        self.div_rem(rhs).0
    }
}

impl Shl<u32> for U256 {
    type Output = Self;
    fn shl(self, shift: u32) -> U256 {
        self.wrapping_shl(shift)
    }
}

impl Shr<u32> for U256 {
    type Output = Self;
    fn shr(self, shift: u32) -> U256 {
        self.wrapping_shr(shift)
    }
}

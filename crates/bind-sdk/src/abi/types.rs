//! ABI type definitions

use std::fmt;

use bind_primitives::{Address, H256, U256};

/// Solidity ABI token types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Address (20 bytes)
    Address(Address),
    /// Unsigned integer (8-256 bits)
    Uint(U256),
    /// Signed integer (8-256 bits)
    Int(I256),
    /// Boolean
    Bool(bool),
    /// Dynamic bytes
    Bytes(Vec<u8>),
    /// Fixed-size bytes (1-32)
    FixedBytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Dynamic array
    Array(Vec<Token>),
    /// Fixed-size array
    FixedArray(Vec<Token>),
    /// Tuple (struct)
    Tuple(Vec<Token>),
}

/// Signed 256-bit integer stored as its two's complement word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct I256(U256);

impl I256 {
    /// Zero
    pub fn zero() -> Self {
        I256(U256::zero())
    }

    /// Wrap a raw two's complement word
    pub fn from_raw(word: U256) -> Self {
        I256(word)
    }

    /// The raw two's complement word
    pub fn into_raw(self) -> U256 {
        self.0
    }

    /// Create from i128
    pub fn from_i128(value: i128) -> Self {
        if value < 0 {
            let abs = U256::from(value.unsigned_abs());
            I256((!abs).overflowing_add(U256::one()).0)
        } else {
            I256(U256::from(value as u128))
        }
    }

    /// Convert to i128 if the value fits
    pub fn to_i128(&self) -> Option<i128> {
        if self.is_negative() {
            let abs = (!self.0).overflowing_add(U256::one()).0;
            if abs > U256::from(i128::MAX as u128) + U256::one() {
                return None;
            }
            let abs = abs.as_u128();
            Some(0i128.wrapping_sub_unsigned(abs))
        } else if self.0 <= U256::from(i128::MAX as u128) {
            Some(self.0.as_u128() as i128)
        } else {
            None
        }
    }

    /// Sign bit set
    pub fn is_negative(&self) -> bool {
        self.0.bit(255)
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// True if the value is representable in `bits` bits
    pub fn fits(&self, bits: usize) -> bool {
        if bits >= 256 {
            return true;
        }
        let high = self.0 >> (bits - 1);
        high.is_zero() || high == (U256::MAX >> (bits - 1))
    }
}

/// Solidity parameter types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Address
    Address,
    /// Unsigned integer with bit size (8, 16, ..., 256)
    Uint(usize),
    /// Signed integer with bit size
    Int(usize),
    /// Boolean
    Bool,
    /// Dynamic bytes
    Bytes,
    /// Fixed-size bytes (size 1-32)
    FixedBytes(usize),
    /// UTF-8 string
    String,
    /// Dynamic array
    Array(Box<ParamType>),
    /// Fixed-size array
    FixedArray(Box<ParamType>, usize),
    /// Tuple
    Tuple(Vec<ParamType>),
}

impl ParamType {
    /// Check if this type is dynamic (variable length)
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            ParamType::Tuple(types) => types.iter().any(|t| t.is_dynamic()),
            _ => false,
        }
    }

    /// Bytes occupied in the head of an enclosing tuple. Saturates for
    /// types too large to address; see [`checked_head_size`](Self::checked_head_size).
    pub fn head_size(&self) -> usize {
        self.checked_head_size().unwrap_or(usize::MAX)
    }

    /// [`head_size`](Self::head_size), or `None` if it overflows `usize`
    pub fn checked_head_size(&self) -> Option<usize> {
        if self.is_dynamic() {
            return Some(32);
        }
        match self {
            ParamType::FixedArray(inner, size) => inner.checked_head_size()?.checked_mul(*size),
            ParamType::Tuple(types) => types
                .iter()
                .try_fold(0usize, |total, t| total.checked_add(t.checked_head_size()?)),
            _ => Some(32),
        }
    }

    /// Canonical form used in signatures, e.g. `(uint32,address)[]`
    pub fn canonical(&self) -> String {
        match self {
            ParamType::Address => "address".to_string(),
            ParamType::Uint(bits) => format!("uint{}", bits),
            ParamType::Int(bits) => format!("int{}", bits),
            ParamType::Bool => "bool".to_string(),
            ParamType::Bytes => "bytes".to_string(),
            ParamType::FixedBytes(size) => format!("bytes{}", size),
            ParamType::String => "string".to_string(),
            ParamType::Array(inner) => format!("{}[]", inner.canonical()),
            ParamType::FixedArray(inner, size) => format!("{}[{}]", inner.canonical(), size),
            ParamType::Tuple(types) => {
                let inner: Vec<String> = types.iter().map(ParamType::canonical).collect();
                format!("({})", inner.join(","))
            }
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl Token {
    /// Create a bytes32 token
    pub fn bytes32(data: H256) -> Self {
        Token::FixedBytes(data.as_bytes().to_vec())
    }

    /// Short name of the token's shape, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Token::Address(_) => "address",
            Token::Uint(_) => "uint",
            Token::Int(_) => "int",
            Token::Bool(_) => "bool",
            Token::Bytes(_) => "bytes",
            Token::FixedBytes(_) => "fixed bytes",
            Token::String(_) => "string",
            Token::Array(_) => "array",
            Token::FixedArray(_) => "fixed array",
            Token::Tuple(_) => "tuple",
        }
    }

    /// Address value
    pub fn into_address(self) -> Option<Address> {
        match self {
            Token::Address(a) => Some(a),
            _ => None,
        }
    }

    /// Unsigned integer value
    pub fn into_uint(self) -> Option<U256> {
        match self {
            Token::Uint(v) => Some(v),
            _ => None,
        }
    }

    /// Bool value
    pub fn into_bool(self) -> Option<bool> {
        match self {
            Token::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Tuple members
    pub fn into_tuple(self) -> Option<Vec<Token>> {
        match self {
            Token::Tuple(t) => Some(t),
            _ => None,
        }
    }

    /// Elements of either array kind
    pub fn into_array(self) -> Option<Vec<Token>> {
        match self {
            Token::Array(t) | Token::FixedArray(t) => Some(t),
            _ => None,
        }
    }
}

//! Conversions between Rust values and ABI tokens

use bind_primitives::{Address, H256, U256};
use bytes::Bytes;

use super::types::{Token, I256};
use crate::SdkError;

/// A Rust value with a single-token ABI representation
pub trait Tokenizable: Sized {
    /// Convert from a token, failing on a shape or range mismatch
    fn from_token(token: Token) -> Result<Self, SdkError>;
    /// Convert into a token
    fn into_token(self) -> Token;
}

/// An argument list
pub trait Tokenize {
    /// Flatten into one token per argument
    fn into_tokens(self) -> Vec<Token>;
}

/// A typed view of a decoded output list.
///
/// A single output converts directly; several outputs convert as a tuple
/// (or a struct implementing `Tokenizable` over a tuple).
pub trait Detokenize: Sized {
    /// Convert decoded output tokens
    fn from_tokens(tokens: Vec<Token>) -> Result<Self, SdkError>;
}

impl<T: Tokenizable> Detokenize for T {
    fn from_tokens(mut tokens: Vec<Token>) -> Result<Self, SdkError> {
        let token = if tokens.len() == 1 {
            tokens.remove(0)
        } else {
            Token::Tuple(tokens)
        };
        T::from_token(token)
    }
}

fn mismatch(expected: &str, got: &Token) -> SdkError {
    SdkError::AbiDecode(format!("Expected {}, got {}", expected, got.kind()))
}

/// Positional reader over tuple members, used to build structs
pub struct TupleFields {
    fields: std::vec::IntoIter<Token>,
}

impl TupleFields {
    /// Open a tuple token, requiring exactly `len` members
    pub fn new(token: Token, len: usize) -> Result<Self, SdkError> {
        match token {
            Token::Tuple(fields) => Self::from_vec(fields, len),
            other => Err(mismatch("tuple", &other)),
        }
    }

    /// Read from a flat token list, requiring exactly `len` entries
    pub fn from_vec(fields: Vec<Token>, len: usize) -> Result<Self, SdkError> {
        if fields.len() != len {
            return Err(SdkError::AbiDecode(format!(
                "Expected {} members, got {}",
                len,
                fields.len()
            )));
        }
        Ok(Self {
            fields: fields.into_iter(),
        })
    }

    /// Next member converted to `T`
    #[allow(clippy::should_implement_trait)]
    pub fn next<T: Tokenizable>(&mut self) -> Result<T, SdkError> {
        let token = self
            .fields
            .next()
            .ok_or_else(|| SdkError::AbiDecode("Tuple exhausted".to_string()))?;
        T::from_token(token)
    }
}

impl Tokenizable for Address {
    fn from_token(token: Token) -> Result<Self, SdkError> {
        match token {
            Token::Address(a) => Ok(a),
            other => Err(mismatch("address", &other)),
        }
    }

    fn into_token(self) -> Token {
        Token::Address(self)
    }
}

impl Tokenizable for H256 {
    fn from_token(token: Token) -> Result<Self, SdkError> {
        match token {
            Token::FixedBytes(b) if b.len() == 32 => {
                H256::from_slice(&b).map_err(|e| SdkError::AbiDecode(e.to_string()))
            }
            other => Err(mismatch("bytes32", &other)),
        }
    }

    fn into_token(self) -> Token {
        Token::FixedBytes(self.as_bytes().to_vec())
    }
}

impl Tokenizable for U256 {
    fn from_token(token: Token) -> Result<Self, SdkError> {
        match token {
            Token::Uint(v) => Ok(v),
            other => Err(mismatch("uint", &other)),
        }
    }

    fn into_token(self) -> Token {
        Token::Uint(self)
    }
}

impl Tokenizable for I256 {
    fn from_token(token: Token) -> Result<Self, SdkError> {
        match token {
            Token::Int(v) => Ok(v),
            other => Err(mismatch("int", &other)),
        }
    }

    fn into_token(self) -> Token {
        Token::Int(self)
    }
}

impl Tokenizable for bool {
    fn from_token(token: Token) -> Result<Self, SdkError> {
        match token {
            Token::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }

    fn into_token(self) -> Token {
        Token::Bool(self)
    }
}

macro_rules! impl_uint_tokenizable {
    ($($t:ty),*) => {
        $(
            impl Tokenizable for $t {
                fn from_token(token: Token) -> Result<Self, SdkError> {
                    match token {
                        Token::Uint(v) => {
                            if v > U256::from(<$t>::MAX) {
                                return Err(SdkError::AbiDecode(format!(
                                    "Value {} does not fit in {}",
                                    v,
                                    stringify!($t)
                                )));
                            }
                            Ok(v.as_u128() as $t)
                        }
                        other => Err(mismatch("uint", &other)),
                    }
                }

                fn into_token(self) -> Token {
                    Token::Uint(U256::from(self))
                }
            }
        )*
    };
}

impl_uint_tokenizable!(u8, u16, u32, u64, u128);

impl Tokenizable for String {
    fn from_token(token: Token) -> Result<Self, SdkError> {
        match token {
            Token::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }

    fn into_token(self) -> Token {
        Token::String(self)
    }
}

impl Tokenizable for Bytes {
    fn from_token(token: Token) -> Result<Self, SdkError> {
        match token {
            Token::Bytes(b) => Ok(Bytes::from(b)),
            other => Err(mismatch("bytes", &other)),
        }
    }

    fn into_token(self) -> Token {
        Token::Bytes(self.to_vec())
    }
}

impl<T: Tokenizable> Tokenizable for Vec<T> {
    fn from_token(token: Token) -> Result<Self, SdkError> {
        match token {
            Token::Array(items) => items.into_iter().map(T::from_token).collect(),
            other => Err(mismatch("array", &other)),
        }
    }

    fn into_token(self) -> Token {
        Token::Array(self.into_iter().map(Tokenizable::into_token).collect())
    }
}

impl<T: Tokenizable, const N: usize> Tokenizable for [T; N] {
    fn from_token(token: Token) -> Result<Self, SdkError> {
        match token {
            Token::FixedArray(items) if items.len() == N => {
                let values = items
                    .into_iter()
                    .map(T::from_token)
                    .collect::<Result<Vec<T>, _>>()?;
                values
                    .try_into()
                    .map_err(|_| SdkError::AbiDecode(format!("Expected {} elements", N)))
            }
            other => Err(mismatch("fixed array", &other)),
        }
    }

    fn into_token(self) -> Token {
        Token::FixedArray(self.into_iter().map(Tokenizable::into_token).collect())
    }
}

impl Tokenizable for () {
    fn from_token(token: Token) -> Result<Self, SdkError> {
        match token {
            Token::Tuple(items) if items.is_empty() => Ok(()),
            other => Err(mismatch("empty tuple", &other)),
        }
    }

    fn into_token(self) -> Token {
        Token::Tuple(Vec::new())
    }
}

impl Tokenize for () {
    fn into_tokens(self) -> Vec<Token> {
        Vec::new()
    }
}

impl Tokenize for Vec<Token> {
    fn into_tokens(self) -> Vec<Token> {
        self
    }
}

impl Tokenize for &[Token] {
    fn into_tokens(self) -> Vec<Token> {
        self.to_vec()
    }
}

macro_rules! impl_tuples {
    ($len:expr; $($name:ident),+) => {
        impl<$($name: Tokenizable),+> Tokenizable for ($($name,)+) {
            fn from_token(token: Token) -> Result<Self, SdkError> {
                let mut fields = TupleFields::new(token, $len)?;
                Ok(($(fields.next::<$name>()?,)+))
            }

            #[allow(non_snake_case)]
            fn into_token(self) -> Token {
                let ($($name,)+) = self;
                Token::Tuple(vec![$($name.into_token()),+])
            }
        }

        impl<$($name: Tokenizable),+> Tokenize for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_tokens(self) -> Vec<Token> {
                let ($($name,)+) = self;
                vec![$($name.into_token()),+]
            }
        }
    };
}

impl_tuples!(1; A);
impl_tuples!(2; A, B);
impl_tuples!(3; A, B, C);
impl_tuples!(4; A, B, C, D);
impl_tuples!(5; A, B, C, D, E);
impl_tuples!(6; A, B, C, D, E, F);
impl_tuples!(7; A, B, C, D, E, F, G);
impl_tuples!(8; A, B, C, D, E, F, G, H);
impl_tuples!(9; A, B, C, D, E, F, G, H, I);
impl_tuples!(10; A, B, C, D, E, F, G, H, I, J);
impl_tuples!(11; A, B, C, D, E, F, G, H, I, J, K);
impl_tuples!(12; A, B, C, D, E, F, G, H, I, J, K, L);

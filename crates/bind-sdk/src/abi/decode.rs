//! ABI decoding

use bind_primitives::{Address, U256};

use super::types::{ParamType, Token, I256};
use crate::SdkError;

/// Decode ABI data into tokens of the given types.
///
/// Decoding is strict: offsets and lengths must stay inside `data`, padding
/// must be zero, bools must be 0 or 1 and integers must fit their declared
/// width. Bytes after the last value read are ignored.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, SdkError> {
    decode_sequence(types.iter(), types.len(), data, 0)
}

fn decode_sequence<'a, I>(
    types: I,
    count: usize,
    data: &[u8],
    base: usize,
) -> Result<Vec<Token>, SdkError>
where
    I: Iterator<Item = &'a ParamType>,
{
    let mut tokens = Vec::with_capacity(count);
    let mut cursor = base;

    for param_type in types {
        if param_type.is_dynamic() {
            let offset = read_usize(data, cursor)?;
            let start = base
                .checked_add(offset)
                .ok_or_else(|| SdkError::AbiDecode("Offset overflow".to_string()))?;
            tokens.push(decode_single(param_type, data, start)?);
            cursor += 32;
        } else {
            tokens.push(decode_single(param_type, data, cursor)?);
            cursor += param_type.head_size();
        }
    }

    Ok(tokens)
}

fn decode_single(param_type: &ParamType, data: &[u8], at: usize) -> Result<Token, SdkError> {
    match param_type {
        ParamType::Address => {
            let word = read_word(data, at)?;
            if word[..12].iter().any(|b| *b != 0) {
                return Err(SdkError::AbiDecode("Address word has dirty high bytes".to_string()));
            }
            let addr = Address::from_slice(&word[12..])
                .map_err(|e| SdkError::AbiDecode(e.to_string()))?;
            Ok(Token::Address(addr))
        }
        ParamType::Uint(bits) => {
            let value = U256::from_big_endian(read_word(data, at)?);
            if *bits < 256 && !(value >> *bits).is_zero() {
                return Err(SdkError::AbiDecode(format!("Value out of range for uint{}", bits)));
            }
            Ok(Token::Uint(value))
        }
        ParamType::Int(bits) => {
            let value = I256::from_raw(U256::from_big_endian(read_word(data, at)?));
            if !value.fits(*bits) {
                return Err(SdkError::AbiDecode(format!("Value out of range for int{}", bits)));
            }
            Ok(Token::Int(value))
        }
        ParamType::Bool => {
            let word = read_word(data, at)?;
            if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
                return Err(SdkError::AbiDecode("Invalid bool word".to_string()));
            }
            Ok(Token::Bool(word[31] == 1))
        }
        ParamType::FixedBytes(size) => {
            let word = read_word(data, at)?;
            if *size > 32 || word[*size..].iter().any(|b| *b != 0) {
                return Err(SdkError::AbiDecode(format!("Invalid bytes{} padding", size)));
            }
            Ok(Token::FixedBytes(word[..*size].to_vec()))
        }
        ParamType::Bytes => Ok(Token::Bytes(read_dynamic_bytes(data, at)?.to_vec())),
        ParamType::String => {
            let bytes = read_dynamic_bytes(data, at)?;
            let s = String::from_utf8(bytes.to_vec())
                .map_err(|e| SdkError::AbiDecode(format!("Invalid UTF-8: {}", e)))?;
            Ok(Token::String(s))
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, at)?;
            // every element needs at least one head word
            let remaining = data.len().saturating_sub(at + 32);
            if len > remaining / 32 {
                return Err(SdkError::AbiDecode(format!(
                    "Array length {} exceeds available data",
                    len
                )));
            }
            let tokens =
                decode_sequence(std::iter::repeat(&**inner).take(len), len, data, at + 32)?;
            Ok(Token::Array(tokens))
        }
        ParamType::FixedArray(inner, size) => {
            // static elements sit inline, dynamic ones need an offset word each
            let element = if inner.is_dynamic() { Some(32) } else { inner.checked_head_size() };
            let needed = element.and_then(|e| e.checked_mul(*size));
            match needed {
                Some(needed) if needed <= data.len().saturating_sub(at) => {}
                _ => {
                    return Err(SdkError::AbiDecode(format!(
                        "{} exceeds available data",
                        param_type
                    )));
                }
            }
            let tokens = decode_sequence(std::iter::repeat(&**inner).take(*size), *size, data, at)?;
            Ok(Token::FixedArray(tokens))
        }
        ParamType::Tuple(types) => {
            let tokens = decode_sequence(types.iter(), types.len(), data, at)?;
            Ok(Token::Tuple(tokens))
        }
    }
}

fn read_word(data: &[u8], at: usize) -> Result<&[u8], SdkError> {
    let end = at
        .checked_add(32)
        .ok_or_else(|| SdkError::AbiDecode("Offset overflow".to_string()))?;
    data.get(at..end).ok_or_else(|| {
        SdkError::AbiDecode(format!(
            "Data too short: need {} bytes, have {}",
            end,
            data.len()
        ))
    })
}

/// Read a word used as an offset or length; it must index into `data`
fn read_usize(data: &[u8], at: usize) -> Result<usize, SdkError> {
    let value = U256::from_big_endian(read_word(data, at)?);
    if value > U256::from(data.len()) {
        return Err(SdkError::AbiDecode(format!(
            "Offset or length {} out of bounds ({} bytes)",
            value,
            data.len()
        )));
    }
    Ok(value.low_u64() as usize)
}

fn read_dynamic_bytes(data: &[u8], at: usize) -> Result<&[u8], SdkError> {
    let len = read_usize(data, at)?;
    let start = at + 32;
    let end = start
        .checked_add(len)
        .ok_or_else(|| SdkError::AbiDecode("Length overflow".to_string()))?;
    data.get(start..end).ok_or_else(|| {
        SdkError::AbiDecode(format!(
            "Dynamic value of {} bytes runs past end of data",
            len
        ))
    })
}

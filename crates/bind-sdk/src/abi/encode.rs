//! ABI encoding

use bind_crypto::keccak256;
use bind_primitives::{H256, U256};

use super::types::{ParamType, Token};
use crate::SdkError;

/// Encode tokens against their declared types (head/tail layout).
///
/// Every token is checked against its type first: arity, shape, integer
/// range, `bytesN` length and fixed-array length. Nothing is padded or
/// truncated silently.
pub fn encode(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, SdkError> {
    if types.len() != tokens.len() {
        return Err(SdkError::AbiEncode(format!(
            "Expected {} arguments, got {}",
            types.len(),
            tokens.len()
        )));
    }
    let mut out = Vec::new();
    encode_sequence(types.iter(), tokens, &mut out)?;
    Ok(out)
}

/// Encode function call (selector + params)
pub fn encode_function_call(
    selector: [u8; 4],
    types: &[ParamType],
    tokens: &[Token],
) -> Result<Vec<u8>, SdkError> {
    let mut result = selector.to_vec();
    result.extend(encode(types, tokens)?);
    Ok(result)
}

fn encode_sequence<'a, I>(types: I, tokens: &[Token], out: &mut Vec<u8>) -> Result<(), SdkError>
where
    I: Iterator<Item = &'a ParamType> + Clone,
{
    let head_size: usize = types.clone().map(ParamType::head_size).sum();

    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for (param_type, token) in types.zip(tokens.iter()) {
        if param_type.is_dynamic() {
            head.extend_from_slice(&usize_word(head_size + tail.len()));
            encode_single(param_type, token, &mut tail)?;
        } else {
            encode_single(param_type, token, &mut head)?;
        }
    }

    out.extend(head);
    out.extend(tail);
    Ok(())
}

fn encode_single(param_type: &ParamType, token: &Token, out: &mut Vec<u8>) -> Result<(), SdkError> {
    match (param_type, token) {
        (ParamType::Address, Token::Address(addr)) => {
            out.extend_from_slice(&addr.to_word());
        }
        (ParamType::Uint(bits), Token::Uint(value)) => {
            if *bits < 256 && !(*value >> *bits).is_zero() {
                return Err(SdkError::AbiEncode(format!(
                    "Value {} does not fit in uint{}",
                    value, bits
                )));
            }
            out.extend_from_slice(&u256_word(value));
        }
        (ParamType::Int(bits), Token::Int(value)) => {
            if !value.fits(*bits) {
                return Err(SdkError::AbiEncode(format!(
                    "Value does not fit in int{}",
                    bits
                )));
            }
            out.extend_from_slice(&u256_word(&value.into_raw()));
        }
        (ParamType::Bool, Token::Bool(b)) => {
            let mut word = [0u8; 32];
            word[31] = u8::from(*b);
            out.extend_from_slice(&word);
        }
        (ParamType::FixedBytes(size), Token::FixedBytes(data)) => {
            if data.len() != *size {
                return Err(SdkError::AbiEncode(format!(
                    "bytes{} expects {} bytes, got {}",
                    size,
                    size,
                    data.len()
                )));
            }
            let mut word = [0u8; 32];
            word[..data.len()].copy_from_slice(data);
            out.extend_from_slice(&word);
        }
        (ParamType::Bytes, Token::Bytes(data)) => encode_bytes(data, out),
        (ParamType::String, Token::String(s)) => encode_bytes(s.as_bytes(), out),
        (ParamType::Array(inner), Token::Array(tokens)) => {
            out.extend_from_slice(&usize_word(tokens.len()));
            encode_sequence(std::iter::repeat(&**inner).take(tokens.len()), tokens, out)?;
        }
        (ParamType::FixedArray(inner, size), Token::FixedArray(tokens)) => {
            if tokens.len() != *size {
                return Err(SdkError::AbiEncode(format!(
                    "{} expects {} elements, got {}",
                    param_type,
                    size,
                    tokens.len()
                )));
            }
            encode_sequence(std::iter::repeat(&**inner).take(*size), tokens, out)?;
        }
        (ParamType::Tuple(types), Token::Tuple(tokens)) => {
            if tokens.len() != types.len() {
                return Err(SdkError::AbiEncode(format!(
                    "{} expects {} members, got {}",
                    param_type,
                    types.len(),
                    tokens.len()
                )));
            }
            encode_sequence(types.iter(), tokens, out)?;
        }
        (expected, got) => {
            return Err(SdkError::AbiEncode(format!(
                "Type mismatch: expected {}, got {}",
                expected,
                got.kind()
            )));
        }
    }
    Ok(())
}

/// Topic value for an indexed event argument.
///
/// Static values are their 32-byte word. `string`/`bytes` hash their raw
/// content and arrays/tuples hash the padded in-place encoding of their
/// elements.
pub fn encode_topic(param_type: &ParamType, token: &Token) -> Result<H256, SdkError> {
    let composite = matches!(param_type, ParamType::FixedArray(..) | ParamType::Tuple(_));
    if !param_type.is_dynamic() && !composite {
        let mut word = Vec::with_capacity(32);
        encode_single(param_type, token, &mut word)?;
        return H256::from_slice(&word).map_err(|e| SdkError::AbiEncode(e.to_string()));
    }
    let mut packed = Vec::new();
    match (param_type, token) {
        (ParamType::String, Token::String(s)) => packed.extend_from_slice(s.as_bytes()),
        (ParamType::Bytes, Token::Bytes(b)) => packed.extend_from_slice(b),
        _ => encode_in_place(param_type, token, &mut packed)?,
    }
    Ok(keccak256(&packed))
}

fn encode_in_place(
    param_type: &ParamType,
    token: &Token,
    out: &mut Vec<u8>,
) -> Result<(), SdkError> {
    match (param_type, token) {
        (ParamType::String, Token::String(s)) => pad_into(s.as_bytes(), out),
        (ParamType::Bytes, Token::Bytes(b)) => pad_into(b, out),
        (ParamType::Array(inner), Token::Array(items))
        | (ParamType::FixedArray(inner, _), Token::FixedArray(items)) => {
            if let ParamType::FixedArray(_, size) = param_type {
                if items.len() != *size {
                    return Err(SdkError::AbiEncode(format!(
                        "{} expects {} elements, got {}",
                        param_type,
                        size,
                        items.len()
                    )));
                }
            }
            for item in items {
                encode_in_place(inner, item, out)?;
            }
        }
        (ParamType::Tuple(types), Token::Tuple(items)) => {
            if types.len() != items.len() {
                return Err(SdkError::AbiEncode(format!(
                    "{} expects {} members, got {}",
                    param_type,
                    types.len(),
                    items.len()
                )));
            }
            for (t, item) in types.iter().zip(items) {
                encode_in_place(t, item, out)?;
            }
        }
        _ => encode_single(param_type, token, out)?,
    }
    Ok(())
}

pub(crate) fn u256_word(value: &U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes
}

fn usize_word(value: usize) -> [u8; 32] {
    u256_word(&U256::from(value))
}

fn encode_bytes(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&usize_word(data.len()));
    pad_into(data, out);
}

fn pad_into(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(data);
    let rem = data.len() % 32;
    if rem != 0 {
        out.extend(std::iter::repeat(0u8).take(32 - rem));
    }
}

//! Named parameters and Solidity type-string parsing

use serde::Deserialize;

use super::types::ParamType;
use crate::SdkError;

/// Function, constructor or error parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name (may be empty)
    pub name: String,
    /// Parameter type
    pub kind: ParamType,
    /// Solidity-level type name, e.g. `struct KeeperRegistryBase2_0.State`
    pub internal_type: Option<String>,
    /// Named members when `kind` is (an array of) a tuple
    pub components: Vec<Param>,
}

/// Event parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub kind: ParamType,
    /// Stored in a topic rather than the data section
    pub indexed: bool,
}

/// Parameter as it appears in ABI JSON
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, rename = "internalType")]
    pub internal_type: Option<String>,
    #[serde(default)]
    pub components: Vec<RawParam>,
    #[serde(default)]
    pub indexed: bool,
}

impl RawParam {
    pub(crate) fn into_param(self) -> Result<Param, SdkError> {
        let components = self
            .components
            .into_iter()
            .map(RawParam::into_param)
            .collect::<Result<Vec<_>, _>>()?;
        let kind = parse_type(&self.kind, &components)?;
        Ok(Param {
            name: self.name,
            kind,
            internal_type: self.internal_type,
            components,
        })
    }

    pub(crate) fn into_event_param(self) -> Result<EventParam, SdkError> {
        let indexed = self.indexed;
        let param = self.into_param()?;
        Ok(EventParam {
            name: param.name,
            kind: param.kind,
            indexed,
        })
    }
}

/// Parse a Solidity type string.
///
/// `tuple` types take their members from `components`; array suffixes are
/// applied right to left, so `uint256[2][]` is a dynamic array of
/// `uint256[2]`.
pub fn parse_type(s: &str, components: &[Param]) -> Result<ParamType, SdkError> {
    let s = s.trim();

    if let Some(stripped) = s.strip_suffix(']') {
        let open = stripped
            .rfind('[')
            .ok_or_else(|| SdkError::Construction(format!("Unbalanced array type: {}", s)))?;
        let inner = parse_type(&stripped[..open], components)?;
        let size = &stripped[open + 1..];
        if size.is_empty() {
            return Ok(ParamType::Array(Box::new(inner)));
        }
        let size: usize = size
            .parse()
            .map_err(|_| SdkError::Construction(format!("Invalid array size in {}", s)))?;
        if size == 0 {
            return Err(SdkError::Construction(format!("Zero-length array type: {}", s)));
        }
        let array = ParamType::FixedArray(Box::new(inner), size);
        if array.checked_head_size().is_none() {
            return Err(SdkError::Construction(format!("Array type too large: {}", s)));
        }
        return Ok(array);
    }

    match s {
        "address" => return Ok(ParamType::Address),
        "bool" => return Ok(ParamType::Bool),
        "string" => return Ok(ParamType::String),
        "bytes" => return Ok(ParamType::Bytes),
        "tuple" => {
            if components.is_empty() {
                return Err(SdkError::Construction("tuple without components".to_string()));
            }
            return Ok(ParamType::Tuple(components.iter().map(|c| c.kind.clone()).collect()));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("uint") {
        return Ok(ParamType::Uint(parse_int_bits(rest, s)?));
    }
    if let Some(rest) = s.strip_prefix("int") {
        return Ok(ParamType::Int(parse_int_bits(rest, s)?));
    }
    if let Some(rest) = s.strip_prefix("bytes") {
        let size: usize = rest
            .parse()
            .map_err(|_| SdkError::Construction(format!("Invalid bytes size: {}", s)))?;
        if !(1..=32).contains(&size) {
            return Err(SdkError::Construction(format!("Invalid bytes size: {}", s)));
        }
        return Ok(ParamType::FixedBytes(size));
    }

    Err(SdkError::Construction(format!("Unsupported type: {}", s)))
}

fn parse_int_bits(rest: &str, full: &str) -> Result<usize, SdkError> {
    if rest.is_empty() {
        return Ok(256);
    }
    let bits: usize = rest
        .parse()
        .map_err(|_| SdkError::Construction(format!("Invalid integer size: {}", full)))?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(SdkError::Construction(format!("Invalid integer size: {}", full)));
    }
    Ok(bits)
}

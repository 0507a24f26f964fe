//! ABI registry: parsed functions, events, errors and constructor

use std::collections::HashMap;
use std::sync::Arc;

use bind_crypto::{event_topic, selector};
use bind_primitives::H256;
use bytes::Bytes;
use serde::Deserialize;

use super::decode::decode;
use super::encode::{encode, encode_topic};
use super::param::{EventParam, Param, RawParam};
use super::types::{ParamType, Token};
use crate::types::Log;
use crate::SdkError;

/// Function state mutability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    /// Reads no state
    Pure,
    /// Reads but does not modify state
    View,
    /// Modifies state, rejects value
    #[default]
    Nonpayable,
    /// Modifies state, accepts value
    Payable,
}

/// Contract function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Inputs in declaration order
    pub inputs: Vec<Param>,
    /// Outputs in declaration order
    pub outputs: Vec<Param>,
    /// State mutability
    pub state_mutability: StateMutability,
    signature: String,
    selector: [u8; 4],
}

impl Function {
    /// Build a function, deriving its signature and selector
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<Param>,
        outputs: Vec<Param>,
        state_mutability: StateMutability,
    ) -> Self {
        let name = name.into();
        let signature = signature_of(&name, inputs.iter().map(|p| &p.kind));
        let selector = selector(&signature);
        Self {
            name,
            inputs,
            outputs,
            state_mutability,
            signature,
            selector,
        }
    }

    /// Canonical signature, e.g. `addFunds(uint256,uint96)`
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// 4-byte selector
    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }

    /// Input types
    pub fn input_types(&self) -> Vec<ParamType> {
        self.inputs.iter().map(|p| p.kind.clone()).collect()
    }

    /// Output types
    pub fn output_types(&self) -> Vec<ParamType> {
        self.outputs.iter().map(|p| p.kind.clone()).collect()
    }

    /// `view` or `pure`
    pub fn is_constant(&self) -> bool {
        matches!(self.state_mutability, StateMutability::View | StateMutability::Pure)
    }

    /// Selector followed by the encoded arguments
    pub fn encode_input(&self, args: &[Token]) -> Result<Bytes, SdkError> {
        if args.len() != self.inputs.len() {
            return Err(SdkError::AbiEncode(format!(
                "{} expects {} arguments, got {}",
                self.signature,
                self.inputs.len(),
                args.len()
            )));
        }
        let mut data = self.selector.to_vec();
        data.extend(encode(&self.input_types(), args)?);
        Ok(Bytes::from(data))
    }

    /// Decode return data into output tokens, in declaration order
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>, SdkError> {
        decode(&self.output_types(), data)
    }

    /// Decode calldata (selector included) into input tokens
    pub fn decode_input(&self, data: &[u8]) -> Result<Vec<Token>, SdkError> {
        if data.len() < 4 || data[..4] != self.selector {
            return Err(SdkError::AbiDecode(format!(
                "Calldata does not start with selector of {}",
                self.signature
            )));
        }
        decode(&self.input_types(), &data[4..])
    }
}

/// Contract event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event name
    pub name: String,
    /// Inputs in declaration order
    pub inputs: Vec<EventParam>,
    /// Emitted without topic0
    pub anonymous: bool,
    signature: String,
    topic: H256,
}

impl Event {
    /// Build an event, deriving its signature and topic
    pub fn new(name: impl Into<String>, inputs: Vec<EventParam>, anonymous: bool) -> Self {
        let name = name.into();
        let signature = signature_of(&name, inputs.iter().map(|p| &p.kind));
        let topic = event_topic(&signature);
        Self {
            name,
            inputs,
            anonymous,
            signature,
            topic,
        }
    }

    /// Canonical signature
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// topic0: keccak of the canonical signature
    pub fn topic(&self) -> H256 {
        self.topic
    }

    /// Indexed parameters in declaration order
    pub fn indexed(&self) -> impl Iterator<Item = &EventParam> {
        self.inputs.iter().filter(|p| p.indexed)
    }

    /// Decode a log into tokens ordered as declared
    pub fn decode_log(&self, log: &Log) -> Result<Vec<Token>, SdkError> {
        self.decode_raw(&log.topics, &log.data)
    }

    /// Decode raw topics and data.
    ///
    /// Indexed dynamic values cannot be recovered from a topic and decode as
    /// their 32-byte hash (`Token::FixedBytes`).
    pub fn decode_raw(&self, topics: &[H256], data: &[u8]) -> Result<Vec<Token>, SdkError> {
        let topics = if self.anonymous {
            topics
        } else {
            match topics.split_first() {
                Some((first, rest)) if *first == self.topic => rest,
                Some((first, _)) => {
                    return Err(SdkError::AbiDecode(format!(
                        "topic0 {} does not match {}",
                        first, self.signature
                    )))
                }
                None => return Err(SdkError::AbiDecode("Log has no topics".to_string())),
            }
        };

        let indexed_count = self.indexed().count();
        if topics.len() != indexed_count {
            return Err(SdkError::AbiDecode(format!(
                "{} expects {} indexed topics, got {}",
                self.signature,
                indexed_count,
                topics.len()
            )));
        }

        let data_types: Vec<ParamType> = self
            .inputs
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.kind.clone())
            .collect();
        let mut data_tokens = decode(&data_types, data)?.into_iter();
        let mut topic_iter = topics.iter();

        let mut tokens = Vec::with_capacity(self.inputs.len());
        for param in &self.inputs {
            let token = if param.indexed {
                let topic = topic_iter
                    .next()
                    .ok_or_else(|| SdkError::AbiDecode("Missing topic".to_string()))?;
                decode_topic(&param.kind, topic)?
            } else {
                data_tokens
                    .next()
                    .ok_or_else(|| SdkError::AbiDecode("Missing data value".to_string()))?
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Topic filter dimensions for the indexed arguments.
    ///
    /// `rules[i]` lists the allowed values of the i-th indexed argument;
    /// values are ORed and an empty or missing list is a wildcard. Trailing
    /// wildcards are dropped.
    pub fn encode_topic_rules(
        &self,
        rules: &[Vec<Token>],
    ) -> Result<Vec<Option<Vec<H256>>>, SdkError> {
        let indexed: Vec<&EventParam> = self.indexed().collect();
        if rules.len() > indexed.len() {
            return Err(SdkError::AbiEncode(format!(
                "{} has {} indexed arguments, got {} topic rules",
                self.signature,
                indexed.len(),
                rules.len()
            )));
        }

        let mut out = Vec::with_capacity(rules.len());
        for (param, values) in indexed.iter().zip(rules) {
            if values.is_empty() {
                out.push(None);
                continue;
            }
            let topics = values
                .iter()
                .map(|v| encode_topic(&param.kind, v))
                .collect::<Result<Vec<_>, _>>()?;
            out.push(Some(topics));
        }
        while matches!(out.last(), Some(None)) {
            out.pop();
        }
        Ok(out)
    }
}

fn decode_topic(kind: &ParamType, topic: &H256) -> Result<Token, SdkError> {
    let hashed =
        kind.is_dynamic() || matches!(kind, ParamType::FixedArray(..) | ParamType::Tuple(_));
    if hashed {
        return Ok(Token::FixedBytes(topic.as_bytes().to_vec()));
    }
    let mut tokens = decode(std::slice::from_ref(kind), topic.as_bytes())?;
    tokens
        .pop()
        .ok_or_else(|| SdkError::AbiDecode("Empty topic decode".to_string()))
}

/// Custom error declared by the contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDef {
    /// Error name
    pub name: String,
    /// Error arguments
    pub inputs: Vec<Param>,
    signature: String,
    selector: [u8; 4],
}

impl ErrorDef {
    /// Build an error definition
    pub fn new(name: impl Into<String>, inputs: Vec<Param>) -> Self {
        let name = name.into();
        let signature = signature_of(&name, inputs.iter().map(|p| &p.kind));
        let selector = selector(&signature);
        Self {
            name,
            inputs,
            signature,
            selector,
        }
    }

    /// Canonical signature
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// 4-byte selector
    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }

    /// Decode the arguments following the selector
    pub fn decode_args(&self, data: &[u8]) -> Result<Vec<Token>, SdkError> {
        let types: Vec<ParamType> = self.inputs.iter().map(|p| p.kind.clone()).collect();
        decode(&types, data)
    }
}

/// Contract constructor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Constructor {
    /// Constructor inputs
    pub inputs: Vec<Param>,
}

impl Constructor {
    /// Deployment data: bytecode followed by the encoded arguments
    pub fn encode(&self, bytecode: &[u8], args: &[Token]) -> Result<Bytes, SdkError> {
        if bytecode.is_empty() {
            return Err(SdkError::AbiEncode("Empty bytecode".to_string()));
        }
        let types: Vec<ParamType> = self.inputs.iter().map(|p| p.kind.clone()).collect();
        let mut data = bytecode.to_vec();
        data.extend(encode(&types, args)?);
        Ok(Bytes::from(data))
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawEntry {
    Function {
        name: String,
        #[serde(default)]
        inputs: Vec<RawParam>,
        #[serde(default)]
        outputs: Vec<RawParam>,
        #[serde(default, rename = "stateMutability")]
        state_mutability: StateMutability,
    },
    Event {
        name: String,
        #[serde(default)]
        inputs: Vec<RawParam>,
        #[serde(default)]
        anonymous: bool,
    },
    Error {
        name: String,
        #[serde(default)]
        inputs: Vec<RawParam>,
    },
    Constructor {
        #[serde(default)]
        inputs: Vec<RawParam>,
    },
    Fallback {},
    Receive {},
}

/// Parsed contract ABI
#[derive(Debug, Clone, Default)]
pub struct Abi {
    constructor: Option<Constructor>,
    functions: Vec<Function>,
    function_index: HashMap<String, Vec<usize>>,
    events: Vec<Event>,
    event_index: HashMap<String, Vec<usize>>,
    errors: Vec<ErrorDef>,
    fallback: bool,
    receive: bool,
}

impl Abi {
    /// Parse standard Solidity ABI JSON.
    ///
    /// Any malformed entry fails the whole parse.
    pub fn parse(json: &str) -> Result<Self, SdkError> {
        let entries: Vec<RawEntry> = serde_json::from_str(json)
            .map_err(|e| SdkError::Construction(format!("Malformed ABI JSON: {}", e)))?;

        let mut abi = Abi::default();
        for entry in entries {
            match entry {
                RawEntry::Function {
                    name,
                    inputs,
                    outputs,
                    state_mutability,
                } => {
                    let function = Function::new(
                        name,
                        params(inputs)?,
                        params(outputs)?,
                        state_mutability,
                    );
                    abi.function_index
                        .entry(function.name.clone())
                        .or_default()
                        .push(abi.functions.len());
                    abi.functions.push(function);
                }
                RawEntry::Event {
                    name,
                    inputs,
                    anonymous,
                } => {
                    let inputs = inputs
                        .into_iter()
                        .map(RawParam::into_event_param)
                        .collect::<Result<Vec<_>, _>>()?;
                    let event = Event::new(name, inputs, anonymous);
                    abi.event_index
                        .entry(event.name.clone())
                        .or_default()
                        .push(abi.events.len());
                    abi.events.push(event);
                }
                RawEntry::Error { name, inputs } => {
                    abi.errors.push(ErrorDef::new(name, params(inputs)?));
                }
                RawEntry::Constructor { inputs } => {
                    if abi.constructor.is_some() {
                        return Err(SdkError::Construction("Duplicate constructor".to_string()));
                    }
                    abi.constructor = Some(Constructor {
                        inputs: params(inputs)?,
                    });
                }
                RawEntry::Fallback {} => abi.fallback = true,
                RawEntry::Receive {} => abi.receive = true,
            }
        }
        Ok(abi)
    }

    /// First function with this name
    pub fn resolve_method(&self, name: &str) -> Result<&Function, SdkError> {
        self.function_index
            .get(name)
            .and_then(|idx| idx.first())
            .map(|i| &self.functions[*i])
            .ok_or_else(|| SdkError::unknown_function(name))
    }

    /// Exact overload by canonical signature
    pub fn resolve_overload(&self, name: &str, signature: &str) -> Result<&Function, SdkError> {
        self.function_index
            .get(name)
            .into_iter()
            .flatten()
            .map(|i| &self.functions[*i])
            .find(|f| f.signature == signature)
            .ok_or_else(|| SdkError::unknown_function(signature))
    }

    /// All overloads with this name, in declaration order
    pub fn overloads(&self, name: &str) -> impl Iterator<Item = &Function> {
        self.function_index
            .get(name)
            .into_iter()
            .flatten()
            .map(move |i| &self.functions[*i])
    }

    /// First event with this name
    pub fn resolve_event(&self, name: &str) -> Result<&Event, SdkError> {
        self.event_index
            .get(name)
            .and_then(|idx| idx.first())
            .map(|i| &self.events[*i])
            .ok_or_else(|| SdkError::unknown_event(name))
    }

    /// Function by selector
    pub fn function_by_selector(&self, selector: [u8; 4]) -> Option<&Function> {
        self.functions.iter().find(|f| f.selector == selector)
    }

    /// Non-anonymous event by topic0
    pub fn event_by_topic(&self, topic: &H256) -> Option<&Event> {
        self.events
            .iter()
            .find(|e| !e.anonymous && e.topic == *topic)
    }

    /// Custom error by selector
    pub fn error_by_selector(&self, selector: [u8; 4]) -> Option<&ErrorDef> {
        self.errors.iter().find(|e| e.selector == selector)
    }

    /// Declared constructor
    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    /// Functions in declaration order
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    /// Events in declaration order
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Custom errors in declaration order
    pub fn errors(&self) -> impl Iterator<Item = &ErrorDef> {
        self.errors.iter()
    }

    /// Declares a `fallback` function
    pub fn has_fallback(&self) -> bool {
        self.fallback
    }

    /// Declares a `receive` function
    pub fn has_receive(&self) -> bool {
        self.receive
    }
}

fn params(raw: Vec<RawParam>) -> Result<Vec<Param>, SdkError> {
    raw.into_iter().map(RawParam::into_param).collect()
}

fn signature_of<'a>(name: &str, kinds: impl Iterator<Item = &'a ParamType>) -> String {
    let args: Vec<String> = kinds.map(ParamType::canonical).collect();
    format!("{}({})", name, args.join(","))
}

/// ABI plus deployment bytecode, parsed once and shared by bindings
#[derive(Debug, Clone)]
pub struct ContractMetadata {
    /// Parsed ABI
    pub abi: Arc<Abi>,
    /// Deployment bytecode (may be empty for interface-only metadata)
    pub bytecode: Bytes,
}

impl ContractMetadata {
    /// Parse ABI JSON and hex bytecode
    pub fn new(abi_json: &str, bytecode_hex: &str) -> Result<Self, SdkError> {
        let abi = Abi::parse(abi_json)?;
        let hex_str = bytecode_hex.trim();
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytecode = hex::decode(hex_str)
            .map_err(|e| SdkError::Construction(format!("Malformed bytecode: {}", e)))?;
        Ok(Self {
            abi: Arc::new(abi),
            bytecode: Bytes::from(bytecode),
        })
    }

    /// Metadata without bytecode
    pub fn from_abi(abi_json: &str) -> Result<Self, SdkError> {
        Ok(Self {
            abi: Arc::new(Abi::parse(abi_json)?),
            bytecode: Bytes::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bind_primitives::{Address, U256};

    const ABI: &str = r#"[
        {"type":"constructor","inputs":[{"name":"logic","type":"address"}],"stateMutability":"nonpayable"},
        {"type":"function","name":"getLinkAddress","inputs":[],"outputs":[{"name":"","type":"address"}],"stateMutability":"view"},
        {"type":"function","name":"addFunds","inputs":[{"name":"id","type":"uint256"},{"name":"amount","type":"uint96"}],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"addFunds","inputs":[{"name":"id","type":"uint256"}],"outputs":[],"stateMutability":"payable"},
        {"type":"event","name":"FundsAdded","anonymous":false,"inputs":[
            {"name":"id","type":"uint256","indexed":true},
            {"name":"from","type":"address","indexed":true},
            {"name":"amount","type":"uint96","indexed":false}]},
        {"type":"error","name":"OnlyCallableByOwner","inputs":[]},
        {"type":"fallback","stateMutability":"nonpayable"},
        {"type":"receive","stateMutability":"payable"}
    ]"#;

    #[test]
    fn test_parse_registry() {
        let abi = Abi::parse(ABI).unwrap();
        assert_eq!(abi.functions().count(), 3);
        assert_eq!(abi.events().count(), 1);
        assert_eq!(abi.errors().count(), 1);
        assert!(abi.has_fallback());
        assert!(abi.has_receive());
        assert_eq!(abi.constructor().unwrap().inputs.len(), 1);
    }

    #[test]
    fn test_resolve_unknown() {
        let abi = Abi::parse(ABI).unwrap();
        match abi.resolve_method("nope") {
            Err(SdkError::UnknownSelector { kind: "function", name }) => assert_eq!(name, "nope"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            abi.resolve_event("Nope"),
            Err(SdkError::UnknownSelector { kind: "event", .. })
        ));
    }

    #[test]
    fn test_overloads_keep_declaration_order() {
        let abi = Abi::parse(ABI).unwrap();
        assert_eq!(abi.resolve_method("addFunds").unwrap().signature(), "addFunds(uint256,uint96)");
        let single = abi.resolve_overload("addFunds", "addFunds(uint256)").unwrap();
        assert_eq!(single.state_mutability, StateMutability::Payable);
        assert_eq!(abi.overloads("addFunds").count(), 2);
    }

    #[test]
    fn test_malformed_abi_is_fatal() {
        assert!(matches!(Abi::parse("{"), Err(SdkError::Construction(_))));
        let bad_type = r#"[{"type":"function","name":"f","inputs":[{"name":"x","type":"uint7"}],"outputs":[]}]"#;
        assert!(matches!(Abi::parse(bad_type), Err(SdkError::Construction(_))));
        let missing_name = r#"[{"type":"event","inputs":[]}]"#;
        assert!(Abi::parse(missing_name).is_err());
    }

    #[test]
    fn test_event_topic_and_lookup() {
        let abi = Abi::parse(ABI).unwrap();
        let event = abi.resolve_event("FundsAdded").unwrap();
        assert_eq!(event.signature(), "FundsAdded(uint256,address,uint96)");
        assert_eq!(
            event.topic().to_hex(),
            "0xafd24114486da8ebfc32f3626dada8863652e187461aa74d4bfa734891506203"
        );
        assert_eq!(abi.event_by_topic(&event.topic()).unwrap().name, "FundsAdded");
    }

    #[test]
    fn test_event_decode_raw_merges_in_declaration_order() {
        let abi = Abi::parse(ABI).unwrap();
        let event = abi.resolve_event("FundsAdded").unwrap();
        let from = Address::from_hex("0x00000000000000000000000000000000000000aa").unwrap();

        let mut id_topic = [0u8; 32];
        id_topic[31] = 42;
        let topics = vec![
            event.topic(),
            H256::from_bytes(id_topic),
            H256::from_bytes(from.to_word()),
        ];
        let data = encode(&[ParamType::Uint(96)], &[Token::Uint(U256::from(1000))]).unwrap();

        let tokens = event.decode_raw(&topics, &data).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Uint(U256::from(42)),
                Token::Address(from),
                Token::Uint(U256::from(1000)),
            ]
        );

        // wrong topic count
        assert!(event.decode_raw(&topics[..2], &data).is_err());
        // wrong topic0
        let mut wrong = topics.clone();
        wrong[0] = H256::ZERO;
        assert!(event.decode_raw(&wrong, &data).is_err());
    }

    #[test]
    fn test_topic_rules_trim_trailing_wildcards() {
        let abi = Abi::parse(ABI).unwrap();
        let event = abi.resolve_event("FundsAdded").unwrap();

        let rules = event
            .encode_topic_rules(&[vec![Token::Uint(U256::from(42))], vec![]])
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].as_ref().unwrap()[0].as_bytes()[31], 42);

        let rules = event
            .encode_topic_rules(&[vec![], vec![Token::Address(Address::ZERO)]])
            .unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules[0].is_none());

        // type mismatch fails before any transport use
        assert!(event.encode_topic_rules(&[vec![Token::Bool(true)]]).is_err());
        // too many rules
        assert!(event.encode_topic_rules(&[vec![], vec![], vec![]]).is_err());
    }

    #[test]
    fn test_function_encode_decode_input() {
        let abi = Abi::parse(ABI).unwrap();
        let f = abi.resolve_method("addFunds").unwrap();
        let args = vec![Token::Uint(U256::from(1)), Token::Uint(U256::from(2))];
        let data = f.encode_input(&args).unwrap();
        assert_eq!(&data[..4], &f.selector());
        assert_eq!(data.len(), 68);
        assert_eq!(f.decode_input(&data).unwrap(), args);
        assert!(f.encode_input(&args[..1]).is_err());
    }

    #[test]
    fn test_constructor_encode() {
        let abi = Abi::parse(ABI).unwrap();
        let ctor = abi.constructor().unwrap();
        let data = ctor.encode(&[0x60, 0x80], &[Token::Address(Address::ZERO)]).unwrap();
        assert_eq!(data.len(), 2 + 32);
        assert_eq!(&data[..2], &[0x60, 0x80]);
        assert!(ctor.encode(&[0x60], &[]).is_err());
    }

    #[test]
    fn test_metadata_rejects_bad_bytecode() {
        assert!(ContractMetadata::new(ABI, "0x6080").is_ok());
        assert!(matches!(
            ContractMetadata::new(ABI, "0xzz"),
            Err(SdkError::Construction(_))
        ));
    }
}

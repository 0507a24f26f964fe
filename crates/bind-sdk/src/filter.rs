//! Log filter criteria

use bind_primitives::{Address, H256};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{BlockId, Log};

/// Number of topic positions a log can carry
pub const TOPIC_SLOTS: usize = 4;

/// Log filter as understood by `eth_getLogs` and `eth_newFilter`.
///
/// Position `i` of `topics` constrains topic `i` of a log. `None` matches
/// anything; `Some(values)` matches a log whose topic equals any of `values`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Emitting contract
    pub address: Option<Address>,
    /// Per-position topic rules
    pub topics: [Option<Vec<H256>>; TOPIC_SLOTS],
    /// First block, inclusive
    pub from_block: Option<BlockId>,
    /// Last block, inclusive
    pub to_block: Option<BlockId>,
}

impl Filter {
    /// Empty filter matching every log
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one contract
    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Set the rule for topic position `index`. An empty list is a wildcard.
    pub fn topic(mut self, index: usize, values: Vec<H256>) -> Self {
        if let Some(slot) = self.topics.get_mut(index) {
            *slot = if values.is_empty() { None } else { Some(values) };
        }
        self
    }

    /// First block, inclusive
    pub fn from_block(mut self, block: impl Into<BlockId>) -> Self {
        self.from_block = Some(block.into());
        self
    }

    /// Last block, inclusive
    pub fn to_block(mut self, block: impl Into<BlockId>) -> Self {
        self.to_block = Some(block.into());
        self
    }

    /// Apply the filter to a log locally.
    ///
    /// Block bounds are only checked when both the bound and the log's
    /// block number are concrete numbers.
    pub fn matches(&self, log: &Log) -> bool {
        if let Some(address) = &self.address {
            if &log.address != address {
                return false;
            }
        }

        for (i, rule) in self.topics.iter().enumerate() {
            if let Some(values) = rule {
                match log.topics.get(i) {
                    Some(topic) if values.contains(topic) => {}
                    _ => return false,
                }
            }
        }

        if let Some(number) = log.block_number {
            if let Some(from) = self.from_block.and_then(|b| b.as_number()) {
                if number < from {
                    return false;
                }
            }
            if let Some(to) = self.to_block.and_then(|b| b.as_number()) {
                if number > to {
                    return false;
                }
            }
        }

        true
    }

    /// Topic rules with trailing wildcards removed
    fn trimmed_topics(&self) -> &[Option<Vec<H256>>] {
        let len = self
            .topics
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |i| i + 1);
        &self.topics[..len]
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(from) = &self.from_block {
            map.serialize_entry("fromBlock", from)?;
        }
        if let Some(to) = &self.to_block {
            map.serialize_entry("toBlock", to)?;
        }
        if let Some(address) = &self.address {
            map.serialize_entry("address", address)?;
        }
        let topics = self.trimmed_topics();
        if !topics.is_empty() {
            map.serialize_entry("topics", topics)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFilter {
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    topics: Vec<Value>,
    #[serde(default)]
    from_block: Option<BlockId>,
    #[serde(default)]
    to_block: Option<BlockId>,
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawFilter::deserialize(deserializer)?;
        if raw.topics.len() > TOPIC_SLOTS {
            return Err(de::Error::custom("too many topic positions"));
        }

        let mut topics: [Option<Vec<H256>>; TOPIC_SLOTS] = Default::default();
        for (slot, value) in topics.iter_mut().zip(raw.topics) {
            *slot = match value {
                Value::Null => None,
                Value::String(s) => Some(vec![H256::from_hex(&s).map_err(de::Error::custom)?]),
                Value::Array(items) => {
                    let values = items
                        .into_iter()
                        .map(|item| serde_json::from_value::<H256>(item).map_err(de::Error::custom))
                        .collect::<Result<Vec<_>, _>>()?;
                    Some(values)
                }
                other => return Err(de::Error::custom(format!("invalid topic rule: {}", other))),
            };
        }

        Ok(Filter {
            address: raw.address,
            topics,
            from_block: raw.from_block,
            to_block: raw.to_block,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn topic(n: u8) -> H256 {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        H256::from_bytes(bytes)
    }

    fn log(topics: Vec<H256>, block: Option<u64>) -> Log {
        Log {
            address: Address::from_bytes([0xaa; 20]),
            topics,
            block_number: block,
            ..Default::default()
        }
    }

    #[test]
    fn test_serialize_trims_trailing_wildcards() {
        let filter = Filter::new()
            .address(Address::from_bytes([0xaa; 20]))
            .topic(0, vec![topic(1)])
            .topic(1, vec![])
            .from_block(5u64);
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["fromBlock"], "0x5");
        assert_eq!(json["topics"], json!([[format!("{}", topic(1))]]));
        assert!(json.get("toBlock").is_none());
    }

    #[test]
    fn test_serialize_keeps_inner_wildcards() {
        let filter = Filter::new().topic(0, vec![topic(1)]).topic(2, vec![topic(3)]);
        let json = serde_json::to_value(&filter).unwrap();
        let topics = json["topics"].as_array().unwrap();
        assert_eq!(topics.len(), 3);
        assert!(topics[1].is_null());
    }

    #[test]
    fn test_deserialize_single_and_list_rules() {
        let filter: Filter = serde_json::from_value(json!({
            "address": "0x00000000000000000000000000000000000000aa",
            "topics": [
                format!("{}", topic(1)),
                null,
                [format!("{}", topic(2)), format!("{}", topic(3))]
            ],
            "fromBlock": "0x1",
            "toBlock": "latest"
        }))
        .unwrap();
        assert_eq!(filter.topics[0], Some(vec![topic(1)]));
        assert_eq!(filter.topics[1], None);
        assert_eq!(filter.topics[2], Some(vec![topic(2), topic(3)]));
        assert_eq!(filter.to_block, Some(BlockId::Latest));
    }

    #[test]
    fn test_matches_or_within_position() {
        let filter = Filter::new().topic(1, vec![topic(7), topic(8)]);
        assert!(filter.matches(&log(vec![topic(0), topic(7)], None)));
        assert!(filter.matches(&log(vec![topic(0), topic(8)], None)));
        assert!(!filter.matches(&log(vec![topic(0), topic(9)], None)));
        assert!(!filter.matches(&log(vec![topic(0)], None)));
    }

    #[test]
    fn test_matches_address_and_blocks() {
        let filter = Filter::new()
            .address(Address::from_bytes([0xaa; 20]))
            .from_block(10u64)
            .to_block(20u64);
        assert!(filter.matches(&log(vec![], Some(10))));
        assert!(filter.matches(&log(vec![], Some(20))));
        assert!(!filter.matches(&log(vec![], Some(21))));
        assert!(!filter.matches(&log(vec![], Some(9))));

        let other = Log {
            address: Address::from_bytes([0xbb; 20]),
            ..log(vec![], Some(15))
        };
        assert!(!filter.matches(&other));
    }
}

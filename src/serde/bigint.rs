//! Tagged bigint (de)serialization.
//!
//! Signed token deltas are persisted as `{"__type": "bigint", "value": "<decimal>"}` objects so
//! readers never mistake them for plain JSON numbers, which lose precision past 2^53.

use alloy::primitives::I256;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};

const TAG: &str = "bigint";

#[derive(Serialize, Deserialize)]
struct TaggedBigint {
    #[serde(rename = "__type")]
    ty: String,
    value: String,
}

impl From<&I256> for TaggedBigint {
    fn from(value: &I256) -> Self {
        Self { ty: TAG.into(), value: value.to_string() }
    }
}

impl TaggedBigint {
    fn into_i256<E: Error>(self) -> Result<I256, E> {
        if self.ty != TAG {
            return Err(E::custom(format!("expected `__type` to be `{TAG}`, got `{}`", self.ty)));
        }
        I256::from_dec_str(&self.value).map_err(E::custom)
    }
}

/// Serializes an [`I256`] as a tagged bigint object.
pub fn serialize<S: Serializer>(value: &I256, serializer: S) -> Result<S::Ok, S::Error> {
    TaggedBigint::from(value).serialize(serializer)
}

/// Deserializes an [`I256`] from a tagged bigint object.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<I256, D::Error> {
    TaggedBigint::deserialize(deserializer)?.into_i256()
}

/// (De)serialization of maps with tagged bigint values.
///
/// Keys go through their own [`Serialize`]/[`Deserialize`] impls.
pub mod map {
    use super::TaggedBigint;
    use alloy::primitives::I256;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    /// Serializes a map with tagged bigint values.
    pub fn serialize<K, S>(map: &BTreeMap<K, I256>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize + Ord,
        S: Serializer,
    {
        serializer.collect_map(map.iter().map(|(key, value)| (key, TaggedBigint::from(value))))
    }

    /// Deserializes a map with tagged bigint values.
    pub fn deserialize<'de, K, D>(deserializer: D) -> Result<BTreeMap<K, I256>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        D: Deserializer<'de>,
    {
        BTreeMap::<K, TaggedBigint>::deserialize(deserializer)?
            .into_iter()
            .map(|(key, value)| Ok((key, value.into_i256()?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::I256;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Delta {
        #[serde(with = "super")]
        value: I256,
    }

    #[test]
    fn tagged_roundtrip() {
        let delta = Delta { value: I256::try_from(-1_000_000_000_000_000_000i128).unwrap() };
        let json = serde_json::to_string(&delta).unwrap();
        assert_eq!(json, r#"{"value":{"__type":"bigint","value":"-1000000000000000000"}}"#);
        assert_eq!(serde_json::from_str::<Delta>(&json).unwrap(), delta);
    }

    #[test]
    fn rejects_wrong_tag() {
        let json = r#"{"value":{"__type":"number","value":"1"}}"#;
        assert!(serde_json::from_str::<Delta>(json).is_err());
    }

    #[test]
    fn rejects_non_decimal_value() {
        let json = r#"{"value":{"__type":"bigint","value":"0x10"}}"#;
        assert!(serde_json::from_str::<Delta>(json).is_err());
    }
}

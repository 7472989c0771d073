//! Serde helpers for `u128` amounts.
//!
//! JSON numbers lose precision past 2^53 in most clients and TOML integers
//! stop at `i64::MAX`, so amounts go out as decimal strings. Either a string
//! or a non-negative integer is accepted on the way in.
//!
//! ```
//! #[derive(serde::Serialize, serde::Deserialize)]
//! struct Payout {
//!     #[serde(with = "escrow_protocol::amount")]
//!     value: u128,
//! }
//!
//! let json = serde_json::to_string(&Payout { value: u128::MAX }).unwrap();
//! assert_eq!(json, r#"{"value":"340282366920938463463374607431768211455"}"#);
//! ```

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    deserializer.deserialize_any(AmountVisitor)
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = u128;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer or decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
        Ok(v as u128)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
        u128::try_from(v).map_err(|_| E::custom("amount must not be negative"))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
        Ok(v)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
        v.trim()
            .parse()
            .map_err(|_| E::custom(format!("invalid amount: {}", v)))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Wrapped(#[serde(with = "super")] u128);

    #[test]
    fn serializes_as_decimal_string() {
        assert_eq!(serde_json::to_string(&Wrapped(0)).unwrap(), "\"0\"");
        assert_eq!(
            serde_json::to_string(&Wrapped(1_000_000_000_000_000_000_000)).unwrap(),
            "\"1000000000000000000000\""
        );
    }

    #[test]
    fn accepts_strings_and_integers() {
        let from_str: Wrapped = serde_json::from_str("\" 42 \"").unwrap();
        let from_num: Wrapped = serde_json::from_str("42").unwrap();
        assert_eq!(from_str, Wrapped(42));
        assert_eq!(from_num, Wrapped(42));
    }

    #[test]
    fn rejects_negative_and_garbage() {
        assert!(serde_json::from_str::<Wrapped>("-1").is_err());
        assert!(serde_json::from_str::<Wrapped>("\"12a\"").is_err());
        assert!(serde_json::from_str::<Wrapped>("1.5").is_err());
    }
}

use num_bigint_dig::BigUint;
use serde::{de, Deserialize, Deserializer, Serializer};

/// Serialize big integers as decimal strings, for use in `#[serde(with)]`.
///
/// Clients encrypting in a browser receive key material in this form, so it must
/// not depend on the digit size of the big-integer backend.
pub mod biguint_decimal {
    use super::*;

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_decimal(&s).map_err(de::Error::custom)
    }
}

/// Same as `biguint_decimal`, for vectors of big integers.
pub mod biguint_decimal_vec {
    use super::*;
    use serde::ser::SerializeSeq;

    pub fn serialize<S>(values: &[BigUint], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&value.to_str_radix(10))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<BigUint>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .iter()
            .map(|s| parse_decimal(s).map_err(de::Error::custom))
            .collect()
    }
}

fn parse_decimal(s: &str) -> Result<BigUint, String> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid decimal integer: {:?}", s));
    }
    BigUint::parse_bytes(s.as_bytes(), 10).ok_or_else(|| format!("invalid decimal integer: {:?}", s))
}

// Serde helper modules for custom serialization/deserialization
//
// This module provides shared serialization utilities used across the crate.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serializer};

/// Module for serializing optional binary payloads as base64 strings
/// Use with #[serde(default, with = "crate::utils::optional_base64")]
pub mod optional_base64 {
    use super::*;

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_some(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Module for serializing a `Duration` as whole seconds
/// Use with #[serde(with = "crate::utils::duration_secs")]
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds_opt = Option::<u64>::deserialize(deserializer)?;
        Ok(seconds_opt.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct TestStruct {
        #[serde(default, with = "optional_base64", skip_serializing_if = "Option::is_none")]
        payload: Option<Vec<u8>>,
        #[serde(default, with = "duration_secs")]
        timeout: Option<Duration>,
    }

    #[test]
    fn test_base64_payload_decodes_from_wire() {
        let parsed: TestStruct =
            serde_json::from_str(r#"{"payload": "aGVsbG8=", "timeout": 30}"#).unwrap();

        assert_eq!(parsed.payload.as_deref(), Some(&b"hello"[..]));
        assert_eq!(parsed.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_fields_default_to_none() {
        let parsed: TestStruct = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.payload, None);
        assert_eq!(parsed.timeout, None);

        let json = serde_json::to_string(&parsed).unwrap();
        assert!(!json.contains("payload"));
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let parsed = serde_json::from_str::<TestStruct>(r#"{"payload": "not base64!"}"#);
        assert!(parsed.is_err());
    }
}

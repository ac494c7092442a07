//! `deserialize_with` helpers for scalar settings that may arrive as text.
//!
//! Environment overlays deliver every value as a string. Numeric and boolean
//! fields accept either their native form or a string that parses into it;
//! text fields stay text, so `02134` keeps its leading zero.
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose<T> {
    Typed(T),
    Text(String),
}

impl<T> Loose<T>
where
    T: FromStr,
    T::Err: Display,
{
    fn resolve<E: de::Error>(self) -> Result<T, E> {
        match self {
            Loose::Typed(v) => Ok(v),
            Loose::Text(s) => s
                .trim()
                .parse()
                .map_err(|e| E::custom(format!("invalid value {s:?}: {e}"))),
        }
    }
}

pub fn scalar<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    Loose::<T>::deserialize(deserializer)?.resolve()
}

/// Like [`scalar`]; an empty string means `None`.
pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<Loose<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(loose) => loose.resolve().map(Some),
    }
}

pub fn map<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    BTreeMap::<String, Loose<T>>::deserialize(deserializer)?
        .into_iter()
        .map(|(k, v)| v.resolve().map(|v| (k, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, Deserialize)]
    struct Knobs {
        #[serde(deserialize_with = "super::scalar")]
        count: u32,
        #[serde(deserialize_with = "super::scalar")]
        ratio: f64,
        #[serde(deserialize_with = "super::scalar")]
        on: bool,
        #[serde(default, deserialize_with = "super::optional")]
        seed: Option<u64>,
        #[serde(default, deserialize_with = "super::map")]
        years: BTreeMap<String, u32>,
    }

    #[test]
    fn accepts_native_and_textual_forms() {
        let native: Knobs = serde_json::from_value(json!({
            "count": 4, "ratio": 2, "on": true, "seed": 7, "years": {"rust": 3}
        }))
        .unwrap();
        let text: Knobs = serde_json::from_value(json!({
            "count": "4", "ratio": " 2.0 ", "on": "true", "seed": "7", "years": {"rust": "3"}
        }))
        .unwrap();
        for k in [native, text] {
            assert_eq!((k.count, k.ratio, k.on, k.seed), (4, 2.0, true, Some(7)));
            assert_eq!(k.years["rust"], 3);
        }
    }

    #[test]
    fn empty_optional_is_none_and_garbage_is_rejected() {
        let k: Knobs =
            serde_json::from_value(json!({"count": 1, "ratio": 1, "on": false, "seed": ""}))
                .unwrap();
        assert_eq!(k.seed, None);

        let err = serde_json::from_value::<Knobs>(json!({"count": "four", "ratio": 1, "on": false}))
            .unwrap_err();
        assert!(err.to_string().contains("four"));
    }
}

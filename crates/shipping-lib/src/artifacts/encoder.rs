//! Ordinal encoder for the `estado` column

use super::{ArtifactSource, Encoder};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct EncoderFile {
    categories: Vec<String>,
    /// Code used for unseen categories; unseen categories are rejected when unset
    #[serde(default)]
    unknown_value: Option<f64>,
}

/// Maps each known category to its position in the fitted vocabulary
#[derive(Debug, Clone)]
pub struct OrdinalEncoder {
    codes: HashMap<String, f64>,
    unknown_value: Option<f64>,
}

impl OrdinalEncoder {
    pub fn new<I, S>(categories: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut codes = HashMap::new();
        for (idx, category) in categories.into_iter().enumerate() {
            let category = category.into();
            if codes.insert(category.clone(), idx as f64).is_some() {
                anyhow::bail!("Duplicate category '{}' in encoder", category);
            }
        }
        if codes.is_empty() {
            anyhow::bail!("Encoder has no categories");
        }
        Ok(Self {
            codes,
            unknown_value: None,
        })
    }

    pub fn with_unknown_value(mut self, value: f64) -> Self {
        self.unknown_value = Some(value);
        self
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let file: EncoderFile = serde_json::from_slice(bytes).context("Failed to parse encoder")?;
        let encoder = Self::new(file.categories)?;
        Ok(match file.unknown_value {
            Some(v) => encoder.with_unknown_value(v),
            None => encoder,
        })
    }

    pub fn load(source: &ArtifactSource) -> Result<Self> {
        let bytes = source.read()?;
        Self::from_json(&bytes).with_context(|| format!("Invalid encoder {}", source.path.display()))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Encoder for OrdinalEncoder {
    fn encode(&self, category: &str) -> Option<f64> {
        self.codes.get(category).copied().or(self.unknown_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_vocabulary_order() {
        let enc = OrdinalEncoder::from_json(br#"{"categories": ["AGS", "CDMX", "JAL"]}"#).unwrap();
        assert_eq!(enc.len(), 3);
        assert_eq!(enc.encode("AGS"), Some(0.0));
        assert_eq!(enc.encode("JAL"), Some(2.0));
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let enc = OrdinalEncoder::new(["CDMX", "JAL"]).unwrap();
        assert_eq!(enc.encode("ZZZ"), None);
        // Matching is exact
        assert_eq!(enc.encode("cdmx"), None);
    }

    #[test]
    fn test_unknown_value_mode() {
        let enc = OrdinalEncoder::from_json(br#"{"categories": ["CDMX"], "unknown_value": -1}"#).unwrap();
        assert_eq!(enc.encode("ZZZ"), Some(-1.0));
        assert_eq!(enc.encode("CDMX"), Some(0.0));
    }

    #[test]
    fn test_invalid_vocabularies() {
        assert!(OrdinalEncoder::from_json(br#"{"categories": []}"#).is_err());
        assert!(OrdinalEncoder::from_json(br#"{"categories": ["A", "A"]}"#).is_err());
        assert!(OrdinalEncoder::from_json(b"[1, 2]").is_err());
    }
}

//! Decoder I/O discovery from tensor names and element types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensorKind {
    Int64,
    Int32,
    Float32,
    Other(String),
}

/// Name and element type of one model input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoDescriptor {
    pub name: String,
    pub kind: TensorKind,
}

impl IoDescriptor {
    pub fn new(name: impl Into<String>, kind: TensorKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectedSchema {
    pub input_ids: String,
    pub attention_mask: Option<String>,
    pub logits: String,
    pub past_keys: Vec<String>,
    pub past_values: Vec<String>,
    pub present_keys: Vec<String>,
    pub present_values: Vec<String>,
    pub ids_int64: bool,
}

impl DetectedSchema {
    pub fn has_kv_cache(&self) -> bool {
        !self.past_keys.is_empty() && !self.past_values.is_empty()
    }
}

fn has(name: &str, needle: &str) -> bool {
    name.to_ascii_lowercase().contains(needle)
}

fn named<'a>(items: &'a [IoDescriptor], needle: &str) -> Option<&'a IoDescriptor> {
    items
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(needle))
        .or_else(|| items.iter().find(|d| has(&d.name, needle)))
}

fn names_with(items: &[IoDescriptor], a: &str, b: &str) -> Vec<String> {
    items
        .iter()
        .filter(|d| has(&d.name, a) && has(&d.name, b))
        .map(|d| d.name.clone())
        .collect()
}

/// `None` when there is no usable token-id input or no output at all.
pub fn detect_schema(inputs: &[IoDescriptor], outputs: &[IoDescriptor]) -> Option<DetectedSchema> {
    let ids = named(inputs, "input_ids")
        .or_else(|| inputs.iter().find(|d| d.kind == TensorKind::Int64))?;
    let logits = named(outputs, "logits").or_else(|| outputs.first())?;

    Some(DetectedSchema {
        input_ids: ids.name.clone(),
        attention_mask: named(inputs, "attention_mask").map(|d| d.name.clone()),
        logits: logits.name.clone(),
        past_keys: names_with(inputs, "past_key_values", "key"),
        past_values: names_with(inputs, "past_key_values", "value"),
        present_keys: names_with(outputs, "present", "key"),
        present_values: names_with(outputs, "present", "value"),
        ids_int64: ids.kind == TensorKind::Int64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io(name: &str, kind: TensorKind) -> IoDescriptor {
        IoDescriptor::new(name, kind)
    }

    #[test]
    fn test_gpt2_style_schema() {
        let inputs = vec![
            io("input_ids", TensorKind::Int64),
            io("attention_mask", TensorKind::Int64),
            io("past_key_values.0.key", TensorKind::Float32),
            io("past_key_values.0.value", TensorKind::Float32),
        ];
        let outputs = vec![
            io("logits", TensorKind::Float32),
            io("present.0.key", TensorKind::Float32),
            io("present.0.value", TensorKind::Float32),
        ];
        let schema = detect_schema(&inputs, &outputs).unwrap();
        assert_eq!(schema.input_ids, "input_ids");
        assert_eq!(schema.attention_mask.as_deref(), Some("attention_mask"));
        assert_eq!(schema.logits, "logits");
        assert_eq!(schema.past_keys, vec!["past_key_values.0.key"]);
        assert_eq!(schema.present_values, vec!["present.0.value"]);
        assert!(schema.ids_int64);
        assert!(schema.has_kv_cache());
    }

    #[test]
    fn test_fallbacks() {
        let inputs = vec![io("tokens", TensorKind::Int64)];
        let outputs = vec![io("out", TensorKind::Float32), io("hidden", TensorKind::Float32)];
        let schema = detect_schema(&inputs, &outputs).unwrap();
        assert_eq!(schema.input_ids, "tokens");
        assert_eq!(schema.logits, "out");
        assert!(schema.attention_mask.is_none());
        assert!(!schema.has_kv_cache());
    }

    #[test]
    fn test_substring_and_case() {
        let inputs = vec![io("decoder_INPUT_IDS", TensorKind::Int32)];
        let outputs = vec![io("lm_Logits", TensorKind::Float32)];
        let schema = detect_schema(&inputs, &outputs).unwrap();
        assert_eq!(schema.input_ids, "decoder_INPUT_IDS");
        assert_eq!(schema.logits, "lm_Logits");
        assert!(!schema.ids_int64);
    }

    #[test]
    fn test_unusable_models() {
        let floats = vec![io("pixel_values", TensorKind::Float32)];
        let outputs = vec![io("logits", TensorKind::Float32)];
        assert!(detect_schema(&floats, &outputs).is_none());
        let ids = vec![io("input_ids", TensorKind::Int64)];
        assert!(detect_schema(&ids, &[]).is_none());
    }
}

//! The blocking decoder seam and its ONNX Runtime implementation.

use std::collections::HashMap;
use std::path::Path;

use ndarray::Array;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputs};
use ort::tensor::TensorElementType;
use ort::value::{DynTensor, Tensor, ValueType};

use crate::error::{OracleError, Result};
use crate::schema::{DetectedSchema, IoDescriptor, TensorKind};

/// One forward pass per call. Implementations own whatever runtime state they
/// need; callers never share a session between threads.
pub trait DecoderSession {
    fn inputs(&self) -> &[IoDescriptor];

    fn outputs(&self) -> &[IoDescriptor];

    /// Runs `input_ids` (batch of one) and returns the logits row of the
    /// last position.
    fn run_step(&mut self, schema: &DetectedSchema, input_ids: &[i64]) -> Result<Vec<f32>>;
}

pub struct OrtDecoderSession {
    session: Session,
    inputs: Vec<IoDescriptor>,
    outputs: Vec<IoDescriptor>,
}

fn tensor_kind(value_type: &ValueType) -> TensorKind {
    match value_type {
        ValueType::Tensor { ty, .. } => match ty {
            TensorElementType::Int64 => TensorKind::Int64,
            TensorElementType::Int32 => TensorKind::Int32,
            TensorElementType::Float32 => TensorKind::Float32,
            other => TensorKind::Other(format!("{other:?}")),
        },
        other => TensorKind::Other(format!("{other:?}")),
    }
}

fn session_error<E: std::fmt::Display>(context: &str) -> impl Fn(E) -> OracleError + '_ {
    move |e| OracleError::Session(format!("{context}: {e}"))
}

impl OrtDecoderSession {
    pub fn load(model_path: &Path) -> Result<Self> {
        let session = Session::builder()
            .map_err(session_error("Failed to create session builder"))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(session_error("Failed to set optimization level"))?
            .commit_from_file(model_path)
            .map_err(session_error("Failed to load ONNX model"))?;

        let inputs: Vec<IoDescriptor> = session
            .inputs
            .iter()
            .map(|i| IoDescriptor::new(i.name.clone(), tensor_kind(&i.input_type)))
            .collect();
        let outputs: Vec<IoDescriptor> = session
            .outputs
            .iter()
            .map(|o| IoDescriptor::new(o.name.clone(), tensor_kind(&o.output_type)))
            .collect();

        log::info!(
            "Loaded ONNX model {} ({} inputs, {} outputs)",
            model_path.display(),
            inputs.len(),
            outputs.len()
        );
        Ok(Self {
            session,
            inputs,
            outputs,
        })
    }

    fn ids_tensor(schema: &DetectedSchema, input_ids: &[i64]) -> Result<DynTensor> {
        let len = input_ids.len();
        let shape_error = |e: ndarray::ShapeError| OracleError::Session(format!("Ids shape error: {e}"));
        let tensor = if schema.ids_int64 {
            let array = Array::from_shape_vec((1, len), input_ids.to_vec()).map_err(shape_error)?;
            Tensor::from_array(array.into_dyn())
                .map_err(session_error("Ids tensor"))?
                .upcast()
        } else {
            let narrowed: Vec<i32> = input_ids.iter().map(|id| *id as i32).collect();
            let array = Array::from_shape_vec((1, len), narrowed).map_err(shape_error)?;
            Tensor::from_array(array.into_dyn())
                .map_err(session_error("Ids tensor"))?
                .upcast()
        };
        Ok(tensor)
    }
}

impl DecoderSession for OrtDecoderSession {
    fn inputs(&self) -> &[IoDescriptor] {
        &self.inputs
    }

    fn outputs(&self) -> &[IoDescriptor] {
        &self.outputs
    }

    fn run_step(&mut self, schema: &DetectedSchema, input_ids: &[i64]) -> Result<Vec<f32>> {
        let mut feed: HashMap<String, DynTensor> = HashMap::new();
        feed.insert(schema.input_ids.clone(), Self::ids_tensor(schema, input_ids)?);
        if let Some(mask_name) = &schema.attention_mask {
            let mask = Array::from_elem((1, input_ids.len()), 1i64);
            let mask = Tensor::from_array(mask.into_dyn())
                .map_err(session_error("Mask tensor"))?
                .upcast();
            feed.insert(mask_name.clone(), mask);
        }

        let outputs = self
            .session
            .run(SessionInputs::from(feed))
            .map_err(session_error("ONNX forward failed"))?;
        let logits = outputs
            .get(schema.logits.as_str())
            .ok_or_else(|| OracleError::Schema(format!("output {} missing", schema.logits)))?;
        let array = logits
            .try_extract_array::<f32>()
            .map_err(session_error("Failed to decode logits"))?;

        // [.., vocab]: keep the final row
        let vocab = array.shape().last().copied().unwrap_or(0);
        let flat: Vec<f32> = array.iter().copied().collect();
        let start = flat.len().saturating_sub(vocab);
        Ok(flat[start..].to_vec())
    }
}

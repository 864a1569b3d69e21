//! Fine-tuned BERT sequence classifier served through ONNX Runtime.

use std::{path::Path, sync::Mutex};

use anyhow::{anyhow, Context, Result};
use ndarray::Array2;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::nlp::relclf::{Category, RelationClassifier};

/// ONNX export of the classifier inside `MODEL_PATH`.
pub const MODEL_FILE: &str = "model.onnx";
/// Fast tokenizer definition inside `MODEL_PATH`.
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// BERT classifier with a four-way head. The session is not re-entrant and is
/// serialised behind a mutex.
pub struct BertClassifier {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    with_token_types: bool,
}

impl BertClassifier {
    pub fn load(model_dir: &Path, max_seq_length: usize) -> Result<Self> {
        let model_file = model_dir.join(MODEL_FILE);
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(&model_file)
            .with_context(|| format!("loading {}", model_file.display()))?;
        let with_token_types = session.inputs.len() > 2;

        let tokenizer_file = model_dir.join(TOKENIZER_FILE);
        let mut tokenizer = Tokenizer::from_file(&tokenizer_file)
            .map_err(|err| anyhow!("loading {}: {err}", tokenizer_file.display()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_seq_length,
                ..Default::default()
            }))
            .map_err(|err| anyhow!("configuring truncation: {err}"))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        info!(
            inputs = session.inputs.len(),
            max_seq_length, "initialised onnx session"
        );
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            with_token_types,
        })
    }

    fn encode(&self, texts: &[String]) -> Result<(Array2<i64>, Array2<i64>, Array2<i64>)> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|err| anyhow!("tokenizing batch: {err}"))?;
        let rows = encodings.len();
        let width = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);
        let mut ids = Vec::with_capacity(rows * width);
        let mut mask = Vec::with_capacity(rows * width);
        let mut types = Vec::with_capacity(rows * width);
        for encoding in &encodings {
            ids.extend(encoding.get_ids().iter().map(|&v| v as i64));
            mask.extend(encoding.get_attention_mask().iter().map(|&v| v as i64));
            types.extend(encoding.get_type_ids().iter().map(|&v| v as i64));
        }
        Ok((
            Array2::from_shape_vec((rows, width), ids)?,
            Array2::from_shape_vec((rows, width), mask)?,
            Array2::from_shape_vec((rows, width), types)?,
        ))
    }
}

impl RelationClassifier for BertClassifier {
    fn predict(&self, texts: &[String]) -> Result<Vec<Category>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let (ids, mask, types) = self.encode(texts)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("onnx session poisoned"))?;
        let mut inputs = ort::inputs![
            "input_ids" => Tensor::from_array(ids)?,
            "attention_mask" => Tensor::from_array(mask)?,
        ];
        if self.with_token_types {
            inputs.push(("token_type_ids".into(), Tensor::from_array(types)?.into()));
        }
        let outputs = session.run(inputs)?;
        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("extracting logits")?;

        let labels = logits
            .outer_iter()
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(idx, _)| idx)
                    .unwrap_or(0);
                Category::from_index(best)
                    .ok_or_else(|| anyhow!("model emitted label index {best} outside label set"))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(batch = texts.len(), "bert inference complete");
        Ok(labels)
    }

    fn name(&self) -> &'static str {
        "bert"
    }
}

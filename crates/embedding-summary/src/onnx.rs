//! ONNX Embedding Backbone

use std::path::Path;

use image::DynamicImage;
use ndarray::Array2;
use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::backbone::Backbone;
use crate::BackboneError;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Vision embedding backbone running an ONNX model through tract.
///
/// The model is expected to take one NCHW float image of a fixed square
/// size and return one embedding vector per input.
pub struct OnnxImageBackbone {
    plan: OnnxPlan,
    input_edge: u32,
    dimension: usize,
}

impl OnnxImageBackbone {
    /// Load and optimize the model at `path`
    pub fn load<P: AsRef<Path>>(
        path: P,
        input_edge: u32,
        dimension: usize,
    ) -> Result<Self, BackboneError> {
        info!(
            "loading ONNX embedding backbone from {}",
            path.as_ref().display()
        );

        let plan = tract_onnx::onnx()
            .model_for_path(path.as_ref())
            .and_then(|m| {
                m.with_input_fact(
                    0,
                    InferenceFact::dt_shape(
                        f32::datum_type(),
                        tvec!(1, 3, input_edge as usize, input_edge as usize),
                    ),
                )
            })
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| BackboneError::Unavailable(e.to_string()))?;

        Ok(Self {
            plan,
            input_edge,
            dimension,
        })
    }

    fn encode_one(&self, image: &DynamicImage) -> Result<Vec<f32>, BackboneError> {
        let edge = self.input_edge;
        let rgb = image
            .resize_exact(edge, edge, image::imageops::FilterType::Triangle)
            .to_rgb8();

        let input: Tensor = tract_ndarray::Array4::from_shape_fn(
            (1, 3, edge as usize, edge as usize),
            |(_, c, y, x)| rgb.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0,
        )
        .into();

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| BackboneError::Inference(e.to_string()))?;

        let view = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| BackboneError::Inference(e.to_string()))?;
        let embedding: Vec<f32> = view.iter().copied().collect();

        if embedding.len() != self.dimension {
            return Err(BackboneError::OutputShape {
                expected: format!("[{}]", self.dimension),
                actual: format!("[{}]", embedding.len()),
            });
        }
        Ok(embedding)
    }
}

impl Backbone<DynamicImage> for OnnxImageBackbone {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, samples: &[DynamicImage]) -> Result<Array2<f32>, BackboneError> {
        let mut output = Array2::zeros((samples.len(), self.dimension));

        for (row, image) in samples.iter().enumerate() {
            let embedding = self.encode_one(image)?;
            for (d, value) in embedding.into_iter().enumerate() {
                output[(row, d)] = value;
            }
        }

        debug!(rows = samples.len(), dim = self.dimension, "ONNX encode complete");
        Ok(output)
    }
}

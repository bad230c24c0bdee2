use image::DynamicImage;
use std::sync::Arc;
use std::collections::HashMap;
use std::path::PathBuf;
use anyhow::Result;
use tracing::debug;

use crate::models::Quad;

/// Data that flows through the pipeline
/// Each PipelineData represents a single image (or cell of it) with associated metadata
#[derive(Clone)]
pub struct PipelineData {
    /// The image data (color, grayscale or binary mask)
    pub image: DynamicImage,

    /// The image this item's geometry refers to (shared via Arc).
    /// Starts as the input photo, becomes the rectified grid after the warp.
    pub original: Arc<DynamicImage>,

    /// Metadata for tracking properties (e.g., "grid_corners", "row", "digit")
    pub metadata: HashMap<String, MetadataValue>,
}

/// Metadata value types
#[derive(Debug, Clone)]
pub enum MetadataValue {
    Float(f32),
    String(String),
    Int(i32),
    Quad(Quad),
}

impl PipelineData {
    /// Create PipelineData for a full image
    pub fn from_image(image: DynamicImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image,
            original,
            metadata: HashMap::new(),
        }
    }

    /// Same original and metadata with a new working image
    pub fn with_image(&self, image: DynamicImage) -> Self {
        Self {
            image,
            original: self.original.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.metadata.get(key) {
            Some(MetadataValue::String(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_quad(&self, key: &str) -> Option<Quad> {
        match self.metadata.get(key) {
            Some(MetadataValue::Quad(q)) => Some(*q),
            _ => None,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Process data and return transformed data
    /// Steps can split data (1 → many), filter (many → fewer), or transform (many → many)
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>>;

    /// Human-readable name for this step (used in logs and debug directory names)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a sequence of steps in order
    pub fn add_steps(mut self, steps: impl IntoIterator<Item = Arc<dyn PipelineStep>>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the pipeline sequentially on an input image
    pub fn run(&self, input: DynamicImage) -> Result<Vec<PipelineData>> {
        self.run_partial(input, self.steps.len())
    }

    /// Run the pipeline but stop after `num_steps` steps (useful for debugging)
    pub fn run_partial(&self, input: DynamicImage, num_steps: usize) -> Result<Vec<PipelineData>> {
        if let Some(debug_config) = &self.context.debug {
            let input_dir = debug_config.output_dir.join("00_input");
            std::fs::create_dir_all(&input_dir)?;
            input.save(input_dir.join("01.png"))
                .map_err(|e| anyhow::anyhow!("Failed to save debug input: {}", e))?;
            debug!("saved 00_input/01.png");
        }

        // Start with a single PipelineData containing the full image
        let mut data = vec![PipelineData::from_image(input)];

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            debug!(step = step.name(), items = data.len(), "running step");

            data = step.process(data, &self.context)?;

            if let Some(debug_config) = &self.context.debug {
                save_debug_outputs(debug_config, step_idx, step.name(), &data)?;
            }

            debug!(step = step.name(), items = data.len(), "step finished");
        }

        Ok(data)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Save every item of a step as `NN_step_name/MM.png`
fn save_debug_outputs(
    config: &DebugConfig,
    step_idx: usize,
    step_name: &str,
    data: &[PipelineData],
) -> Result<()> {
    let step_dir_name = format!("{:02}_{}", step_idx + 1,
        step_name.to_lowercase().replace(' ', "_"));
    let step_dir = config.output_dir.join(&step_dir_name);
    std::fs::create_dir_all(&step_dir)?;

    for (idx, item) in data.iter().enumerate() {
        let output_path = step_dir.join(format!("{:02}.png", idx + 1));
        item.image.save(&output_path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
    }

    debug!(count = data.len(), dir = %step_dir_name, "saved debug images");
    Ok(())
}

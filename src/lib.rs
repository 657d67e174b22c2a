//! Underwater image and video-frame enhancement core.
//!
//! Six fixed-order stages (white balance, UDCP dehazing, Beer-Lambert
//! depth compensation, color rebalance, CLAHE, multi-scale fusion) driven
//! by a pipeline engine with an optional auto-tuning layer, plus a
//! standalone quality analyzer. See [`engine::Engine`] for the main
//! entry point.

pub mod autotune;
pub mod color;
pub mod engine;
pub mod error;
pub mod filters;
pub mod image_buffer;
pub mod params;
pub mod preferences;
pub mod preview;
pub mod progress;
pub mod pyramid;
pub mod quality;
pub mod save;
pub mod schema;
pub mod stages;
pub mod water_type;

pub use engine::{create_engine, CancelToken, Engine, ProcessResult, Warning};
pub use error::{Error, Result};
pub use image_buffer::Image;
pub use params::{ParameterStore, Value};
pub use quality::{analyze_quality, QualityReport};
pub use schema::StageId;
pub use water_type::WaterType;

//! Pipeline engine (C4): owns the parameter store and auto-tune flags,
//! and drives the six stages in their fixed order for a single
//! `process()` call.

use crate::autotune::{self, AutoTuneMode};
use crate::error::{Error, Result};
use crate::image_buffer::Image;
use crate::params::{ParameterStore, Value};
use crate::preview;
use crate::progress::ProgressSink;
use crate::schema::{self, StageId, PIPELINE_ORDER};
use crate::stages;
use crate::water_type::{self, WaterType};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation: checked only between stages, per §5.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A non-fatal event recorded while processing: a recovered stage or
/// auto-tune failure, surfaced on the result envelope rather than
/// aborting the run.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub stage: StageId,
    pub message: String,
}

/// The result envelope `process()` returns: the image plus any warnings
/// accumulated from recovered stage/auto-tune failures.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub image: Image,
    pub warnings: Vec<Warning>,
    pub cancelled: bool,
}

pub struct Engine {
    params: ParameterStore,
    global_auto_tune: bool,
    enhanced_auto_tune: bool,
    stage_auto_tune: HashMap<StageId, bool>,
}

pub fn create_engine() -> Engine {
    Engine::new()
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        let mut stage_auto_tune = HashMap::new();
        for stage in PIPELINE_ORDER {
            stage_auto_tune.insert(stage, false);
        }
        Engine {
            params: ParameterStore::with_defaults(),
            global_auto_tune: false,
            enhanced_auto_tune: false,
            stage_auto_tune,
        }
    }

    pub fn set_parameter(&mut self, key: &str, value: Value) -> Result<()> {
        self.params.set(key, value)
    }

    pub fn get_parameter(&self, key: &str) -> Result<Value> {
        self.params.get(key).map(|v| v.clone())
    }

    pub fn reset_to_defaults(&mut self) {
        self.params.reset_to_defaults();
    }

    pub fn reset_stage_defaults(&mut self, stage: StageId) {
        self.params.reset_stage_defaults(stage);
    }

    pub fn set_auto_tune(&mut self, global_on: bool) {
        self.global_auto_tune = global_on;
    }

    pub fn set_stage_auto_tune(&mut self, stage: StageId, on: bool) {
        self.stage_auto_tune.insert(stage, on);
    }

    pub fn set_enhanced_auto_tune(&mut self, on: bool) {
        self.enhanced_auto_tune = on;
    }

    pub fn detect_water_type(&self, img: &Image) -> WaterType {
        water_type::detect_water_type(&img.to_f32())
    }

    /// Run the fixed pipeline, honoring each stage's enable flag and,
    /// when auto-tune is on globally and for that stage, seeding its
    /// parameters from the *original* image first.
    pub fn process(
        &mut self,
        img: &Image,
        progress: Option<&mut dyn ProgressSink>,
        cancel: Option<&CancelToken>,
    ) -> Result<ProcessResult> {
        let expected_len = (img.width as usize) * (img.height as usize) * 3;
        if img.data.len() != expected_len {
            let got_channels = if img.width == 0 || img.height == 0 {
                3
            } else {
                (img.data.len() / (img.width as usize * img.height as usize)) as u8
            };
            return Err(Error::ImageShapeInvalid {
                expected: (img.width, img.height, 3),
                got: (img.width, img.height, got_channels),
            });
        }

        let original = img.to_f32();
        let mut current = original.clone();
        let mut warnings = Vec::new();
        let mut null_sink = crate::progress::NullProgressSink;
        let sink: &mut dyn ProgressSink = progress.unwrap_or(&mut null_sink);

        sink.on_progress("pipeline", 0);

        let band_start = 10u8;
        let band_end = 90u8;
        let band_width = (band_end - band_start) as f32 / PIPELINE_ORDER.len() as f32;

        let mut last_completed: Option<StageId> = None;

        for (i, stage_id) in PIPELINE_ORDER.iter().copied().enumerate() {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    log::info!("process cancelled after stage {last_completed:?}");
                    sink.on_progress("pipeline", 100);
                    return Ok(ProcessResult {
                        image: current.to_u8_clamped(),
                        warnings,
                        cancelled: true,
                    });
                }
            }

            if self.global_auto_tune && *self.stage_auto_tune.get(&stage_id).unwrap_or(&false) {
                let mode = if self.enhanced_auto_tune {
                    AutoTuneMode::Enhanced
                } else {
                    AutoTuneMode::Standard
                };
                if let Err(e) = autotune::auto_tune(stage_id, mode, &original, &mut self.params) {
                    log::warn!("auto-tune failed for {stage_id:?}: {e}");
                    warnings.push(Warning {
                        stage: stage_id,
                        message: e.to_string(),
                    });
                }
            }

            let enabled = self.params.get_bool(stage_id.enable_key())?;
            if !enabled {
                last_completed = Some(stage_id);
                continue;
            }

            let start_percent = band_start + (band_width * i as f32).round() as u8;
            let end_percent = band_start + (band_width * (i + 1) as f32).round() as u8;
            sink.on_progress(stage_id.wire_id(), start_percent.min(band_end));

            let stage = stages::stage_for(stage_id);
            match stage.apply(&current, &self.params) {
                Ok(out) => current = out,
                Err(e) => {
                    log::warn!("stage {stage_id:?} failed, substituting input: {e}");
                    warnings.push(Warning {
                        stage: stage_id,
                        message: e.to_string(),
                    });
                }
            }

            sink.on_progress(stage_id.wire_id(), end_percent.min(band_end));
            last_completed = Some(stage_id);
        }

        sink.on_progress("pipeline", 100);

        Ok(ProcessResult {
            image: current.to_u8_clamped(),
            warnings,
            cancelled: false,
        })
    }

    /// `process_for_preview`: downsample first, process the small
    /// buffer, and hand back both the (downsampled) original and the
    /// processed preview alongside the scale factor used.
    pub fn process_for_preview(
        &mut self,
        img: &Image,
        max_side: u32,
    ) -> Result<(Image, Image, f32)> {
        let (original_preview, scale) = preview::downsample(img, max_side);
        let result = self.process(&original_preview, None, None)?;
        Ok((original_preview, result.image, scale))
    }

    pub fn describe_pipeline(&self) -> Vec<StageDescriptor> {
        PIPELINE_ORDER
            .iter()
            .map(|&id| StageDescriptor {
                name: id.display_name(),
                description: id.description(),
                parameter_summary: id
                    .parameter_keys()
                    .iter()
                    .filter_map(|&k| schema::descriptor(k).map(|d| (k, d.label)))
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct StageDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub parameter_summary: Vec<(&'static str, &'static str)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    #[test]
    fn all_stages_disabled_is_pixel_exact_identity() {
        let img = Image::filled(16, 16, [90, 100, 110]);
        let mut engine = create_engine();
        for stage in PIPELINE_ORDER {
            engine.set_parameter(stage.enable_key(), Value::Bool(false)).unwrap();
        }
        let result = engine.process(&img, None, None).unwrap();
        assert_eq!(result.image, img);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn reset_to_defaults_is_idempotent() {
        let mut engine = create_engine();
        engine.set_parameter("udcp_omega", Value::Float(0.5)).unwrap();
        engine.reset_to_defaults();
        let first = engine.get_parameter("udcp_omega").unwrap();
        engine.reset_to_defaults();
        let second = engine.get_parameter("udcp_omega").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn process_is_deterministic_across_runs() {
        let img = Image::filled(32, 32, [40, 90, 160]);
        let mut engine_a = create_engine();
        let mut engine_b = create_engine();
        let out_a = engine_a.process(&img, None, None).unwrap();
        let out_b = engine_b.process(&img, None, None).unwrap();
        assert_eq!(out_a.image, out_b.image);
    }

    #[test]
    fn preview_is_noop_when_already_small() {
        let img = Image::filled(64, 64, [80, 120, 160]);
        let mut engine = create_engine();
        let (_orig_preview, _processed, scale) = engine.process_for_preview(&img, 1024).unwrap();
        assert!((scale - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cancel_after_first_stage_returns_cancelled_flag() {
        let img = Image::filled(8, 8, [60, 90, 120]);
        let mut engine = create_engine();
        let token = CancelToken::new();
        token.cancel();
        let result = engine.process(&img, None, Some(&token)).unwrap();
        assert!(result.cancelled);
    }

    #[test]
    fn describe_pipeline_lists_all_six_stages() {
        let engine = create_engine();
        assert_eq!(engine.describe_pipeline().len(), 6);
    }

    fn green_cast_checkerboard(w: u32, h: u32) -> Image {
        let mut data = Vec::with_capacity(w as usize * h as usize * 3);
        for y in 0..h {
            for x in 0..w {
                if (x + y) % 2 == 0 {
                    data.extend_from_slice(&[50, 140, 70]);
                } else {
                    data.extend_from_slice(&[70, 160, 90]);
                }
            }
        }
        Image::new(w, h, data).unwrap()
    }

    #[test]
    fn auto_tune_on_green_cast_selects_lake_green_water() {
        let img = green_cast_checkerboard(128, 128);
        let mut engine = create_engine();
        assert_eq!(engine.detect_water_type(&img), WaterType::GreenLake);
        engine.set_auto_tune(true);
        engine.set_stage_auto_tune(StageId::WhiteBalance, true);
        engine.process(&img, None, None).unwrap();
        let method = engine.get_parameter("white_balance_method").unwrap();
        assert_eq!(method, Value::Choice("lake_green_water".to_string()));
    }
}

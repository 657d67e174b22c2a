//! C3 — the six enhancement stages. Every stage is a pure function from
//! `(&ImageF32, &ParameterStore)` to a new `ImageF32`; none of them touch
//! the parameter store, the filesystem, or logging directly — that is the
//! engine's (C4) job.

pub mod beer_lambert;
pub mod clahe;
pub mod color_rebalance;
pub mod fusion;
pub mod udcp;
pub mod white_balance;

use crate::error::Result;
use crate::image_buffer::ImageF32;
use crate::params::ParameterStore;
use crate::schema::StageId;

/// A single pipeline stage. `apply` must never panic; any internal
/// failure should surface as `Err` so the engine can fall back to
/// "unchanged input" and record a `StageFailed` warning.
pub trait Stage {
    fn id(&self) -> StageId;
    fn apply(&self, img: &ImageF32, params: &ParameterStore) -> Result<ImageF32>;
}

pub fn stage_for(id: StageId) -> Box<dyn Stage> {
    match id {
        StageId::WhiteBalance => Box::new(white_balance::WhiteBalanceStage),
        StageId::Udcp => Box::new(udcp::UdcpStage),
        StageId::BeerLambert => Box::new(beer_lambert::BeerLambertStage),
        StageId::ColorRebalance => Box::new(color_rebalance::ColorRebalanceStage),
        StageId::Clahe => Box::new(clahe::ClaheStage),
        StageId::Fusion => Box::new(fusion::FusionStage),
    }
}

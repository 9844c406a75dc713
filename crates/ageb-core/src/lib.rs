//! Assignment of census small-area (AGEB) codes to address records.
//!
//! Records go through an ordered cascade: a code the record already carries,
//! point-in-polygon containment of the postal-code centroid, deterministic
//! distribution inside the administrative key, then inside the state. Two
//! follow-up passes repair results that are not canonical urban codes and
//! records whose postal code lost its leading zero.

pub mod admin;
mod batch;
pub mod cascade;
pub mod catalog;
pub mod centroid;
pub mod config;
pub mod coords;
pub mod correction;
pub mod diagnostics;
pub mod distributor;
pub mod error;
pub mod index;
pub mod locator;
pub mod model;
pub mod pipeline;
pub mod postal;

pub use cascade::{spatial_containment, ResolutionCascade, SpatialOutcome};
pub use catalog::{AreaCatalog, LoadStats};
pub use centroid::CentroidTable;
pub use config::AssignerConfig;
pub use coords::LatLon;
pub use correction::CorrectionPass;
pub use diagnostics::{BatchReport, Diagnostics};
pub use distributor::{fnv1a_32, pick};
pub use error::{AgebError, Result};
pub use index::AreaIndex;
pub use locator::{Hit, SpatialLocator};
pub use model::{
    AdministrativeKey, AreaUnit, AreaUnitRow, AssignmentResult, CentroidRow, MethodTag,
    SourceRecord, Urbanicity,
};
pub use pipeline::{postal_locator, run_pipeline, PipelineOutput};
pub use postal::{NormalizedBatch, PostalNormalizer};

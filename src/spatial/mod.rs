//! # Spatial Classification
//!
//! Interior/boundary classification of address points relative to their
//! parcel.

pub mod classifier;

pub use classifier::{
    classify_points, ClassificationMode, ClassifiedPoint, ParcelClassification, PointLocation,
    SpatialClassifier, DEFAULT_EROSION_MARGIN, PRECOMPUTED_MARGIN,
};

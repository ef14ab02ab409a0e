//! Error type shared across the engine.

use thiserror::Error;

use crate::model::{AnnotationId, AnnotationKind};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("annotation {id} does not exist")]
    AnnotationNotFound { id: AnnotationId },

    #[error("view index {index} is out of range")]
    ViewNotFound { index: usize },

    #[error("no renderer registered for {kind:?}")]
    RendererNotRegistered { kind: AnnotationKind },

    #[error("no serializer registered for {kind:?}")]
    SerializerNotRegistered { kind: AnnotationKind },

    #[error("expected {expected:?} data, got {actual:?}")]
    KindMismatch {
        expected: AnnotationKind,
        actual: AnnotationKind,
    },

    #[error("{kind:?} annotations cannot be interpolated")]
    InterpolationNotSupported { kind: AnnotationKind },

    #[error("unsupported interpolation algorithm '{algorithm}'")]
    UnsupportedInterpolationAlgorithm { algorithm: String },

    #[error("missing required field '{field}'")]
    MissingField { field: String },

    #[error("invalid payload: {message}")]
    InvalidPayload { message: String },

    #[error("invalid dense rle: {message}")]
    InvalidRle { message: String },

    #[error("mask annotation {id} has no raster layer to draw into")]
    MissingRasterLayer { id: AnnotationId },

    #[error("raster layer maps label to missing mask annotation {id}")]
    MissingMaskPayload { id: AnnotationId },
}

use crate::id::FramebufferId;
use thiserror::Error;

/// Errors returned by drawing calls.
///
/// Every variant is a usage error: the offending call is aborted and the renderer state is left
/// as it was before the call. Degraded output and resource limits are reported through `tracing`
/// instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("pop() was called more times than push()")]
    UnbalancedPop,
    #[error("vertex() must be used once before calling {call}()")]
    MissingAnchor { call: &'static str },
    #[error("make sure you call begin_geometry() before end_geometry()")]
    GeometryNotStarted,
    #[error("a geometry is already being built; call end_geometry() first")]
    GeometryAlreadyStarted,
    #[error("no cached geometry registered under shape key `{0}`")]
    UnknownShape(String),
    #[error("{0}() cannot be called while a shape is in progress")]
    ShapeInProgress(&'static str),
    #[error("{0}() requires begin_shape() first")]
    NoShapeInProgress(&'static str),
    #[error("end_clip() called without a matching begin_clip()")]
    ClipNotStarted,
    #[error("begin_clip() called while a clip mask is being drawn")]
    ClipAlreadyStarted,
    #[error("framebuffer {0} does not exist")]
    UnknownFramebuffer(FramebufferId),
    #[error("this shader has no hooks; hooks need a built-in program and per-pixel lighting")]
    HooksUnsupported,
    #[error("invalid shader: {0}")]
    InvalidShader(String),
    #[error("no suitable GPU adapter was found")]
    NoAdapter,
    #[error("backend failure: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;

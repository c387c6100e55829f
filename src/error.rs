use std::fmt;

/// Shader pipeline stage a compile failure belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// The host environment could not hand out a GPU context.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("no drawing surface could be created: {0}")]
    Surface(String),
    #[error("GPU context unavailable: {0}")]
    Unavailable(String),
}

/// The GPU backend rejected the static shader sources.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{stage} shader failed to compile: {log}")]
    Stage { stage: ShaderStage, log: String },
    #[error("shader program failed to link: {0}")]
    Link(String),
    #[error("GPU refused to allocate {0}")]
    Allocation(&'static str),
}

/// A color descriptor that could not be turned into RGB.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ColorResolutionError {
    #[error("empty color descriptor")]
    Empty,
    #[error("unrecognised color `{0}`")]
    Unrecognised(String),
    #[error("custom property `{0}` is not defined")]
    UndefinedProperty(String),
    #[error("custom property `{0}` nests too deeply")]
    TooDeep(String),
}

#[derive(Debug, thiserror::Error)]
#[error("container size observation unavailable: {0}")]
pub struct ObserveError(pub String);

#[derive(Debug, thiserror::Error)]
#[error("display frame request refused: {0}")]
pub struct ScheduleError(pub String);

/// Every way a mount can fail. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Observe(#[from] ObserveError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("invalid effect configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type CaplayResult<T> = Result<T, CaplayError>;

#[derive(thiserror::Error, Debug)]
pub enum CaplayError {
    #[error("codec error: {0}")]
    Codec(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("animation error: {0}")]
    Animation(String),

    #[error("state error: {0}")]
    State(String),

    #[error("emitter error: {0}")]
    Emitter(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CaplayError {
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    pub fn emitter(msg: impl Into<String>) -> Self {
        Self::Emitter(msg.into())
    }
}

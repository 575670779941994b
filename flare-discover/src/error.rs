use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoverError>;

#[derive(Debug, Error)]
pub enum DiscoverError {
    /// 注册中心不可用或拒绝注册
    #[error("registry error: {0}")]
    Registry(String),

    /// 已注册实例的元数据更新或注销失败
    #[error("heartbeat error: {0}")]
    Heartbeat(String),

    #[error("health check failed: {0}")]
    Check(String),

    #[error("invalid address `{0}`")]
    InvalidAddr(String),

    #[error("heartbeat closed")]
    Closed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DiscoverError {
    pub fn registry(msg: impl Into<String>) -> Self {
        DiscoverError::Registry(msg.into())
    }

    pub fn heartbeat(msg: impl Into<String>) -> Self {
        DiscoverError::Heartbeat(msg.into())
    }

    pub fn check(msg: impl Into<String>) -> Self {
        DiscoverError::Check(msg.into())
    }

    pub fn invalid_addr(addr: impl Into<String>) -> Self {
        DiscoverError::InvalidAddr(addr.into())
    }
}

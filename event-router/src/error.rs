//! 路由层统一错误定义
//!
use thiserror::Error;

/// 路由与分发过程中可能出现的错误
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RouterError {
    // --- 路由表 ---
    #[error("cannot create route with reserved name: {name}")]
    ReservedName { name: String },
    #[error("cannot set undefined route as active: {name}")]
    UnknownRoute { name: String },

    // --- 回调 ---
    /// 回调返回的错误，原样透传
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

/// 统一 Result 类型别名
pub type RouterResult<T> = Result<T, RouterError>;

impl RouterError {
    pub fn reserved_name(name: impl Into<String>) -> Self {
        Self::ReservedName { name: name.into() }
    }

    pub fn unknown_route(name: impl Into<String>) -> Self {
        Self::UnknownRoute { name: name.into() }
    }
}

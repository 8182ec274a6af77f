//! 事件载荷与回调句柄
//!
//! - `Event`：单次分发时构造的只读载荷包装；
//! - `Callback`：可克隆的回调句柄，按引用身份比较，用于 `off` 系列操作的精确移除。
//!
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// 单次分发的载荷包装，构造后不可修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<T = serde_json::Value> {
    data: T,
}

impl<T> Event<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

type CallbackFn<T> = dyn Fn(&Event<T>) -> anyhow::Result<()> + Send + Sync;

/// 事件回调句柄
///
/// 克隆得到的句柄与原句柄指向同一回调，视为相等；
/// 即使闭包内容完全相同，分别 `new` 出来的两个句柄也互不相等。
pub struct Callback<T = serde_json::Value> {
    f: Arc<CallbackFn<T>>,
}

impl<T> Callback<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Event<T>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// 以给定事件调用回调
    pub fn call(&self, event: &Event<T>) -> anyhow::Result<()> {
        (self.f)(event)
    }

    /// 是否为同一回调（引用身份）
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl<T, F> From<F> for Callback<T>
where
    F: Fn(&Event<T>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<T> PartialEq for Callback<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for Callback<T> {}

impl<T> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback")
            .field(&Arc::as_ptr(&self.f).cast::<()>())
            .finish()
    }
}

//! 进程内事件路由（event-router）
//!
//! 以“路由（Route）”为单位组织事件回调，并由路由器（Router）统一分发：
//! - `Route`：事件名到有序回调列表的映射，可配置回退路由（fallback）；
//! - `Router`：持有命名路由表，始终包含 `default`/`before`/`after` 三个保留路由，
//!   并维护一个当前激活路由；
//! - `Event`：每次分发时构造的载荷包装，仅在该次回调期间存在。
//!
//! 分发顺序固定为 `before` → 激活路由 → `after`，同一路由内按注册顺序同步调用。
//! 回调返回的错误会立即中止后续回调并原样返回给 `emit` 的调用方。
//!
//! 典型用法：
//! 1. 创建 `Router`，通过 `route(name)` 获取或创建命名路由；
//! 2. 在路由上使用 `on` 注册回调，使用 `set_active` 切换激活路由；
//! 3. 调用 `Router::emit` 分发事件。
//!
pub mod error;
pub mod event;
pub mod route;
pub mod router;

pub use error::{RouterError, RouterResult};
pub use event::{Callback, Event};
pub use route::{Route, RouteOptions};
pub use router::{AFTER_ROUTE, BEFORE_ROUTE, DEFAULT_ROUTE, RESERVED_ROUTES, Router, RouterOptions};

//! 路由器（Router）
//!
//! 持有命名路由表与当前激活路由。路由表始终包含三个保留路由：
//! - `default`：初始激活路由；
//! - `before`：每次分发时最先调用；
//! - `after`：每次分发时最后调用。
//!
//! 所有操作都只需 `&self`，回调内部可以持有路由器（例如 `Arc<Router>`）
//! 并在分发过程中切换激活路由。
//!
use crate::error::{RouterError, RouterResult};
use crate::route::{Route, RouteOptions};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;
use tracing::debug;

pub const DEFAULT_ROUTE: &str = "default";
pub const BEFORE_ROUTE: &str = "before";
pub const AFTER_ROUTE: &str = "after";

/// 保留路由名，构造时预先创建，不可删除或覆盖
pub const RESERVED_ROUTES: [&str; 3] = [DEFAULT_ROUTE, BEFORE_ROUTE, AFTER_ROUTE];

/// 路由器配置（预留扩展）
#[non_exhaustive]
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct RouterOptions {}

/// 命名路由表
struct RouteTable<T> {
    routes: DashMap<String, Route<T>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self {
            routes: DashMap::new(),
        }
    }
}

impl<T> RouteTable<T> {
    fn insert_reserved(&self, key: &str, route: &Route<T>) {
        self.routes.insert(key.to_string(), route.clone());
    }

    fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<Route<T>> {
        self.routes.get(name).map(|r| r.value().clone())
    }

    /// 按名称获取路由，不存在时以给定配置创建；已存在时忽略配置
    fn get_or_create(&self, name: &str, options: RouteOptions<T>) -> RouterResult<Route<T>> {
        match self.routes.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                // 保留名只能由构造过程预置，不能在此补建
                if RESERVED_ROUTES.contains(&name) {
                    return Err(RouterError::reserved_name(name));
                }
                let route = Route::with_options(options.with_name(name));
                entry.insert(route.clone());
                debug!(route = name, "route created");
                Ok(route)
            }
        }
    }

    fn names(&self) -> Vec<String> {
        self.routes.iter().map(|e| e.key().clone()).collect()
    }
}

/// 事件路由器
pub struct Router<T = serde_json::Value> {
    options: RouterOptions,
    routes: RouteTable<T>,
    default: Route<T>,
    before: Route<T>,
    after: Route<T>,
    active: RwLock<Route<T>>,
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    pub fn with_options(options: RouterOptions) -> Self {
        // 保留路由不带名称，仅以路由表中的键区分
        let default = Route::new();
        let before = Route::new();
        let after = Route::new();

        let routes = RouteTable::default();
        for (key, route) in RESERVED_ROUTES.into_iter().zip([&default, &before, &after]) {
            routes.insert_reserved(key, route);
        }

        Self {
            options,
            routes,
            active: RwLock::new(default.clone()),
            default,
            before,
            after,
        }
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// 获取或创建命名路由（默认配置）
    pub fn route(&self, name: &str) -> RouterResult<Route<T>> {
        self.route_with(name, RouteOptions::default())
    }

    /// 获取或创建命名路由；路由已存在时返回原实例并忽略 `options`，
    /// 新建时以 `name` 覆盖配置中的名称
    pub fn route_with(&self, name: &str, options: RouteOptions<T>) -> RouterResult<Route<T>> {
        self.routes.get_or_create(name, options)
    }

    /// 按名称切换激活路由，名称未注册时返回错误且保持原激活路由
    pub fn set_active(&self, name: &str) -> RouterResult<&Self> {
        let route = self
            .routes
            .get(name)
            .ok_or_else(|| RouterError::unknown_route(name))?;
        Ok(self.set_active_route(route))
    }

    /// 直接以路由实例切换激活路由，不要求该路由属于本路由器
    pub fn set_active_route(&self, route: Route<T>) -> &Self {
        debug!(route = route.name(), "active route switched");
        // 旧路由在锁释放后再析构
        let _previous = mem::replace(&mut *self.active.write(), route);
        self
    }

    pub fn has_route(&self, name: &str) -> bool {
        self.routes.contains(name)
    }

    pub fn get_route(&self, name: &str) -> Option<Route<T>> {
        self.routes.get(name)
    }

    /// 当前激活路由
    pub fn active(&self) -> Route<T> {
        self.active.read().clone()
    }

    pub fn default_route(&self) -> &Route<T> {
        &self.default
    }

    pub fn before(&self) -> &Route<T> {
        &self.before
    }

    pub fn after(&self) -> &Route<T> {
        &self.after
    }

    /// 已注册的路由名（只读视图，顺序不保证）
    pub fn route_names(&self) -> Vec<String> {
        self.routes.names()
    }
}

impl<T: Clone> Router<T> {
    /// 依次向 `before`、激活路由、`after` 分发事件
    ///
    /// 激活路由在 `before` 分发完成后读取；任一阶段的回调出错都会中止后续阶段。
    pub fn emit(&self, event: &str, data: T) -> RouterResult<&Self> {
        self.before.emit(event, data.clone())?;
        self.active().emit(event, data.clone())?;
        self.after.emit(event, data)?;
        Ok(self)
    }
}

impl<T: Clone + Default> Router<T> {
    /// 以默认载荷分发事件
    pub fn emit_empty(&self, event: &str) -> RouterResult<&Self> {
        self.emit(event, T::default())
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.route_names())
            .field("active", &self.active().name().to_string())
            .finish()
    }
}

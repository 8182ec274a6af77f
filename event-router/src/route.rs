//! 路由（Route）
//!
//! 一个路由持有“事件名 → 有序回调列表”的映射以及自身的分发策略：
//! - 事件名未注册：转交回退路由（若配置）；
//! - 已注册且回调非空：按注册顺序同步调用，回调出错立即中止并返回错误；
//! - 已注册但回调为空：仅当 `fallback_on_no_callbacks` 为真时转交回退路由。
//!
//! `Route` 本身是共享句柄，克隆后指向同一路由；回退路由同样以共享句柄保存，
//! 不转移所有权。
//!
use crate::error::RouterResult;
use crate::event::{Callback, Event};
use bon::Builder;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// 路由配置，构造路由后不可再修改
#[derive(Builder)]
pub struct RouteOptions<T> {
    /// 事件未在本路由定义时，转交给该路由
    fallback: Option<Route<T>>,
    /// 事件已定义但没有回调时，是否转交给回退路由
    #[builder(default = true)]
    fallback_on_no_callbacks: bool,
    /// 路由名称，主要供路由器使用
    #[builder(default, into)]
    name: String,
}

impl<T> RouteOptions<T> {
    pub fn fallback(&self) -> Option<&Route<T>> {
        self.fallback.as_ref()
    }

    pub fn fallback_on_no_callbacks(&self) -> bool {
        self.fallback_on_no_callbacks
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<T> Default for RouteOptions<T> {
    fn default() -> Self {
        Self {
            fallback: None,
            fallback_on_no_callbacks: true,
            name: String::new(),
        }
    }
}

impl<T> Clone for RouteOptions<T> {
    fn clone(&self) -> Self {
        Self {
            fallback: self.fallback.clone(),
            fallback_on_no_callbacks: self.fallback_on_no_callbacks,
            name: self.name.clone(),
        }
    }
}

impl<T> fmt::Debug for RouteOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteOptions")
            .field("fallback", &self.fallback.as_ref().map(|r| r.name()))
            .field("fallback_on_no_callbacks", &self.fallback_on_no_callbacks)
            .field("name", &self.name)
            .finish()
    }
}

struct RouteInner<T> {
    options: RouteOptions<T>,
    handlers: DashMap<String, Vec<Callback<T>>>,
}

/// 事件路由
pub struct Route<T = serde_json::Value> {
    inner: Arc<RouteInner<T>>,
}

impl<T> Route<T> {
    pub fn new() -> Self {
        Self::with_options(RouteOptions::default())
    }

    pub fn with_options(options: RouteOptions<T>) -> Self {
        Self {
            inner: Arc::new(RouteInner {
                options,
                handlers: DashMap::new(),
            }),
        }
    }

    /// 路由名称，未配置时为空字符串
    pub fn name(&self) -> &str {
        self.inner.options.name()
    }

    /// 当前配置的副本
    pub fn options(&self) -> RouteOptions<T> {
        self.inner.options.clone()
    }

    /// 是否为同一路由（引用身份）
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// 为事件追加回调，不做去重
    pub fn on(&self, event: impl Into<String>, callback: Callback<T>) -> &Self {
        self.inner
            .handlers
            .entry(event.into())
            .or_default()
            .push(callback);
        self
    }

    /// 移除事件的全部回调（连同事件名本身）
    pub fn off(&self, event: &str) -> &Self {
        self.inner.handlers.remove(event);
        self
    }

    /// 从事件的回调列表中移除第一个相同的回调；列表清空后事件名仍保留
    pub fn off_callback(&self, event: &str, callback: &Callback<T>) -> &Self {
        if let Some(mut callbacks) = self.inner.handlers.get_mut(event) {
            remove_first(&mut callbacks, callback);
        }
        self
    }

    /// 在所有事件的回调列表中各移除第一个相同的回调
    pub fn off_everywhere(&self, callback: &Callback<T>) -> &Self {
        for mut entry in self.inner.handlers.iter_mut() {
            remove_first(entry.value_mut(), callback);
        }
        self
    }

    /// 分发事件
    pub fn emit(&self, event: &str, data: T) -> RouterResult<&Self> {
        // 先取快照再释放锁，回调内可以安全地调用 on/off
        let callbacks = self.inner.handlers.get(event).map(|c| c.value().clone());

        match callbacks {
            None => self.emit_fallback(event, data)?,
            Some(callbacks) if callbacks.is_empty() => {
                if self.inner.options.fallback_on_no_callbacks() {
                    self.emit_fallback(event, data)?;
                }
            }
            Some(callbacks) => {
                trace!(
                    route = self.name(),
                    event,
                    handlers = callbacks.len(),
                    "dispatching event"
                );
                let ev = Event::new(data);
                for callback in &callbacks {
                    callback.call(&ev)?;
                }
            }
        }

        Ok(self)
    }

    fn emit_fallback(&self, event: &str, data: T) -> RouterResult<()> {
        if let Some(fallback) = self.inner.options.fallback() {
            trace!(
                route = self.name(),
                fallback = fallback.name(),
                event,
                "forwarding event to fallback"
            );
            fallback.emit(event, data)?;
        }
        Ok(())
    }

    /// 已注册的事件名（只读视图，顺序不保证）
    pub fn event_names(&self) -> Vec<String> {
        self.inner.handlers.iter().map(|e| e.key().clone()).collect()
    }

    /// 事件当前的回调数量，未注册时为 0
    pub fn handler_count(&self, event: &str) -> usize {
        self.inner.handlers.get(event).map_or(0, |c| c.len())
    }
}

impl<T: Default> Route<T> {
    /// 以默认载荷分发事件
    pub fn emit_empty(&self, event: &str) -> RouterResult<&Self> {
        self.emit(event, T::default())
    }
}

fn remove_first<T>(callbacks: &mut Vec<Callback<T>>, callback: &Callback<T>) {
    if let Some(pos) = callbacks.iter().position(|c| c.ptr_eq(callback)) {
        callbacks.remove(pos);
    }
}

impl<T> Default for Route<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Route<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PartialEq for Route<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for Route<T> {}

impl<T> fmt::Debug for Route<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name())
            .field("events", &self.event_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, tag: &'static str) -> Callback<Value> {
        let log = log.clone();
        Callback::new(move |e: &Event<Value>| {
            log.lock().unwrap().push(format!("{tag}:{}", e.data()));
            Ok(())
        })
    }

    fn counter() -> (Callback<Value>, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let cb = {
            let hits = hits.clone();
            Callback::new(move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
        };
        (cb, hits)
    }

    #[test]
    fn options_default_and_copy() {
        let route: Route = Route::new();
        let opts = route.options();
        assert!(opts.fallback().is_none());
        assert!(opts.fallback_on_no_callbacks());
        assert_eq!(opts.name(), "");
        assert_eq!(route.name(), "");

        let fallback: Route = Route::new();
        let route = Route::with_options(
            RouteOptions::builder()
                .fallback(fallback.clone())
                .fallback_on_no_callbacks(false)
                .name("menu")
                .build(),
        );
        let opts = route.options();
        assert_eq!(route.name(), "menu");
        assert!(!opts.fallback_on_no_callbacks());
        assert_eq!(opts.fallback(), Some(&fallback));

        // 副本的修改不影响路由本身
        let renamed = opts.with_name("other");
        assert_eq!(renamed.name(), "other");
        assert_eq!(route.name(), "menu");
    }

    #[test]
    fn emit_invokes_each_registration_in_order() {
        let log = Log::default();
        let first = recorder(&log, "a");
        let route: Route = Route::new();
        route
            .on("tick", first.clone())
            .on("tick", recorder(&log, "b"))
            .on("tick", first);

        route.emit("tick", json!(1)).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a:1", "b:1", "a:1"]);
    }

    #[test]
    fn unknown_event_without_fallback_is_noop() {
        let (cb, hits) = counter();
        let route: Route = Route::new();
        route.on("known", cb);

        route.emit("unknown", Value::Null).unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn off_removes_whole_event() {
        let (a, hits_a) = counter();
        let (b, hits_b) = counter();
        let route: Route = Route::new();
        route.on("x", a).on("x", b);

        route.off("x").emit("x", Value::Null).unwrap();
        assert_eq!(hits_a.load(Ordering::Relaxed), 0);
        assert_eq!(hits_b.load(Ordering::Relaxed), 0);
        assert!(route.event_names().is_empty());
    }

    #[test]
    fn off_callback_removes_first_occurrence_only() {
        let (a, hits_a) = counter();
        let (b, hits_b) = counter();
        let route: Route = Route::new();
        route.on("x", a.clone()).on("x", a.clone()).on("x", b);

        route.off_callback("x", &a).emit("x", Value::Null).unwrap();
        assert_eq!(hits_a.load(Ordering::Relaxed), 1);
        assert_eq!(hits_b.load(Ordering::Relaxed), 1);

        // 未注册的回调或事件：无操作
        let (stranger, _) = counter();
        route.off_callback("x", &stranger).off_callback("nope", &a);
        assert_eq!(route.handler_count("x"), 2);
    }

    #[test]
    fn off_callback_matches_identity_not_body() {
        let log = Log::default();
        let a = recorder(&log, "same");
        let b = recorder(&log, "same");
        let route: Route = Route::new();
        route.on("x", a).on("x", b.clone());

        route.off_callback("x", &b);
        assert_eq!(route.handler_count("x"), 1);
    }

    #[test]
    fn off_everywhere_removes_one_per_list() {
        let (a, hits) = counter();
        let route: Route = Route::new();
        route
            .on("x", a.clone())
            .on("x", a.clone())
            .on("y", a.clone())
            .on("z", a.clone());

        route.off_everywhere(&a);
        assert_eq!(route.handler_count("x"), 1);
        assert_eq!(route.handler_count("y"), 0);
        assert_eq!(route.handler_count("z"), 0);

        route.emit("x", Value::Null).unwrap();
        route.emit("y", Value::Null).unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn unknown_event_forwards_to_fallback() {
        let log = Log::default();
        let fallback: Route = Route::new();
        fallback.on("x", recorder(&log, "fb"));
        let route = Route::with_options(RouteOptions::builder().fallback(fallback).build());

        route.emit("x", json!("hi")).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![r#"fb:"hi""#]);
    }

    #[test]
    fn emptied_event_respects_fallback_on_no_callbacks() {
        let (fb_cb, fb_hits) = counter();
        let (own, own_hits) = counter();
        let fallback: Route = Route::new();
        fallback.on("x", fb_cb);

        let strict = Route::with_options(
            RouteOptions::builder()
                .fallback(fallback.clone())
                .fallback_on_no_callbacks(false)
                .build(),
        );
        strict.on("x", own.clone()).off_callback("x", &own);
        strict.emit("x", Value::Null).unwrap();
        assert_eq!(fb_hits.load(Ordering::Relaxed), 0);
        assert_eq!(own_hits.load(Ordering::Relaxed), 0);

        let lenient = Route::with_options(RouteOptions::builder().fallback(fallback).build());
        lenient.on("x", own.clone()).off_callback("x", &own);
        lenient.emit("x", Value::Null).unwrap();
        assert_eq!(fb_hits.load(Ordering::Relaxed), 1);
        assert_eq!(own_hits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn unknown_event_forwards_even_when_fallback_on_no_callbacks_disabled() {
        let (fb_cb, fb_hits) = counter();
        let fallback: Route = Route::new();
        fallback.on("x", fb_cb);
        let route = Route::with_options(
            RouteOptions::builder()
                .fallback(fallback)
                .fallback_on_no_callbacks(false)
                .build(),
        );

        // 从未注册的事件：与开关无关，总是转交
        route.emit("x", Value::Null).unwrap();
        assert_eq!(fb_hits.load(Ordering::Relaxed), 1);

        // off(event) 删除事件名后同样视为未注册
        let (own, own_hits) = counter();
        route.on("x", own).off("x");
        route.emit("x", Value::Null).unwrap();
        assert_eq!(fb_hits.load(Ordering::Relaxed), 2);
        assert_eq!(own_hits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn fallback_chains_transitively() {
        let log = Log::default();
        let last: Route = Route::new();
        last.on("x", recorder(&log, "last"));
        let middle = Route::with_options(RouteOptions::builder().fallback(last).build());
        let first = Route::with_options(RouteOptions::builder().fallback(middle).build());

        first.emit("x", json!(7)).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["last:7"]);
    }

    #[test]
    fn handler_error_aborts_remaining_handlers() {
        let (after, hits) = counter();
        let route: Route = Route::new();
        route
            .on("x", Callback::new(|_| anyhow::bail!("boom")))
            .on("x", after);

        let err = route.emit("x", Value::Null).unwrap_err();
        assert!(matches!(err, RouterError::Handler(_)));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(hits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn handlers_added_during_emit_wait_for_next_emit() {
        let (late, hits) = counter();
        let route: Route = Route::new();
        let registrar = {
            let route = route.clone();
            Callback::new(move |_| {
                route.on("x", late.clone());
                Ok(())
            })
        };
        route.on("x", registrar.clone());

        route.emit("x", Value::Null).unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 0);

        route.off_callback("x", &registrar);
        route.emit("x", Value::Null).unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn emit_empty_uses_default_payload() {
        let seen = Arc::new(Mutex::new(None));
        let route: Route<Option<u32>> = Route::new();
        {
            let seen = seen.clone();
            route.on(
                "x",
                Callback::new(move |e: &Event<Option<u32>>| {
                    *seen.lock().unwrap() = Some(*e.data());
                    Ok(())
                }),
            );
        }

        route.emit_empty("x").unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(None));
    }
}

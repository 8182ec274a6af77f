/// 事件路由示例
/// 展示菜单/游戏两个场景路由的切换、before/after 公共处理以及回退路由
use anyhow::Result as AnyResult;
use event_router::{Callback, Event, RouteOptions, Router};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")),
        )
        .with_target(false)
        .init();

    let router: Router = Router::new();
    let score = Arc::new(Mutex::new(0_i64));

    // 公共处理：任何场景下的按键都会先后经过 before/after
    router.before().on(
        "key",
        Callback::new(|e: &Event| {
            println!("[before] key {}", e.data());
            Ok(())
        }),
    );
    router.after().on(
        "key",
        Callback::new(|_| {
            println!("[after] frame done");
            Ok(())
        }),
    );

    // 菜单场景未处理的事件交给 default 路由
    router.default_route().on(
        "quit",
        Callback::new(|_| {
            println!("[default] bye");
            Ok(())
        }),
    );
    let menu = router.route_with(
        "menu",
        RouteOptions::builder()
            .fallback(router.default_route().clone())
            .build(),
    )?;
    menu.on(
        "key",
        Callback::new(|e: &Event| {
            println!("[menu] selected {}", e.data());
            Ok(())
        }),
    );

    let game = router.route("game")?;
    {
        let score = score.clone();
        game.on(
            "score",
            Callback::new(move |e: &Event| {
                let points = e.data().as_i64().unwrap_or_default();
                *score.lock().unwrap() += points;
                println!("[game] +{points}");
                Ok(())
            }),
        );
    }

    router.set_active("menu")?;
    router.emit("key", json!("enter"))?;
    router.emit("quit", Value::Null)?;

    router.set_active("game")?;
    router.emit("score", json!(10))?.emit("score", json!(5))?;

    println!("total score: {}", score.lock().unwrap());
    Ok(())
}

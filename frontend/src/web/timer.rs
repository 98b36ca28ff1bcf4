//! 定时器封装模块
//!
//! 基于 `gloo-timers` 的 `Timeout`，句柄被 drop 时自动 `clearTimeout`。

use crate::maps::Scheduler;
use gloo_timers::callback::Timeout;
use std::time::Duration;

/// 浏览器调度器
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserScheduler;

/// 延时任务句柄，drop 即取消
pub struct TimeoutHandle(#[allow(dead_code)] Timeout);

impl Scheduler for BrowserScheduler {
    type Handle = TimeoutHandle;

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimeoutHandle {
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        // 任务在 timeout 回调返回后执行，任务内部可以安全地 drop 自己的句柄
        TimeoutHandle(Timeout::new(millis, move || {
            wasm_bindgen_futures::spawn_local(async move { task() });
        }))
    }
}

//! Geolocation 封装模块
//!
//! - `watch_stream`: 连续定位，返回句柄 + 事件流；句柄 drop 时调用 `clearWatch`
//! - `get_once`: 单次定位

use crate::location::{GeolocationError, Position, TrackerOptions};
use futures::channel::{mpsc, oneshot};
use starmap_shared::LatLng;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::{Geolocation, PositionError, PositionOptions};

// 浏览器回调参数（稳定 API 中的名称）
type JsPosition = web_sys::Position;

pub type PositionEvent = Result<Position, GeolocationError>;

type SuccessCallback = Closure<dyn FnMut(JsPosition)>;
type ErrorCallback = Closure<dyn FnMut(PositionError)>;

/// 连续定位句柄
///
/// 持有 JS 回调，drop 时释放浏览器的 watch id。
pub struct WatchHandle {
    geolocation: Geolocation,
    watch_id: i32,
    _on_success: SuccessCallback,
    _on_error: ErrorCallback,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.geolocation.clear_watch(self.watch_id);
        log_info!("[Geolocation] Watch {} released", self.watch_id);
    }
}

fn geolocation() -> Result<Geolocation, GeolocationError> {
    web_sys::window()
        .ok_or(GeolocationError::Unavailable)?
        .navigator()
        .geolocation()
        .map_err(|_| GeolocationError::Unavailable)
}

fn position_options(options: &TrackerOptions) -> PositionOptions {
    let js = PositionOptions::new();
    js.set_enable_high_accuracy(options.high_accuracy);
    js.set_timeout(options.timeout.as_millis() as u32);
    js.set_maximum_age(options.maximum_age.as_millis() as u32);
    js
}

fn to_position(pos: &JsPosition) -> Position {
    let coords = pos.coords();
    Position {
        coords: LatLng::new(coords.latitude(), coords.longitude()),
        accuracy: coords.accuracy(),
    }
}

/// 开始连续定位，每次更新调用 `on_event`
pub fn watch<F>(options: &TrackerOptions, on_event: F) -> Result<WatchHandle, GeolocationError>
where
    F: Fn(PositionEvent) + 'static,
{
    let geolocation = geolocation()?;
    let on_event = Rc::new(on_event);

    let on_success = {
        let on_event = on_event.clone();
        SuccessCallback::new(move |pos: JsPosition| on_event(Ok(to_position(&pos))))
    };
    let on_error = ErrorCallback::new(move |err: PositionError| {
        on_event(Err(GeolocationError::from_code(err.code())))
    });

    let watch_id = geolocation
        .watch_position_with_error_callback_and_options(
            on_success.as_ref().unchecked_ref(),
            Some(on_error.as_ref().unchecked_ref()),
            &position_options(options),
        )
        .map_err(|_| GeolocationError::Unavailable)?;

    log_info!("[Geolocation] Watch {} started", watch_id);
    Ok(WatchHandle {
        geolocation,
        watch_id,
        _on_success: on_success,
        _on_error: on_error,
    })
}

/// 连续定位的流式接口
pub fn watch_stream(
    options: &TrackerOptions,
) -> Result<(WatchHandle, mpsc::UnboundedReceiver<PositionEvent>), GeolocationError> {
    let (tx, rx) = mpsc::unbounded();
    let handle = watch(options, move |event| {
        // 接收端已关闭时忽略
        let _ = tx.unbounded_send(event);
    })?;
    Ok((handle, rx))
}

/// 单次定位
pub async fn get_once(options: &TrackerOptions) -> PositionEvent {
    let geolocation = geolocation()?;
    let (tx, rx) = oneshot::channel::<PositionEvent>();
    let tx = Rc::new(RefCell::new(Some(tx)));

    let on_success = {
        let tx = tx.clone();
        SuccessCallback::new(move |pos: JsPosition| {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(Ok(to_position(&pos)));
            }
        })
    };
    let on_error = ErrorCallback::new(move |err: PositionError| {
        if let Some(tx) = tx.borrow_mut().take() {
            let _ = tx.send(Err(GeolocationError::from_code(err.code())));
        }
    });

    geolocation
        .get_current_position_with_error_callback_and_options(
            on_success.as_ref().unchecked_ref(),
            Some(on_error.as_ref().unchecked_ref()),
            &position_options(options),
        )
        .map_err(|_| GeolocationError::Unavailable)?;

    // 回调在 await 期间保持存活
    let result = rx.await.unwrap_or(Err(GeolocationError::Unknown));
    drop((on_success, on_error));
    result
}

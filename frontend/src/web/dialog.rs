//! 浏览器对话框与页面跳转

/// 模态提示框
pub fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        if let Err(e) = window.alert_with_message(message) {
            log_error!("[Dialog] alert failed: {:?}", e);
        }
    }
}

/// 整页跳转（登录 / 登出由后端处理）
pub fn navigate_to(path: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Err(e) = window.location().assign(path) {
        log_error!("[Dialog] navigation to {} failed: {:?}", path, e);
    }
}

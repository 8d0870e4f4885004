//! 日志初始化
//!
//! 默认级别为 `info`，可通过 `RUST_LOG` 覆盖。重复调用是安全的，
//! 后续调用会被忽略（测试中多次初始化也不会 panic）。

use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_logging() {
    init_logging_with_filter(None);
}

/// `filter` 使用 `env_logger` 语法，例如 `"qr_workbench=debug"`。
pub fn init_logging_with_filter(filter: Option<&str>) {
    INIT.call_once(|| {
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
        if let Some(filter) = filter {
            builder.parse_filters(filter);
        }
        if builder.try_init().is_err() {
            log::debug!("logger already installed, keeping existing one");
        }
    });
}

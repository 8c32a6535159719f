use nvim_oxi::{Array, Object, api};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{LazyLock, Mutex};
use texsync_core::{LogLevel, LogRecord};

use crate::LOG_SOURCE_NAME;

static LOG_LEVEL: AtomicI64 = AtomicI64::new(LogLevel::Info.notify_level());
static LOG_FILE_PATH: LazyLock<Option<PathBuf>> =
    LazyLock::new(|| std::env::var_os("TEXSYNC_LOG_FILE").map(PathBuf::from));
static LOG_FILE_HANDLE: LazyLock<Mutex<Option<File>>> = LazyLock::new(|| Mutex::new(None));

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level.notify_level(), Ordering::Relaxed);
}

fn should_log(level: LogLevel) -> bool {
    LOG_LEVEL.load(Ordering::Relaxed) <= level.notify_level()
}

fn append_log_line(level_name: &str, message: &str) {
    let Some(path) = LOG_FILE_PATH.as_ref() else {
        return;
    };
    let Ok(mut file_guard) = LOG_FILE_HANDLE.lock() else {
        return;
    };

    if file_guard.is_none() {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                *file_guard = Some(file);
            }
            Err(err) => {
                api::err_writeln(&format!(
                    "[{LOG_SOURCE_NAME}] failed to open log file {}: {err}",
                    path.display()
                ));
                return;
            }
        }
    }

    if let Some(file) = file_guard.as_mut()
        && let Err(err) = writeln!(file, "[{LOG_SOURCE_NAME}][{level_name}] {message}")
    {
        api::err_writeln(&format!(
            "[{LOG_SOURCE_NAME}] failed to write log file: {err}"
        ));
        *file_guard = None;
    }
}

pub fn log(record: &LogRecord) {
    if !should_log(record.level) {
        return;
    }

    let level_name = record.level.name();
    append_log_line(level_name, &record.message);
    let payload_message = format!("[{LOG_SOURCE_NAME}][{level_name}] {}", record.message);
    let payload = Array::from_iter([
        Object::from(payload_message),
        Object::from(record.level.notify_level()),
    ]);
    let args = Array::from_iter([
        Object::from("vim.notify(_A[1], _A[2])"),
        Object::from(payload),
    ]);
    if let Err(err) = api::call_function::<_, Object>("luaeval", args) {
        api::err_writeln(&format!("[{LOG_SOURCE_NAME}] vim.notify failed: {err}"));
    }
}

pub fn info(message: impl Into<String>) {
    log(&LogRecord::info(message));
}

pub fn warn(message: impl Into<String>) {
    log(&LogRecord::warn(message));
}

pub fn error(message: impl Into<String>) {
    log(&LogRecord::error(message));
}

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use nvim_oxi::libuv::TimerHandle;
use nvim_oxi::{Dictionary, schedule};
use texsync_core::glyphs::{FontSet, TtfFont};
use texsync_core::protocol::{InboundMessage, OutboundMessage};
use texsync_core::{
    DecodedDocument, Generation, GenerationError, PreviewConfig, PreviewSession, SessionCommand,
    SessionEffect, SessionEvent, SessionTransition,
};
use texsync_nvim_oxi_utils::decode;
use texsync_nvim_oxi_utils::guard;
use texsync_nvim_oxi_utils::handles::BufHandle;

use crate::args::{
    ArgsError, CursorMovedArgs, FailGenerationArgs, LoadDocumentArgs, MagnifyArgs,
    TargetMessageArgs, parse_buf_handle,
};
use crate::state::{clear_all_sync_timers, clear_sync_timer, context, set_sync_timer};
use crate::{bridge, logging};

fn report_panic(label: &str, info: &guard::PanicInfo) {
    logging::error(format!("{label} panic: {}", info.render()));
}

/// Run a Lua entry point, turning argument errors and panics into
/// notifications.
fn run_entry<F>(label: &'static str, f: F)
where
    F: FnOnce() -> Result<(), ArgsError>,
{
    guard::with_panic(
        (),
        || {
            if let Err(err) = f() {
                logging::warn(format!("{label}: {err}"));
            }
        },
        |info| report_panic(label, &info),
    );
}

fn now_ms() -> u64 {
    let duration = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(err) => err.duration(),
    };
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn post(buf_handle: BufHandle, message: &OutboundMessage) -> Option<SessionTransition> {
    let delivered = match message.to_json() {
        Ok(json) => match bridge::post(buf_handle, json) {
            Ok(accepted) => accepted,
            Err(err) => {
                logging::warn(format!("post to rendering target failed: {err}"));
                false
            }
        },
        Err(err) => {
            logging::error(format!("encode message failed: {err}"));
            false
        }
    };
    if delivered {
        return None;
    }
    let OutboundMessage::RenderPage { page_index, .. } = message else {
        return None;
    };
    context().apply_event(buf_handle, SessionEvent::RenderRejected { page: *page_index })
}

fn execute_effect(buf_handle: BufHandle, effect: SessionEffect) -> Option<SessionTransition> {
    match effect {
        SessionEffect::Post(message) => post(buf_handle, &message),
        SessionEffect::RevealLine(line) => {
            if let Err(err) = bridge::reveal_line(buf_handle, line.raw()) {
                logging::warn(format!("reveal line {line} failed: {err}"));
            }
            None
        }
        SessionEffect::Status(status) => {
            if let Err(err) = bridge::set_status(buf_handle, status.to_string()) {
                logging::warn(format!("set status failed: {err}"));
            }
            None
        }
        SessionEffect::Log(record) => {
            logging::log(&record);
            None
        }
    }
}

fn schedule_forward_sync(buf_handle: BufHandle, delay_ms: u64) {
    clear_sync_timer(buf_handle);
    match TimerHandle::once(Duration::from_millis(delay_ms), move || {
        schedule(move |_| {
            clear_sync_timer(buf_handle);
            let transition = context().apply_event(
                buf_handle,
                SessionEvent::ForwardSyncDue { now_ms: now_ms() },
            );
            if let Some(transition) = transition {
                execute_transition(buf_handle, transition);
            }
        });
    }) {
        Ok(handle) => set_sync_timer(buf_handle, handle),
        Err(err) => logging::warn(format!("failed to schedule forward sync: {err}")),
    }
}

fn execute_command(buf_handle: BufHandle, command: SessionCommand) {
    match command {
        SessionCommand::ScheduleForwardSync { delay_ms } => {
            schedule_forward_sync(buf_handle, delay_ms);
        }
    }
}

/// Execute effects in order. Follow-up transitions (a rejected render)
/// run after the current one.
fn execute_transition(buf_handle: BufHandle, transition: SessionTransition) {
    let mut pending = VecDeque::from([transition]);
    while let Some(transition) = pending.pop_front() {
        for effect in transition.effects {
            if let Some(follow_up) = execute_effect(buf_handle, effect) {
                pending.push_back(follow_up);
            }
        }
        if let Some(command) = transition.command {
            execute_command(buf_handle, command);
        }
    }
}

fn load_fonts(document: &DecodedDocument) -> FontSet {
    let mut fonts = FontSet::default();
    for font in &document.fonts {
        let path = Path::new(&font.font_path).join(&font.font_name);
        match TtfFont::load(font.font_num, &path) {
            Ok(loaded) => fonts.insert(font.font_num, Arc::new(loaded)),
            Err(err) => logging::warn(format!("font {} unavailable: {err}", path.display())),
        }
    }
    fonts
}

fn read_trace(path: Option<&Path>) -> Result<Option<String>, GenerationError> {
    let Some(path) = path else {
        return Ok(None);
    };
    match std::fs::read_to_string(path) {
        Ok(trace) => Ok(Some(trace)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn read_generation(args: &LoadDocumentArgs) -> Result<Generation, GenerationError> {
    let json = std::fs::read_to_string(&args.document)?;
    let document = DecodedDocument::from_json(&json)?;
    let fonts = load_fonts(&document);
    let trace = read_trace(args.trace.as_deref())?;
    Ok(Generation {
        source: args.source.clone(),
        document,
        fonts,
        trace,
    })
}

fn with_session_transition(
    buf_handle: BufHandle,
    f: impl FnOnce(&mut PreviewSession) -> SessionTransition,
) -> Result<(), ArgsError> {
    let transition = context()
        .with_session(buf_handle, f)
        .map_err(|err| ArgsError::Unexpected {
            message: err.to_string(),
        })?;
    execute_transition(buf_handle, transition);
    Ok(())
}

pub fn setup_lua(opts: &Dictionary) {
    run_entry("setup", || {
        let config: PreviewConfig = decode::deserialize(opts)?;
        logging::set_log_level(config.log_level);
        let transitions = context()
            .configure(config)
            .map_err(|err| ArgsError::Unexpected {
                message: err.to_string(),
            })?;
        for (buf_handle, transition) in transitions {
            execute_transition(buf_handle, transition);
        }
        Ok(())
    });
}

pub fn load_document_lua(args: &Dictionary) {
    run_entry("load_document", || {
        let args = LoadDocumentArgs::parse(args)?;
        let buf_handle = args.buf_handle;
        clear_sync_timer(buf_handle);
        match read_generation(&args) {
            Ok(generation) => {
                with_session_transition(buf_handle, |session| session.load_generation(generation))
            }
            Err(err) => {
                with_session_transition(buf_handle, |session| session.fail_generation(&err))
            }
        }
    });
}

pub fn fail_generation_lua(args: &Dictionary) {
    run_entry("fail_generation", || {
        let args = FailGenerationArgs::parse(args)?;
        clear_sync_timer(args.buf_handle);
        let error = GenerationError::Toolchain {
            output: args.output,
        };
        with_session_transition(args.buf_handle, |session| session.fail_generation(&error))
    });
}

pub fn on_cursor_moved_lua(args: &Dictionary) {
    run_entry("on_cursor_moved", || {
        let args = CursorMovedArgs::parse(args)?;
        let event = SessionEvent::CursorMoved {
            line: args.line,
            now_ms: now_ms(),
        };
        if let Some(transition) = context().apply_event(args.buf_handle, event) {
            execute_transition(args.buf_handle, transition);
        }
        Ok(())
    });
}

pub fn on_render_target_message_lua(args: &Dictionary) {
    run_entry("on_render_target_message", || {
        let args = TargetMessageArgs::parse(args)?;
        let message =
            InboundMessage::from_json(&args.message).map_err(|err| ArgsError::InvalidValue {
                key: "message".to_string(),
                expected: if err.is_data() {
                    "a known rendering target command"
                } else {
                    "a JSON object"
                },
            })?;
        if let Some(transition) =
            context().apply_event(args.buf_handle, SessionEvent::Inbound(message))
        {
            execute_transition(args.buf_handle, transition);
        }
        Ok(())
    });
}

pub fn adjust_magnification_lua(args: &Dictionary) {
    run_entry("adjust_magnification", || {
        let args = MagnifyArgs::parse(args)?;
        if let Some(transition) = context().with_existing(args.buf_handle, |session| {
            session.adjust_magnification(args.delta)
        }) {
            execute_transition(args.buf_handle, transition);
        }
        Ok(())
    });
}

pub fn export_document_lua(buf: i64) {
    run_entry("export_document", || {
        let buf_handle = parse_buf_handle(buf)?;
        let exported = context().with_existing(buf_handle, |session| {
            session
                .export_target()
                .map(|(path, document)| (path, document.to_json_pretty()))
        });
        let Some(Some((path, json))) = exported else {
            logging::warn("no document to export");
            return Ok(());
        };
        let json = json.map_err(|err| ArgsError::Unexpected {
            message: err.to_string(),
        })?;
        match std::fs::write(&path, json) {
            Ok(()) => logging::info(format!("exported {}", path.display())),
            Err(err) => logging::error(format!("export to {} failed: {err}", path.display())),
        }
        Ok(())
    });
}

pub fn status_lua(buf: i64) -> String {
    guard::with_panic(
        String::new(),
        || {
            parse_buf_handle(buf)
                .ok()
                .and_then(|buf_handle| context().with_existing(buf_handle, |session| session.status()))
                .flatten()
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default()
        },
        |info| report_panic("status", &info),
    )
}

pub fn close_lua(buf: i64) {
    run_entry("close", || {
        let buf_handle = parse_buf_handle(buf)?;
        clear_sync_timer(buf_handle);
        context().remove(buf_handle);
        Ok(())
    });
}

pub fn reset_state_lua() {
    run_entry("reset_state", || {
        clear_all_sync_timers();
        context().reset();
        Ok(())
    });
}

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::LazyLock;

use nvim_oxi::libuv::TimerHandle;
use texsync_core::{ConfigError, PreviewConfig, PreviewSession, SessionEvent, SessionTransition};
use texsync_nvim_oxi_utils::handles::BufHandle;
use texsync_nvim_oxi_utils::state::{StateCell, StateGuard};
use texsync_support::state_machine::apply_event;

use crate::logging;

#[derive(Debug, Default)]
pub struct State {
    config: PreviewConfig,
    sessions: HashMap<BufHandle, PreviewSession>,
}

#[derive(Debug)]
pub struct PreviewContext {
    state: StateCell<State>,
}

impl PreviewContext {
    fn new() -> Self {
        Self {
            state: StateCell::new(State::default()),
        }
    }

    fn state_lock(&self) -> StateGuard<'_, State> {
        self.state.lock_recover(|state| {
            let dropped = state.sessions.len();
            logging::warn(format!(
                "state mutex poisoned; resetting preview sessions (dropping {dropped})"
            ));
            *state = State::default();
        })
    }

    /// Store `config` and push it into every open session.
    pub fn configure(
        &self,
        config: PreviewConfig,
    ) -> Result<Vec<(BufHandle, SessionTransition)>, ConfigError> {
        config.validate()?;
        let mut state = self.state_lock();
        state.config = config.clone();
        let mut transitions = Vec::with_capacity(state.sessions.len());
        for (buf_handle, session) in &mut state.sessions {
            transitions.push((*buf_handle, session.configure(config.clone())?));
        }
        Ok(transitions)
    }

    /// Run `f` on the session of `buf_handle`, creating it on first use.
    pub fn with_session<R>(
        &self,
        buf_handle: BufHandle,
        f: impl FnOnce(&mut PreviewSession) -> R,
    ) -> Result<R, ConfigError> {
        let mut state = self.state_lock();
        let config = state.config.clone();
        let session = match state.sessions.entry(buf_handle) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(PreviewSession::new(config)?),
        };
        Ok(f(session))
    }

    /// Run `f` on an existing session only.
    pub fn with_existing<R>(
        &self,
        buf_handle: BufHandle,
        f: impl FnOnce(&mut PreviewSession) -> R,
    ) -> Option<R> {
        let mut state = self.state_lock();
        state.sessions.get_mut(&buf_handle).map(f)
    }

    pub fn apply_event(
        &self,
        buf_handle: BufHandle,
        event: SessionEvent,
    ) -> Option<SessionTransition> {
        self.with_existing(buf_handle, |session| apply_event(session, event))
    }

    pub fn remove(&self, buf_handle: BufHandle) -> bool {
        self.state_lock().sessions.remove(&buf_handle).is_some()
    }

    pub fn reset(&self) {
        let mut state = self.state_lock();
        state.sessions.clear();
    }
}

static CONTEXT: LazyLock<PreviewContext> = LazyLock::new(PreviewContext::new);

pub fn context() -> &'static PreviewContext {
    &CONTEXT
}

thread_local! {
    static SYNC_TIMERS: RefCell<HashMap<BufHandle, TimerHandle>> = RefCell::new(HashMap::new());
}

pub fn set_sync_timer(buf_handle: BufHandle, handle: TimerHandle) {
    SYNC_TIMERS.with(|timers| {
        timers.borrow_mut().insert(buf_handle, handle);
    });
}

pub fn clear_sync_timer(buf_handle: BufHandle) {
    SYNC_TIMERS.with(|timers| {
        let _ = timers.borrow_mut().remove(&buf_handle);
    });
}

pub fn clear_all_sync_timers() {
    SYNC_TIMERS.with(|timers| timers.borrow_mut().clear());
}

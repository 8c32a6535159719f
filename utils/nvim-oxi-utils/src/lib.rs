//! nvim-oxi helpers shared by the preview plugin.

pub mod decode;
mod error;

pub use error::{Error, Result};

pub mod guard {
    use std::any::Any;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    /// Captured panic payload.
    #[derive(Debug, Clone)]
    pub enum PanicInfo {
        Message(String),
        Unknown,
    }

    impl PanicInfo {
        pub fn render(&self) -> String {
            match self {
                Self::Message(msg) => msg.clone(),
                Self::Unknown => "panic payload: <non-string>".to_string(),
            }
        }

        fn from_payload(payload: &(dyn Any + Send)) -> Self {
            payload
                .downcast_ref::<&str>()
                .map(|msg| (*msg).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .map_or(Self::Unknown, Self::Message)
        }
    }

    /// Execute `f`, returning `fallback` on panic and handing the payload to
    /// `on_panic`. Lua callbacks must never unwind into Neovim.
    pub fn with_panic<F, R, G>(fallback: R, f: F, on_panic: G) -> R
    where
        F: FnOnce() -> R,
        G: FnOnce(PanicInfo),
    {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => value,
            Err(payload) => {
                on_panic(PanicInfo::from_payload(payload.as_ref()));
                fallback
            }
        }
    }
}

pub mod state {
    use std::ops::{Deref, DerefMut};
    use std::sync::{Mutex, MutexGuard};

    /// Mutex-backed plugin state that repairs itself after a poisoned lock.
    #[derive(Debug)]
    pub struct StateCell<T> {
        inner: Mutex<T>,
    }

    impl<T> StateCell<T> {
        pub const fn new(value: T) -> Self {
            Self {
                inner: Mutex::new(value),
            }
        }

        /// Lock the state, running `recover` first when a previous holder
        /// panicked.
        pub fn lock_recover<F>(&self, recover: F) -> StateGuard<'_, T>
        where
            F: FnOnce(&mut T),
        {
            let mut guard = match self.inner.lock() {
                Ok(guard) => return StateGuard { guard },
                Err(poisoned) => poisoned.into_inner(),
            };
            recover(&mut guard);
            self.inner.clear_poison();
            StateGuard { guard }
        }
    }

    #[derive(Debug)]
    pub struct StateGuard<'a, T> {
        guard: MutexGuard<'a, T>,
    }

    impl<T> Deref for StateGuard<'_, T> {
        type Target = T;

        fn deref(&self) -> &Self::Target {
            &self.guard
        }
    }

    impl<T> DerefMut for StateGuard<'_, T> {
        fn deref_mut(&mut self) -> &mut Self::Target {
            &mut self.guard
        }
    }
}

pub mod lua {
    use nvim_oxi::Result;
    use nvim_oxi::mlua;

    pub fn state() -> mlua::Lua {
        nvim_oxi::mlua::lua()
    }

    /// Require a Lua module, returning it as a table.
    pub fn require_table(lua: &mlua::Lua, name: &str) -> Result<mlua::Table> {
        let require: mlua::Function = lua.globals().get("require")?;
        require.call(name).map_err(Into::into)
    }

    pub fn call_table_function<A, R>(table: &mlua::Table, name: &str, args: A) -> Result<R>
    where
        A: mlua::IntoLuaMulti,
        R: mlua::FromLuaMulti,
    {
        let fun: mlua::Function = table.get(name)?;
        fun.call(args).map_err(Into::into)
    }
}

pub mod handles {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct BufHandle(i64);

    impl BufHandle {
        /// Accept only positive handles that fit Neovim's `i32` handle space.
        pub fn try_from_i64(handle: i64) -> Option<Self> {
            if handle <= 0 {
                return None;
            }
            i32::try_from(handle).ok().map(|_| Self(handle))
        }

        pub const fn raw(self) -> i64 {
            self.0
        }
    }
}

pub mod dict {
    use crate::decode;
    use crate::Result;
    use nvim_oxi::Dictionary;
    use texsync_support::NonEmptyString;

    pub fn require_i64(dict: &Dictionary, key: &str) -> Result<i64> {
        decode::require_i64(decode::get_object(dict, key), key)
    }

    pub fn require_string(dict: &Dictionary, key: &str) -> Result<String> {
        decode::require_string(decode::get_object(dict, key), key)
    }

    pub fn require_string_nonempty(dict: &Dictionary, key: &str) -> Result<NonEmptyString> {
        decode::require_nonempty_string(decode::get_object(dict, key), key)
    }

    pub fn optional_string_nonempty(
        dict: &Dictionary,
        key: &str,
    ) -> Result<Option<NonEmptyString>> {
        decode::optional_nonempty_string(decode::get_object(dict, key), key)
    }
}

#[cfg(test)]
mod tests {
    use super::handles::BufHandle;

    #[test]
    fn buf_handle_rejects_non_positive() {
        assert!(BufHandle::try_from_i64(0).is_none());
        assert!(BufHandle::try_from_i64(-1).is_none());
        assert!(BufHandle::try_from_i64(i64::MIN).is_none());
    }

    #[test]
    fn buf_handle_rejects_overflow_i32_max_plus_one() {
        let overflow = i64::from(i32::MAX) + 1;
        assert!(BufHandle::try_from_i64(overflow).is_none());
        assert!(BufHandle::try_from_i64(i64::MAX).is_none());
    }

    #[test]
    fn buf_handle_keeps_raw_value() {
        assert_eq!(BufHandle::try_from_i64(7).map(BufHandle::raw), Some(7));
    }
}

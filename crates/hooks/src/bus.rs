use std::any::Any;
use std::collections::HashMap;

use crate::error::Error;
use crate::event::{Event, EventFlags, EventResult, Hook, HookId, ReturnMode};

/// Registry of named [`Event`]s, passed around explicitly as a context
/// handle rather than retained as a static.
#[derive(Default)]
pub struct EventBus {
    events: HashMap<String, Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_event(
        &mut self,
        name: impl Into<String>,
        mode: ReturnMode,
        flags: EventFlags,
    ) -> Result<(), Error> {
        let name = name.into();
        if self.events.contains_key(&name) {
            return Err(Error::AlreadyRegistered(name));
        }
        self.events.insert(name.clone(), Event::new(name, mode, flags));
        Ok(())
    }

    /// Registers the event if it is not already present; a no-op otherwise.
    /// Modules commonly want "make sure this hook point exists" without
    /// caring who got there first.
    pub fn ensure_event(&mut self, name: &str, mode: ReturnMode, flags: EventFlags) {
        if !self.events.contains_key(name) {
            self.events
                .insert(name.to_string(), Event::new(name, mode, flags));
        }
    }

    pub fn add_hook(&mut self, event: &str, f: Hook) -> Result<HookId, Error> {
        self.events
            .get_mut(event)
            .map(|e| e.add_hook(f))
            .ok_or_else(|| Error::UnknownEvent(event.to_string()))
    }

    pub fn add_hook_before(
        &mut self,
        event: &str,
        anchor: HookId,
        f: Hook,
    ) -> Result<HookId, Error> {
        let ev = self
            .events
            .get_mut(event)
            .ok_or_else(|| Error::UnknownEvent(event.to_string()))?;
        ev.add_hook_before(anchor, f).ok_or(Error::UnknownHook(anchor))
    }

    pub fn add_hook_after(
        &mut self,
        event: &str,
        anchor: HookId,
        f: Hook,
    ) -> Result<HookId, Error> {
        let ev = self
            .events
            .get_mut(event)
            .ok_or_else(|| Error::UnknownEvent(event.to_string()))?;
        ev.add_hook_after(anchor, f).ok_or(Error::UnknownHook(anchor))
    }

    pub fn remove_hook(&mut self, event: &str, id: HookId) -> Result<(), Error> {
        let ev = self
            .events
            .get_mut(event)
            .ok_or_else(|| Error::UnknownEvent(event.to_string()))?;
        if ev.remove_hook(id) {
            Ok(())
        } else {
            Err(Error::UnknownHook(id))
        }
    }

    pub fn fire(&mut self, event: &str, data: &dyn Any) -> Result<EventResult, Error> {
        self.events
            .get_mut(event)
            .map(|e| e.fire(data))
            .ok_or_else(|| Error::UnknownEvent(event.to_string()))
    }

    pub fn numhooks(&self, event: &str) -> Option<usize> {
        self.events.get(event).map(|e| e.numhooks())
    }

    pub fn get(&self, event: &str) -> Option<&Event> {
        self.events.get(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventCtl, HookReturn, Sentinel, Verdict};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn noop_verdict(s: Sentinel) -> Hook {
        Box::new(move |_, _: &mut EventCtl| HookReturn::Verdict(s))
    }

    #[test]
    fn conditional_short_circuit_never_ok_stops_iteration() {
        // hooks [H1->OK, H2->NEVER_OK, H3->ALWAYS_OK] fold to FAIL and
        // H3 is never called.
        let mut bus = EventBus::new();
        bus.register_event("can_join_channel", ReturnMode::Conditional, EventFlags::NONE)
            .unwrap();

        let h3_called = Arc::new(AtomicBool::new(false));
        let h3_called_clone = h3_called.clone();

        bus.add_hook("can_join_channel", noop_verdict(Sentinel::Ok)).unwrap();
        bus.add_hook("can_join_channel", noop_verdict(Sentinel::NeverOk)).unwrap();
        bus.add_hook(
            "can_join_channel",
            Box::new(move |_, _: &mut EventCtl| {
                h3_called_clone.store(true, Ordering::SeqCst);
                HookReturn::Verdict(Sentinel::AlwaysOk)
            }),
        )
        .unwrap();

        let result = bus.fire("can_join_channel", &()).unwrap();
        assert!(matches!(result, EventResult::Verdict(Verdict::Fail(None))));
        assert!(!h3_called.load(Ordering::SeqCst));
    }

    #[test]
    fn hook_installed_reentrantly_is_skipped_until_next_call() {
        let mut bus = EventBus::new();
        bus.register_event("after_poll", ReturnMode::NoReturn, EventFlags::NONE)
            .unwrap();

        let second_calls = Arc::new(AtomicUsize::new(0));
        let second_calls_for_hook = second_calls.clone();

        // H1 installs H2 on its first call through `EventCtl`.
        bus.add_hook(
            "after_poll",
            Box::new(move |_, ctl: &mut EventCtl| {
                let second_calls_for_hook = second_calls_for_hook.clone();
                ctl.add_hook(Box::new(move |_, _: &mut EventCtl| {
                    second_calls_for_hook.fetch_add(1, Ordering::SeqCst);
                    HookReturn::None
                }));
                HookReturn::None
            }),
        )
        .unwrap();

        bus.fire("after_poll", &()).unwrap();
        // H2 was queued during this pass; it must not have run yet, and it
        // is only counted as "at rest" once the sweep admits it.
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
        assert_eq!(bus.numhooks("after_poll"), Some(2));

        bus.fire("after_poll", &()).unwrap();
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removing_a_hook_during_its_own_call_excludes_it_only_for_that_pass() {
        let mut bus = EventBus::new();
        bus.register_event("read_conf", ReturnMode::NoReturn, EventFlags::NONE)
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_inner = calls.clone();

        bus.add_hook(
            "read_conf",
            Box::new(move |_, ctl: &mut EventCtl| {
                calls_inner.fetch_add(1, Ordering::SeqCst);
                // Self-remove; the removal is deferred so this very call
                // still counts, but the hook list is empty afterward.
                ctl.remove_hook(HookId(0));
                HookReturn::None
            }),
        )
        .unwrap();

        bus.fire("read_conf", &()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.numhooks("read_conf"), Some(0));

        bus.fire("read_conf", &()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

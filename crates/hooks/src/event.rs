use std::any::Any;
use std::fmt;

/// Handle returned when a hook is installed; used to remove it later or to
/// anchor an `insert_before`/`insert_after`.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct HookId(pub(crate) u64);

impl fmt::Debug for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HookId({})", self.0)
    }
}

/// Conditional-event sentinel codes.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Sentinel {
    AlwaysOk,
    Ok,
    Neutral,
    NotOk,
    NeverOk,
    /// A non-sentinel numeric reply code that becomes the verdict's
    /// rejection code if nothing else short-circuits first.
    Specific(i32),
}

/// The folded outcome of a conditional event.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Verdict {
    Pass,
    Fail(Option<i32>),
}

/// What a hook call returns, and what [`Event::fire`] does with it,
/// determined per-event by [`ReturnMode`].
pub enum HookReturn {
    /// No-return events ignore whatever the hook returns.
    None,
    /// Array events collect an opaque per-hook value.
    Value(Box<dyn Any + Send>),
    /// Conditional events contribute a sentinel to the fold.
    Verdict(Sentinel),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ReturnMode {
    NoReturn,
    Array,
    Conditional,
}

/// Per-event behavior flags, distinct from [`ReturnMode`].
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct EventFlags(u8);

impl EventFlags {
    pub const NONE: EventFlags = EventFlags(0);
    /// The whole event disables itself (clears all hooks) once it has
    /// fired a single time.
    pub const ONE_SHOT: EventFlags = EventFlags(1 << 0);
    /// Each hook auto-defers itself for removal after its first call,
    /// independent of the others.
    pub const ONE_SHOT_PER_HOOK: EventFlags = EventFlags(1 << 1);

    pub fn contains(self, other: EventFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for EventFlags {
    type Output = EventFlags;
    fn bitor(self, rhs: EventFlags) -> EventFlags {
        EventFlags(self.0 | rhs.0)
    }
}

/// The result of a call to [`Event::fire`], shaped by [`ReturnMode`].
pub enum EventResult {
    None,
    Values(Vec<Box<dyn Any + Send>>),
    Verdict(Verdict),
}

pub type HookFn = Box<dyn FnMut(&dyn Any, &mut EventCtl) -> HookReturn + Send>;
pub type Hook = HookFn;

/// Handed to a hook while it runs so it can add or remove hooks on its own
/// event without a second mutable borrow of [`Event`] — the mutation is
/// queued and applied by [`Event::fire`] between hook calls, which is where
/// the `new`/`deferred_delete` flagging actually happens.
pub struct EventCtl<'a> {
    pending_add: &'a mut Vec<HookFn>,
    pending_remove: &'a mut Vec<HookId>,
}

impl EventCtl<'_> {
    /// Queues an append; the hook becomes visible starting with the next
    /// `fire` call, never the one in progress.
    pub fn add_hook(&mut self, f: HookFn) {
        self.pending_add.push(f);
    }

    /// Queues a removal; excised by the end-of-pass sweep, so the remainder of this pass still sees a stable hook list.
    pub fn remove_hook(&mut self, id: HookId) {
        self.pending_remove.push(id);
    }
}

struct Slot {
    id: HookId,
    func: HookFn,
    /// Set when removed during an in-flight `fire`; excised by the
    /// post-pass sweep rather than immediately, so the iterator never
    /// observes a hole.
    deferred_delete: bool,
    /// Set when added during an in-flight `fire`; skipped for the
    /// remainder of that pass.
    new: bool,
}

pub struct Event {
    name: String,
    flags: EventFlags,
    mode: ReturnMode,
    hooks: Vec<Slot>,
    /// Reentrancy guard: true while a `fire` is in progress on this event.
    calling: bool,
    next_id: u64,
}

impl Event {
    pub fn new(name: impl Into<String>, mode: ReturnMode, flags: EventFlags) -> Self {
        Event {
            name: name.into(),
            flags,
            mode,
            hooks: Vec::new(),
            calling: false,
            next_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ReturnMode {
        self.mode
    }

    /// Count of hooks that are at rest: neither deferred for deletion nor
    /// pending-new.
    pub fn numhooks(&self) -> usize {
        self.hooks
            .iter()
            .filter(|s| !s.deferred_delete && !s.new)
            .count()
    }

    /// Appends a hook; shorthand for inserting at the end of the list.
    pub fn add_hook(&mut self, f: HookFn) -> HookId {
        let id = self.alloc_id();
        let new = self.calling;
        self.hooks.push(Slot {
            id,
            func: f,
            deferred_delete: false,
            new,
        });
        id
    }

    pub fn add_hook_before(&mut self, anchor: HookId, f: HookFn) -> Option<HookId> {
        let pos = self.hooks.iter().position(|s| s.id == anchor)?;
        let id = self.alloc_id();
        let new = self.calling;
        self.hooks.insert(
            pos,
            Slot {
                id,
                func: f,
                deferred_delete: false,
                new,
            },
        );
        Some(id)
    }

    pub fn add_hook_after(&mut self, anchor: HookId, f: HookFn) -> Option<HookId> {
        let pos = self.hooks.iter().position(|s| s.id == anchor)?;
        let id = self.alloc_id();
        let new = self.calling;
        self.hooks.insert(
            pos + 1,
            Slot {
                id,
                func: f,
                deferred_delete: false,
                new,
            },
        );
        Some(id)
    }

    /// Remove a hook. If called from within this event's own `fire`, the
    /// removal is deferred until the post-pass sweep; otherwise it is
    /// excised immediately.
    pub fn remove_hook(&mut self, id: HookId) -> bool {
        let Some(slot) = self.hooks.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        if self.calling {
            slot.deferred_delete = true;
        } else {
            self.hooks.retain(|s| s.id != id);
        }
        true
    }

    fn alloc_id(&mut self) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Run every surviving hook in subscription order, fold per
    /// [`ReturnMode`], then sweep deferred-deletes and clear `new` flags.
    pub fn fire(&mut self, data: &dyn Any) -> EventResult {
        self.calling = true;

        let mut values = Vec::new();
        let mut saw_not_ok = false;
        let mut saw_ok = false;
        let mut specific: Option<i32> = None;
        let mut short_circuit: Option<Verdict> = None;
        let mut pending_add: Vec<HookFn> = Vec::new();
        let mut pending_remove: Vec<HookId> = Vec::new();

        let pass_len = self.hooks.len();
        for idx in 0..pass_len {
            if self.hooks[idx].deferred_delete || self.hooks[idx].new {
                continue;
            }
            // Swap the closure out so calling it doesn't hold `self.hooks`
            // borrowed while the closure itself wants to queue mutations
            // against this same event through `EventCtl`.
            let mut func = std::mem::replace(&mut self.hooks[idx].func, Box::new(|_, _| HookReturn::None));
            let mut ctl = EventCtl {
                pending_add: &mut pending_add,
                pending_remove: &mut pending_remove,
            };
            let ret = func(data, &mut ctl);
            self.hooks[idx].func = func;

            for id in pending_remove.drain(..) {
                if let Some(slot) = self.hooks.iter_mut().find(|s| s.id == id) {
                    slot.deferred_delete = true;
                }
            }
            for f in pending_add.drain(..) {
                let id = self.alloc_id();
                self.hooks.push(Slot {
                    id,
                    func: f,
                    deferred_delete: false,
                    new: true,
                });
            }

            match (self.mode, ret) {
                (ReturnMode::NoReturn, _) => {}
                (ReturnMode::Array, HookReturn::Value(v)) => values.push(v),
                (ReturnMode::Array, _) => {}
                (ReturnMode::Conditional, HookReturn::Verdict(s)) => match s {
                    Sentinel::AlwaysOk => {
                        short_circuit = Some(Verdict::Pass);
                    }
                    Sentinel::NeverOk => {
                        short_circuit = Some(Verdict::Fail(None));
                    }
                    Sentinel::Ok => saw_ok = true,
                    Sentinel::NotOk => saw_not_ok = true,
                    Sentinel::Neutral => {}
                    Sentinel::Specific(code) => {
                        saw_not_ok = true;
                        specific.get_or_insert(code);
                    }
                },
                (ReturnMode::Conditional, _) => {}
            }

            if self.flags.contains(EventFlags::ONE_SHOT_PER_HOOK) {
                self.hooks[idx].deferred_delete = true;
            }

            if short_circuit.is_some() {
                break;
            }
        }

        if self.flags.contains(EventFlags::ONE_SHOT) {
            for slot in &mut self.hooks {
                slot.deferred_delete = true;
            }
        }

        // Post-pass sweep: excise deferred deletes, admit new hooks.
        self.hooks.retain(|s| !s.deferred_delete);
        for slot in &mut self.hooks {
            slot.new = false;
        }
        self.calling = false;

        match self.mode {
            ReturnMode::NoReturn => EventResult::None,
            ReturnMode::Array => EventResult::Values(values),
            ReturnMode::Conditional => {
                let verdict = short_circuit.unwrap_or_else(|| {
                    if let Some(code) = specific {
                        Verdict::Fail(Some(code))
                    } else if saw_not_ok {
                        Verdict::Fail(None)
                    } else if saw_ok {
                        Verdict::Pass
                    } else {
                        Verdict::Pass
                    }
                });
                EventResult::Verdict(verdict)
            }
        }
    }
}

use std::collections::HashMap;

use relayd_hooks::{EventBus, EventFlags, EventResult, ReturnMode, Verdict};
use relayd_types::Numeric;

use crate::error::Error;
use crate::flags::CommandFlags;

pub type CommandFn<Ctx> = Box<dyn Fn(&mut Ctx, &[String]) -> i32 + Send>;

pub struct CommandSpec<Ctx> {
    pub name: String,
    pub min_args: usize,
    pub max_args: usize,
    pub flags: CommandFlags,
    pub handler: CommandFn<Ctx>,
}

/// What [`CommandTable::dispatch`] did with a line.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The built-in handler ran and returned this flood weight.
    Handled(i32),
    /// A pre-handler hook vetoed the command before the built-in ran; it
    /// never gets credited (or debited) a weight.
    Vetoed(Option<i32>),
    Error(Numeric),
}

/// The event name a command's pre-handlers subscribe to via
/// `command_add_hook(name, ...)`.
fn hook_event_name(canonical: &str) -> String {
    format!("command:{canonical}")
}

/// The name → [`CommandSpec`] registry plus alias table. Generic
/// over `Ctx`, the caller-defined bundle of state a handler needs — the
/// dispatcher itself only knows arity, flags, and flood weight, never the
/// state graph or connection table directly.
#[derive(Default)]
pub struct CommandTable<Ctx> {
    commands: HashMap<String, CommandSpec<Ctx>>,
    aliases: HashMap<String, String>,
}

impl<Ctx> CommandTable<Ctx> {
    pub fn new() -> Self {
        CommandTable {
            commands: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    pub fn register(&mut self, spec: CommandSpec<Ctx>) -> Result<(), Error> {
        let name = spec.name.clone();
        if self.commands.contains_key(&name) {
            return Err(Error::AlreadyRegistered(name));
        }
        self.commands.insert(name, spec);
        Ok(())
    }

    /// Maps `alias` to an already-registered command name. Aliases resolve
    /// one level only — aliasing an alias is not supported.
    pub fn alias(&mut self, alias: impl Into<String>, target: &str) -> Result<(), Error> {
        let alias = alias.into();
        if self.commands.contains_key(&alias) {
            return Err(Error::AliasShadowsCommand(alias));
        }
        if !self.commands.contains_key(target) {
            return Err(Error::UnknownCommand(target.to_string()));
        }
        self.aliases.insert(alias, target.to_string());
        Ok(())
    }

    fn resolve<'a>(&'a self, name: &str) -> Option<&'a CommandSpec<Ctx>> {
        let canonical = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.commands.get(canonical)
    }

    /// Makes sure the per-command pre-handler event exists on `bus` so a
    /// module loaded later can hook it even before any traffic for that
    /// command arrives.
    pub fn ensure_hook_event(&self, bus: &mut EventBus, name: &str) {
        if let Some(spec) = self.resolve(name) {
            bus.ensure_event(&hook_event_name(&spec.name), ReturnMode::Conditional, EventFlags::NONE);
        }
    }

    /// Runs arity/permission checks, fires the command's pre-handler event,
    /// then (if nothing vetoed) invokes the handler and folds its flood
    /// weight into the outcome.
    pub fn dispatch(
        &self,
        bus: &mut EventBus,
        ctx: &mut Ctx,
        is_registered: bool,
        is_operator: bool,
        name: &str,
        args: &[String],
    ) -> DispatchOutcome {
        let Some(spec) = self.resolve(name) else {
            return DispatchOutcome::Error(Numeric::ErrUnknownCommand);
        };

        if spec.flags.contains(CommandFlags::UNREGISTERED) && is_registered {
            return DispatchOutcome::Error(Numeric::ErrAlreadyRegistered);
        }
        if spec.flags.contains(CommandFlags::REGISTERED) && !is_registered {
            return DispatchOutcome::Error(Numeric::ErrNotRegistered);
        }
        if spec.flags.contains(CommandFlags::OPERATOR) && !is_operator {
            return DispatchOutcome::Error(Numeric::ErrNoPrivileges);
        }

        let folded;
        let args: &[String] = if args.len() > spec.max_args {
            if spec.flags.contains(CommandFlags::FOLD_EXCESS_ARGS_INTO_LAST) {
                let mut kept = args[..spec.max_args.saturating_sub(1)].to_vec();
                kept.push(args[spec.max_args.saturating_sub(1)..].join(" "));
                folded = kept;
                &folded
            } else {
                &args[..spec.max_args]
            }
        } else {
            args
        };
        if args.len() < spec.min_args {
            return DispatchOutcome::Error(Numeric::ErrNeedMoreParams);
        }

        let event_name = hook_event_name(&spec.name);
        if bus.get(&event_name).is_some() {
            match bus.fire(&event_name, &args.to_vec()) {
                Ok(EventResult::Verdict(Verdict::Fail(code))) => {
                    return DispatchOutcome::Vetoed(code);
                }
                Ok(_) => {}
                Err(_) => {}
            }
        }

        let weight = (spec.handler)(ctx, args);
        DispatchOutcome::Handled(weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayd_hooks::{EventCtl, HookReturn, Sentinel};
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    struct Ctx {
        calls: i32,
    }

    fn ping_spec() -> CommandSpec<Ctx> {
        CommandSpec {
            name: "PING".into(),
            min_args: 1,
            max_args: 1,
            flags: CommandFlags::NONE,
            handler: Box::new(|ctx, _args| {
                ctx.calls += 1;
                crate::flags::weight::LOW
            }),
        }
    }

    #[test]
    fn unknown_command_yields_unknown_command_numeric() {
        let table: CommandTable<Ctx> = CommandTable::new();
        let mut bus = EventBus::new();
        let mut ctx = Ctx { calls: 0 };
        let outcome = table.dispatch(&mut bus, &mut ctx, true, false, "XYZZY", &[]);
        assert!(matches!(outcome, DispatchOutcome::Error(Numeric::ErrUnknownCommand)));
    }

    #[test]
    fn too_few_args_yields_need_more_params() {
        let mut table = CommandTable::new();
        table.register(ping_spec()).unwrap();
        let mut bus = EventBus::new();
        let mut ctx = Ctx { calls: 0 };
        let outcome = table.dispatch(&mut bus, &mut ctx, true, false, "PING", &[]);
        assert!(matches!(outcome, DispatchOutcome::Error(Numeric::ErrNeedMoreParams)));
        assert_eq!(ctx.calls, 0);
    }

    #[test]
    fn registered_only_command_refuses_an_unregistered_caller() {
        let mut table = CommandTable::new();
        table
            .register(CommandSpec {
                name: "JOIN".into(),
                min_args: 1,
                max_args: 1,
                flags: CommandFlags::REGISTERED,
                handler: Box::new(|_, _| 0),
            })
            .unwrap();
        let mut bus = EventBus::new();
        let mut ctx = Ctx { calls: 0 };
        let outcome = table.dispatch(&mut bus, &mut ctx, false, false, "JOIN", &["#t".into()]);
        assert!(matches!(outcome, DispatchOutcome::Error(Numeric::ErrNotRegistered)));
    }

    #[test]
    fn an_alias_resolves_to_its_target_and_runs_the_same_handler() {
        let mut table = CommandTable::new();
        table.register(ping_spec()).unwrap();
        table.alias("PONG2", "PING").unwrap();
        let mut bus = EventBus::new();
        let mut ctx = Ctx { calls: 0 };
        let outcome = table.dispatch(&mut bus, &mut ctx, true, false, "PONG2", &["x".into()]);
        assert!(matches!(outcome, DispatchOutcome::Handled(w) if w == crate::flags::weight::LOW));
        assert_eq!(ctx.calls, 1);
    }

    #[test]
    fn excess_args_are_folded_into_the_last_parameter_when_flagged() {
        let seen = Arc::new(std::sync::Mutex::new(String::new()));
        let seen_for_handler = seen.clone();
        let mut table = CommandTable::new();
        table
            .register(CommandSpec {
                name: "TOPIC".into(),
                min_args: 1,
                max_args: 2,
                flags: CommandFlags::FOLD_EXCESS_ARGS_INTO_LAST,
                handler: Box::new(move |_, args| {
                    *seen_for_handler.lock().unwrap() = args[1].clone();
                    0
                }),
            })
            .unwrap();
        let mut bus = EventBus::new();
        let mut ctx = Ctx { calls: 0 };
        table.dispatch(
            &mut bus,
            &mut ctx,
            true,
            false,
            "TOPIC",
            &["#t".into(), "hello".into(), "world".into()],
        );
        assert_eq!(*seen.lock().unwrap(), "hello world");
    }

    #[test]
    fn a_pre_handler_hook_that_fails_vetoes_the_built_in() {
        let mut table = CommandTable::new();
        table.register(ping_spec()).unwrap();
        let mut bus = EventBus::new();
        table.ensure_hook_event(&mut bus, "PING");
        bus.add_hook(
            "command:PING",
            Box::new(|_, _: &mut EventCtl| HookReturn::Verdict(Sentinel::NeverOk)),
        )
        .unwrap();
        let mut ctx = Ctx { calls: 0 };
        let outcome = table.dispatch(&mut bus, &mut ctx, true, false, "PING", &["x".into()]);
        assert!(matches!(outcome, DispatchOutcome::Vetoed(None)));
        assert_eq!(ctx.calls, 0);
    }

    #[test]
    fn a_passing_pre_handler_hook_lets_the_built_in_run() {
        let calls = Arc::new(AtomicI32::new(0));
        let calls_for_hook = calls.clone();
        let mut table = CommandTable::new();
        table.register(ping_spec()).unwrap();
        let mut bus = EventBus::new();
        table.ensure_hook_event(&mut bus, "PING");
        bus.add_hook(
            "command:PING",
            Box::new(move |_, _: &mut EventCtl| {
                calls_for_hook.fetch_add(1, Ordering::SeqCst);
                HookReturn::Verdict(Sentinel::Ok)
            }),
        )
        .unwrap();
        let mut ctx = Ctx { calls: 0 };
        let outcome = table.dispatch(&mut bus, &mut ctx, true, false, "PING", &["x".into()]);
        assert!(matches!(outcome, DispatchOutcome::Handled(_)));
        assert_eq!(ctx.calls, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

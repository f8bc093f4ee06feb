//! Conditional access-check events. Each event below folds to
//! [`relayd_hooks::Verdict::Pass`] or `Fail(code)` per the usual hook
//! combinator: any `NEVER_OK` kills it outright, an `ALWAYS_OK` grants it
//! outright, and otherwise one `NOT_OK`/`Specific` beats any number of
//! plain `OK`s.
//!
//! The checks here only read fields already computed by the caller — no
//! hook closure touches [`relayd_state::StateGraph`] directly, since the
//! event payload has to be `'static` to go through `dyn Any`, and a borrow
//! into the graph isn't. The dispatcher gathers the booleans first (ban
//! match, invite, key, limit, ...) and fires the event with that snapshot.

use std::any::Any;

use relayd_hooks::{Error as HookError, EventBus, EventFlags, EventResult, ReturnMode, Sentinel, Verdict};
use relayd_types::Numeric;

pub const CAN_JOIN_CHANNEL: &str = "can_join_channel";
pub const CAN_SEND_CHANNEL: &str = "can_send_channel";
pub const CAN_NICK_CHANNEL: &str = "can_nick_channel";
pub const CAN_SEND_CLIENT: &str = "can_send_client";
pub const CAN_SEE_CHANNEL: &str = "can_see_channel";
pub const CAN_NICK_CLIENT: &str = "can_nick_client";

/// Inputs to `can_join_channel`: everything the built-in channel modes
/// would otherwise veto on, already resolved by the caller.
pub struct JoinCheck {
    pub invited: bool,
    pub banned: bool,
    pub invite_only: bool,
    pub key_ok: bool,
    pub limit_ok: bool,
}

/// Inputs to `can_send_channel`.
pub struct SendCheck {
    pub is_member: bool,
    pub has_voice_or_higher: bool,
    pub moderated: bool,
    pub no_external: bool,
    pub banned: bool,
}

/// Inputs to `can_see_channel` (used by `LIST`/`WHOIS`/`NAMES` visibility).
pub struct SeeCheck {
    pub secret_or_private: bool,
    pub is_member: bool,
}

/// Inputs to `can_nick_channel` (nick change while sharing a channel with
/// the observer — e.g. a moderation module vetoing a rename it can't see
/// from the client's own connection).
pub struct NickChannelCheck {
    pub is_member: bool,
    pub banned: bool,
}

/// Inputs to `can_send_client` (private message delivery).
pub struct SendClientCheck {
    pub target_has_them_ignored: bool,
}

/// Inputs to `can_nick_client` (nick change, global checks independent of
/// any one channel — e.g. a registered-nick-guard module).
pub struct NickClientCheck {
    pub nick_held_by_services: bool,
}

fn verdict(s: Sentinel) -> relayd_hooks::HookReturn {
    relayd_hooks::HookReturn::Verdict(s)
}

/// Registers all six access-check events (if not already present) and
/// installs the built-in hooks that implement the core channel-mode
/// semantics. Safe to call more than once; re-registration of an existing
/// event is a no-op (`ensure_event`), but this will install a second copy
/// of the core hooks if called twice on the same bus — callers should
/// call it exactly once at startup.
pub fn register_core_access_hooks(bus: &mut EventBus) -> Result<(), HookError> {
    for name in [
        CAN_JOIN_CHANNEL,
        CAN_SEND_CHANNEL,
        CAN_NICK_CHANNEL,
        CAN_SEND_CLIENT,
        CAN_SEE_CHANNEL,
        CAN_NICK_CLIENT,
    ] {
        bus.ensure_event(name, ReturnMode::Conditional, EventFlags::NONE);
    }

    // can_join_channel: an accepted invite bypasses every other veto.
    bus.add_hook(
        CAN_JOIN_CHANNEL,
        Box::new(|data, _| {
            let check = data.downcast_ref::<JoinCheck>().expect("JoinCheck payload");
            if check.invited {
                verdict(Sentinel::AlwaysOk)
            } else {
                verdict(Sentinel::Neutral)
            }
        }),
    )?;
    bus.add_hook(
        CAN_JOIN_CHANNEL,
        Box::new(|data, _| {
            let check = data.downcast_ref::<JoinCheck>().expect("JoinCheck payload");
            if check.banned {
                verdict(Sentinel::Specific(Numeric::ErrBannedFromChan.code() as i32))
            } else {
                verdict(Sentinel::Neutral)
            }
        }),
    )?;
    bus.add_hook(
        CAN_JOIN_CHANNEL,
        Box::new(|data, _| {
            let check = data.downcast_ref::<JoinCheck>().expect("JoinCheck payload");
            if check.invite_only {
                verdict(Sentinel::Specific(Numeric::ErrInviteOnlyChan.code() as i32))
            } else {
                verdict(Sentinel::Neutral)
            }
        }),
    )?;
    bus.add_hook(
        CAN_JOIN_CHANNEL,
        Box::new(|data, _| {
            let check = data.downcast_ref::<JoinCheck>().expect("JoinCheck payload");
            if !check.key_ok {
                verdict(Sentinel::Specific(Numeric::ErrBadChannelKey.code() as i32))
            } else {
                verdict(Sentinel::Neutral)
            }
        }),
    )?;
    bus.add_hook(
        CAN_JOIN_CHANNEL,
        Box::new(|data, _| {
            let check = data.downcast_ref::<JoinCheck>().expect("JoinCheck payload");
            if !check.limit_ok {
                verdict(Sentinel::Specific(Numeric::ErrChannelIsFull.code() as i32))
            } else {
                verdict(Sentinel::Ok)
            }
        }),
    )?;

    // can_send_channel: banned members may never speak; moderated/no_external
    // gate non-members and plain voiceless members respectively.
    bus.add_hook(
        CAN_SEND_CHANNEL,
        Box::new(|data, _| {
            let check = data.downcast_ref::<SendCheck>().expect("SendCheck payload");
            if check.is_member && check.banned && !check.has_voice_or_higher {
                verdict(Sentinel::Specific(Numeric::ErrCannotSendToChan.code() as i32))
            } else {
                verdict(Sentinel::Neutral)
            }
        }),
    )?;
    bus.add_hook(
        CAN_SEND_CHANNEL,
        Box::new(|data, _| {
            let check = data.downcast_ref::<SendCheck>().expect("SendCheck payload");
            if check.moderated && !check.has_voice_or_higher {
                verdict(Sentinel::Specific(Numeric::ErrCannotSendToChan.code() as i32))
            } else {
                verdict(Sentinel::Neutral)
            }
        }),
    )?;
    bus.add_hook(
        CAN_SEND_CHANNEL,
        Box::new(|data, _| {
            let check = data.downcast_ref::<SendCheck>().expect("SendCheck payload");
            if check.no_external && !check.is_member {
                verdict(Sentinel::Specific(Numeric::ErrCannotSendToChan.code() as i32))
            } else {
                verdict(Sentinel::Ok)
            }
        }),
    )?;

    // can_see_channel: secret/private channels only show to their members.
    bus.add_hook(
        CAN_SEE_CHANNEL,
        Box::new(|data, _| {
            let check = data.downcast_ref::<SeeCheck>().expect("SeeCheck payload");
            if check.secret_or_private && !check.is_member {
                verdict(Sentinel::NotOk)
            } else {
                verdict(Sentinel::Ok)
            }
        }),
    )?;

    // can_nick_channel: a banned client can't rename into visibility either.
    bus.add_hook(
        CAN_NICK_CHANNEL,
        Box::new(|data, _| {
            let check = data.downcast_ref::<NickChannelCheck>().expect("NickChannelCheck payload");
            if check.is_member && check.banned {
                verdict(Sentinel::NotOk)
            } else {
                verdict(Sentinel::Ok)
            }
        }),
    )?;

    // can_send_client: a recipient-side ignore list vetoes a private message.
    bus.add_hook(
        CAN_SEND_CLIENT,
        Box::new(|data, _| {
            let check = data.downcast_ref::<SendClientCheck>().expect("SendClientCheck payload");
            if check.target_has_them_ignored {
                verdict(Sentinel::NotOk)
            } else {
                verdict(Sentinel::Ok)
            }
        }),
    )?;

    // can_nick_client: nothing built-in vetoes this; a services module
    // would install a hook ahead of this one.
    bus.add_hook(
        CAN_NICK_CLIENT,
        Box::new(|data, _| {
            let check = data.downcast_ref::<NickClientCheck>().expect("NickClientCheck payload");
            if check.nick_held_by_services {
                verdict(Sentinel::NotOk)
            } else {
                verdict(Sentinel::Ok)
            }
        }),
    )?;

    Ok(())
}

/// Fires a conditional access event and flattens its [`Verdict`] to a plain
/// `Result`, the shape dispatch code actually wants.
pub fn check(bus: &mut EventBus, event: &str, data: &dyn Any) -> Result<Result<(), Option<i32>>, HookError> {
    match bus.fire(event, data)? {
        EventResult::Verdict(Verdict::Pass) => Ok(Ok(())),
        EventResult::Verdict(Verdict::Fail(code)) => Ok(Err(code)),
        _ => unreachable!("access-check events are always Conditional"),
    }
}

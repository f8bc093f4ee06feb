/// Registers several conditional access-check events at once — the shape
/// `can_join_channel`, `can_send_channel`, etc. all share.
///
/// ```ignore
/// conditional_events!(bus, "can_join_channel", "can_send_channel");
/// ```
#[macro_export]
macro_rules! conditional_events {
    ($bus:expr, $($name:expr),+ $(,)?) => {
        $(
            $bus.ensure_event($name, $crate::ReturnMode::Conditional, $crate::EventFlags::NONE);
        )+
    };
}

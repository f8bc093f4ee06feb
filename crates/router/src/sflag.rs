use std::collections::HashMap;

use relayd_types::ClientId;

/// Named operator-notice channel subscriptions, e.g.
/// `SPY`, `GLOBOPS`, `HELPER`. Not part of [`relayd_state::StateGraph`]
/// because subscription is a router-level concern, not client identity —
/// a client's subscriptions are lost on disconnect and rebuilt from its
/// `umode` flags plus operator block at registration.
#[derive(Default)]
pub struct SflagRegistry {
    subscribers: HashMap<String, Vec<ClientId>>,
}

impl SflagRegistry {
    pub fn new() -> Self {
        SflagRegistry::default()
    }

    pub fn subscribe(&mut self, flag: &str, client: ClientId) {
        let list = self.subscribers.entry(flag.to_string()).or_default();
        if !list.contains(&client) {
            list.push(client);
        }
    }

    pub fn unsubscribe(&mut self, flag: &str, client: ClientId) {
        if let Some(list) = self.subscribers.get_mut(flag) {
            list.retain(|&c| c != client);
        }
    }

    /// Drops every subscription a disconnecting client held, across all
    /// flags.
    pub fn remove_client(&mut self, client: ClientId) {
        for list in self.subscribers.values_mut() {
            list.retain(|&c| c != client);
        }
    }

    pub fn members(&self, flag: &str) -> &[ClientId] {
        self.subscribers.get(flag).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayd_types::ClientId;

    #[test]
    fn subscribe_is_idempotent_and_unsubscribe_removes_only_that_client() {
        let mut reg = SflagRegistry::new();
        let a = ClientId::from_raw(0);
        let b = ClientId::from_raw(1);
        reg.subscribe("SPY", a);
        reg.subscribe("SPY", a);
        reg.subscribe("SPY", b);
        assert_eq!(reg.members("SPY"), &[a, b]);

        reg.unsubscribe("SPY", a);
        assert_eq!(reg.members("SPY"), &[b]);
    }

    #[test]
    fn remove_client_clears_every_flag() {
        let mut reg = SflagRegistry::new();
        let a = ClientId::from_raw(0);
        reg.subscribe("SPY", a);
        reg.subscribe("GLOBOPS", a);
        reg.remove_client(a);
        assert!(reg.members("SPY").is_empty());
        assert!(reg.members("GLOBOPS").is_empty());
    }
}

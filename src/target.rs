use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Engine-assigned identifier for a connected or known player.
pub type PlayerId = u64;

/// One "who" an override can be scoped to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Target {
    Player(PlayerId),
    Group(String),
}

impl Target {
    /// Does this target describe the actor?
    pub fn matches(&self, actor: &Actor<'_>) -> bool {
        match self {
            Self::Player(id) => actor.player == *id,
            Self::Group(group) => actor.groups.player_in_group(actor.player, group),
        }
    }
}

/// Group membership is owned by an external permissions system; the core
/// only asks yes/no questions through this seam.
pub trait GroupLookup {
    fn player_in_group(&self, player: PlayerId, group: &str) -> bool;
}

/// Query-side actor context: the player an event is about, plus the
/// permission collaborator used to answer group targets.
#[derive(Clone, Copy)]
pub struct Actor<'a> {
    pub player: PlayerId,
    pub groups: &'a dyn GroupLookup,
}

impl<'a> Actor<'a> {
    pub fn new(player: PlayerId, groups: &'a dyn GroupLookup) -> Self {
        Self { player, groups }
    }
}

/// A whitelist or blacklist of players and groups governing which actors a
/// setting assignment applies to.
///
/// The default is an empty blacklist, which matches every actor: an
/// unrestricted assignment. An empty whitelist matches nobody.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSet {
    players: BTreeSet<PlayerId>,
    groups: BTreeSet<String>,
    whitelist: bool,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_whitelist(&self) -> bool {
        self.whitelist
    }

    /// True when the set places no restriction at all (empty blacklist).
    pub fn is_unrestricted(&self) -> bool {
        !self.whitelist && self.players.is_empty() && self.groups.is_empty()
    }

    /// Switch to whitelist mode. Returns whether the mode actually changed,
    /// so callers can report "already a whitelist" instead of pretending to
    /// have done work.
    pub fn set_whitelist(&mut self) -> bool {
        let changed = !self.whitelist;
        self.whitelist = true;
        changed
    }

    /// Switch to blacklist mode. Returns whether the mode actually changed.
    pub fn set_blacklist(&mut self) -> bool {
        let changed = self.whitelist;
        self.whitelist = false;
        changed
    }

    /// Returns false if the player was already listed.
    pub fn add_player(&mut self, player: PlayerId) -> bool {
        self.players.insert(player)
    }

    /// Returns false if the player was not listed.
    pub fn remove_player(&mut self, player: PlayerId) -> bool {
        self.players.remove(&player)
    }

    /// Returns false if the group was already listed.
    pub fn add_group(&mut self, group: impl Into<String>) -> bool {
        self.groups.insert(group.into())
    }

    /// Returns false if the group was not listed.
    pub fn remove_group(&mut self, group: &str) -> bool {
        self.groups.remove(group)
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().copied()
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    fn lists(&self, actor: &Actor<'_>) -> bool {
        self.players.contains(&actor.player)
            || self
                .groups
                .iter()
                .any(|group| actor.groups.player_in_group(actor.player, group))
    }

    /// Whitelist: only listed actors match. Blacklist: everyone except
    /// listed actors matches.
    pub fn test(&self, actor: &Actor<'_>) -> bool {
        if self.whitelist {
            self.lists(actor)
        } else {
            !self.lists(actor)
        }
    }
}

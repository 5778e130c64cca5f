//! Event categories
//!
//! Every event belongs to exactly one category. A listener registers for a
//! set of categories and receives every event whose category is in the set.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Listener capability set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventCategories: u64 {
        // Lifecycle
        const CONNECTION_LOST       = 1 << 0;
        const RESUMED               = 1 << 1;
        const RECONNECTED           = 1 << 2;
        const READY                 = 1 << 3;

        // Servers
        const SERVER_AVAILABLE      = 1 << 4;
        const SERVER_JOIN           = 1 << 5;
        const SERVER_CHANGE         = 1 << 6;
        const SERVER_LEAVE          = 1 << 7;
        const SERVER_UNAVAILABLE    = 1 << 8;

        // Bans and members
        const USER_BAN              = 1 << 9;
        const USER_UNBAN            = 1 << 10;
        const MEMBER_JOIN           = 1 << 11;
        const MEMBER_CHANGE         = 1 << 12;
        const MEMBER_LEAVE          = 1 << 13;

        // Roles and channels
        const ROLE_CREATE           = 1 << 14;
        const ROLE_CHANGE           = 1 << 15;
        const ROLE_DELETE           = 1 << 16;
        const CHANNEL_CREATE        = 1 << 17;
        const CHANNEL_CHANGE        = 1 << 18;
        const CHANNEL_DELETE        = 1 << 19;
        const CHANNEL_PINS_UPDATE   = 1 << 20;
        const THREAD_MEMBERS_UPDATE = 1 << 21;

        // Messages and reactions
        const MESSAGE_CREATE        = 1 << 22;
        const MESSAGE_EDIT          = 1 << 23;
        const MESSAGE_DELETE        = 1 << 24;
        const REACTION_ADD          = 1 << 25;
        const REACTION_REMOVE       = 1 << 26;
        const REACTION_REMOVE_ALL   = 1 << 27;

        // Users and webhooks
        const USER_STATUS_CHANGE    = 1 << 28;
        const USER_TYPING           = 1 << 29;
        const USER_CHANGE           = 1 << 30;
        const WEBHOOKS_UPDATE       = 1 << 31;

        const ALL_REACTIONS = Self::REACTION_ADD.bits()
            | Self::REACTION_REMOVE.bits()
            | Self::REACTION_REMOVE_ALL.bits();

        const ALL_MESSAGES = Self::MESSAGE_CREATE.bits()
            | Self::MESSAGE_EDIT.bits()
            | Self::MESSAGE_DELETE.bits();

        const LIFECYCLE = Self::CONNECTION_LOST.bits()
            | Self::RESUMED.bits()
            | Self::RECONNECTED.bits()
            | Self::READY.bits();

        const ALL = (1 << 32) - 1;
    }
}

impl EventCategories {
    /// Check whether a listener with this set receives `category`
    #[inline]
    pub fn accepts(&self, category: EventCategories) -> bool {
        self.contains(category)
    }
}

impl fmt::Display for EventCategories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        write!(f, "{}", names.join("|"))
    }
}

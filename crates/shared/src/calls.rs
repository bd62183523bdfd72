//! Canonical call strings understood by the remote service. Any string may
//! be broadcast as a call; these are the ones with sounds attached.

pub const BOB: &str = "Bob";
pub const SINGLE: &str = "Single";
pub const LOOK_TO: &str = "Look to";
pub const GO: &str = "Go";
pub const THATS_ALL: &str = "That's all";
pub const STAND: &str = "Stand next";
pub const ROUNDS: &str = "Rounds";

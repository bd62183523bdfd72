use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Bell, Stroke, TowerId, UserId};

/// An action sent by a client into the tower.
///
/// Variant names on the wire carry the `c_` prefix; the server mirrors state
/// changes back as [`TowerEvent`]s with the `s_` prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientAction {
    #[serde(rename = "c_join")]
    Join {
        anonymous_user: bool,
        tower_id: TowerId,
    },
    #[serde(rename = "c_request_global_state")]
    RequestGlobalState { tower_id: TowerId },
    #[serde(rename = "c_bell_rung")]
    RingBell {
        bell: Bell,
        stroke: Stroke,
        tower_id: TowerId,
    },
    #[serde(rename = "c_set_bells")]
    SetAtHand { tower_id: TowerId },
    #[serde(rename = "c_size_change")]
    SetSize { new_size: usize, tower_id: TowerId },
    #[serde(rename = "c_audio_change")]
    SetBellType {
        new_audio: String,
        tower_id: TowerId,
    },
    #[serde(rename = "c_assign_user")]
    AssignUser {
        bell: Bell,
        #[serde(default, with = "optional_user")]
        user: Option<UserId>,
        tower_id: TowerId,
    },
    #[serde(rename = "c_msg_sent")]
    Chat {
        user: String,
        msg: String,
        email: String,
        #[serde(with = "iso_millis")]
        time: DateTime<Utc>,
        tower_id: TowerId,
    },
    #[serde(rename = "c_call")]
    Call { call: String, tower_id: TowerId },
}

/// An event pushed by the tower to every connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum TowerEvent {
    #[serde(rename = "s_bell_rung")]
    BellRung {
        global_bell_state: Vec<Stroke>,
        who_rang: Bell,
    },
    #[serde(rename = "s_call")]
    Call { call: String },
    #[serde(rename = "s_user_entered")]
    UserEntered { user_id: UserId, username: String },
    #[serde(rename = "s_user_left")]
    UserLeft { user_id: UserId, username: String },
    #[serde(rename = "s_set_userlist")]
    UserList { user_list: Vec<RosterEntry> },
    #[serde(rename = "s_assign_user")]
    AssignUser {
        bell: Bell,
        #[serde(default, with = "optional_user")]
        user: Option<UserId>,
    },
    #[serde(rename = "s_global_state")]
    GlobalState { global_bell_state: Vec<Stroke> },
    #[serde(rename = "s_size_change")]
    SizeChange { size: usize },
    // The bell type arrives as a raw string so that an unrecognised encoding
    // can be tolerated instead of poisoning the whole frame.
    #[serde(rename = "s_audio_change")]
    AudioChange { new_audio: String },
    #[serde(rename = "s_msg_sent")]
    Chat { user: String, msg: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub user_id: UserId,
    pub username: String,
}

/// The `user` field of an assignment is a user id when a bell is assigned
/// and the empty string (or absent) when it is unassigned.
mod optional_user {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::domain::UserId;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Id(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(
        user: &Option<UserId>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match user {
            Some(id) => serializer.serialize_i64(id.0),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<UserId>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Id(id)) => Ok(Some(UserId(id))),
            Some(Raw::Text(text)) if text.is_empty() => Ok(None),
            Some(Raw::Text(text)) => Err(de::Error::custom(format!(
                "expected a user id or an empty string, got '{text}'"
            ))),
        }
    }
}

/// Chat timestamps use ISO-8601 with exactly three fractional digits.
mod iso_millis {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

    pub fn serialize<S: Serializer>(
        time: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(de::Error::custom)
    }
}

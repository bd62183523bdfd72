use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(TowerId);

/// Single-character names of the bells of a sixteen-bell tower, in ringing
/// order (treble first).
pub const BELL_SYMBOLS: [char; 16] = [
    '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'E', 'T', 'A', 'B', 'C', 'D',
];

pub const MAX_BELLS: usize = BELL_SYMBOLS.len();

/// One bell of a tower. Wraps a 0-based index so that call sites never have
/// to guess whether the treble is bell 0 or bell 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bell(u8);

impl Bell {
    /// Builds a `Bell` from its 1-based number, so `Bell::from_number(1)` is
    /// the treble. `None` if the number is outside `1..=MAX_BELLS`.
    pub fn from_number(number: usize) -> Option<Self> {
        if (1..=MAX_BELLS).contains(&number) {
            Some(Self((number - 1) as u8))
        } else {
            None
        }
    }

    /// Builds a `Bell` from its 0-based index, so `Bell::from_index(0)` is
    /// the treble.
    pub fn from_index(index: usize) -> Option<Self> {
        if index < MAX_BELLS {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Builds a `Bell` from its conventional single-character name, so
    /// `Bell::from_symbol('T')` is the twelfth.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        BELL_SYMBOLS
            .iter()
            .position(|&name| name == symbol)
            .map(|index| Self(index as u8))
    }

    pub fn number(self) -> usize {
        self.0 as usize + 1
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn symbol(self) -> char {
        BELL_SYMBOLS[self.0 as usize]
    }
}

impl fmt::Display for Bell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// On the wire a bell is its 1-based number.
impl Serialize for Bell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.number() as u64)
    }
}

impl<'de> Deserialize<'de> for Bell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let number = u64::deserialize(deserializer)?;
        Bell::from_number(number as usize)
            .ok_or_else(|| de::Error::custom(format!("bell number {number} out of range")))
    }
}

/// The two alternating phases of ringing a bell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stroke {
    Hand,
    Back,
}

impl Stroke {
    pub fn is_hand(self) -> bool {
        self == Stroke::Hand
    }

    pub fn is_back(self) -> bool {
        self == Stroke::Back
    }

    pub fn opposite(self) -> Self {
        match self {
            Stroke::Hand => Stroke::Back,
            Stroke::Back => Stroke::Hand,
        }
    }

    /// The stroke of the row at a given index; even rows are handstrokes.
    pub fn from_index(row_index: usize) -> Self {
        if row_index % 2 == 0 {
            Stroke::Hand
        } else {
            Stroke::Back
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Stroke::Hand => 'H',
            Stroke::Back => 'B',
        }
    }
}

impl fmt::Display for Stroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stroke::Hand => write!(f, "handstroke"),
            Stroke::Back => write!(f, "backstroke"),
        }
    }
}

// On the wire a stroke is a boolean, true for handstroke.
impl Serialize for Stroke {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(self.is_hand())
    }
}

impl<'de> Deserialize<'de> for Stroke {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let is_hand = bool::deserialize(deserializer)?;
        Ok(if is_hand { Stroke::Hand } else { Stroke::Back })
    }
}

/// The appearance and sound of the bells in a tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BellType {
    Hand,
    Tower,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown bell type '{0}'")]
pub struct UnknownBellType(pub String);

impl BellType {
    /// The name the remote service uses for this bell type.
    pub fn wire_name(self) -> &'static str {
        match self {
            BellType::Hand => "Hand",
            BellType::Tower => "Tower",
        }
    }

    pub fn from_wire_name(name: &str) -> Result<Self, UnknownBellType> {
        match name {
            "Hand" => Ok(BellType::Hand),
            "Tower" => Ok(BellType::Tower),
            other => Err(UnknownBellType(other.to_string())),
        }
    }
}

impl fmt::Display for BellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BellType::Hand => write!(f, "handbells"),
            BellType::Tower => write!(f, "tower bells"),
        }
    }
}

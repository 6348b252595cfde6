//! The three rounds of a Hat game.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three explanation styles, played in order over the same words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HatRound {
    /// Spoken description without naming the word.
    Explain,
    /// Gestures only.
    Pantomime,
    /// A single associated word.
    Association,
}

impl HatRound {
    pub const ALL: [HatRound; 3] = [HatRound::Explain, HatRound::Pantomime, HatRound::Association];

    pub fn first() -> HatRound {
        HatRound::Explain
    }

    /// 1-based round number.
    pub fn number(&self) -> u8 {
        match self {
            HatRound::Explain => 1,
            HatRound::Pantomime => 2,
            HatRound::Association => 3,
        }
    }

    pub fn from_number(number: u8) -> Option<HatRound> {
        match number {
            1 => Some(HatRound::Explain),
            2 => Some(HatRound::Pantomime),
            3 => Some(HatRound::Association),
            _ => None,
        }
    }

    /// The round that follows this one, or `None` after the last round.
    pub fn next(&self) -> Option<HatRound> {
        match self {
            HatRound::Explain => Some(HatRound::Pantomime),
            HatRound::Pantomime => Some(HatRound::Association),
            HatRound::Association => None,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next().is_none()
    }

    pub fn name(&self) -> &'static str {
        match self {
            HatRound::Explain => "Explain",
            HatRound::Pantomime => "Pantomime",
            HatRound::Association => "Association",
        }
    }

    pub fn rules(&self) -> &'static str {
        match self {
            HatRound::Explain => {
                "Describe the word in your own words without saying it or any word with the same root."
            }
            HatRound::Pantomime => "Show the word with gestures only. No sounds, no pointing at objects.",
            HatRound::Association => "Say exactly one word that makes your team think of the hidden one.",
        }
    }
}

impl fmt::Display for HatRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Round {}: {}", self.number(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_succession() {
        assert_eq!(HatRound::first(), HatRound::Explain);
        assert_eq!(HatRound::Explain.next(), Some(HatRound::Pantomime));
        assert_eq!(HatRound::Pantomime.next(), Some(HatRound::Association));
        assert_eq!(HatRound::Association.next(), None);
        assert!(HatRound::Association.is_last());
    }

    #[test]
    fn test_order_matches_numbers() {
        for pair in HatRound::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].number() + 1, pair[1].number());
        }
        for round in HatRound::ALL {
            assert_eq!(HatRound::from_number(round.number()), Some(round));
        }
        assert_eq!(HatRound::from_number(4), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(HatRound::Pantomime.to_string(), "Round 2: Pantomime");
    }
}

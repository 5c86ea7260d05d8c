//! Market regime states.

use serde::{Deserialize, Serialize};

/// Weekly market regime, assigned from the week's percentage return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    Bull,
    Bear,
    Stagnant,
}

impl State {
    /// All states in fixed order. This order doubles as the arg-max
    /// tie-break priority: Bull wins over Bear wins over Stagnant.
    pub const ALL: [State; 3] = [State::Bull, State::Bear, State::Stagnant];

    /// Index into [`State::ALL`].
    pub fn index(self) -> usize {
        match self {
            State::Bull => 0,
            State::Bear => 1,
            State::Stagnant => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            State::Bull => "Bull",
            State::Bear => "Bear",
            State::Stagnant => "Stagnant",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bull" => Ok(State::Bull),
            "bear" => Ok(State::Bear),
            "stagnant" => Ok(State::Stagnant),
            other => Err(format!("unknown state: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_all_order() {
        for (i, state) in State::ALL.iter().enumerate() {
            assert_eq!(state.index(), i);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("bull".parse::<State>().unwrap(), State::Bull);
        assert_eq!("BEAR".parse::<State>().unwrap(), State::Bear);
        assert_eq!("Stagnant".parse::<State>().unwrap(), State::Stagnant);
        assert!("sideways".parse::<State>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for state in State::ALL {
            assert_eq!(state.to_string().parse::<State>().unwrap(), state);
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::dto::lenient;

pub const ROSTER_SIZE: usize = 5;

/// A rostered player. Older control panels stored players as bare strings or
/// under differently-cased keys; those shapes are folded into this one when
/// the roster is read.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(from = "PlayerRecord")]
pub struct Player {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlayerRecord {
    Name(String),
    Fields {
        #[serde(default, alias = "Name", alias = "NAME", alias = "playerName", alias = "PlayerName")]
        name: Option<String>,
        #[serde(default, alias = "Role", alias = "ROLE")]
        role: Option<String>,
    },
    Missing(()),
}

impl From<PlayerRecord> for Player {
    fn from(record: PlayerRecord) -> Self {
        let (name, role) = match record {
            PlayerRecord::Name(name) => (name, None),
            PlayerRecord::Fields { name, role } => (name.unwrap_or_default(), role),
            PlayerRecord::Missing(()) => (String::new(), None),
        };

        // a browser once stringified whole objects into the name field
        let name = if name == "[object Object]" {
            String::new()
        } else {
            name
        };

        Player {
            name,
            role: role.filter(|r| !r.trim().is_empty()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Team {
    #[serde(default)]
    pub teamname: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub score: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub playerlist: Vec<Player>,
}

impl Team {
    fn named(teamname: &str) -> Self {
        Self {
            teamname: teamname.to_string(),
            score: "0".to_string(),
            logo: String::new(),
            playerlist: vec![Player::default(); ROSTER_SIZE],
        }
    }

    /// Series score; anything unparsable counts as zero.
    pub fn score_value(&self) -> u32 {
        self.score.trim().parse().unwrap_or(0)
    }

    fn normalize(&mut self, side: &str) -> Result<(), String> {
        if self.playerlist.len() > ROSTER_SIZE {
            return Err(format!(
                "{side} lists {} players, a roster holds {ROSTER_SIZE}",
                self.playerlist.len()
            ));
        }
        self.playerlist.resize(ROSTER_SIZE, Player::default());
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TeamData {
    pub blueteam: Team,
    pub redteam: Team,
}

impl Default for TeamData {
    fn default() -> Self {
        Self {
            blueteam: Team::named("BLUE TEAM"),
            redteam: Team::named("RED TEAM"),
        }
    }
}

/// The match roster document (`matchdata`).
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct MatchData {
    #[serde(default)]
    pub teamdata: TeamData,
}

impl MatchData {
    /// Pads short rosters and rejects oversized ones.
    pub fn normalized(mut self) -> Result<Self, String> {
        self.teamdata.blueteam.normalize("blueteam")?;
        self.teamdata.redteam.normalize("redteam")?;
        Ok(self)
    }
}

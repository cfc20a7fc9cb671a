use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use flagwatch_shared::{Actor, Flag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Flagger,
    Target,
}

impl ActorRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "flagger" | "flaggers" => Some(Self::Flagger),
            "target" | "targets" => Some(Self::Target),
            _ => None,
        }
    }

    pub fn actor<'a>(&self, flag: &'a Flag) -> &'a Actor {
        match self {
            Self::Flagger => &flag.flagger,
            Self::Target => &flag.target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorRank {
    pub actor_id: String,
    pub display_name: String,
    /// Metadata as first seen for this actor.
    pub metadata_json: Option<String>,
    pub count: usize,
}

/// Every actor in `role`, most frequent first. Equal counts keep the order
/// in which the actors were first encountered.
pub fn rank_actors(flags: &[Flag], role: ActorRole) -> Vec<ActorRank> {
    let mut ranks: Vec<ActorRank> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for flag in flags {
        let actor = role.actor(flag);
        match index.get(actor.id.as_str()) {
            Some(&i) => ranks[i].count += 1,
            None => {
                index.insert(actor.id.as_str(), ranks.len());
                ranks.push(ActorRank {
                    actor_id: actor.id.clone(),
                    display_name: actor.display_name(),
                    metadata_json: actor.metadata_json.clone(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable
    ranks.sort_by(|a, b| b.count.cmp(&a.count));
    ranks
}

pub fn top_actors(flags: &[Flag], role: ActorRole, k: usize) -> Vec<ActorRank> {
    let mut ranks = rank_actors(flags, role);
    ranks.truncate(k);
    ranks
}

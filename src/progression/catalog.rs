use anyhow::{bail, Result};
use serde::Serialize;

/// A named progression level reached by accumulating currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tier {
    pub level: u32,
    pub name: &'static str,
    pub threshold: u64,
}

/// A companion unlocked once currency reaches `unlocked_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Companion {
    pub id: &'static str,
    pub name: &'static str,
    pub unlocked_at: u64,
}

/// A stage on the adventure map, opened by total words read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub id: &'static str,
    pub name: &'static str,
    pub words_to_unlock: u64,
}

/// Currency granted for each rewarded event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardTable {
    pub correct_word: u64,
    /// (streak, bonus) pairs; the bonus is granted whenever the streak hits the value
    pub streak_bonuses: Vec<(u32, u64)>,
    pub completed_page: u64,
    pub daily_login: u64,
}

impl RewardTable {
    pub fn streak_bonus(&self, streak: u32) -> u64 {
        self.streak_bonuses
            .iter()
            .find(|(at, _)| *at == streak)
            .map(|(_, bonus)| *bonus)
            .unwrap_or(0)
    }
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            correct_word: 1,
            streak_bonuses: vec![(5, 5), (10, 15), (20, 30)],
            completed_page: 25,
            daily_login: 5,
        }
    }
}

const TIERS: &[(u32, &str, u64)] = &[
    (1, "Little Acorn", 0),
    (2, "Sprouting Seed", 50),
    (3, "Growing Tree", 150),
    (4, "Mighty Oak", 300),
    (5, "Reading Star", 500),
    (6, "Super Reader", 800),
    (7, "Reading Champion", 1200),
    (8, "Word Wizard", 1800),
    (9, "Story Master", 2500),
    (10, "Legend", 3500),
];

const COMPANIONS: &[(&str, &str, u64)] = &[
    ("owl", "Professor Hoot", 25),
    ("elephant", "Memory", 75),
    ("cheetah", "Speedy", 150),
    ("butterfly", "Flutter", 250),
    ("dragon", "Draco", 500),
];

const STAGES: &[(&str, &str, u64)] = &[
    ("forest", "The Friendly Forest", 0),
    ("river", "The River Crossing", 50),
    ("cave", "The Crystal Cave", 150),
    ("mountain", "The Mountain Climb", 300),
    ("castle", "The Story Castle", 500),
];

/// Static reward configuration: tiers, unlockables and reward amounts
#[derive(Debug, Clone)]
pub struct RewardCatalog {
    tiers: Vec<Tier>,
    companions: Vec<Companion>,
    stages: Vec<Stage>,
    rewards: RewardTable,
}

impl RewardCatalog {
    /// Build a catalog, rejecting tables that are empty, unsorted, or do not
    /// start at zero
    pub fn new(
        tiers: Vec<Tier>,
        companions: Vec<Companion>,
        stages: Vec<Stage>,
        rewards: RewardTable,
    ) -> Result<Self> {
        match tiers.first() {
            None => bail!("Reward catalog needs at least one tier"),
            Some(first) if first.threshold != 0 => {
                bail!("Lowest tier {} must start at 0, got {}", first.name, first.threshold)
            }
            _ => {}
        }
        if tiers.windows(2).any(|w| w[0].threshold > w[1].threshold) {
            bail!("Tier thresholds must be in ascending order");
        }
        if stages.windows(2).any(|w| w[0].words_to_unlock > w[1].words_to_unlock) {
            bail!("Stage thresholds must be in ascending order");
        }

        Ok(Self {
            tiers,
            companions,
            stages,
            rewards,
        })
    }

    /// The shipped catalog
    pub fn standard() -> Self {
        Self {
            tiers: TIERS
                .iter()
                .map(|&(level, name, threshold)| Tier {
                    level,
                    name,
                    threshold,
                })
                .collect(),
            companions: COMPANIONS
                .iter()
                .map(|&(id, name, unlocked_at)| Companion {
                    id,
                    name,
                    unlocked_at,
                })
                .collect(),
            stages: STAGES
                .iter()
                .map(|&(id, name, words_to_unlock)| Stage {
                    id,
                    name,
                    words_to_unlock,
                })
                .collect(),
            rewards: RewardTable::default(),
        }
    }

    pub fn with_rewards(mut self, rewards: RewardTable) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn rewards(&self) -> &RewardTable {
        &self.rewards
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn companions(&self) -> &[Companion] {
        &self.companions
    }

    /// Highest tier whose threshold is covered by `currency`
    ///
    /// Scans in ascending order and keeps the last qualifying tier, so equal
    /// thresholds resolve to the higher tier.
    pub fn tier_for(&self, currency: u64) -> &Tier {
        self.tiers
            .iter()
            .filter(|tier| tier.threshold <= currency)
            .last()
            .unwrap_or(&self.tiers[0])
    }

    /// Companions whose threshold is covered by `currency`
    pub fn companions_for(&self, currency: u64) -> impl Iterator<Item = &Companion> {
        self.companions
            .iter()
            .filter(move |c| c.unlocked_at <= currency)
    }

    /// Furthest stage reached after `words_read` words
    pub fn stage_for(&self, words_read: u64) -> Option<&Stage> {
        self.stages
            .iter()
            .filter(|stage| stage.words_to_unlock <= words_read)
            .last()
    }
}

impl Default for RewardCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_lookup_uses_thresholds() {
        let catalog = RewardCatalog::standard();
        assert_eq!(catalog.tier_for(0).level, 1);
        assert_eq!(catalog.tier_for(49).level, 1);
        assert_eq!(catalog.tier_for(50).level, 2);
        assert_eq!(catalog.tier_for(10_000).name, "Legend");
    }

    #[test]
    fn equal_thresholds_resolve_to_higher_tier() {
        let tiers = vec![
            Tier { level: 1, name: "a", threshold: 0 },
            Tier { level: 2, name: "b", threshold: 10 },
            Tier { level: 3, name: "c", threshold: 10 },
        ];
        let catalog =
            RewardCatalog::new(tiers, vec![], vec![], RewardTable::default()).unwrap();
        assert_eq!(catalog.tier_for(10).level, 3);
    }

    #[test]
    fn rejects_unsorted_tiers() {
        let tiers = vec![
            Tier { level: 1, name: "a", threshold: 0 },
            Tier { level: 2, name: "b", threshold: 20 },
            Tier { level: 3, name: "c", threshold: 10 },
        ];
        assert!(RewardCatalog::new(tiers, vec![], vec![], RewardTable::default()).is_err());
    }

    #[test]
    fn streak_bonus_only_on_exact_milestones() {
        let rewards = RewardTable::default();
        assert_eq!(rewards.streak_bonus(5), 5);
        assert_eq!(rewards.streak_bonus(10), 15);
        assert_eq!(rewards.streak_bonus(20), 30);
        assert_eq!(rewards.streak_bonus(6), 0);
        assert_eq!(rewards.streak_bonus(15), 0);
    }
}

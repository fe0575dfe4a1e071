//! A tiny clicker game that produces progress mutations.

use progress_model::{FieldSpec, SnapshotSchema, StateSnapshot};

/// Field declarations for the clicker's progress record.
pub fn clicker_schema(automation_flag: &str) -> SnapshotSchema {
    SnapshotSchema::new()
        .with_field("coins", FieldSpec::progress().core())
        .with_field("clicks", FieldSpec::progress())
        .with_field("tier", FieldSpec::progress().core())
        .with_field("last_tick", FieldSpec::progress())
        .with_field("owned", FieldSpec::collection())
        .with_field(automation_flag, FieldSpec::flag())
}

/// Game state driven by the simulation loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickerGame {
    coins: f64,
    clicks: f64,
    tier: f64,
    owned: Vec<String>,
    automation_flag: String,
    auto_active: bool,
}

impl ClickerGame {
    /// Resume from a previously synced snapshot.
    pub fn from_snapshot(snapshot: &StateSnapshot, automation_flag: &str) -> Self {
        Self {
            coins: snapshot.number("coins").unwrap_or(0.0),
            clicks: snapshot.number("clicks").unwrap_or(0.0),
            tier: snapshot.number("tier").unwrap_or(0.0),
            owned: snapshot
                .get("owned")
                .and_then(|value| value.as_collection())
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
            automation_flag: automation_flag.to_string(),
            auto_active: snapshot.flag(automation_flag),
        }
    }

    fn multiplier(&self) -> f64 {
        1.0 + self.tier
    }

    /// Advance one tick and return the fields it changed.
    pub fn tick(&mut self, tick: u32) -> StateSnapshot {
        let mut update = StateSnapshot::new();

        self.clicks += 1.0;
        self.coins += self.multiplier() * if self.auto_active { 5.0 } else { 1.0 };
        update.insert("clicks", self.clicks);
        update.insert("coins", self.coins);

        // Buy the autoclicker once it is affordable.
        if !self.auto_active && self.coins >= 50.0 {
            self.coins -= 50.0;
            self.auto_active = true;
            self.owned.push("autoclicker".to_string());
            update.insert("coins", self.coins);
            update.insert(self.automation_flag.clone(), true);
            update.insert("owned", self.owned.clone());
        }

        if tick % 10 == 0 {
            update.insert("last_tick", f64::from(tick));
        }

        update
    }

    /// Reset progress in exchange for a tier, returning the full new state.
    pub fn prestige(&mut self) -> StateSnapshot {
        self.tier += 1.0;
        self.coins = 0.0;
        self.clicks = 0.0;
        self.owned.clear();
        self.auto_active = false;

        StateSnapshot::new()
            .with("coins", self.coins)
            .with("clicks", self.clicks)
            .with("tier", self.tier)
            .with("owned", self.owned.clone())
            .with(self.automation_flag.clone(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clicker_schema_is_valid() {
        let schema = clicker_schema("auto_active");
        assert!(schema.validate().is_ok());
        assert!(schema.is_core("coins"));
        assert!(!schema.is_core("auto_active"));
    }

    #[test]
    fn test_tick_accumulates() {
        let mut game = ClickerGame::from_snapshot(&StateSnapshot::new(), "auto_active");
        let update = game.tick(1);
        assert_eq!(update.number("coins"), Some(1.0));
        assert_eq!(update.number("clicks"), Some(1.0));
        assert!(!update.contains("auto_active"));
    }

    #[test]
    fn test_buys_autoclicker() {
        let snapshot = StateSnapshot::new().with("coins", 49.0);
        let mut game = ClickerGame::from_snapshot(&snapshot, "auto_active");

        let update = game.tick(1);
        assert!(update.flag("auto_active"));
        assert_eq!(update.number("coins"), Some(0.0));

        let update = game.tick(2);
        assert_eq!(update.number("coins"), Some(5.0));
    }

    #[test]
    fn test_prestige_resets_progress() {
        let snapshot = StateSnapshot::new()
            .with("coins", 300.0)
            .with("tier", 1.0)
            .with("auto_active", true);
        let mut game = ClickerGame::from_snapshot(&snapshot, "auto_active");

        let reset = game.prestige();
        assert_eq!(reset.number("coins"), Some(0.0));
        assert_eq!(reset.number("tier"), Some(2.0));
        assert!(!reset.flag("auto_active"));

        let update = game.tick(1);
        assert_eq!(update.number("coins"), Some(3.0));
    }
}

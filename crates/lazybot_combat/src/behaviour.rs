//! Health and stamina of one entity

use serde::{Deserialize, Serialize};

use crate::resource::FloatEntityData;

/// Events emitted by [`EntityBehaviour`], drained by the owner
#[derive(Debug, Clone, PartialEq)]
pub enum BehaviourEvent {
    /// Damage was applied and the entity survived
    Damaged { amount: f32, health: f32 },
    /// Health reached its low threshold
    Died,
}

/// Health/stamina resource model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityBehaviour {
    pub health: FloatEntityData,
    pub stamina: FloatEntityData,
    #[serde(skip)]
    dead: bool,
    #[serde(skip)]
    events: Vec<BehaviourEvent>,
}

impl EntityBehaviour {
    pub fn new(health: FloatEntityData, stamina: FloatEntityData) -> Self {
        Self {
            health,
            stamina,
            dead: false,
            events: Vec::new(),
        }
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Regenerate both resources
    pub fn update(&mut self, dt: f32) {
        if self.dead {
            return;
        }
        self.stamina.regenerate(dt);
        self.health.regenerate(dt);
    }

    /// Force-apply damage to health, dying when it reaches the low threshold.
    ///
    /// Returns `false` if the entity was already dead.
    pub fn damage(&mut self, amount: f32) -> bool {
        if self.dead {
            return false;
        }

        self.health.change(-amount, true);

        if self.health.is_low() && !self.health.is_unlimited() {
            self.die();
        } else {
            self.events.push(BehaviourEvent::Damaged {
                amount,
                health: self.health.value(),
            });
        }
        true
    }

    /// Spend health if the result stays in range
    pub fn do_health_action(&mut self, cost: f32) -> bool {
        !self.dead && self.health.change(-cost, false)
    }

    pub fn is_health_action(&self, cost: f32) -> bool {
        !self.dead && self.health.is_changeable(-cost)
    }

    /// Spend stamina if the result stays in range
    pub fn do_stamina_action(&mut self, cost: f32) -> bool {
        !self.dead && self.stamina.change(-cost, false)
    }

    pub fn is_stamina_action(&self, cost: f32) -> bool {
        !self.dead && self.stamina.is_changeable(-cost)
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<BehaviourEvent> {
        std::mem::take(&mut self.events)
    }

    fn die(&mut self) {
        self.stamina.set_locked(true);
        self.health.set_locked(true);
        self.dead = true;
        log::debug!("entity died at health {}", self.health.value());
        self.events.push(BehaviourEvent::Died);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn behaviour() -> EntityBehaviour {
        EntityBehaviour::new(
            FloatEntityData::new(100.0, 0.0, 100.0).with_low(10.0),
            FloatEntityData::new(50.0, 0.0, 50.0).with_regeneration(10.0),
        )
    }

    #[test]
    fn test_damage_event() {
        let mut b = behaviour();
        assert!(b.damage(30.0));
        assert_relative_eq!(b.health.value(), 70.0);
        assert_eq!(
            b.drain_events(),
            vec![BehaviourEvent::Damaged { amount: 30.0, health: 70.0 }]
        );
        assert!(b.drain_events().is_empty());
    }

    #[test]
    fn test_damage_is_clamped() {
        let mut b = behaviour();
        b.damage(1000.0);
        assert_relative_eq!(b.health.value(), 0.0);
        assert!(b.is_dead());
    }

    #[test]
    fn test_death_is_terminal() {
        let mut b = behaviour();
        b.damage(90.0);
        assert!(b.is_dead());
        assert_eq!(b.drain_events(), vec![BehaviourEvent::Died]);

        assert!(!b.damage(1.0));
        assert!(!b.do_health_action(1.0));
        assert!(!b.do_stamina_action(1.0));
        assert!(!b.is_stamina_action(1.0));
        assert!(b.health.is_locked());
        assert!(b.stamina.is_locked());
        assert!(b.drain_events().is_empty());
    }

    #[test]
    fn test_unlimited_health_never_dies() {
        let mut b = behaviour();
        b.health.set_unlimited(true);
        b.damage(1000.0);
        assert!(!b.is_dead());
        assert_relative_eq!(b.health.value(), 100.0);
    }

    #[test]
    fn test_actions() {
        let mut b = behaviour();
        assert!(b.is_stamina_action(50.0));
        assert!(!b.is_stamina_action(51.0));
        assert!(b.do_stamina_action(20.0));
        assert_relative_eq!(b.stamina.value(), 30.0);
        assert!(!b.do_health_action(101.0));
        assert!(b.do_health_action(5.0));
        assert_relative_eq!(b.health.value(), 95.0);
    }

    #[test]
    fn test_update_regenerates() {
        let mut b = behaviour();
        b.do_stamina_action(20.0);
        b.update(0.5);
        assert_relative_eq!(b.stamina.value(), 35.0);
    }
}

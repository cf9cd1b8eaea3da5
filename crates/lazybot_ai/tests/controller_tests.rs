//! Integration tests for the entity controller

use std::sync::Arc;

use glam::Vec3;
use lazybot_ai::prelude::*;
use lazybot_combat::{EntityBehaviour, FloatEntityData};
use lazybot_core::{AreaId, EntityId, PointId, PropertyValue, Transform};
use parking_lot::Mutex;

type Journal = Arc<Mutex<Vec<String>>>;

struct Patrol {
    journal: Journal,
}

impl StateBehaviour for Patrol {
    fn name(&self) -> &str {
        "patrol"
    }

    fn validate(&self, agent: &EntityAgent) -> bool {
        !agent.navigation.is_empty() && agent.targets.count() == 0
    }

    fn on_enter(&self, agent: &mut EntityAgent) {
        self.journal.lock().push("patrol.enter".into());
        agent.on_update_path_destination().unwrap();
    }

    fn execute(&self, _agent: &mut EntityAgent) {
        self.journal.lock().push("patrol.execute".into());
    }

    fn on_exit(&self, agent: &mut EntityAgent) {
        self.journal.lock().push("patrol.exit".into());
        agent.navigation_index = None;
    }
}

struct Attack {
    journal: Journal,
}

impl StateBehaviour for Attack {
    fn name(&self) -> &str {
        "attack"
    }

    fn validate(&self, agent: &EntityAgent) -> bool {
        agent.targets.count() > 0
    }

    fn on_enter(&self, _agent: &mut EntityAgent) {
        self.journal.lock().push("attack.enter".into());
    }

    fn execute(&self, agent: &mut EntityAgent) {
        self.journal.lock().push("attack.execute".into());
        let position = agent
            .targets
            .first_mut()
            .and_then(|target| target.get(POSITION).and_then(PropertyValue::as_vec3));
        agent.update_path(position, true);
    }

    fn on_exit(&self, _agent: &mut EntityAgent) {
        self.journal.lock().push("attack.exit".into());
    }
}

fn guard(journal: &Journal) -> EntityController {
    let behaviour = EntityBehaviour::new(
        FloatEntityData::new(100.0, 0.0, 100.0).with_low(5.0),
        FloatEntityData::new(20.0, 0.0, 20.0),
    );
    let path = NavigationContainer::new().with_points((0..3).map(|i| {
        NavigationPoint::new(IntermediatePoint::shared(
            PointId(i),
            Vec3::new(i as f32 * 10.0, 0.0, 0.0),
        ))
        .with_action(PointAction::Continue)
    }));
    let agent = EntityAgent::new(
        EntityId(1),
        behaviour,
        Box::new(StaticMover::new(Transform::from_position(Vec3::new(9.0, 0.0, 0.0)))),
    )
    .with_navigation(path);

    EntityController::new(agent)
        .with_exclusive(
            EntityState::new(Arc::new(Patrol {
                journal: Arc::clone(journal),
            }))
            .with_check_on(IntMask::parse("1")),
        )
        .with_exclusive(
            EntityState::new(Arc::new(Attack {
                journal: Arc::clone(journal),
            }))
            .with_priority(10)
            .with_check_on(IntMask::parse("0")),
        )
}

fn drain(journal: &Journal) -> Vec<String> {
    std::mem::take(&mut *journal.lock())
}

#[test]
fn test_patrol_attack_round_trip() {
    let journal = Journal::default();
    let mut controller = guard(&journal);
    let enemy = TargetType::new("enemy").with_mask(IntMask::parse("0"));

    controller.tick(0.1);
    assert_eq!(drain(&journal), vec!["patrol.enter", "patrol.execute"]);
    assert_eq!(controller.agent().navigation_index, Some(1));

    controller.agent_mut().add_target(
        &enemy,
        AreaId(4),
        Target::resolved([(POSITION, PropertyValue::Vec3(Vec3::new(0.0, 0.0, 30.0)))]),
    );
    controller.tick(0.1);
    assert_eq!(
        drain(&journal),
        vec!["patrol.exit", "attack.enter", "attack.execute"]
    );
    assert_eq!(controller.active_state().map(EntityState::name), Some("attack"));
    assert_eq!(controller.agent().navigation_index, None);
    assert_eq!(
        controller.agent().mover().destination(),
        Some(Vec3::new(0.0, 0.0, 30.0))
    );

    controller.tick(0.1);
    assert_eq!(drain(&journal), vec!["attack.execute"]);

    controller.agent_mut().clear_target("enemy", AreaId(4));
    controller.tick(0.1);
    assert_eq!(
        drain(&journal),
        vec!["attack.exit", "patrol.enter", "patrol.execute"]
    );
}

#[test]
fn test_lazy_target_fills_when_attacked() {
    let journal = Journal::default();
    let mut controller = guard(&journal);
    let mut manager = EntityManager::new();

    let behaviour = EntityBehaviour::new(
        FloatEntityData::new(10.0, 0.0, 10.0),
        FloatEntityData::new(10.0, 0.0, 10.0),
    );
    let intruder = EntityAgent::new(
        EntityId(2),
        behaviour,
        Box::new(StaticMover::new(Transform::from_position(Vec3::new(-4.0, 0.0, 2.0)))),
    );
    manager.register(EntityController::new(intruder));
    manager.publish_board();

    let enemy = TargetType::new("enemy").with_mask(IntMask::parse("0"));
    let fill = manager.lazy_fill(EntityId(2), &enemy.mask);
    controller
        .agent_mut()
        .add_target(&enemy, AreaId(1), Target::lazy(fill).with_source(EntityId(2)));

    controller.tick(0.1);
    controller.tick(0.1);
    assert_eq!(
        controller.agent().mover().destination(),
        Some(Vec3::new(-4.0, 0.0, 2.0))
    );
}

#[test]
fn test_navigation_wraps_over_full_cycle() {
    let mut nav = NavigationContainer::new().with_points((0..4).map(|i| {
        NavigationPoint::new(IntermediatePoint::shared(PointId(i), Vec3::splat(i as f32)))
    }));
    let indices: Vec<usize> = (0..5).map(|_| nav.next_point().unwrap().1).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 0]);
}

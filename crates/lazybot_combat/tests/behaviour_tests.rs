//! Resource model tests across many operations

use lazybot_combat::prelude::*;

#[test]
fn test_change_applies_iff_in_range() {
    let amounts = [-3.0, 4.5, 10.0, -12.0, 0.0, 2.25, -7.75, 30.0, -30.0, 1.0];
    let mut data = FloatEntityData::new(5.0, 0.0, 10.0);

    for amount in amounts {
        let before = data.value();
        let expected = before + amount >= 0.0 && before + amount <= 10.0;
        let applied = data.change(amount, false);
        assert_eq!(applied, expected, "amount {amount} from {before}");
        if applied {
            assert_eq!(data.value(), before + amount);
        } else {
            assert_eq!(data.value(), before);
        }
    }
}

#[test]
fn test_dead_entity_ignores_regeneration() {
    let mut behaviour = EntityBehaviour::new(
        FloatEntityData::new(20.0, 0.0, 20.0).with_low(5.0).with_regeneration(100.0),
        FloatEntityData::new(10.0, 0.0, 10.0).with_regeneration(100.0),
    );

    behaviour.damage(15.0);
    assert!(behaviour.is_dead());

    let health = behaviour.health.value();
    behaviour.update(1.0);
    assert_eq!(behaviour.health.value(), health);
}

#[test]
fn test_deserialized_resource_starts_at_start() {
    let data: FloatEntityData =
        serde_json::from_str(r#"{"start": 40.0, "min": 0.0, "max": 50.0, "low": 5.0}"#).unwrap();
    let data = data.validated().unwrap();
    assert_eq!(data.value(), 40.0);
    assert!(data.is_regenerating());
    assert!(!data.is_locked());
}

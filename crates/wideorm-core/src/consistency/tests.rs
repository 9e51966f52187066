use super::*;
use crate::{
    model::{MappingError, property::PropertyKind, registry::MetadataRegistry},
    schema::{ConsistencySchema, EntitySchema, IdSchema, PropertySchema},
    test_support::{meta, registry, user_schema},
    value::ValueKind,
};

fn policy() -> ConsistencyPolicy {
    ConsistencyPolicy::new(ConsistencyLevel::One, ConsistencyLevel::Quorum)
}

#[test]
fn batch_pinned_level_wins_over_entity_declaration() {
    let user = meta("User");
    let name = user.property("name").unwrap();
    let target = ConsistencyTarget::Property {
        entity: &user,
        property: name,
    };

    let outside = ResolutionContext::default();
    assert_eq!(
        resolve_write(&policy(), target, &outside).unwrap(),
        ConsistencyLevel::All
    );

    let inside = ResolutionContext::new(
        ConsistencyPair::empty(),
        ConsistencyPair::write(ConsistencyLevel::EachQuorum),
    );
    assert_eq!(
        resolve_write(&policy(), target, &inside).unwrap(),
        ConsistencyLevel::EachQuorum
    );
}

#[test]
fn priority_chain_falls_through_in_order() {
    let schema = user_schema().property(
        PropertySchema::simple("bio", ValueKind::Text).consistency(ConsistencySchema::new(
            Some(ConsistencyLevel::Two),
            None,
        )),
    );
    let registry = MetadataRegistry::bootstrap(&[schema]).unwrap();
    let user = registry.get("User").unwrap();
    let bio = ConsistencyTarget::Property {
        entity: user,
        property: user.property("bio").unwrap(),
    };
    let mut policy = policy();

    // property declaration beats the global default
    let none = ResolutionContext::default();
    assert_eq!(resolve_read(&policy, bio, &none).unwrap(), ConsistencyLevel::Two);

    // batch beats property
    let pinned = ResolutionContext::new(
        ConsistencyPair::empty(),
        ConsistencyPair::read(ConsistencyLevel::Three),
    );
    assert_eq!(resolve_read(&policy, bio, &pinned).unwrap(), ConsistencyLevel::Three);

    // call override beats batch
    let call = ResolutionContext::new(
        ConsistencyPair::read(ConsistencyLevel::LocalOne),
        ConsistencyPair::read(ConsistencyLevel::Three),
    );
    assert_eq!(resolve_read(&policy, bio, &call).unwrap(), ConsistencyLevel::LocalOne);

    // table entry beats entity declaration
    let entity = ConsistencyTarget::Entity(user);
    assert_eq!(resolve_write(&policy, entity, &none).unwrap(), ConsistencyLevel::All);
    policy.set_level("users", AccessKind::Write, ConsistencyLevel::LocalQuorum);
    assert_eq!(
        resolve_write(&policy, entity, &none).unwrap(),
        ConsistencyLevel::LocalQuorum
    );

    // nothing declared anywhere
    assert_eq!(resolve_read(&policy, entity, &none).unwrap(), ConsistencyLevel::One);
}

#[test]
fn counter_any_fails_at_resolution() {
    let user = meta("User");
    let visits = ConsistencyTarget::Property {
        entity: &user,
        property: user.property("visits").unwrap(),
    };
    let ctx = ResolutionContext::new(ConsistencyPair::both(ConsistencyLevel::Any), ConsistencyPair::empty());

    let err = resolve_read(&policy(), visits, &ctx).unwrap_err();

    assert_eq!(
        err,
        ConsistencyError::AnyForCounter {
            target: "User.visits".to_string(),
            access: AccessKind::Read,
        }
    );
}

#[test]
fn counter_any_fails_from_the_global_default() {
    let clicks = meta("Clicks");
    let any = ConsistencyPolicy::new(ConsistencyLevel::Any, ConsistencyLevel::Any);

    let err = resolve_write(&any, ConsistencyTarget::Entity(&clicks), &ResolutionContext::default())
        .unwrap_err();

    assert!(matches!(err, ConsistencyError::AnyForCounter { ref target, .. } if target == "Clicks"));
}

#[test]
fn non_counter_any_is_allowed() {
    let user = meta("User");
    let name = ConsistencyTarget::Property {
        entity: &user,
        property: user.property("name").unwrap(),
    };
    let ctx = ResolutionContext::new(ConsistencyPair::read(ConsistencyLevel::Any), ConsistencyPair::empty());

    assert_eq!(resolve_read(&policy(), name, &ctx).unwrap(), ConsistencyLevel::Any);
}

#[test]
fn counter_any_fails_at_bootstrap() {
    let schema = user_schema().property(
        PropertySchema::new("likes", PropertyKind::Counter, ValueKind::BigInt).consistency(
            ConsistencySchema::new(Some(ConsistencyLevel::Any), None),
        ),
    );

    let err = MetadataRegistry::bootstrap(&[schema]).unwrap_err();

    assert_eq!(
        err,
        MappingError::CounterConsistency {
            entity: "User".to_string(),
            property: "likes".to_string(),
            access: AccessKind::Read,
        }
    );
}

#[test]
fn policy_falls_back_to_defaults() {
    let mut policy = policy();
    assert_eq!(policy.level("nowhere", AccessKind::Read), ConsistencyLevel::One);
    assert_eq!(policy.level("nowhere", AccessKind::Write), ConsistencyLevel::Quorum);

    policy.set_level("t", AccessKind::Read, ConsistencyLevel::All);
    assert_eq!(policy.level("t", AccessKind::Read), ConsistencyLevel::All);
    assert_eq!(policy.level("t", AccessKind::Write), ConsistencyLevel::Quorum);
}

#[test]
fn policy_is_seeded_from_declared_levels() {
    let policy = ConsistencyPolicy::from_registry(
        &registry(),
        ConsistencyLevel::One,
        ConsistencyLevel::One,
    );

    assert_eq!(policy.table_level("users", AccessKind::Write), Some(ConsistencyLevel::All));
    assert_eq!(policy.table_level("users", AccessKind::Read), None);
    assert_eq!(policy.table_level("tweets", AccessKind::Write), None);
}

fn shared_table_entity(name: &str, write: ConsistencyLevel) -> EntitySchema {
    EntitySchema::new(
        name,
        IdSchema::Simple(PropertySchema::simple("id", ValueKind::BigInt)),
    )
    .table("shared")
    .consistency(ConsistencySchema::new(None, Some(write)))
}

#[test]
fn entities_sharing_a_table_keep_their_declared_level() {
    let registry = MetadataRegistry::bootstrap(&[
        shared_table_entity("A", ConsistencyLevel::All),
        shared_table_entity("B", ConsistencyLevel::All),
    ])
    .unwrap();
    let policy =
        ConsistencyPolicy::from_registry(&registry, ConsistencyLevel::One, ConsistencyLevel::One);

    for name in ["A", "B"] {
        let entity = registry.get(name).unwrap();
        assert_eq!(
            resolve_write(
                &policy,
                ConsistencyTarget::Entity(entity),
                &ResolutionContext::default()
            )
            .unwrap(),
            ConsistencyLevel::All
        );
    }
}

#[test]
fn conflicting_levels_on_a_shared_table_fail_bootstrap() {
    let err = MetadataRegistry::bootstrap(&[
        shared_table_entity("A", ConsistencyLevel::All),
        shared_table_entity("B", ConsistencyLevel::One),
    ])
    .unwrap_err();

    assert_eq!(
        err,
        MappingError::TableConsistencyConflict {
            table: "shared".to_string(),
            first: "A".to_string(),
            second: "B".to_string(),
            access: AccessKind::Write,
        }
    );
}

#[test]
fn levels_parse_case_insensitively() {
    assert_eq!(
        "each_quorum".parse::<ConsistencyLevel>().unwrap(),
        ConsistencyLevel::EachQuorum
    );
    assert_eq!(ConsistencyLevel::LocalSerial.to_string(), "LOCAL_SERIAL");
    assert!(matches!(
        "MOST".parse::<ConsistencyLevel>(),
        Err(ConsistencyError::UnknownLevel { .. })
    ));
}

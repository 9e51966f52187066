use super::*;
use crate::value::{CustomValue, ValueKind};
use proptest::prelude::*;
use uuid::Uuid;

const ENTITY: &str = "entityClass";

fn shape(kinds: &[ValueKind]) -> Vec<KeyComponent> {
    kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| KeyComponent::new(format!("c{i}"), kind.clone()))
        .collect()
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn partition_requires_at_least_one_component() {
    let components = shape(&[ValueKind::BigInt, ValueKind::Text]);

    let err = validate_partition(ENTITY, &components, &[]).unwrap_err();

    assert_eq!(
        err.to_string(),
        "There should be at least one partition key component provided for querying on entity 'entityClass'"
    );
}

#[test]
fn clustering_requires_at_least_one_component() {
    let components = shape(&[ValueKind::BigInt]);

    let err = validate_clustering(ENTITY, &components, &[]).unwrap_err();

    assert_eq!(
        err.to_string(),
        "There should be at least one clustering key component provided for querying on entity 'entityClass'"
    );
}

#[test]
fn partition_count_must_match_exactly() {
    let components = shape(&[ValueKind::BigInt, ValueKind::Text]);
    let values = [Value::BigInt(11), text("test"), Value::Int(11)];

    let err = validate_partition(ENTITY, &components, &values).unwrap_err();

    assert_eq!(
        err.to_string(),
        "There should be exactly '2' partition components for querying on entity 'entityClass'"
    );

    let err = validate_partition(ENTITY, &components, &[Value::BigInt(11)]).unwrap_err();
    assert!(matches!(
        err,
        ValidationError::ComponentCount { expected: 2, .. }
    ));
}

#[test]
fn partition_type_mismatch_names_value_and_types() {
    let components = shape(&[ValueKind::BigInt, ValueKind::BigInt]);
    let values = [Value::BigInt(11), text("name")];

    let err = validate_partition(ENTITY, &components, &values).unwrap_err();

    assert_eq!(
        err.to_string(),
        "The type 'String' of partition key component 'name' for querying on entity 'entityClass' is not valid. It should be 'i64'"
    );
}

#[test]
fn partition_rejects_null_with_one_based_position() {
    let components = shape(&[ValueKind::BigInt, ValueKind::Text]);
    let values = [Value::BigInt(1), Value::Null];

    let err = validate_partition(ENTITY, &components, &values).unwrap_err();

    assert_eq!(
        err,
        ValidationError::NullComponent {
            role: ComponentRole::Partition,
            position: 2,
            entity: ENTITY.to_string(),
        }
    );
}

#[test]
fn partition_accepts_matching_values() {
    let components = shape(&[ValueKind::BigInt, ValueKind::Text]);

    validate_partition(ENTITY, &components, &[Value::BigInt(1), text("a")]).unwrap();
}

#[test]
fn clustering_rejects_gap_between_non_null_components() {
    let components = shape(&[ValueKind::Text, ValueKind::Int, ValueKind::Uuid]);
    let values = [text("name"), Value::Null, Value::Uuid(Uuid::new_v4())];

    let err = validate_clustering(ENTITY, &components, &values).unwrap_err();

    assert!(matches!(err, ValidationError::ComponentGap { .. }));
    assert!(
        err.to_string()
            .contains("no null value between two non-null components")
    );
}

#[test]
fn clustering_all_null_skips_validation() {
    let components = shape(&[ValueKind::BigInt, ValueKind::Text, ValueKind::Int]);

    validate_clustering(ENTITY, &components, &[Value::Null, Value::Null, Value::Null]).unwrap();
}

#[test]
fn clustering_accepts_trailing_nulls() {
    let components = shape(&[ValueKind::BigInt, ValueKind::Text, ValueKind::Int]);

    validate_clustering(ENTITY, &components, &[Value::BigInt(3), Value::Null]).unwrap();
}

#[test]
fn clustering_rejects_more_than_declared() {
    let components = shape(&[ValueKind::Text]);

    let err = validate_clustering(ENTITY, &components, &[text("a"), text("b")]).unwrap_err();

    assert_eq!(
        err.to_string(),
        "There should be at most '1' clustering components for querying on entity 'entityClass'"
    );
}

#[test]
fn clustering_type_mismatch_uses_clustering_role() {
    let components = shape(&[ValueKind::Int]);

    let err = validate_clustering(ENTITY, &components, &[text("x")]).unwrap_err();

    assert_eq!(
        err.to_string(),
        "The type 'String' of clustering key component 'x' for querying on entity 'entityClass' is not valid. It should be 'i32'"
    );
}

#[test]
fn clustering_custom_component_must_be_ordered() {
    let components = shape(&[ValueKind::Custom("Point".to_string())]);
    let unordered = Value::Custom(CustomValue::new("Point", "[1,2]", false));
    let ordered = Value::Custom(CustomValue::new("Point", "[1,2]", true));

    let err = validate_clustering(ENTITY, &components, &[unordered]).unwrap_err();
    assert!(matches!(
        err,
        ValidationError::NotComparable { ref type_name, .. } if type_name == "Point"
    ));

    validate_clustering(ENTITY, &components, &[ordered]).unwrap();
}

#[test]
fn validate_dispatches_on_role() {
    let components = shape(&[ValueKind::BigInt, ValueKind::Text]);

    // a prefix is fine for clustering, not for partition
    validate(ENTITY, ComponentRole::Clustering, &components, &[Value::BigInt(1)]).unwrap();
    assert!(validate(ENTITY, ComponentRole::Partition, &components, &[Value::BigInt(1)]).is_err());
}

fn kind_and_value() -> impl Strategy<Value = (ValueKind, Value)> {
    prop_oneof![
        any::<i64>().prop_map(|v| (ValueKind::BigInt, Value::BigInt(v))),
        any::<i32>().prop_map(|v| (ValueKind::Int, Value::Int(v))),
        any::<bool>().prop_map(|v| (ValueKind::Bool, Value::Bool(v))),
        "[a-z]{0,8}".prop_map(|v| (ValueKind::Text, Value::Text(v))),
    ]
}

proptest! {
    #[test]
    fn clustering_accepts_any_typed_prefix_padded_with_nulls(
        columns in prop::collection::vec(kind_and_value(), 1..6),
        bound in 0usize..6,
    ) {
        let components: Vec<_> = columns
            .iter()
            .enumerate()
            .map(|(i, (kind, _))| KeyComponent::new(format!("c{i}"), kind.clone()))
            .collect();
        let bound = bound.min(columns.len());
        let values: Vec<_> = columns
            .iter()
            .enumerate()
            .map(|(i, (_, value))| if i < bound { value.clone() } else { Value::Null })
            .collect();

        prop_assert!(validate_clustering(ENTITY, &components, &values).is_ok());
        prop_assert!(validate_clustering(ENTITY, &components, &values[..bound.max(1)]).is_ok());
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use fleetql::{
    FieldDefinition, FieldType, QueryParser, QueryValidator, ResourceDefinition, SchemaRegistry,
    SqlError,
};

fn field(name: &str) -> FieldDefinition {
    FieldDefinition {
        name: name.to_string(),
        ..Default::default()
    }
}

fn field_with_aliases(name: &str, aliases: &[&str]) -> FieldDefinition {
    FieldDefinition {
        name: name.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        ..Default::default()
    }
}

fn fields(defs: Vec<FieldDefinition>) -> HashMap<String, FieldDefinition> {
    defs.into_iter().map(|f| (f.name.clone(), f)).collect()
}

fn test_schema() -> Arc<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry.register(ResourceDefinition {
        name: "pod".to_string(),
        aliases: vec!["pods".to_string(), "po".to_string()],
        default_fields: vec!["name".to_string(), "status".to_string()],
        fields: fields(vec![
            field("name"),
            field_with_aliases("namespace", &["ns"]),
            field("status"),
            field("restarts"),
            field("node"),
            FieldDefinition {
                name: "labels".to_string(),
                field_type: FieldType::Map,
                ..Default::default()
            },
        ]),
    });
    registry.register(ResourceDefinition {
        name: "service".to_string(),
        aliases: vec!["svc".to_string()],
        default_fields: vec![],
        fields: fields(vec![field("name"), field("type"), field("selector")]),
    });
    registry.register(ResourceDefinition {
        name: "deployment".to_string(),
        aliases: vec!["deploy".to_string()],
        default_fields: vec![],
        fields: fields(vec![field("name"), field("replicas")]),
    });
    Arc::new(registry)
}

fn validate(query_text: &str) -> Result<(), SqlError> {
    let parser = QueryParser::new();
    let query = parser.parse(query_text).unwrap();
    QueryValidator::new(test_schema()).validate(&query)
}

fn error_message(result: Result<(), SqlError>) -> String {
    result.unwrap_err().to_string()
}

fn suggestions_of(result: Result<(), SqlError>) -> Vec<String> {
    match result.unwrap_err() {
        SqlError::ValidationError { suggestions, .. } => suggestions,
        other => panic!("expected ValidationError, got {:?}", other),
    }
}

#[test]
fn test_valid_simple_query() {
    assert!(validate("name,status FROM pod WHERE namespace=default").is_ok());
}

#[test]
fn test_resource_alias_accepted() {
    assert!(validate("name FROM pods").is_ok());
    assert!(validate("name FROM po").is_ok());
}

#[test]
fn test_unknown_resource_with_suggestions() {
    let result = validate("name FROM podz");
    let suggestions = suggestions_of(result);
    assert_eq!(suggestions.first().map(String::as_str), Some("pod"));
    assert!(suggestions.iter().any(|s| s == "pods"));
}

#[test]
fn test_unknown_resource_message() {
    let message = error_message(validate("name FROM bogusresource"));
    assert!(message.contains("Resource 'bogusresource' not found"));
}

#[test]
fn test_unknown_field_with_suggestions() {
    let result = validate("nmae FROM pod");
    let message = result.as_ref().unwrap_err().to_string();
    assert!(message.contains("Field 'nmae' not found in resource 'pod'"));
    assert!(suggestions_of(result).iter().any(|s| s == "name"));
}

#[test]
fn test_field_alias_accepted() {
    assert!(validate("ns FROM pod").is_ok());
}

#[test]
fn test_where_field_checked_recursively() {
    let message = error_message(validate(
        "name FROM pod WHERE status=Running OR bogusfield=1",
    ));
    assert!(message.contains("WHERE clause"));
}

#[test]
fn test_map_sub_field_accepted() {
    assert!(validate("name FROM pod WHERE labels.app=web").is_ok());
}

#[test]
fn test_map_sub_field_on_plain_field_rejected() {
    assert!(validate("name FROM pod WHERE status.app=web").is_err());
}

#[test]
fn test_join_resource_checked() {
    let message = error_message(validate("name FROM pod INNER JOIN bogus ON name = selector"));
    assert!(message.contains("JOIN validation failed"));
    assert!(message.contains("Resource 'bogus' not found"));
}

#[test]
fn test_join_resource_accepted() {
    assert!(validate("name FROM pod INNER JOIN service svc ON name = selector").is_ok());
}

#[test]
fn test_subquery_resource_checked() {
    let message = error_message(validate("name FROM pod WHERE name IN (name FROM bogus)"));
    assert!(message.contains("subquery validation failed"));
}

#[test]
fn test_subquery_resource_accepted() {
    assert!(validate("name FROM pod WHERE name IN (name FROM deployment)").is_ok());
}

#[test]
fn test_order_by_aggregate_alias_accepted() {
    assert!(validate(
        "namespace, COUNT as total FROM pod GROUP BY namespace ORDER BY total DESC"
    )
    .is_ok());
}

#[test]
fn test_order_by_selected_field_accepted() {
    assert!(validate("name FROM pod ORDER BY name").is_ok());
}

#[test]
fn test_order_by_schema_field_accepted() {
    // restarts is not selected but is a genuine schema field
    assert!(validate("name FROM pod ORDER BY restarts DESC").is_ok());
}

#[test]
fn test_order_by_unknown_field_rejected() {
    let message = error_message(validate("name FROM pod ORDER BY bogus"));
    assert!(message.contains("ORDER BY clause"));
}

#[test]
fn test_group_by_unknown_field_rejected() {
    let message = error_message(validate(
        "bogus, COUNT as total FROM pod GROUP BY bogus",
    ));
    assert!(message.contains("GROUP BY clause"));
}

#[test]
fn test_aggregate_target_checked() {
    let message = error_message(validate("SUM.bogus AS s FROM pod"));
    assert!(message.contains("SUM() aggregation"));
}

#[test]
fn test_aggregate_count_star_accepted() {
    assert!(validate("COUNT(*) FROM pod").is_ok());
}

#[test]
fn test_distinct_with_aggregates_rejected() {
    let message = error_message(validate("DISTINCT COUNT(*) FROM pod"));
    assert!(message.contains("DISTINCT cannot be used with aggregate functions"));
}

#[test]
fn test_distinct_with_group_by_rejected() {
    let message = error_message(validate(
        "DISTINCT status FROM pod GROUP BY status",
    ));
    assert!(message.contains("DISTINCT cannot be used with GROUP BY"));
}

#[test]
fn test_distinct_star_allowed() {
    assert!(validate("DISTINCT * FROM pod").is_ok());
}

#[test]
fn test_aggregates_without_group_by_reject_plain_fields() {
    // Aggregate present, no GROUP BY, non-aggregate field selected
    let message = error_message(validate("name, COUNT as count FROM pod"));
    assert!(message.contains("must appear in GROUP BY"));
}

#[test]
fn test_star_with_aggregates_rejected() {
    let message = error_message(validate("*, COUNT as count FROM pod"));
    assert!(message.contains("Cannot use '*' with aggregate functions without GROUP BY"));
}

#[test]
fn test_star_with_group_by_rejected() {
    let message = error_message(validate("* FROM pod GROUP BY namespace"));
    assert!(message.contains("Cannot use '*' with GROUP BY"));
}

#[test]
fn test_group_by_covers_selected_fields() {
    assert!(validate("namespace, COUNT as total FROM pod GROUP BY namespace").is_ok());

    let message = error_message(validate(
        "namespace, status, COUNT as total FROM pod GROUP BY namespace",
    ));
    assert!(message.contains("Field 'status' must appear in GROUP BY"));
}

#[test]
fn test_group_by_alias_normalized_equality() {
    // "ns" and "namespace" resolve to the same canonical field
    assert!(validate("ns, COUNT as total FROM pod GROUP BY namespace").is_ok());
}

#[test]
fn test_having_requires_group_by_or_aggregates() {
    let message = error_message(validate("name FROM pod HAVING restarts > 5"));
    assert!(message.contains("HAVING clause requires GROUP BY or aggregate functions"));
}

#[test]
fn test_having_on_aggregate_token_accepted() {
    assert!(validate(
        "status, COUNT(*) FROM pod GROUP BY status HAVING count > 1"
    )
    .is_ok());
}

#[test]
fn test_having_on_group_by_field_accepted() {
    assert!(validate(
        "status, COUNT as total FROM pod GROUP BY status HAVING status = Running"
    )
    .is_ok());
}

#[test]
fn test_having_on_ungrouped_field_rejected() {
    let message = error_message(validate(
        "status, COUNT as total FROM pod GROUP BY status HAVING node = worker-1",
    ));
    assert!(message.contains("HAVING clause must be in GROUP BY"));
}

#[test]
fn test_validation_is_deterministic() {
    let parser = QueryParser::new();
    let query = parser.parse("name FROM podz").unwrap();
    let validator = QueryValidator::new(test_schema());

    let first = validator.validate(&query).unwrap_err();
    let second = validator.validate(&query).unwrap_err();
    assert_eq!(first, second);
}

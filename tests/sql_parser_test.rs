use fleetql::fleetql::sql::ast::*;
use fleetql::QueryParser;

#[test]
fn test_simple_query() {
    let parser = QueryParser::new();
    let query = parser
        .parse("name,status FROM pod WHERE namespace=default")
        .unwrap();

    assert_eq!(query.fields, vec!["name", "status"]);
    assert_eq!(query.resource, "pod");
    assert_eq!(query.scope, "default");

    let conditions = query.conditions.expect("conditions should be parsed");
    assert_eq!(conditions.operator, LogicalOperator::And);
    assert_eq!(conditions.conditions.len(), 1);
    assert_eq!(conditions.conditions[0].field, "namespace");
    assert_eq!(conditions.conditions[0].operator, ConditionOperator::Equal);
    assert_eq!(conditions.conditions[0].value, "default");
}

#[test]
fn test_optional_select_keyword() {
    let parser = QueryParser::new();
    let query = parser
        .parse("SELECT name,status FROM pod WHERE namespace=default")
        .unwrap();
    assert_eq!(query.fields, vec!["name", "status"]);
    assert_eq!(query.resource, "pod");
}

#[test]
fn test_tool_name_prefix_stripped() {
    let parser = QueryParser::new();
    let query = parser.parse("fleetql name FROM pod").unwrap();
    assert_eq!(query.fields, vec!["name"]);
    assert_eq!(query.resource, "pod");
}

#[test]
fn test_select_star() {
    let parser = QueryParser::new();
    let query = parser
        .parse("* FROM deployment WHERE namespace=production")
        .unwrap();
    assert_eq!(query.fields, vec!["*"]);
    assert!(!query.use_default_fields);
    assert_eq!(query.scope, "production");
}

#[test]
fn test_empty_field_list_uses_defaults() {
    let parser = QueryParser::new();
    let query = parser.parse("FROM pod WHERE namespace=default").unwrap();
    assert_eq!(query.fields, vec!["*"]);
    assert!(query.use_default_fields);
    assert_eq!(query.resource, "pod");
}

#[test]
fn test_default_scope() {
    let parser = QueryParser::new();
    let query = parser.parse("name FROM pod").unwrap();
    assert_eq!(query.scope, "default");
}

#[test]
fn test_scope_from_ns_alias() {
    let parser = QueryParser::new();
    let query = parser.parse("name FROM pod WHERE ns=production").unwrap();

    assert_eq!(query.scope, "production");
    // The condition itself keeps the alias; resolution happens at execution
    let conditions = query.conditions.unwrap();
    assert_eq!(conditions.conditions[0].field, "ns");
}

#[test]
fn test_missing_from_is_error() {
    let parser = QueryParser::new();
    assert!(parser.parse("name,status pod").is_err());
}

#[test]
fn test_missing_resource_is_error() {
    let parser = QueryParser::new();
    assert!(parser.parse("name FROM").is_err());
}

#[test]
fn test_resource_alias() {
    let parser = QueryParser::new();
    let query = parser.parse("name FROM pod p WHERE status=Running").unwrap();
    assert_eq!(query.resource, "pod");
    assert_eq!(query.resource_alias.as_deref(), Some("p"));
}

#[test]
fn test_order_by_desc() {
    let parser = QueryParser::new();
    let query = parser
        .parse("name,restarts FROM pod ORDER BY restarts DESC")
        .unwrap();
    assert_eq!(query.order_by.len(), 1);
    assert_eq!(query.order_by[0].field, "restarts");
    assert!(query.order_by[0].descending);
}

#[test]
fn test_multiple_order_by() {
    let parser = QueryParser::new();
    let query = parser
        .parse("namespace,name FROM pod ORDER BY namespace ASC, name DESC")
        .unwrap();
    assert_eq!(query.order_by.len(), 2);
    assert_eq!(query.order_by[0].field, "namespace");
    assert!(!query.order_by[0].descending);
    assert_eq!(query.order_by[1].field, "name");
    assert!(query.order_by[1].descending);
}

#[test]
fn test_limit() {
    let parser = QueryParser::new();
    let query = parser.parse("name FROM pod LIMIT 10").unwrap();
    assert_eq!(query.limit, 10);
    assert_eq!(query.offset, 0);
}

#[test]
fn test_limit_offset() {
    let parser = QueryParser::new();
    let query = parser.parse("name FROM pod LIMIT 10 OFFSET 20").unwrap();
    assert_eq!(query.limit, 10);
    assert_eq!(query.offset, 20);
}

#[test]
fn test_distinct() {
    let parser = QueryParser::new();
    let query = parser.parse("DISTINCT status FROM pod").unwrap();
    assert!(query.distinct);
    assert_eq!(query.fields, vec!["status"]);
}

#[test]
fn test_group_by_with_count() {
    let parser = QueryParser::new();
    let query = parser
        .parse("namespace, COUNT(*) as pod_count FROM pod GROUP BY namespace")
        .unwrap();

    assert_eq!(query.group_by, vec!["namespace"]);
    assert_eq!(query.aggregates.len(), 1);
    assert_eq!(query.aggregates[0].function, AggregateFunction::Count);
    assert_eq!(query.aggregates[0].field, "*");
    assert_eq!(query.aggregates[0].alias, "pod_count");
}

#[test]
fn test_bare_aggregate_with_alias() {
    let parser = QueryParser::new();
    let query = parser
        .parse("namespace, COUNT as total FROM pod GROUP BY namespace")
        .unwrap();

    assert_eq!(query.aggregates.len(), 1);
    assert_eq!(query.aggregates[0].function, AggregateFunction::Count);
    assert_eq!(query.aggregates[0].field, "*");
    assert_eq!(query.aggregates[0].alias, "total");
    assert_eq!(query.group_by, vec!["namespace"]);
}

#[test]
fn test_dot_form_aggregate() {
    let parser = QueryParser::new();
    let query = parser.parse("SUM.restarts FROM pod").unwrap();

    assert_eq!(query.aggregates.len(), 1);
    assert_eq!(query.aggregates[0].function, AggregateFunction::Sum);
    assert_eq!(query.aggregates[0].field, "restarts");
    assert_eq!(query.aggregates[0].alias, "sum_restarts");
    assert!(query.fields.is_empty());
}

#[test]
fn test_default_aggregate_alias_for_star() {
    let parser = QueryParser::new();
    let query = parser.parse("COUNT(*) FROM pod").unwrap();
    assert_eq!(query.aggregates[0].alias, "count");
}

#[test]
fn test_or_conditions() {
    let parser = QueryParser::new();
    let query = parser
        .parse("name FROM pod WHERE status=Running OR status=Pending")
        .unwrap();

    let conditions = query.conditions.unwrap();
    assert_eq!(conditions.operator, LogicalOperator::Or);
    assert!(conditions.conditions.is_empty());
    assert_eq!(conditions.sub_groups.len(), 2);
    assert_eq!(conditions.sub_groups[0].operator, LogicalOperator::And);
    assert_eq!(conditions.sub_groups[0].conditions[0].value, "Running");
    assert_eq!(conditions.sub_groups[1].conditions[0].value, "Pending");
}

#[test]
fn test_and_conditions_stay_flat() {
    let parser = QueryParser::new();
    let query = parser
        .parse("name FROM pod WHERE status=Running AND namespace=default AND restarts>0")
        .unwrap();

    let conditions = query.conditions.unwrap();
    assert_eq!(conditions.operator, LogicalOperator::And);
    assert_eq!(conditions.conditions.len(), 3);
    assert!(conditions.sub_groups.is_empty());
}

#[test]
fn test_operator_synonyms() {
    let parser = QueryParser::new();
    let cases = [
        ("restarts GT 3", ConditionOperator::GreaterThan),
        ("restarts ge 3", ConditionOperator::GreaterEqual),
        ("restarts lt 3", ConditionOperator::LessThan),
        ("restarts LE 3", ConditionOperator::LessEqual),
        ("restarts NE 3", ConditionOperator::NotEqual),
        ("restarts eq 3", ConditionOperator::Equal),
    ];
    for (clause, expected) in cases {
        let query = parser
            .parse(&format!("name FROM pod WHERE {}", clause))
            .unwrap();
        let conditions = query.conditions.unwrap();
        assert_eq!(conditions.conditions[0].operator, expected, "{}", clause);
        assert_eq!(conditions.conditions[0].value, "3");
    }
}

#[test]
fn test_like_with_quoted_pattern() {
    let parser = QueryParser::new();
    let query = parser
        .parse("name FROM pod WHERE name LIKE 'nginx-%'")
        .unwrap();
    let conditions = query.conditions.unwrap();
    assert_eq!(conditions.conditions[0].operator, ConditionOperator::Like);
    assert_eq!(conditions.conditions[0].value, "nginx-%");
}

#[test]
fn test_not_like() {
    let parser = QueryParser::new();
    let query = parser
        .parse("name FROM pod WHERE name NOT LIKE '%test%'")
        .unwrap();
    let conditions = query.conditions.unwrap();
    assert_eq!(conditions.conditions[0].operator, ConditionOperator::NotLike);
}

#[test]
fn test_in_literal_list() {
    let parser = QueryParser::new();
    let query = parser
        .parse("name FROM pod WHERE status IN (Running, Pending)")
        .unwrap();
    let conditions = query.conditions.unwrap();
    assert_eq!(conditions.conditions[0].operator, ConditionOperator::In);
    assert_eq!(conditions.conditions[0].value, "Running,Pending");
    assert!(conditions.conditions[0].subquery.is_none());
}

#[test]
fn test_not_in_literal_list() {
    let parser = QueryParser::new();
    let query = parser
        .parse("name FROM pod WHERE status NOT IN ('Failed', 'Unknown')")
        .unwrap();
    let conditions = query.conditions.unwrap();
    assert_eq!(conditions.conditions[0].operator, ConditionOperator::NotIn);
    assert_eq!(conditions.conditions[0].value, "Failed,Unknown");
}

#[test]
fn test_in_parenthesized_subquery() {
    let parser = QueryParser::new();
    let query = parser
        .parse("name FROM pod WHERE owner IN (name FROM deployment WHERE namespace=default)")
        .unwrap();

    let conditions = query.conditions.unwrap();
    let condition = &conditions.conditions[0];
    assert_eq!(condition.operator, ConditionOperator::In);
    let subquery = condition.subquery.as_ref().expect("subquery expected");
    assert_eq!(subquery.resource, "deployment");
    assert_eq!(subquery.fields, vec!["name"]);
    assert!(condition.resolved_set.is_none());
}

#[test]
fn test_not_in_trailing_subquery() {
    let parser = QueryParser::new();
    let query = parser
        .parse("name FROM pod WHERE name NOT IN fleetql name FROM deployment")
        .unwrap();

    let conditions = query.conditions.unwrap();
    let condition = &conditions.conditions[0];
    assert_eq!(condition.operator, ConditionOperator::NotIn);
    let subquery = condition.subquery.as_ref().expect("subquery expected");
    assert_eq!(subquery.resource, "deployment");
}

#[test]
fn test_join_clause() {
    let parser = QueryParser::new();
    let query = parser
        .parse("pod.name, svc.name FROM pod LEFT JOIN service svc ON name = selector")
        .unwrap();

    assert_eq!(query.fields, vec!["pod.name", "svc.name"]);
    assert_eq!(query.joins.len(), 1);
    let join = &query.joins[0];
    assert_eq!(join.join_type, JoinType::Left);
    assert_eq!(join.resource, "service");
    assert_eq!(join.alias.as_deref(), Some("svc"));
    assert_eq!(join.conditions.len(), 1);
    assert_eq!(join.conditions[0].left_field, "name");
    assert_eq!(join.conditions[0].right_field, "selector");
}

#[test]
fn test_join_with_multiple_on_conditions() {
    let parser = QueryParser::new();
    let query = parser
        .parse("name FROM pod INNER JOIN service svc ON name = selector AND namespace = svc-ns")
        .unwrap();

    let join = &query.joins[0];
    assert_eq!(join.join_type, JoinType::Inner);
    assert_eq!(join.conditions.len(), 2);
    assert_eq!(join.conditions[1].left_field, "namespace");
    assert_eq!(join.conditions[1].right_field, "svc-ns");
}

#[test]
fn test_multiple_joins() {
    let parser = QueryParser::new();
    let query = parser
        .parse(
            "name FROM pod \
             INNER JOIN service svc ON name = selector \
             LEFT JOIN deployment dep ON name = owner \
             WHERE status=Running",
        )
        .unwrap();

    assert_eq!(query.joins.len(), 2);
    assert_eq!(query.joins[0].resource, "service");
    assert_eq!(query.joins[1].resource, "deployment");
    assert_eq!(query.joins[1].join_type, JoinType::Left);
    assert!(query.conditions.is_some());
}

#[test]
fn test_case_insensitive_keywords() {
    let parser = QueryParser::new();
    let query = parser
        .parse("name from pod where namespace=default order by name limit 5")
        .unwrap();
    assert_eq!(query.resource, "pod");
    assert_eq!(query.order_by.len(), 1);
    assert_eq!(query.limit, 5);
}

#[test]
fn test_full_clause_ordering() {
    let parser = QueryParser::new();
    let query = parser
        .parse(
            "status, COUNT(*) AS total FROM pod \
             WHERE namespace=default \
             GROUP BY status \
             HAVING total > 1 \
             ORDER BY total DESC \
             LIMIT 10 OFFSET 2",
        )
        .unwrap();

    assert_eq!(query.fields, vec!["status"]);
    assert_eq!(query.group_by, vec!["status"]);
    assert!(query.having.is_some());
    assert_eq!(query.order_by[0].field, "total");
    assert_eq!(query.limit, 10);
    assert_eq!(query.offset, 2);
}

#[test]
fn test_parsing_is_deterministic() {
    let parser = QueryParser::new();
    let text = "name,status FROM pod WHERE namespace=default OR status LIKE 'web-%' ORDER BY name";
    let first = parser.parse(text).unwrap();
    let second = parser.parse(text).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_parse_conditions_empty_is_vacuous_and_group() {
    let parser = QueryParser::new();
    let group = parser.parse_conditions("").unwrap();
    assert_eq!(group.operator, LogicalOperator::And);
    assert!(group.conditions.is_empty());
    assert!(group.sub_groups.is_empty());
}

#[test]
fn test_unterminated_string_is_error() {
    let parser = QueryParser::new();
    assert!(parser.parse("name FROM pod WHERE name LIKE 'nginx").is_err());
}

#[test]
fn test_trailing_garbage_is_error() {
    let parser = QueryParser::new();
    assert!(parser.parse("name FROM pod LIMIT 5 bogus").is_err());
}

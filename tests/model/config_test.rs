//! Integration tests for the report config model.
//!
//! These tests pin the JSON wire form the backend expects and the
//! execution preconditions.

use quarry::model::{
    fingerprint, Aggregation, CalculatedField, ColumnSpec, FieldRef, FilterOperator, FilterSpec,
    GroupMethod, GroupSpec, JoinSpec, JoinType, NotReady, ReportConfig, ReportType, Scalar,
    SortDirection, SortSpec,
};
use serde_json::json;

fn sample_config() -> ReportConfig {
    let mut config = ReportConfig::new("1");
    config.columns.push(ColumnSpec {
        field: FieldRef::column("orders", "amount"),
        aggregation: Aggregation::Sum,
    });
    config.filters.push(FilterSpec {
        field: FieldRef::column("orders", "region"),
        operator: FilterOperator::Eq,
        value: Scalar::from("EU"),
        is_drill_down: false,
    });
    config.groups.push(GroupSpec {
        field: FieldRef::column("orders", "region"),
        method: GroupMethod::Exact,
    });
    config.sorts.push(SortSpec {
        field: FieldRef::calculated("Margin"),
        direction: SortDirection::Desc,
    });
    config.calculated_fields.push(CalculatedField {
        name: "Margin".to_string(),
        formula: "[orders.amount] - [orders.cost]".to_string(),
        description: String::new(),
    });
    config
}

#[test]
fn test_config_wire_form() {
    let value = serde_json::to_value(sample_config()).unwrap();

    assert_eq!(value["type"], "basic");
    assert_eq!(value["connectionId"], "1");
    assert_eq!(
        value["columns"],
        json!([{ "field": "orders.amount", "aggregation": "SUM" }])
    );
    assert_eq!(
        value["filters"],
        json!([{
            "field": "orders.region",
            "operator": "=",
            "value": "EU",
            "isDrillDown": false
        }])
    );
    assert_eq!(
        value["groups"],
        json!([{ "field": "orders.region", "method": "exact" }])
    );
    assert_eq!(
        value["sorts"],
        json!([{ "field": "calculated.Margin", "direction": "DESC" }])
    );
    assert_eq!(value["calculatedFields"][0]["name"], "Margin");
    assert!(value.get("userFilters").is_none());
}

#[test]
fn test_empty_config_json() {
    let text = serde_json::to_string(&ReportConfig::new("1")).unwrap();
    insta::assert_snapshot!(text, @r#"{"type":"basic","connectionId":"1","columns":[],"filters":[],"groups":[],"sorts":[],"joins":[],"calculatedFields":[],"columnAliases":{},"columnFormats":{}}"#);
}

#[test]
fn test_config_round_trips_through_json() {
    let config = sample_config();
    let text = serde_json::to_string(&config).unwrap();
    let parsed: ReportConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_config_missing_lists_default_to_empty() {
    let parsed: ReportConfig = serde_json::from_value(json!({
        "connectionId": "3",
        "columns": [{ "field": "orders.id", "aggregation": "COUNT" }]
    }))
    .unwrap();

    assert_eq!(parsed.report_type, ReportType::Basic);
    assert_eq!(parsed.connection_id.as_deref(), Some("3"));
    assert!(parsed.filters.is_empty());
    assert!(parsed.joins.is_empty());
    assert!(parsed.column_aliases.is_empty());
    assert!(parsed.is_executable());
}

#[test]
fn test_config_rejects_unqualified_field() {
    let parsed = serde_json::from_value::<ReportConfig>(json!({
        "columns": [{ "field": "amount", "aggregation": "SUM" }]
    }));
    assert!(parsed.is_err());
}

#[test]
fn test_join_wire_form() {
    let join = JoinSpec {
        left: FieldRef::column("orders", "customer_id"),
        right: FieldRef::column("customers", "id"),
        join_type: JoinType::Left,
    };
    assert_eq!(
        serde_json::to_value(&join).unwrap(),
        json!({ "left": "orders.customer_id", "right": "customers.id", "type": "LEFT" })
    );
}

#[test]
fn test_scalar_values_keep_their_json_type() {
    let values: Vec<Scalar> = serde_json::from_value(json!([null, true, 7, 2.5, "EU"])).unwrap();
    assert_eq!(
        values,
        vec![
            Scalar::Null,
            Scalar::Bool(true),
            Scalar::Int(7),
            Scalar::Float(2.5),
            Scalar::Text("EU".to_string()),
        ]
    );
    assert!(Scalar::Null.is_blank());
    assert!(Scalar::from("   ").is_blank());
    assert!(!Scalar::Int(0).is_blank());
}

#[test]
fn test_execution_preconditions() {
    let mut config = ReportConfig::default();
    assert_eq!(config.ensure_executable(), Err(NotReady::NoConnection));

    config.connection_id = Some("1".to_string());
    assert_eq!(config.ensure_executable(), Err(NotReady::NothingSelected));

    config.groups.push(GroupSpec {
        field: FieldRef::column("orders", "year"),
        method: GroupMethod::Year,
    });
    assert!(config.is_executable());
}

#[test]
fn test_fingerprint_covers_display_metadata() {
    let config = sample_config();
    let mut renamed = config.clone();
    renamed
        .column_aliases
        .insert("orders.amount".to_string(), "Revenue".to_string());

    assert_eq!(fingerprint(&config).unwrap(), fingerprint(&config.clone()).unwrap());
    assert_ne!(fingerprint(&config).unwrap(), fingerprint(&renamed).unwrap());
}

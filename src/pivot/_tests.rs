#[cfg(test)]
pub mod fixtures {
    use serde_json::{json, Map, Value};

    use crate::database::{Db, DbCommon, MemoryTable, Relation, SeedFile};

    pub fn create_sales(db: &Db, rows: Value) {
        let seed = SeedFile::from_json(json!({
            "relations": [{
                "name": "Sales",
                "columns": [
                    { "name": "Quarter", "type": "nvarchar(8)" },
                    { "name": "Region",  "type": "nvarchar(32)" },
                    { "name": "Amount",  "type": "int" }
                ],
                "rows": rows
            }]
        })).unwrap();
        db.load_seed(seed).unwrap();
    }

    pub fn create_readings(db: &Db) {
        let seed = SeedFile::from_json(json!({
            "relations": [{
                "name": "VW_Readings",
                "columns": [
                    { "name": "Day",    "type": "int" },
                    { "name": "Sensor", "type": "varchar(16)" },
                    { "name": "Level",  "type": "decimal(8,3)" }
                ],
                "rows": [
                    { "Day": 2, "Sensor": "intake",  "Level": 1.250 },
                    { "Day": 1, "Sensor": "intake",  "Level": 1.000 },
                    { "Day": 1, "Sensor": "intake",  "Level": 2.000 },
                    { "Day": 1, "Sensor": "outflow", "Level": 0.125 },
                    { "Day": 3, "Sensor": "outflow", "Level": null  }
                ]
            }]
        })).unwrap();
        db.load_seed(seed).unwrap();
    }

    /// `Ledger(Month, Account, Balance)` with `Balance` declared as `balance_type`.
    pub fn create_ledger(db: &Db, balance_type: &str, rows: Value) {
        let seed = SeedFile::from_json(json!({
            "relations": [{
                "name": "Ledger",
                "columns": [
                    { "name": "Month",   "type": "char(7)" },
                    { "name": "Account", "type": "nvarchar(16)" },
                    { "name": "Balance", "type": balance_type }
                ],
                "rows": rows
            }]
        })).unwrap();
        db.load_seed(seed).unwrap();
    }

    pub fn create_log_table(db: &Db) {
        let seed = SeedFile::from_json(json!({
            "relations": [{
                "name": "PivotLog",
                "columns": [
                    { "name": "table_name", "type": "nvarchar(128)", "nullable": false },
                    { "name": "updated_at", "type": "datetime2" }
                ]
            }]
        })).unwrap();
        db.load_seed(seed).unwrap();
    }

    /// The three-row quarterly example: East and West in Q1, East only in Q2.
    pub fn seed_sales() -> Db {
        let db = Db::new_db();
        create_sales(&db, json!([
            { "Quarter": "Q1", "Region": "East", "Amount": 10 },
            { "Quarter": "Q1", "Region": "West", "Amount": 20 },
            { "Quarter": "Q2", "Region": "East", "Amount": 30 }
        ]));
        db
    }

    pub fn add_sales_row(db: &Db, quarter: &str, region: Option<&str>, amount: i64) {
        add_sales_json(db, json!({ "Quarter": quarter, "Region": region, "Amount": amount }));
    }

    pub fn add_sales_json(db: &Db, row: Value) {
        let mut guard = db.write().unwrap();
        let Some(Relation::Table(sales)) = guard.get_mut("Sales") else {
            panic!("Sales is not a table");
        };
        sales.add(row.as_object().unwrap().clone()).unwrap();
    }

    pub fn clear_sales(db: &Db) {
        let mut guard = db.write().unwrap();
        if let Some(Relation::Table(sales)) = guard.get_mut("Sales") {
            *sales = MemoryTable::new(&sales.name, sales.schema.clone(), sales.primary_key.clone());
        }
    }

    pub fn columns_of(db: &Db, relation: &str) -> Vec<String> {
        db.read().unwrap().schema_of_relation(relation).unwrap().column_names()
    }

    pub fn rows_of(db: &Db, relation: &str) -> Vec<Map<String, Value>> {
        db.rows_of(relation).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::fixtures::*;
    use crate::{
        catalog::{Catalog, RelationKind},
        config::PivotConfig,
        database::{Db, DbCommon, Relation, SqlType},
        error::PivotError,
        pivot::{PivotGenerator, PivotRequest},
    };

    fn sales_request() -> PivotRequest {
        PivotRequest::new("Sales", "Amount", "Region", "Quarter")
    }

    #[test]
    fn sales_view_has_one_column_per_region() {
        let db = seed_sales();
        let config = PivotConfig::default();

        let outcome = PivotGenerator::new(&db, &config).generate(&sales_request()).unwrap();
        assert_eq!(outcome.view_name, "VW_Sales_pivoted");
        assert_eq!(outcome.table_name, None);
        assert_eq!(outcome.categories.values(), ["East", "West"]);

        assert_eq!(columns_of(&db, "VW_Sales_pivoted"), vec!["Quarter", "East", "West"]);
        let rows = rows_of(&db, "VW_Sales_pivoted");
        assert_eq!(rows.len(), 2);
        assert_eq!(serde_json::Value::Object(rows[0].clone()), json!({ "Quarter": "Q1", "East": 10, "West": 20 }));
        assert_eq!(serde_json::Value::Object(rows[1].clone()), json!({ "Quarter": "Q2", "East": 30, "West": null }));

        assert_eq!(db.relation_kind("Sales_pivoted").unwrap(), None);
    }

    #[test]
    fn materialized_sales_table_keeps_source_types() {
        let db = seed_sales();
        let config = PivotConfig::default();

        let outcome = PivotGenerator::new(&db, &config)
            .generate(&sales_request().materialized(true))
            .unwrap();
        assert_eq!(outcome.table_name.as_deref(), Some("Sales_pivoted"));

        let guard = db.read().unwrap();
        let Some(Relation::Table(table)) = guard.get("Sales_pivoted") else {
            panic!("Sales_pivoted is not a table");
        };
        assert_eq!(table.primary_key.as_deref(), Some("Quarter"));
        let quarter = table.schema.get("Quarter").unwrap();
        assert_eq!(quarter.ty, "nvarchar(8)".parse::<SqlType>().unwrap());
        assert!(!quarter.nullable);
        for region in ["East", "West"] {
            let column = table.schema.get(region).unwrap();
            assert_eq!(column.ty, SqlType::Int);
            assert!(column.nullable);
        }
        assert_eq!(
            table.get_all(),
            guard.rows_of("VW_Sales_pivoted").unwrap()
        );
        assert_eq!(table.count(), 2);
    }

    #[test]
    fn statements_run_in_order() {
        let db = seed_sales();
        let config = PivotConfig::default();
        let outcome = PivotGenerator::new(&db, &config)
            .generate(&sales_request().materialized(true))
            .unwrap();

        assert_eq!(outcome.statements.len(), 3);
        assert!(outcome.statements[0].starts_with("CREATE VIEW [VW_Sales_pivoted] AS"));
        assert!(outcome.statements[0].contains("AVG([Amount]) FOR [Region] IN ([East], [West])"));
        assert!(outcome.statements[1].starts_with("CREATE TABLE [Sales_pivoted] ("));
        assert!(outcome.statements[1].contains("[Quarter] nvarchar(8) NOT NULL"));
        assert!(outcome.statements[1].contains("CONSTRAINT [PK_Sales_pivoted] PRIMARY KEY ([Quarter])"));
        assert_eq!(outcome.statements[2], "INSERT INTO [Sales_pivoted] SELECT * FROM [VW_Sales_pivoted]");
        assert_eq!(db.executed_statements().unwrap(), outcome.statements);
    }

    #[test]
    fn rerunning_replaces_with_the_same_shape() {
        let db = seed_sales();
        let config = PivotConfig::default();
        let generator = PivotGenerator::new(&db, &config);
        let request = sales_request().materialized(true);

        generator.generate(&request).unwrap();
        let view_columns = columns_of(&db, "VW_Sales_pivoted");
        let table_columns = columns_of(&db, "Sales_pivoted");
        let table_rows = rows_of(&db, "Sales_pivoted");

        let second = generator.generate(&request).unwrap();
        assert_eq!(second.statements[0], "DROP VIEW [VW_Sales_pivoted]");
        assert!(second.statements.iter().any(|s| s == "DROP TABLE [Sales_pivoted]"));
        assert_eq!(columns_of(&db, "VW_Sales_pivoted"), view_columns);
        assert_eq!(columns_of(&db, "Sales_pivoted"), table_columns);
        assert_eq!(rows_of(&db, "Sales_pivoted"), table_rows);

        let names = Catalog::list_relations(&db).unwrap();
        assert_eq!(names, vec!["Sales", "VW_Sales_pivoted", "Sales_pivoted"]);
    }

    #[test]
    fn new_categories_add_columns_and_stale_ones_go() {
        let db = seed_sales();
        let config = PivotConfig::default();
        let generator = PivotGenerator::new(&db, &config);
        let request = sales_request().materialized(true);
        generator.generate(&request).unwrap();

        add_sales_row(&db, "Q3", Some("North"), 7);
        generator.generate(&request).unwrap();
        assert_eq!(columns_of(&db, "VW_Sales_pivoted"), vec!["Quarter", "East", "North", "West"]);
        assert_eq!(columns_of(&db, "Sales_pivoted"), vec!["Quarter", "East", "North", "West"]);
        assert_eq!(rows_of(&db, "Sales_pivoted").len(), 3);

        clear_sales(&db);
        add_sales_row(&db, "Q4", Some("East"), 4);
        generator.generate(&request).unwrap();
        assert_eq!(columns_of(&db, "VW_Sales_pivoted"), vec!["Quarter", "East"]);
        assert_eq!(columns_of(&db, "Sales_pivoted"), vec!["Quarter", "East"]);
        let rows = rows_of(&db, "Sales_pivoted");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("East"), Some(&json!(4)));
    }

    #[test]
    fn integer_axis_with_decimal_values() {
        let db = Db::new_db();
        create_readings(&db);
        let config = PivotConfig::default();

        let outcome = PivotGenerator::new(&db, &config)
            .generate(&PivotRequest::new("VW_Readings", "Level", "Sensor", "Day").materialized(true))
            .unwrap();
        assert_eq!(outcome.view_name, "VW_Readings_pivoted");
        assert_eq!(outcome.table_name.as_deref(), Some("Readings_pivoted"));

        let guard = db.read().unwrap();
        let schema = guard.schema_of_relation("Readings_pivoted").unwrap();
        assert_eq!(schema.get("Day").unwrap().ty, SqlType::Int);
        assert_eq!(schema.get("intake").unwrap().ty, SqlType::Decimal { precision: 8, scale: 3 });
        assert_eq!(schema.get("outflow").unwrap().ty, SqlType::Decimal { precision: 8, scale: 3 });

        let rows = guard.rows_of("Readings_pivoted").unwrap();
        let days = rows.iter().map(|r| r["Day"].clone()).collect::<Vec<_>>();
        assert_eq!(days, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(rows[0]["intake"], json!(1.5));
        assert_eq!(rows[0]["outflow"], json!(0.125));
        assert_eq!(rows[2]["outflow"], json!(null));
    }

    #[test]
    fn empty_category_set_fails_before_any_statement() {
        let db = Db::new_db();
        create_sales(&db, json!([{ "Quarter": "Q1", "Region": null, "Amount": 1 }]));
        let config = PivotConfig::default();

        let err = PivotGenerator::new(&db, &config).generate(&sales_request().materialized(true)).unwrap_err();
        assert_eq!(err, PivotError::EmptyCategorySet { relation: "Sales".into(), column: "Region".into() });
        assert!(db.executed_statements().unwrap().is_empty());
        assert_eq!(db.relation_kind("VW_Sales_pivoted").unwrap(), None);
        assert_eq!(db.relation_kind("Sales_pivoted").unwrap(), None);
    }

    #[test]
    fn missing_columns_fail_before_any_statement() {
        let db = seed_sales();
        let config = PivotConfig::default();
        let err = PivotGenerator::new(&db, &config)
            .generate(&PivotRequest::new("Sales", "Amount", "Region", "Year"))
            .unwrap_err();
        assert!(matches!(err, PivotError::CatalogLookup { column: Some(c), .. } if c == "Year"));
        assert!(db.executed_statements().unwrap().is_empty());

        let err = PivotGenerator::new(&db, &config)
            .generate(&PivotRequest::new("Orders", "Amount", "Region", "Quarter"))
            .unwrap_err();
        assert!(matches!(err, PivotError::CatalogLookup { column: None, .. }));
    }

    #[test]
    fn a_table_holding_the_view_name_is_a_collision() {
        let db = seed_sales();
        let squatter = db.read().unwrap().schema_of_relation("Sales").unwrap();
        db.create_table("VW_Sales_pivoted", squatter, None).unwrap();
        let config = PivotConfig::default();

        let err = PivotGenerator::new(&db, &config).generate(&sales_request()).unwrap_err();
        assert_eq!(err, PivotError::NameCollision { name: "VW_Sales_pivoted".into(), existing: "TABLE".into() });
        assert!(db.executed_statements().unwrap().is_empty());
        assert_eq!(db.relation_kind("VW_Sales_pivoted").unwrap(), Some(RelationKind::Table));
    }

    #[test]
    fn failed_materialization_keeps_the_new_view() {
        let db = seed_sales();
        // Quarter is nullable in the source, so the view gets a NULL axis row
        // that the NOT NULL key of the table refuses.
        add_sales_json(&db, json!({ "Quarter": null, "Region": "West", "Amount": 3 }));
        let config = PivotConfig::default();

        let err = PivotGenerator::new(&db, &config)
            .generate(&sales_request().materialized(true))
            .unwrap_err();
        assert!(matches!(
            err,
            PivotError::StatementExecution { statement, .. } if statement.starts_with("INSERT INTO [Sales_pivoted]")
        ));

        assert_eq!(db.executed_statements().unwrap().len(), 2);
        assert_eq!(db.relation_kind("VW_Sales_pivoted").unwrap(), Some(RelationKind::View));
        let view_rows = rows_of(&db, "VW_Sales_pivoted");
        assert_eq!(view_rows.len(), 3);
        assert_eq!(view_rows[2]["Quarter"], json!(null));
        assert!(rows_of(&db, "Sales_pivoted").is_empty());
    }

    #[test]
    fn awkward_category_values_are_quoted() {
        let db = seed_sales();
        add_sales_row(&db, "Q1", Some("North ]East"), 5);
        add_sales_row(&db, "Q1", Some("west"), 40);
        let config = PivotConfig::default();

        let outcome = PivotGenerator::new(&db, &config).generate(&sales_request()).unwrap();
        assert!(outcome.statements[0].contains("IN ([East], [North ]]East], [West])"));
        assert_eq!(columns_of(&db, "VW_Sales_pivoted"), vec!["Quarter", "East", "North ]East", "West"]);

        let rows = rows_of(&db, "VW_Sales_pivoted");
        assert_eq!(rows[0]["North ]East"], json!(5));
        // West and west land in the same column
        assert_eq!(rows[0]["West"], json!(30));
    }

    #[test]
    fn case_variants_beyond_ascii_share_one_column() {
        let db = Db::new_db();
        create_sales(&db, json!([
            { "Quarter": "Q1", "Region": "Ärger", "Amount": 10 },
            { "Quarter": "Q2", "Region": "ärger", "Amount": 30 },
            { "Quarter": "Q2", "Region": "ÄRGER", "Amount": 50 },
            { "Quarter": "Q3", "Region": "Øst",   "Amount": 7 },
            { "Quarter": "Q3", "Region": "øST",   "Amount": 8 }
        ]));
        let config = PivotConfig::default();

        let outcome = PivotGenerator::new(&db, &config)
            .generate(&sales_request().materialized(true))
            .unwrap();
        // first spelling in sorted order names the column
        assert_eq!(outcome.categories.values(), ["ÄRGER", "Øst"]);
        assert_eq!(columns_of(&db, "VW_Sales_pivoted"), vec!["Quarter", "ÄRGER", "Øst"]);

        let rows = rows_of(&db, "Sales_pivoted");
        assert_eq!(rows.len(), 3);
        assert_eq!(serde_json::Value::Object(rows[0].clone()), json!({ "Quarter": "Q1", "ÄRGER": 10, "Øst": null }));
        assert_eq!(serde_json::Value::Object(rows[1].clone()), json!({ "Quarter": "Q2", "ÄRGER": 40, "Øst": null }));
        assert_eq!(serde_json::Value::Object(rows[2].clone()), json!({ "Quarter": "Q3", "ÄRGER": null, "Øst": 7 }));
    }

    #[test]
    fn bigint_values_materialize_exactly() {
        let db = Db::new_db();
        create_ledger(&db, "bigint", json!([
            { "Month": "2024-01", "Account": "cash",  "Balance": 9007199254740993i64 },
            { "Month": "2024-01", "Account": "cash",  "Balance": 9007199254740993i64 },
            { "Month": "2024-01", "Account": "loans", "Balance": -9007199254740993i64 },
            { "Month": "2024-02", "Account": "loans", "Balance": -2 },
            { "Month": "2024-02", "Account": "loans", "Balance": -3 }
        ]));
        let config = PivotConfig::default();

        PivotGenerator::new(&db, &config)
            .generate(&PivotRequest::new("Ledger", "Balance", "Account", "Month").materialized(true))
            .unwrap();

        let guard = db.read().unwrap();
        let schema = guard.schema_of_relation("Ledger_pivoted").unwrap();
        assert_eq!(schema.get("Month").unwrap().ty, "char(7)".parse::<SqlType>().unwrap());
        assert_eq!(schema.get("cash").unwrap().ty, SqlType::BigInt);
        assert_eq!(schema.get("loans").unwrap().ty, SqlType::BigInt);

        let rows = guard.rows_of("Ledger_pivoted").unwrap();
        assert_eq!(rows[0]["cash"], json!(9007199254740993i64));
        assert_eq!(rows[0]["loans"], json!(-9007199254740993i64));
        // -5 / 2 truncates toward zero
        assert_eq!(rows[1]["loans"], json!(-2));
        assert_eq!(rows[1]["cash"], json!(null));
    }

    #[test]
    fn money_values_materialize_with_four_decimals() {
        let db = Db::new_db();
        create_ledger(&db, "money", json!([
            { "Month": "2024-01", "Account": "cash", "Balance": 10.5 },
            { "Month": "2024-01", "Account": "cash", "Balance": 20.25 },
            { "Month": "2024-02", "Account": "cash", "Balance": 1.0 },
            { "Month": "2024-02", "Account": "cash", "Balance": 2.0 },
            { "Month": "2024-02", "Account": "cash", "Balance": 2.0 }
        ]));
        let config = PivotConfig::default();

        let outcome = PivotGenerator::new(&db, &config)
            .generate(&PivotRequest::new("Ledger", "Balance", "Account", "Month").materialized(true))
            .unwrap();
        assert!(outcome.statements[1].contains("[cash] money NULL"));

        let guard = db.read().unwrap();
        assert_eq!(guard.schema_of_relation("Ledger_pivoted").unwrap().get("cash").unwrap().ty, SqlType::Money);
        let rows = guard.rows_of("Ledger_pivoted").unwrap();
        assert_eq!(rows[0]["cash"], json!(15.375));
        assert_eq!(rows[1]["cash"], json!(1.6667));
    }

    #[test]
    fn empty_prefix_is_rejected_before_any_statement() {
        let db = seed_sales();
        let config = PivotConfig::from("", "_pivoted");

        let err = PivotGenerator::new(&db, &config).generate(&sales_request()).unwrap_err();
        assert!(matches!(err, PivotError::Config(msg) if msg.contains("view_prefix")));
        assert!(db.executed_statements().unwrap().is_empty());
        assert_eq!(Catalog::list_relations(&db).unwrap(), vec!["Sales"]);
    }

    #[test]
    fn log_table_receives_one_row_per_run() {
        let db = seed_sales();
        create_log_table(&db);
        let config = PivotConfig::default().with_log_table("PivotLog");
        let generator = PivotGenerator::new(&db, &config);

        let outcome = generator.generate(&sales_request().materialized(true)).unwrap();
        let last = outcome.statements.last().unwrap();
        assert!(last.starts_with("INSERT INTO [PivotLog] ([table_name], [updated_at]) VALUES (N'Sales_pivoted', N'"));

        generator.generate(&sales_request()).unwrap();
        let log = rows_of(&db, "PivotLog");
        assert_eq!(log.len(), 2);
        assert_eq!(log[0]["table_name"], json!("Sales_pivoted"));
        assert_eq!(log[1]["table_name"], json!("VW_Sales_pivoted"));
        assert!(log.iter().all(|row| row["updated_at"].is_string()));
    }

    #[test]
    fn missing_log_table_fails_after_the_view_is_built() {
        let db = seed_sales();
        let config = PivotConfig::default().with_log_table("PivotLog");

        let err = PivotGenerator::new(&db, &config).generate(&sales_request()).unwrap_err();
        assert!(matches!(err, PivotError::StatementExecution { .. }));
        assert_eq!(db.relation_kind("VW_Sales_pivoted").unwrap(), Some(RelationKind::View));
    }

    #[test]
    fn custom_prefix_and_suffix_drive_the_names() {
        let db = seed_sales();
        let config = PivotConfig::from("v_", "_wide");
        let outcome = PivotGenerator::new(&db, &config)
            .generate(&sales_request().materialized(true))
            .unwrap();
        assert_eq!(outcome.view_name, "v_Sales_wide");
        assert_eq!(outcome.table_name.as_deref(), Some("Sales_wide"));
        assert_eq!(db.relation_kind("Sales_wide").unwrap(), Some(RelationKind::Table));
    }

    #[test]
    fn outcome_serializes_for_hosts() {
        let db = seed_sales();
        let config = PivotConfig::default();
        let outcome = PivotGenerator::new(&db, &config).generate(&sales_request()).unwrap();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["view_name"], json!("VW_Sales_pivoted"));
        assert_eq!(value["table_name"], json!(null));
        assert_eq!(value["categories"], json!(["East", "West"]));
    }
}

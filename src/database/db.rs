use std::{
    path::Path,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    catalog::{Catalog, RelationKind},
    config::PivotConfig,
    database::{ColumnDef, MemoryTable, Relation, SchemaDict, SeedFile, SqlType},
    error::{PivotError, Result},
    executor::{helpers::Helpers, pivot_eval::PivotEvaluator, statement_executor::StatementExecutor},
    sql::{Ident, Statement},
};

pub type Db = Arc<RwLock<InternalDb>>;

/// In-memory catalog: tables and pivot views keyed case-insensitively by
/// name, plus the text of every statement executed against it.
#[derive(Debug)]
pub struct InternalDb {
    text_type: SqlType,
    relations: IndexMap<String, Relation>,
    statements: Vec<String>,
}

impl Default for InternalDb {
    fn default() -> Self {
        Self {
            text_type: SqlType::NVarChar(crate::database::CharLength::Fixed(256)),
            relations: IndexMap::new(),
            statements: Vec::new(),
        }
    }
}

impl InternalDb {
    pub fn into_protected(self) -> Db {
        Arc::new(RwLock::new(self))
    }

    fn new_db() -> Self {
        Self::default()
    }

    fn new_db_with_config(config: &PivotConfig) -> Result<Self> {
        let text_type = config.text_type.parse::<SqlType>()
            .map_err(|e| PivotError::Config(format!("text_type: {e}")))?;
        Ok(Self { text_type, ..Self::default() })
    }

    fn key(name: &str) -> String {
        Ident::fold(name)
    }

    pub fn get(&self, name: &str) -> Option<&Relation> {
        self.relations.get(&Self::key(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Relation> {
        self.relations.get_mut(&Self::key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.relations.contains_key(&Self::key(name))
    }

    /// Store a relation. Fails when the name is already taken.
    pub fn insert(&mut self, relation: Relation) -> std::result::Result<(), String> {
        let key = Self::key(relation.name());
        if self.relations.contains_key(&key) {
            return Err(format!("There is already an object named {} in the database", relation.name()));
        }
        self.relations.insert(key, relation);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Relation> {
        self.relations.shift_remove(&Self::key(name))
    }

    pub fn create_table(&mut self, name: &str, schema: SchemaDict, primary_key: Option<String>) -> Result<()> {
        if let Some(existing) = self.get(name) {
            return Err(PivotError::NameCollision {
                name: name.to_string(),
                existing: existing.kind().to_string(),
            });
        }
        self.insert(Relation::Table(MemoryTable::new(name, schema, primary_key)))
            .map_err(PivotError::Config)
    }

    pub fn list_relations(&self) -> Vec<String> {
        self.relations.values().map(|r| r.name().to_string()).collect()
    }

    pub fn rows_of(&self, name: &str) -> Result<Vec<Map<String, Value>>> {
        self.rows_at_depth(name, 0)
    }

    pub fn schema_of_relation(&self, name: &str) -> Result<SchemaDict> {
        self.schema_at_depth(name, 0)
    }

    pub(crate) fn rows_at_depth(&self, name: &str, depth: usize) -> Result<Vec<Map<String, Value>>> {
        match self.get(name) {
            Some(Relation::Table(table)) => Ok(table.get_all()),
            Some(Relation::View(view)) => PivotEvaluator::rows(view, self, depth),
            None => Err(PivotError::relation_not_found(name)),
        }
    }

    pub(crate) fn schema_at_depth(&self, name: &str, depth: usize) -> Result<SchemaDict> {
        match self.get(name) {
            Some(Relation::Table(table)) => Ok(table.schema.clone()),
            Some(Relation::View(view)) => PivotEvaluator::schema(view, self, depth),
            None => Err(PivotError::relation_not_found(name)),
        }
    }

    /// Create every relation described by a seed document.
    ///
    /// Relations with declared columns use those types; the rest infer them
    /// from their rows.
    pub fn load_seed(&mut self, seed: SeedFile) -> Result<usize> {
        let mut loaded = 0;
        for relation in seed.relations {
            let mut table = if relation.columns.is_empty() {
                MemoryTable::infer_from_rows(&relation.name, &relation.rows, self.text_type)
            } else {
                let mut columns = Vec::with_capacity(relation.columns.len());
                for column in &relation.columns {
                    let ty = column.ty.parse::<SqlType>().map_err(|e| PivotError::Config(
                        format!("column {} of {}: {e}", column.name, relation.name)
                    ))?;
                    columns.push(ColumnDef::new(&column.name, ty, column.nullable));
                }
                MemoryTable::new(&relation.name, SchemaDict::from_columns(columns), None)
            };

            if let Some(pk) = &relation.primary_key {
                let Some(column) = table.schema.get(pk).cloned() else {
                    return Err(PivotError::Config(format!("primary key {pk} is not a column of {}", relation.name)));
                };
                table.schema.fields.insert(column.name.clone(), ColumnDef { nullable: false, ..column.clone() });
                table.primary_key = Some(column.name);
            }

            let count = table.add_batch(relation.rows)
                .map_err(|e| PivotError::Config(format!("seed rows for {}: {e}", relation.name)))?
                .len();
            debug!(relation = %table.name, rows = count, "seeded relation");
            self.insert(Relation::Table(table))
                .map_err(|e| PivotError::Config(format!("seed: {e}")))?;
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn log_statement(&mut self, sql: String) {
        self.statements.push(sql);
    }

    pub fn executed_statements(&self) -> &[String] {
        &self.statements
    }
}

pub trait DbCommon: Sized {
    fn new_db() -> Self;
    fn new_db_with_config(config: &PivotConfig) -> Result<Self>;
    fn create_table(&self, name: &str, schema: SchemaDict, primary_key: Option<String>) -> Result<()>;
    fn load_seed(&self, seed: SeedFile) -> Result<usize>;
    fn load_seed_file(&self, path: impl AsRef<Path>) -> Result<usize>;
    fn list_relations(&self) -> Result<Vec<String>>;
    fn rows_of(&self, name: &str) -> Result<Vec<Map<String, Value>>>;
    fn executed_statements(&self) -> Result<Vec<String>>;
}

fn read_db(db: &Db) -> Result<RwLockReadGuard<'_, InternalDb>> {
    db.read().map_err(|_| PivotError::rejected("<read>", "catalog lock poisoned"))
}

fn write_db(db: &Db) -> Result<RwLockWriteGuard<'_, InternalDb>> {
    db.write().map_err(|_| PivotError::rejected("<write>", "catalog lock poisoned"))
}

impl DbCommon for Db {
    fn new_db() -> Self {
        InternalDb::new_db().into_protected()
    }

    fn new_db_with_config(config: &PivotConfig) -> Result<Self> {
        Ok(InternalDb::new_db_with_config(config)?.into_protected())
    }

    fn create_table(&self, name: &str, schema: SchemaDict, primary_key: Option<String>) -> Result<()> {
        write_db(self)?.create_table(name, schema, primary_key)
    }

    fn load_seed(&self, seed: SeedFile) -> Result<usize> {
        write_db(self)?.load_seed(seed)
    }

    fn load_seed_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let seed = SeedFile::from_file(path)?;
        self.load_seed(seed)
    }

    fn list_relations(&self) -> Result<Vec<String>> {
        Ok(read_db(self)?.list_relations())
    }

    fn rows_of(&self, name: &str) -> Result<Vec<Map<String, Value>>> {
        read_db(self)?.rows_of(name)
    }

    fn executed_statements(&self) -> Result<Vec<String>> {
        Ok(read_db(self)?.executed_statements().to_vec())
    }
}

impl Catalog for Db {
    fn list_relations(&self) -> Result<Vec<String>> {
        DbCommon::list_relations(self)
    }

    fn relation_kind(&self, name: &str) -> Result<Option<RelationKind>> {
        Ok(read_db(self)?.get(name).map(Relation::kind))
    }

    fn describe_column(&self, relation: &str, column: &str) -> Result<SqlType> {
        let guard = read_db(self)?;
        let schema = guard.schema_of_relation(relation)?;
        schema.get(column)
            .map(|c| c.ty)
            .ok_or_else(|| PivotError::column_not_found(relation, column))
    }

    fn distinct_values(&self, relation: &str, column: &str) -> Result<Vec<Value>> {
        let guard = read_db(self)?;
        let schema = guard.schema_of_relation(relation)?;
        let Some(column) = schema.get(column).map(|c| c.name.clone()) else {
            return Err(PivotError::column_not_found(relation, column));
        };

        let mut seen = IndexMap::new();
        for row in guard.rows_of(relation)? {
            match row.get(&column) {
                None | Some(Value::Null) => {}
                Some(value) => {
                    seen.entry(Helpers::group_key(value)).or_insert_with(|| value.clone());
                }
            }
        }

        let mut values = seen.into_values().collect::<Vec<_>>();
        values.sort_by(|a, b| Helpers::cmp_json_for_sort(a, b, true));
        Ok(values)
    }

    fn execute(&self, statement: &Statement) -> Result<()> {
        let mut guard = write_db(self)?;
        let affected = StatementExecutor::run(statement, &mut guard)?;
        debug!(object = %statement.target(), affected, "statement applied");
        guard.log_statement(statement.to_sql());
        Ok(())
    }
}

// storage/table_store.rs
//! Persisted single-table store
//!
//! One JSON file per record type, laid out like a relational table:
//!
//! ```text
//! {
//!   "table":   "todos",
//!   "columns": [ {"name": "id", "type": "INTEGER", "nullable": false, "primary_key": true},
//!                {"name": "title", "type": "TEXT", "nullable": false}, ... ],
//!   "last_id": 12,
//!   "rows":    [ [1, "Buy groceries", null, 3, false], ... ]
//! }
//! ```
//!
//! Reads are served from a `MemoryStore` mirror. Every mutation rewrites
//! the file through a temp file + rename; if the write fails the mirror is
//! rolled back so memory and disk never disagree.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, ShelfError};
use crate::record::{FieldMap, IdStrategy, Record, RecordId, ID_FIELD};
use crate::schema::{FieldKind, Presence, Schema};
use crate::storage::{MemoryStore, RecordStore};

/// Column definition as written to the table file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
}

impl Column {
    /// Identity column first, then one column per declared field
    pub fn for_schema(schema: &Schema) -> Vec<Column> {
        let id_type = match schema.identity {
            IdStrategy::Sequential => "INTEGER",
            IdStrategy::Uuid => "TEXT",
        };
        let mut columns = vec![Column {
            name: ID_FIELD.to_string(),
            sql_type: id_type.to_string(),
            nullable: false,
            primary_key: true,
        }];
        columns.extend(schema.fields().iter().map(|spec| Column {
            name: spec.name.to_string(),
            sql_type: sql_type(&spec.kind).to_string(),
            nullable: !matches!(spec.presence, Presence::Required),
            primary_key: false,
        }));
        columns
    }
}

fn sql_type(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Text { .. } => "TEXT",
        FieldKind::Integer { .. } => "INTEGER",
        FieldKind::Float { .. } => "REAL",
        FieldKind::Boolean => "BOOLEAN",
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    table: String,
    columns: Vec<Column>,
    last_id: u64,
    rows: Vec<Vec<Value>>,
}

pub struct TableStore {
    path: PathBuf,
    table: String,
    columns: Vec<Column>,
    mirror: MemoryStore,
}

impl TableStore {
    /// Open `<dir>/<schema.name>.table.json`, creating it when missing
    pub fn open<P: AsRef<Path>>(dir: P, schema: &Schema) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(format!("{}.table.json", schema.name));
        let columns = Column::for_schema(schema);

        if !path.exists() {
            let store = TableStore {
                path,
                table: schema.name.to_string(),
                columns,
                mirror: MemoryStore::new(schema.identity),
            };
            store.persist()?;
            info!(table = %store.table, path = %store.path.display(), "created table");
            return Ok(store);
        }

        let file: TableFile = serde_json::from_slice(&fs::read(&path)?)?;
        if file.table != schema.name {
            return Err(ShelfError::Corruption(format!(
                "{} holds table '{}', expected '{}'",
                path.display(),
                file.table,
                schema.name
            )));
        }
        if file.columns != columns {
            return Err(ShelfError::Corruption(format!(
                "table '{}' column layout does not match its record type",
                schema.name
            )));
        }

        let mut records = Vec::with_capacity(file.rows.len());
        for (index, row) in file.rows.into_iter().enumerate() {
            let corrupt = |reason: String| {
                ShelfError::Corruption(format!(
                    "table '{}' row {}: {}",
                    schema.name, index, reason
                ))
            };
            let record = row_to_record(&columns, row).map_err(corrupt)?;
            match schema.validate_record(&record) {
                Ok(()) => records.push(record),
                Err(ShelfError::InvalidInput(errors)) => return Err(corrupt(errors.to_string())),
                Err(other) => return Err(other),
            }
        }
        let mirror = MemoryStore::restore(schema.identity, file.last_id, records)?;
        info!(
            table = schema.name,
            rows = mirror.len(),
            path = %path.display(),
            "opened table"
        );

        Ok(TableStore {
            path,
            table: file.table,
            columns,
            mirror,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Rewrite the whole table: temp file, fsync, rename over the table file
    fn persist(&self) -> Result<()> {
        let rows = self
            .mirror
            .scan()?
            .iter()
            .map(|record| record_to_row(&self.columns, record))
            .collect::<Result<Vec<_>>>()?;
        let file = TableFile {
            table: self.table.clone(),
            columns: self.columns.clone(),
            last_id: self.mirror.last_issued(),
            rows,
        };

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut temp = File::create(&temp_path)?;
            temp.write_all(&serde_json::to_vec_pretty(&file)?)?;
            temp.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        debug!(table = %self.table, rows = file.rows.len(), "table persisted");
        Ok(())
    }

    /// Apply `op` to the mirror and persist, undoing the change on failure
    fn commit<T>(&mut self, op: impl FnOnce(&mut MemoryStore) -> Result<T>) -> Result<T> {
        let before = self.mirror.clone();
        let outcome = op(&mut self.mirror)?;
        if let Err(err) = self.persist() {
            self.mirror = before;
            return Err(err);
        }
        Ok(outcome)
    }
}

fn record_to_row(columns: &[Column], record: &Record) -> Result<Vec<Value>> {
    let mut row = Vec::with_capacity(columns.len());
    row.push(serde_json::to_value(&record.id)?);
    for column in &columns[1..] {
        row.push(record.get(&column.name).cloned().unwrap_or(Value::Null));
    }
    Ok(row)
}

fn row_to_record(columns: &[Column], row: Vec<Value>) -> std::result::Result<Record, String> {
    if row.len() != columns.len() {
        return Err(format!(
            "expected {} values, found {}",
            columns.len(),
            row.len()
        ));
    }
    let mut values = row.into_iter();
    let id: RecordId = values
        .next()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| format!("bad identity: {}", e))?
        .ok_or_else(|| "missing identity".to_string())?;

    let mut fields = FieldMap::new();
    for (column, value) in columns[1..].iter().zip(values) {
        if value.is_null() && !column.nullable {
            return Err(format!("column '{}' is not nullable", column.name));
        }
        fields.insert(column.name.clone(), value);
    }
    Ok(Record::new(id, fields))
}

impl RecordStore for TableStore {
    fn insert(&mut self, fields: FieldMap) -> Result<RecordId> {
        self.commit(|mirror| mirror.insert(fields))
    }

    fn get(&self, id: &RecordId) -> Result<Record> {
        self.mirror.get(id)
    }

    fn replace(&mut self, record: Record) -> Result<()> {
        self.commit(|mirror| mirror.replace(record))
    }

    fn remove(&mut self, id: &RecordId) -> Result<Record> {
        self.commit(|mirror| mirror.remove(id))
    }

    fn scan(&self) -> Result<Vec<Record>> {
        self.mirror.scan()
    }

    fn len(&self) -> usize {
        self.mirror.len()
    }

    fn flush(&mut self) -> Result<()> {
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, Todo};
    use serde_json::json;
    use tempfile::TempDir;

    fn todo_fields(title: &str, priority: i64) -> FieldMap {
        let schema = Todo::schema(IdStrategy::Sequential);
        let payload = serde_json::from_value(json!({"title": title, "priority": priority})).unwrap();
        schema.validate_create(&payload).unwrap()
    }

    #[test]
    fn test_columns_follow_schema() {
        let columns = Column::for_schema(&Todo::schema(IdStrategy::Sequential));
        let layout: Vec<(&str, &str, bool)> = columns
            .iter()
            .map(|c| (c.name.as_str(), c.sql_type.as_str(), c.nullable))
            .collect();
        assert_eq!(
            layout,
            vec![
                ("id", "INTEGER", false),
                ("title", "TEXT", false),
                ("description", "TEXT", true),
                ("priority", "INTEGER", false),
                ("complete", "BOOLEAN", true),
            ]
        );
        assert!(columns[0].primary_key);
    }

    #[test]
    fn test_uuid_identity_is_text_column() {
        let columns = Column::for_schema(&Book::schema(IdStrategy::Uuid));
        assert_eq!(columns[0].sql_type, "TEXT");
        assert_eq!(columns.last().unwrap().sql_type, "REAL");
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let schema = Todo::schema(IdStrategy::Sequential);

        let (first, second) = {
            let mut store = TableStore::open(dir.path(), &schema).unwrap();
            let first = store.insert(todo_fields("Buy groceries", 3)).unwrap();
            let second = store.insert(todo_fields("Call dentist", 5)).unwrap();
            (first, second)
        };

        let store = TableStore::open(dir.path(), &schema).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&first).unwrap().get_str("title"), Some("Buy groceries"));
        assert_eq!(store.get(&second).unwrap().get("priority"), Some(&json!(5)));
        assert_eq!(store.get(&first).unwrap().get("complete"), Some(&json!(false)));
    }

    #[test]
    fn test_deleted_max_id_is_not_reused_after_reopen() {
        let dir = TempDir::new().unwrap();
        let schema = Todo::schema(IdStrategy::Sequential);
        {
            let mut store = TableStore::open(dir.path(), &schema).unwrap();
            store.insert(todo_fields("one", 1)).unwrap();
            let two = store.insert(todo_fields("two", 2)).unwrap();
            store.remove(&two).unwrap();
        }

        let mut store = TableStore::open(dir.path(), &schema).unwrap();
        assert_eq!(store.insert(todo_fields("three", 3)).unwrap(), RecordId::Int(3));
    }

    #[test]
    fn test_layout_mismatch_is_corruption() {
        let dir = TempDir::new().unwrap();
        TableStore::open(dir.path(), &Todo::schema(IdStrategy::Sequential)).unwrap();

        let err = TableStore::open(dir.path(), &Todo::schema(IdStrategy::Uuid))
            .err()
            .unwrap();
        assert!(matches!(err, ShelfError::Corruption(_)));
    }

    #[test]
    fn test_null_in_required_column_is_corruption() {
        let dir = TempDir::new().unwrap();
        let schema = Todo::schema(IdStrategy::Sequential);
        let path = TableStore::open(dir.path(), &schema).unwrap().path().to_path_buf();

        let file = TableFile {
            table: "todos".to_string(),
            columns: Column::for_schema(&schema),
            last_id: 1,
            rows: vec![vec![json!(1), Value::Null, Value::Null, json!(2), json!(false)]],
        };
        fs::write(&path, serde_json::to_vec(&file).unwrap()).unwrap();

        let err = TableStore::open(dir.path(), &schema).err().unwrap();
        assert!(matches!(err, ShelfError::Corruption(ref msg) if msg.contains("title")));
    }

    #[test]
    fn test_row_breaking_field_rules_is_corruption() {
        let dir = TempDir::new().unwrap();
        let schema = Todo::schema(IdStrategy::Sequential);
        let path = TableStore::open(dir.path(), &schema).unwrap().path().to_path_buf();

        let file = TableFile {
            table: "todos".to_string(),
            columns: Column::for_schema(&schema),
            last_id: 1,
            rows: vec![vec![json!(1), json!("ab"), Value::Null, json!(9), json!("yes")]],
        };
        fs::write(&path, serde_json::to_vec(&file).unwrap()).unwrap();

        let err = TableStore::open(dir.path(), &schema).err().unwrap();
        match err {
            ShelfError::Corruption(msg) => {
                assert!(msg.contains("row 0"));
                assert!(msg.contains("title"));
                assert!(msg.contains("priority"));
                assert!(msg.contains("complete"));
            }
            other => panic!("expected corruption, got {:?}", other),
        }
    }

    #[test]
    fn test_replace_is_persisted() {
        let dir = TempDir::new().unwrap();
        let schema = Todo::schema(IdStrategy::Sequential);
        let id = {
            let mut store = TableStore::open(dir.path(), &schema).unwrap();
            let id = store.insert(todo_fields("Draft", 2)).unwrap();
            let mut record = store.get(&id).unwrap();
            record.fields.insert("complete".to_string(), json!(true));
            store.replace(record).unwrap();
            id
        };

        let store = TableStore::open(dir.path(), &schema).unwrap();
        assert_eq!(store.get(&id).unwrap().get("complete"), Some(&json!(true)));
    }
}

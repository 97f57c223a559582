// shelfbase-core/src/database.rs
// Entry point owning the book and todo collections

use tracing::info;

use crate::collection::Collection;
use crate::config::{ShelfConfig, StorageConfig};
use crate::error::Result;
use crate::models::{Book, Todo};
use crate::record::IdStrategy;
use crate::schema::Schema;
use crate::seed;
use crate::storage::{Backend, MemoryStore};

/// Both collections over stores opened from one configuration
pub struct Database {
    books: Collection<Backend>,
    todos: Collection<Backend>,
}

impl Database {
    /// Open (or create) the configured stores
    pub fn open(config: &ShelfConfig) -> Result<Self> {
        let books = open_collection(&config.storage, Book::schema(config.books_identity()))?;
        let todos = open_collection(&config.storage, Todo::schema(config.todos_identity()))?;
        info!(
            backend = ?config.storage.backend,
            books = books.count(),
            todos = todos.count(),
            "database opened"
        );
        Ok(Database { books, todos })
    }

    /// Empty in-memory database with the default identity strategies
    pub fn in_memory() -> Self {
        let memory = |schema: Schema| {
            let store = Backend::Memory(MemoryStore::new(schema.identity));
            Collection::new(schema, store)
        };
        Database {
            books: memory(Book::schema(IdStrategy::Uuid)),
            todos: memory(Todo::schema(IdStrategy::Sequential)),
        }
    }

    pub fn books(&self) -> &Collection<Backend> {
        &self.books
    }

    pub fn todos(&self) -> &Collection<Backend> {
        &self.todos
    }

    /// Load the starter catalogue when the book collection is empty.
    /// Returns the number of books inserted.
    pub fn seed_books(&self) -> Result<usize> {
        if self.books.count() > 0 {
            return Ok(0);
        }
        let mut inserted = 0;
        for payload in seed::books() {
            self.books.create(&payload)?;
            inserted += 1;
        }
        info!(inserted, "seeded books");
        Ok(inserted)
    }

    /// Flush all changes to disk
    pub fn flush(&self) -> Result<()> {
        self.books.flush()?;
        self.todos.flush()
    }
}

fn open_collection(storage: &StorageConfig, schema: Schema) -> Result<Collection<Backend>> {
    let store = Backend::open(storage, &schema)?;
    if let Some(path) = store.path() {
        info!(collection = schema.name, path = %path.display(), "collection store");
    }
    Ok(Collection::new(schema, store))
}

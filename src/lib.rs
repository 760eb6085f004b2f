//! Grocery List Core
//!
//! Layered architecture:
//! - domain: Item entity, form drafts and projection rules
//! - repository: SQLite store, migrations and the item repository
//! - store, context, reconciler: the to-buy and cart lists kept in step with the store
//! - commands: handlers the view layer calls

use std::path::{Path, PathBuf};

pub mod commands;
pub mod config;
pub mod context;
pub mod domain;
pub mod reconciler;
pub mod repository;
pub mod store;

pub use config::{ConfigError, GroceryConfig};
pub use context::ListContext;
pub use domain::{DomainError, DomainResult, Item, ItemDraft};
pub use reconciler::ListReconciler;
pub use repository::{init_db, DbState, GroceryRepository, ItemRepository};
pub use store::{ListState, Totals};

/// Application state shared across commands
pub struct AppState {
    pub db_state: DbState,
    pub lists: ListReconciler<ItemRepository>,
}

impl AppState {
    /// Wire up the state around a database that is not opened yet
    pub fn new(db_path: PathBuf) -> Self {
        let db_state = DbState::new(db_path);
        let lists = ListReconciler::new(ItemRepository::new(db_state.connection()));
        Self { db_state, lists }
    }

    /// Private in-memory database, already initialized
    pub async fn open_in_memory() -> DomainResult<Self> {
        let state = Self::new(PathBuf::from(":memory:"));
        state.initialize().await?;
        Ok(state)
    }

    /// Open the database, migrate it and load both lists
    pub async fn initialize(&self) -> DomainResult<()> {
        let initialized = init_db(self.db_state.path()).await?;
        self.db_state.adopt(initialized).await;
        log::info!("Database ready at {}", self.db_state.path().display());
        self.lists.refresh_all().await
    }

    /// Read-only list handle for a screen
    pub fn context(&self) -> ListContext {
        self.lists.context()
    }
}

/// Start from configuration: logging, database directory, initial lists
pub async fn run(config: &GroceryConfig) -> DomainResult<AppState> {
    if config.logging.enabled {
        init_logging(config);
    }

    let db_path = config.db_path()?;
    ensure_parent_dir(&db_path)?;

    let state = AppState::new(db_path);
    if let Err(e) = state.initialize().await {
        let _ = rolling_logger::error(&format!("DB init failed: {}", e));
        return Err(e);
    }
    let _ = rolling_logger::info("DB init success");
    Ok(state)
}

fn ensure_parent_dir(path: &Path) -> DomainResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .map_err(|e| DomainError::Store(format!("Failed to create {}: {}", dir.display(), e))),
        _ => Ok(()),
    }
}

/// Logging failures never stop the app; they are reported on stderr.
fn init_logging(config: &GroceryConfig) {
    let logging = &config.logging;
    let log_dir = match config.log_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Logging disabled: {}", e);
            return;
        }
    };
    let level = logging.level.parse().unwrap_or_else(|_| {
        eprintln!("Unknown log level '{}', using info", logging.level);
        rolling_logger::LevelFilter::INFO
    });

    let options = rolling_logger::LoggerOptions {
        level,
        max_file_bytes: logging.max_file_bytes,
        max_files: logging.max_files,
        buffer_lines: logging.buffer_lines,
        ..rolling_logger::LoggerOptions::new(log_dir, &logging.app_name)
    };
    if let Err(e) = rolling_logger::init_logger_with(options) {
        eprintln!("Failed to init rolling logger: {}", e);
    }
}

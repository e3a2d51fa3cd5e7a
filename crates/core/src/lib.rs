pub mod capture;
pub mod clock;
pub mod config;
pub mod dates;
pub mod error;
pub mod gateway;
pub mod migration;
pub mod model;
pub mod operations;
pub mod parser;
pub mod store;
pub mod views;

pub use capture::CaptureInput;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::{
    CaptureError, MigrationError, StorageError, StoreError, ValidationError, ValidationIssue,
};
pub use gateway::{MemoryGateway, SqliteGateway, TaskGateway};
pub use migration::{LegacyImport, MigrationReport, Migrator, NoMigration};
pub use model::*;
pub use store::{StorePhase, TaskStore};
pub use views::{Board, QuadrantColumn, TodayLayout};

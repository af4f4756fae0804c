pub mod board;
pub mod board_schema;
pub mod cursor;
pub mod record;

// Re-export for convenience
pub use board::{net_name, BoardItems, BoardScanner, ScanError};
pub use board_schema::*;
pub use cursor::{ScanCursor, Source};
pub use record::{RecordKind, RecordSchema};

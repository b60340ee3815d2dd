use std::path::Path;
use std::time::Duration;

use duckdb::{AccessMode, Config, Connection};
use log::warn;

/// Open a DuckDB file read-write, waiting and trying again while another
/// process holds the lock.  The wait doubles after each failure.
/// Suggested `max_attempts = 8`, `initial_wait = Duration::from_millis(25)`.
pub fn open_with_retry(
    duckdb_path: &Path,
    max_attempts: u32,
    initial_wait: Duration,
) -> Result<Connection, duckdb::Error> {
    let mut attempts = 0;
    let mut wait_duration = initial_wait;

    loop {
        let config = Config::default().access_mode(AccessMode::ReadWrite)?;
        match Connection::open_with_flags(duckdb_path, config) {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                attempts += 1;
                if attempts >= max_attempts {
                    return Err(e);
                }
                warn!(
                    "Failed to open {} ({}), attempt {}/{}",
                    duckdb_path.display(),
                    e,
                    attempts,
                    max_attempts
                );
                std::thread::sleep(wait_duration);
                wait_duration *= 2;
            }
        }
    }
}

/// True if `name` can be spliced into SQL as a table name.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

pub mod index;
pub mod init;
pub mod links;
pub mod parse;
pub mod watch;

use anyhow::Result;
use serde::Serialize;

/// Print a value as pretty JSON on stdout.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

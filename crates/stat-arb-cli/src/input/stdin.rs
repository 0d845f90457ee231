use std::io::{self, Read};

use stat_arb_core::config::StrategyConfig;
use stat_arb_core::data::PriceTable;

use super::file::parse_prices;

/// Read piped stdin as text.
/// Returns None if stdin is a TTY (interactive) or empty.
pub fn read_stdin_text() -> Result<Option<String>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    if buffer.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(buffer))
}

/// Price CSV piped on stdin.
pub fn read_stdin_prices() -> Result<Option<PriceTable>, Box<dyn std::error::Error>> {
    match read_stdin_text()? {
        Some(text) => Ok(Some(parse_prices(text.as_bytes())?)),
        None => Ok(None),
    }
}

/// JSON strategy config piped on stdin.
pub fn read_stdin_config() -> Result<Option<StrategyConfig>, Box<dyn std::error::Error>> {
    match read_stdin_text()? {
        Some(text) => Ok(Some(serde_json::from_str(text.trim())?)),
        None => Ok(None),
    }
}

use crate::error::Result;
use crate::runsheet::RunsheetJobParser;
use crate::settings::{load_settings, settings_path};

pub fn show() -> Result<()> {
    let settings = load_settings();
    // Fail loudly on patterns the parser would reject.
    RunsheetJobParser::new(&settings.parser)?;
    println!("{}", serde_json::to_string_pretty(&settings.parser)?);
    Ok(())
}

pub fn path() -> Result<()> {
    println!("{}", settings_path().display());
    Ok(())
}

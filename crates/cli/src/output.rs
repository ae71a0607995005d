use crate::error::CliError;
use serde::Serialize;

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub async fn write_json<T: Serialize>(value: &T, path: &str) -> Result<(), CliError> {
    let json = to_json(value)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", to_json(value)?);
    Ok(())
}

use csv::Writer;
use serde_json::Value;
use std::error::Error;

use crate::remote::models::Row;

/// Renders result rows as CSV using the first row's keys as the column order.
pub fn rows_to_csv(rows: &[Row]) -> Result<String, Box<dyn Error + Send + Sync>> {
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;

    for row in rows {
        let record: Vec<String> = headers
            .iter()
            .map(|column| cell_text(row.get(*column)))
            .collect();
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.to_string())?;
    Ok(String::from_utf8(bytes)?)
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

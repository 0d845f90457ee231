use serde_json::{Map, Value};
use std::io::{self, Write};

/// Series columns of a pipeline run, in output order.
const RUN_COLUMNS: [(&str, &str); 3] = [
    ("portfolio_returns", "portfolio_ret"),
    ("equity_curve", "equity"),
    ("drawdown", "drawdown"),
];

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    if let Err(e) = write_csv(value, stdout.lock()) {
        eprintln!("CSV output error: {}", e);
    }
}

/// A pipeline run becomes one row per date; record lists become one row per
/// record; anything else is a two-column `field,value` listing.
pub fn write_csv<W: Write>(value: &Value, out: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) if map.contains_key("portfolio_returns") => {
            write_run_csv(&mut wtr, map)?;
        }
        Value::Object(map) => {
            wtr.write_record(["field", "value"])?;
            for (key, val) in map {
                wtr.write_record([key.as_str(), &format_csv_value(val)])?;
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr)?,
        _ => wtr.write_record([&format_csv_value(result)])?,
    }

    wtr.flush()?;
    Ok(())
}

fn write_run_csv<W: Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) -> csv::Result<()> {
    let columns: Vec<(&str, &Vec<Value>)> = RUN_COLUMNS
        .iter()
        .filter_map(|(key, name)| {
            map.get(*key)
                .and_then(|s| s.get("values"))
                .and_then(Value::as_array)
                .map(|values| (*name, values))
        })
        .collect();
    let dates = map
        .get("portfolio_returns")
        .and_then(|s| s.get("dates"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut header = vec!["date"];
    header.extend(columns.iter().map(|(name, _)| *name));
    wtr.write_record(&header)?;
    for (i, date) in dates.iter().enumerate() {
        let mut row = vec![format_csv_value(date)];
        row.extend(
            columns
                .iter()
                .map(|(_, values)| values.get(i).map(format_csv_value).unwrap_or_default()),
        );
        wtr.write_record(&row)?;
    }
    Ok(())
}

fn write_array_csv<W: Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> csv::Result<()> {
    if arr.is_empty() {
        return Ok(());
    }

    // Extract headers from first object
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        wtr.write_record(&headers)?;

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                wtr.write_record(&row)?;
            }
        }
    } else {
        for item in arr {
            wtr.write_record([&format_csv_value(item)])?;
        }
    }
    Ok(())
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

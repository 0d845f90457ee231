use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            // Check if "result" key holds the primary data
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => {
            // Scalars and series first, then one sub-table per record list
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            let mut sections = Vec::new();
            for (key, val) in res_map {
                match val {
                    Value::Array(rows) if rows.iter().all(Value::is_object) && !rows.is_empty() => {
                        sections.push((key, rows));
                    }
                    Value::Object(inner) if !is_series(inner) && !inner.values().any(is_series_value) => {
                        for (k, v) in inner {
                            builder.push_record([format!("{key}.{k}"), format_value(v)]);
                        }
                    }
                    _ => builder.push_record([key.to_string(), format_value(val)]),
                }
            }
            println!("{}", Table::from(builder));
            for (key, rows) in sections {
                println!("\n{}:", key);
                print_array_table(rows);
            }
        }
        Value::Array(rows) => print_array_table(rows),
        _ => print_flat_object(envelope),
    }

    // Print warnings if any
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    // Print methodology
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    // Collect all keys from first object for headers
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        // Simple array of values
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

/// `{"dates": [..], "values": [..]}`
fn is_series(map: &Map<String, Value>) -> bool {
    map.len() == 2 && map.contains_key("dates") && map.contains_key("values")
}

fn is_series_value(value: &Value) -> bool {
    matches!(value, Value::Object(m) if is_series(m))
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(map) if is_series(map) => describe_series(map),
        Value::Object(map) if map.values().all(is_series_value) => {
            format!("{} series", map.len())
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn describe_series(map: &Map<String, Value>) -> String {
    let values = map.get("values").and_then(Value::as_array);
    let dates = map.get("dates").and_then(Value::as_array);
    let (Some(values), Some(dates)) = (values, dates) else {
        return String::new();
    };
    let defined = values.iter().filter(|v| !v.is_null()).count();
    match (dates.first(), dates.last(), values.last()) {
        (Some(first), Some(last), Some(end)) => format!(
            "{} points ({} defined), {} .. {}, last {}",
            values.len(),
            defined,
            format_value(first),
            format_value(last),
            format_value(end)
        ),
        _ => "empty series".to_string(),
    }
}

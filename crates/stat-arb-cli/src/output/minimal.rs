use serde_json::Value;

/// Metric keys, in print order.
const METRIC_KEYS: [&str; 4] = ["annualized_return", "sharpe", "max_drawdown", "win_rate"];

/// Print just the key answer from the output: the performance metrics of a
/// run or metrics call, or one `A__B pvalue` line per selected pair.
pub fn print_minimal(value: &Value) {
    for line in minimal_lines(value) {
        println!("{}", line);
    }
}

fn minimal_lines(value: &Value) -> Vec<String> {
    // Try to extract the "result" envelope
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result_obj {
        Value::Array(pairs) => pairs.iter().map(pair_line).collect(),
        Value::Object(map) => {
            let metrics = map.get("summary").and_then(Value::as_object).unwrap_or(map);
            let lines: Vec<String> = METRIC_KEYS
                .iter()
                .filter_map(|k| metrics.get(*k).map(|v| format!("{}: {}", k, format_minimal(v))))
                .collect();
            if lines.is_empty() {
                // Fall back to first field
                map.iter()
                    .next()
                    .map(|(k, v)| vec![format!("{}: {}", k, format_minimal(v))])
                    .unwrap_or_default()
            } else {
                lines
            }
        }
        other => vec![format_minimal(other)],
    }
}

fn pair_line(pair: &Value) -> String {
    match (pair.get("a"), pair.get("b"), pair.get("coint_pvalue")) {
        (Some(a), Some(b), Some(p)) => format!(
            "{}__{} {}",
            format_minimal(a),
            format_minimal(b),
            format_minimal(p)
        ),
        _ => format_minimal(pair),
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_run_prints_summary() {
        let value = json!({"result": {
            "summary": {"annualized_return": 0.1, "sharpe": null, "max_drawdown": -0.2, "win_rate": 0.5},
            "selected_pairs": []
        }});
        assert_eq!(
            minimal_lines(&value),
            vec![
                "annualized_return: 0.1",
                "sharpe: null",
                "max_drawdown: -0.2",
                "win_rate: 0.5"
            ]
        );
    }

    #[test]
    fn test_selection_prints_labels() {
        let value = json!({"result": [{"a": "KO", "b": "PEP", "coint_pvalue": 0.003}]});
        assert_eq!(minimal_lines(&value), vec!["KO__PEP 0.003"]);
    }
}

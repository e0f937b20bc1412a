use serde_json::Value;
use std::io;

/// Write output as CSV to stdout.
///
/// Envelopes whose result carries a table (stress results, waterfall tiers,
/// sensitivity matrix) are written as that table; anything else as
/// field/value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => {
                // Sensitivity grid, then per-row results, then field/value pairs
                if let Some(Value::Array(rows)) = result.get("matrix") {
                    write_matrix_csv(&mut wtr, result, rows);
                } else if let Some(records) = record_table(result) {
                    write_array_csv(&mut wtr, records);
                } else {
                    // Two-column CSV: field, value
                    let _ = wtr.write_record(["field", "value"]);
                    for (key, val) in result {
                        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                    }
                }
            }
            Some(Value::Array(records)) => write_array_csv(&mut wtr, records),
            // No envelope: dump the object itself
            _ => {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        },
        Value::Array(arr) => {
            write_array_csv(&mut wtr, arr);
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

/// First array of records among the fields that carry per-row results.
fn record_table(result: &serde_json::Map<String, Value>) -> Option<&Vec<Value>> {
    ["tiers", "results", "outcomes", "fan_chart"]
        .iter()
        .filter_map(|k| result.get(*k).and_then(Value::as_array))
        .find(|a| matches!(a.first(), Some(Value::Object(_))))
}

fn write_matrix_csv(
    wtr: &mut csv::Writer<io::StdoutLock<'_>>,
    result: &serde_json::Map<String, Value>,
    rows: &[Value],
) {
    let labels = |key: &str| -> Vec<String> {
        result
            .get(key)
            .and_then(Value::as_array)
            .map(|a| a.iter().map(format_csv_value).collect())
            .unwrap_or_default()
    };
    let row_labels = labels("margin_values");

    // Header row carries the WACC axis
    let mut header = vec!["margin".to_string()];
    header.extend(labels("wacc_values"));
    let _ = wtr.write_record(&header);

    for (i, row) in rows.iter().enumerate() {
        let mut record = vec![row_labels.get(i).cloned().unwrap_or_default()];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_csv_value));
        }
        let _ = wtr.write_record(&record);
    }
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    // Extract headers from first object
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        // Simple array of values
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
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

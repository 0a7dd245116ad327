// ABOUTME: Windowed extractor reading one watermark range from an origin tier
// ABOUTME: Renders duration (TIME) values as HH:MM:SS text before rows leave the extractor

use mysql_async::consts::ColumnType;
use mysql_async::Value;

use super::window::ReplicationWindow;
use crate::config::TableNaming;
use crate::error::{ReplicationError, Result};
use crate::store::{RowSet, TierStore};

/// Read every row of `table` whose `column` falls inside `window`.
///
/// Zero matching rows is an empty `RowSet`, not an error.
pub async fn extract<S: TierStore>(
    origin: &S,
    naming: &TableNaming,
    table: &str,
    column: &str,
    window: &ReplicationWindow,
) -> Result<RowSet> {
    let physical = naming.physical(origin.tier(), table);
    tracing::debug!(
        "Extracting {} from the {} tier, range {}",
        physical,
        origin.tier(),
        window
    );

    let mut rows = origin
        .select_range(
            &physical,
            column,
            &window.start.to_sql(),
            &window.end.to_sql(),
        )
        .await
        .map_err(|source| ReplicationError::Extraction {
            table: table.to_string(),
            tier: origin.tier(),
            source,
        })?;

    normalize_durations(&mut rows);
    tracing::debug!("{} with {} rows", physical, rows.len());
    Ok(rows)
}

/// Replace every duration value with its clock text and retype the columns
/// that held them as strings.
pub fn normalize_durations(rows: &mut RowSet) {
    let mut duration_columns: Vec<usize> = rows
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.column_type == ColumnType::MYSQL_TYPE_TIME)
        .map(|(i, _)| i)
        .collect();

    // Typeless results (no column metadata) still carry Value::Time.
    for row in &rows.rows {
        for (i, value) in row.iter().enumerate() {
            if matches!(value, Value::Time(..)) && !duration_columns.contains(&i) {
                duration_columns.push(i);
            }
        }
    }

    if duration_columns.is_empty() {
        return;
    }

    for row in rows.rows.iter_mut() {
        for &i in &duration_columns {
            if let Some(value) = row.get_mut(i) {
                *value = duration_text(value);
            }
        }
    }
    for &i in &duration_columns {
        if let Some(column) = rows.columns.get_mut(i) {
            column.column_type = ColumnType::MYSQL_TYPE_VAR_STRING;
        }
    }
}

/// Clock text of one duration value with its day count dropped.
///
/// `Time(false, 3, 4, 5, 6, 0)` becomes `"04:05:06"`; fractional seconds are
/// kept as `.ffffff`. Text durations get their day prefix stripped. NULL stays
/// NULL.
pub fn duration_text(value: &Value) -> Value {
    match value {
        Value::Time(negative, _days, hours, minutes, seconds, micros) => {
            let mut text = format!("{:02}:{:02}:{:02}", hours, minutes, seconds);
            if *micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            if *negative {
                text.insert(0, '-');
            }
            Value::Bytes(text.into_bytes())
        }
        Value::Bytes(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            Value::Bytes(strip_day_prefix(&text).as_bytes().to_vec())
        }
        other => other.clone(),
    }
}

/// Drop a leading day count from a textual duration.
///
/// Handles both `"3 days, 04:05:06"` and `"0 days 04:05:06"`; text without a
/// day count is returned unchanged.
pub fn strip_day_prefix(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.find("day") {
        Some(pos) => {
            let rest = &trimmed[pos..];
            let after_word = rest.trim_start_matches("days").trim_start_matches("day");
            after_word.trim_start_matches(',').trim_start()
        }
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ColumnMeta;

    fn text(value: Value) -> String {
        match value {
            Value::Bytes(b) => String::from_utf8(b).unwrap(),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_strip_day_prefix() {
        assert_eq!(strip_day_prefix("3 days, 04:05:06"), "04:05:06");
        assert_eq!(strip_day_prefix("0 days 04:05:06"), "04:05:06");
        assert_eq!(strip_day_prefix("1 day, 00:00:01"), "00:00:01");
        assert_eq!(strip_day_prefix("04:05:06"), "04:05:06");
        assert_eq!(strip_day_prefix("0 days 04:05:06.250000"), "04:05:06.250000");
    }

    #[test]
    fn test_duration_text_from_time_value() {
        assert_eq!(text(duration_text(&Value::Time(false, 3, 4, 5, 6, 0))), "04:05:06");
        assert_eq!(
            text(duration_text(&Value::Time(false, 0, 23, 59, 1, 500_000))),
            "23:59:01.500000"
        );
        assert_eq!(text(duration_text(&Value::Time(true, 0, 1, 0, 0, 0))), "-01:00:00");
        assert_eq!(duration_text(&Value::NULL), Value::NULL);
    }

    #[test]
    fn test_normalize_durations_only_touches_time_columns() {
        let mut rows = RowSet::new(
            vec![
                ColumnMeta::new("id", ColumnType::MYSQL_TYPE_LONG),
                ColumnMeta::new("handle_time", ColumnType::MYSQL_TYPE_TIME),
            ],
            vec![
                vec![Value::Int(1), Value::Time(false, 3, 4, 5, 6, 0)],
                vec![Value::Int(2), Value::NULL],
            ],
        );

        normalize_durations(&mut rows);

        assert_eq!(rows.rows[0][0], Value::Int(1));
        assert_eq!(rows.rows[0][1], Value::Bytes(b"04:05:06".to_vec()));
        assert_eq!(rows.rows[1][1], Value::NULL);
        assert_eq!(rows.columns[1].column_type, ColumnType::MYSQL_TYPE_VAR_STRING);
        assert_eq!(rows.columns[0].column_type, ColumnType::MYSQL_TYPE_LONG);
    }

    #[test]
    fn test_normalize_textual_durations_in_time_column() {
        let mut rows = RowSet::new(
            vec![ColumnMeta::new("wait", ColumnType::MYSQL_TYPE_TIME)],
            vec![vec![Value::Bytes(b"3 days, 04:05:06".to_vec())]],
        );
        normalize_durations(&mut rows);
        assert_eq!(rows.rows[0][0], Value::Bytes(b"04:05:06".to_vec()));
    }
}

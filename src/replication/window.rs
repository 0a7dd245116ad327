// ABOUTME: Watermark values and the replication window bounding one extraction
// ABOUTME: Converts watermarks to and from MySQL values and parses CLI window tokens

use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, SubsecRound, Timelike};
use mysql_async::Value;
use std::fmt;

/// Number of identifiers covered by one window on an identifier-watermarked table.
pub const ID_BATCH_SIZE: i64 = 300;

/// Column name that marks a table as identifier-watermarked.
pub const IDENTIFIER_COLUMN: &str = "id";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How a watermark column is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkKind {
    Identifier,
    Timestamp,
}

impl WatermarkKind {
    pub fn for_column(column: &str) -> Self {
        if column == IDENTIFIER_COLUMN {
            WatermarkKind::Identifier
        } else {
            WatermarkKind::Timestamp
        }
    }

    /// Start used when the destination holds no watermark yet: `1` for
    /// identifiers, `2024-04-01 00:00:00` for timestamps.
    pub fn default_start(&self) -> Watermark {
        match self {
            WatermarkKind::Identifier => Watermark::Id(1),
            WatermarkKind::Timestamp => Watermark::Timestamp(default_epoch()),
        }
    }
}

fn default_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// A position in a table's watermark column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Watermark {
    Id(i64),
    Timestamp(NaiveDateTime),
}

impl Watermark {
    pub fn kind(&self) -> WatermarkKind {
        match self {
            Watermark::Id(_) => WatermarkKind::Identifier,
            Watermark::Timestamp(_) => WatermarkKind::Timestamp,
        }
    }

    /// Interpret a value read from a watermark column.
    pub fn from_sql(value: &Value, kind: WatermarkKind) -> Result<Self> {
        match (kind, value) {
            (WatermarkKind::Identifier, Value::Int(n)) => Ok(Watermark::Id(*n)),
            (WatermarkKind::Identifier, Value::UInt(n)) => i64::try_from(*n)
                .map(Watermark::Id)
                .map_err(|_| anyhow!("Identifier watermark {} does not fit in i64", n)),
            (WatermarkKind::Timestamp, Value::Date(year, month, day, hour, min, sec, micro)) => {
                NaiveDate::from_ymd_opt(*year as i32, *month as u32, *day as u32)
                    .and_then(|d| {
                        d.and_hms_micro_opt(*hour as u32, *min as u32, *sec as u32, *micro)
                    })
                    .map(Watermark::Timestamp)
                    .ok_or_else(|| {
                        anyhow!(
                            "Invalid timestamp watermark {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                            year,
                            month,
                            day,
                            hour,
                            min,
                            sec
                        )
                    })
            }
            (_, Value::Bytes(bytes)) => {
                let text = String::from_utf8_lossy(bytes);
                let parsed = Watermark::parse(text.trim())?;
                if parsed.kind() != kind {
                    bail!("Expected a {:?} watermark, got '{}'", kind, text);
                }
                Ok(parsed)
            }
            (_, Value::NULL) => bail!("Watermark column holds NULL"),
            (kind, other) => bail!("Unsupported {:?} watermark value {:?}", kind, other),
        }
    }

    /// Parse a watermark typed on the command line: an integer identifier,
    /// `YYYY-MM-DD HH:MM:SS[.ffffff]`, or a bare `YYYY-MM-DD` (midnight).
    pub fn parse(text: &str) -> Result<Self> {
        if let Ok(id) = text.parse::<i64>() {
            return Ok(Watermark::Id(id));
        }
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
            return Ok(Watermark::Timestamp(ts));
        }
        if let Some(ts) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(Watermark::Timestamp(ts));
        }
        bail!(
            "Invalid watermark '{}': expected an integer id or YYYY-MM-DD HH:MM:SS",
            text
        )
    }

    /// Bound parameter form used in range predicates.
    pub fn to_sql(&self) -> Value {
        match self {
            Watermark::Id(id) => Value::Int(*id),
            Watermark::Timestamp(ts) => Value::Date(
                ts.year() as u16,
                ts.month() as u8,
                ts.day() as u8,
                ts.hour() as u8,
                ts.minute() as u8,
                ts.second() as u8,
                ts.nanosecond() / 1000,
            ),
        }
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Watermark::Id(id) => write!(f, "{}", id),
            Watermark::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Inclusive `[start, end]` range bounding one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationWindow {
    pub start: Watermark,
    pub end: Watermark,
}

impl ReplicationWindow {
    pub fn new(start: Watermark, end: Watermark) -> Self {
        Self { start, end }
    }

    /// Window that follows a resolved start: identifier windows span
    /// `ID_BATCH_SIZE` ids, timestamp windows run up to `now`.
    pub fn following(start: Watermark, now: NaiveDateTime) -> Self {
        let end = match start {
            Watermark::Id(id) => Watermark::Id(id.saturating_add(ID_BATCH_SIZE)),
            Watermark::Timestamp(_) => Watermark::Timestamp(now.trunc_subsecs(0)),
        };
        Self { start, end }
    }

    /// Build an explicit backfill window from positional CLI tokens.
    ///
    /// Accepts nothing (automatic resolution), `START END`, or the split form
    /// `START_DATE START_TIME END_DATE END_TIME`.
    pub fn from_tokens(tokens: &[String]) -> Result<Option<Self>> {
        let (start, end) = match tokens {
            [] => return Ok(None),
            [start, end] => (start.clone(), end.clone()),
            [start_date, start_time, end_date, end_time] => (
                format!("{} {}", start_date, start_time),
                format!("{} {}", end_date, end_time),
            ),
            other => bail!(
                "Expected a window of 2 or 4 tokens (START END or DATE TIME DATE TIME), got {}",
                other.len()
            ),
        };

        let window = Self::new(Watermark::parse(&start)?, Watermark::parse(&end)?);
        if window.start.kind() != window.end.kind() {
            bail!(
                "Window bounds must both be ids or both be timestamps: {} - {}",
                window.start,
                window.end
            );
        }
        if window.start > window.end {
            bail!("Window start {} is after its end {}", window.start, window.end);
        }
        Ok(Some(window))
    }

    /// Whether the window's bounds are the kind `column` is watermarked by.
    pub fn fits_column(&self, column: &str) -> bool {
        self.start.kind() == WatermarkKind::for_column(column)
    }
}

impl fmt::Display for ReplicationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "( {} - {} )", self.start, self.end)
    }
}

/// Current local wall-clock time, the default end of timestamp windows.
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

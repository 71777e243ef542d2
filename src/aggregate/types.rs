//! Row types for the delay aggregation stage.

use serde::{Deserialize, Serialize};

/// A single row from a raw Fahrzeiten export. Only the columns the pipeline
/// touches are mapped; the csv reader ignores the rest. Every field is
/// optional so that an empty cell surfaces as `None` instead of a parse
/// error for the whole row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    pub linie: Option<i64>,
    pub betriebsdatum: Option<String>,
    pub fahrzeug: Option<i64>,
    pub soll_an_von: Option<i64>,
    pub ist_an_von: Option<i64>,
    pub fw_typ: Option<i64>,
    pub halt_id_von: Option<i64>,
}

/// One qualifying stop event, projected to the aggregated schema.
/// Field order is the on-disk column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelayRecord {
    pub linie: i64,
    pub betriebsdatum: String,
    pub fahrzeug: i64,
    pub soll_an_von: i64,
    pub verspaetung: i64,
    pub halt_id_von: i64,
}

impl DelayRecord {
    pub const COLUMNS: [&'static str; 6] = [
        "linie",
        "betriebsdatum",
        "fahrzeug",
        "soll_an_von",
        "verspaetung",
        "halt_id_von",
    ];
}

/// Why rows were excluded from a file, for run diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DropCounts {
    /// linie above the tram range, or absent.
    pub line_filtered: usize,
    /// fw_typ other than regular service, or absent.
    pub service_filtered: usize,
    /// Passed both filters but a projected column was empty.
    pub missing_field: usize,
    /// Row failed to parse at all.
    pub malformed: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.line_filtered + self.service_filtered + self.missing_field + self.malformed
    }
}

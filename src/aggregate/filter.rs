//! Row filter and delay derivation.

use super::types::{DelayRecord, DropCounts, RawRecord};

/// Lines 1-20 are tram lines; higher numbers are buses and special services.
pub const TRAM_LINE_MAX: i64 = 20;

/// fw_typ value marking a regular scheduled trip.
pub const REGULAR_SERVICE: i64 = 1;

/// Kept rows plus counts of what was dropped and why.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub kept: Vec<DelayRecord>,
    pub dropped: DropCounts,
}

enum DropReason {
    LineFiltered,
    ServiceFiltered,
    MissingField,
}

/// Applies the tram-line and service-type filter and computes the delay
/// column. Row order is preserved; nothing is logged here, the caller owns
/// reporting.
pub fn filter_records(rows: Vec<RawRecord>) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    for row in rows {
        match keep(row) {
            Ok(record) => outcome.kept.push(record),
            Err(DropReason::LineFiltered) => outcome.dropped.line_filtered += 1,
            Err(DropReason::ServiceFiltered) => outcome.dropped.service_filtered += 1,
            Err(DropReason::MissingField) => outcome.dropped.missing_field += 1,
        }
    }

    outcome
}

fn keep(row: RawRecord) -> Result<DelayRecord, DropReason> {
    if !row.linie.is_some_and(|l| l <= TRAM_LINE_MAX) {
        return Err(DropReason::LineFiltered);
    }
    if row.fw_typ != Some(REGULAR_SERVICE) {
        return Err(DropReason::ServiceFiltered);
    }

    let RawRecord {
        linie: Some(linie),
        betriebsdatum: Some(betriebsdatum),
        fahrzeug: Some(fahrzeug),
        soll_an_von: Some(soll_an_von),
        ist_an_von: Some(ist_an_von),
        halt_id_von: Some(halt_id_von),
        ..
    } = row
    else {
        return Err(DropReason::MissingField);
    };

    Ok(DelayRecord {
        linie,
        betriebsdatum,
        fahrzeug,
        soll_an_von,
        verspaetung: ist_an_von - soll_an_von,
        halt_id_von,
    })
}

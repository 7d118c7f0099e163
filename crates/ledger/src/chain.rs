//! Ledger - the append-only chain of records

use chrono::{DateTime, Utc};
use std::io::Write;
use tracing::{debug, error, info};

use crate::error::{LedgerError, LedgerResult};
use crate::hash::{verify_chain, ChainError};
use crate::record::{Record, RecordPayload, RecordReport, GENESIS_PREV_HASH};
use crate::stats::LedgerStats;

/// Append-only, hash-linked prescription ledger
///
/// Records are only reachable through shared references, so the public API
/// cannot mutate a committed record. Once corruption has been detected the
/// ledger refuses every further append.
#[derive(Debug, Clone)]
pub struct Ledger {
    records: Vec<Record>,
    corruption: Option<ChainError>,
}

impl Ledger {
    /// Create a ledger holding only the genesis record
    pub fn new() -> LedgerResult<Self> {
        Self::with_genesis_at(Utc::now())
    }

    /// Create a ledger whose genesis record carries the given timestamp
    pub fn with_genesis_at(timestamp: DateTime<Utc>) -> LedgerResult<Self> {
        let genesis = Record::seal(
            0,
            timestamp,
            RecordPayload::Genesis,
            RecordReport::genesis(),
            GENESIS_PREV_HASH.to_string(),
        )?;
        debug!(hash = %genesis.hash, "Genesis record created");

        Ok(Self {
            records: vec![genesis],
            corruption: None,
        })
    }

    /// Append a record stamped with the current time
    pub fn append(&mut self, payload: RecordPayload, report: RecordReport) -> LedgerResult<&Record> {
        self.append_at(payload, report, Utc::now())
    }

    /// Append a record with an explicit timestamp
    ///
    /// No validation of the payload happens here; routing has already decided.
    /// Before linking, the tail record is re-hashed so a tampered tail is
    /// never extended.
    pub fn append_at(
        &mut self,
        payload: RecordPayload,
        report: RecordReport,
        timestamp: DateTime<Utc>,
    ) -> LedgerResult<&Record> {
        if let Some(ref err) = self.corruption {
            return Err(LedgerError::Integrity(err.clone()));
        }

        let (index, previous_hash) = match self.records.last() {
            Some(tail) => {
                let recomputed = tail.compute_hash()?;
                if recomputed != tail.hash {
                    let err = ChainError::InvalidHash {
                        index: tail.index,
                        expected: recomputed,
                        actual: tail.hash.clone(),
                    };
                    return Err(self.poison(err));
                }
                (tail.index + 1, tail.hash.clone())
            }
            None => (0, GENESIS_PREV_HASH.to_string()),
        };

        let record = Record::seal(index, timestamp, payload, report, previous_hash)?;
        info!(
            index = record.index,
            hash = %record.hash,
            status = %record.report.status,
            "Record appended"
        );
        self.records.push(record);

        let last = self.records.len() - 1;
        Ok(&self.records[last])
    }

    /// True if every record hashes correctly and links to its predecessor
    pub fn verify_integrity(&self) -> bool {
        self.verify_chain().is_ok()
    }

    /// Verify the chain, reporting the first offending record
    pub fn verify_chain(&self) -> Result<(), ChainError> {
        verify_chain(&self.records)
    }

    /// Verify the chain and halt further appends if it is corrupt
    pub fn audit(&mut self) -> LedgerResult<()> {
        match self.verify_chain() {
            Ok(()) => {
                debug!(records = self.records.len(), "Ledger audit passed");
                Ok(())
            }
            Err(err) => Err(self.poison(err)),
        }
    }

    /// True once corruption has been detected
    pub fn is_halted(&self) -> bool {
        self.corruption.is_some()
    }

    fn poison(&mut self, err: ChainError) -> LedgerError {
        error!(index = err.index(), error = %err, "Ledger integrity violated, appends halted");
        self.corruption = Some(err.clone());
        LedgerError::Integrity(err)
    }

    /// Records matching a predicate, genesis excluded, in chain order
    pub fn history<F>(&self, predicate: F) -> Vec<Record>
    where
        F: Fn(&Record) -> bool,
    {
        self.records
            .iter()
            .skip(1)
            .filter(|r| !r.is_genesis() && predicate(r))
            .cloned()
            .collect()
    }

    /// All records for a patient
    pub fn patient_history(&self, patient_id: &str) -> Vec<Record> {
        self.history(|r| {
            r.prescription()
                .and_then(|p| p.patient_id.as_deref())
                .map_or(false, |id| id == patient_id)
        })
    }

    /// All records written by a prescriber
    pub fn prescriber_history(&self, doctor_id: &str) -> Vec<Record> {
        self.history(|r| {
            r.prescription()
                .and_then(|p| p.doctor_id.as_deref())
                .map_or(false, |id| id == doctor_id)
        })
    }

    /// Records whose medication contains the term (case-insensitive)
    pub fn search_by_medication(&self, term: &str) -> Vec<Record> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.history(|r| {
            r.prescription()
                .and_then(|p| p.medication.as_deref())
                .map_or(false, |m| m.to_lowercase().contains(&needle))
        })
    }

    /// Number of records including genesis
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false: a ledger holds at least its genesis record
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Option<&Record> {
        self.records.last()
    }

    pub fn get(&self, index: u64) -> Option<&Record> {
        usize::try_from(index).ok().and_then(|i| self.records.get(i))
    }

    /// Read-only view of the whole chain
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats::collect(&self.records, self.verify_integrity())
    }

    /// Write every record as one JSON line
    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> LedgerResult<usize> {
        for record in &self.records {
            let json = serde_json::to_string(record)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;
        Ok(self.records.len())
    }
}

//! In-memory patient record storage.
//!
//! This module provides the [`PatientStore`] which keeps one ordered record
//! sequence per patient. Each patient sits behind its own lock so ingestion
//! for one patient never blocks readers of another.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::types::{Record, SignalType, TimeRange};

/// The ordered record sequence of one patient.
///
/// Records are kept in arrival order, which is not necessarily timestamp
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    id: u32,
    records: Vec<Record>,
    observations: HashSet<(i64, SignalType, u64)>,
}

impl Patient {
    /// Creates a patient with no records.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self {
            id,
            records: Vec::new(),
            observations: HashSet::new(),
        }
    }

    /// The patient identifier.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Appends a record for this patient.
    ///
    /// Returns `false`, storing nothing, if the exact same `(signal_type,
    /// value)` pair already exists at `timestamp`.
    pub fn add_record(&mut self, signal_type: SignalType, value: f64, timestamp: i64) -> bool {
        if !self
            .observations
            .insert((timestamp, signal_type.clone(), value.to_bits()))
        {
            return false;
        }
        self.records
            .push(Record::new(self.id, signal_type, value, timestamp));
        true
    }

    /// Returns the records whose timestamp falls within the range, in arrival order.
    #[must_use]
    pub fn records_in(&self, range: TimeRange) -> Vec<Record> {
        self.records
            .iter()
            .filter(|r| range.contains(r.timestamp()))
            .cloned()
            .collect()
    }

    /// Returns all records in arrival order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the patient has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Thread-safe in-memory storage for patient records.
///
/// Cloning a store yields a handle to the same data; the pipeline owner
/// creates one store and hands clones to ingestion and evaluation.
#[derive(Debug, Default)]
pub struct PatientStore {
    patients: Arc<RwLock<HashMap<u32, Arc<RwLock<Patient>>>>>,
}

impl PatientStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a measurement for a patient, creating the patient on first use.
    ///
    /// Returns `false` if an identical `(signal_type, value)` observation already
    /// exists at the same timestamp; the duplicate is not stored.
    pub fn append_record(
        &self,
        patient_id: u32,
        signal_type: SignalType,
        value: f64,
        timestamp: i64,
    ) -> bool {
        let patient = self.patient_entry(patient_id);
        let mut patient = patient.write();

        if !patient.add_record(signal_type.clone(), value, timestamp) {
            debug!(
                patient_id,
                signal = %signal_type,
                timestamp,
                "record already exists, skipping"
            );
            return false;
        }

        debug!(
            patient_id,
            records_count = patient.len(),
            "appended record"
        );
        true
    }

    /// Appends an already-built record.
    pub fn append(&self, record: Record) -> bool {
        self.append_record(
            record.patient_id(),
            record.signal_type().clone(),
            record.value(),
            record.timestamp(),
        )
    }

    /// Returns a patient's records with `start_ms <= timestamp <= end_ms`.
    ///
    /// Unknown patients and inverted bounds yield an empty sequence.
    #[must_use]
    pub fn get_records(&self, patient_id: u32, start_ms: i64, end_ms: i64) -> Vec<Record> {
        if start_ms > end_ms {
            return Vec::new();
        }
        self.query(patient_id, TimeRange { start: start_ms, end: end_ms })
    }

    /// Returns a patient's records within the range, in arrival order.
    #[must_use]
    pub fn query(&self, patient_id: u32, range: TimeRange) -> Vec<Record> {
        self.patient(patient_id)
            .map(|p| p.read().records_in(range))
            .unwrap_or_default()
    }

    /// Returns a point-in-time copy of all of a patient's records.
    ///
    /// The copy is taken under the patient's read lock, so a concurrent append
    /// is either fully visible or not visible at all.
    #[must_use]
    pub fn snapshot(&self, patient_id: u32) -> Vec<Record> {
        self.patient(patient_id)
            .map(|p| p.read().records().to_vec())
            .unwrap_or_default()
    }

    /// Returns the first record stored at exactly `timestamp`.
    #[must_use]
    pub fn record_at(&self, patient_id: u32, timestamp: i64) -> Option<Record> {
        self.query(patient_id, TimeRange::at(timestamp))
            .into_iter()
            .next()
    }

    /// Returns the ids of all known patients, sorted.
    #[must_use]
    pub fn patient_ids(&self) -> Vec<u32> {
        let patients = self.patients.read();
        let mut ids: Vec<u32> = patients.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of known patients.
    #[must_use]
    pub fn patient_count(&self) -> usize {
        self.patients.read().len()
    }

    /// Returns true if the patient has at least one stored record.
    #[must_use]
    pub fn contains_patient(&self, patient_id: u32) -> bool {
        self.patients.read().contains_key(&patient_id)
    }

    /// Returns the number of records across all patients.
    #[must_use]
    pub fn total_records(&self) -> usize {
        let patients: Vec<_> = self.patients.read().values().cloned().collect();
        patients.iter().map(|p| p.read().len()).sum()
    }

    fn patient(&self, patient_id: u32) -> Option<Arc<RwLock<Patient>>> {
        self.patients.read().get(&patient_id).cloned()
    }

    fn patient_entry(&self, patient_id: u32) -> Arc<RwLock<Patient>> {
        if let Some(patient) = self.patient(patient_id) {
            return patient;
        }

        let mut patients = self.patients.write();
        Arc::clone(patients.entry(patient_id).or_insert_with(|| {
            info!(patient_id, "registered new patient");
            Arc::new(RwLock::new(Patient::new(patient_id)))
        }))
    }
}

impl Clone for PatientStore {
    fn clone(&self) -> Self {
        Self {
            patients: Arc::clone(&self.patients),
        }
    }
}

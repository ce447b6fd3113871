use crate::model::{Medication, MedicationStatus};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// The user's known medications, shared between the caller and the tool router.
#[derive(Debug, Clone, Default)]
pub struct MedicationList {
    inner: Arc<Mutex<Vec<Medication>>>,
}

impl MedicationList {
    pub fn new(mut medications: Vec<Medication>) -> Self {
        for (i, med) in medications.iter_mut().enumerate() {
            if med.id.is_empty() {
                med.id = format!("med-{}", i + 1);
            }
        }
        Self {
            inner: Arc::new(Mutex::new(medications)),
        }
    }

    pub fn snapshot(&self) -> Vec<Medication> {
        match self.inner.lock() {
            Ok(list) => list.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Marks every entry whose name appears in `reported` as taken at `when`.
    ///
    /// Matching is a case-insensitive containment test, so a label read as
    /// "Lisinopril 10mg" matches the entry "Lisinopril". Returns the names of
    /// the entries that were updated.
    pub fn mark_taken(&self, reported: &str, when: DateTime<Utc>) -> Vec<String> {
        let reported = reported.to_lowercase();
        let mut list = match self.inner.lock() {
            Ok(list) => list,
            Err(poisoned) => {
                warn!("Medication list lock poisoned, recovering");
                poisoned.into_inner()
            }
        };

        let mut updated = Vec::new();
        for med in list.iter_mut() {
            let name = med.name.to_lowercase();
            if !name.is_empty() && reported.contains(&name) {
                med.status = MedicationStatus::Taken;
                med.last_taken = Some(when);
                updated.push(med.name.clone());
            }
        }
        debug!("Medication check for '{}' updated {:?}", reported, updated);
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn med(name: &str) -> Medication {
        Medication {
            id: String::new(),
            name: name.to_string(),
            dosage: "10mg".to_string(),
            frequency: "daily".to_string(),
            time_of_day: "Morning".to_string(),
            status: MedicationStatus::Pending,
            last_taken: None,
        }
    }

    #[test]
    fn test_mark_taken_matches_by_containment() {
        let list = MedicationList::new(vec![med("Lisinopril"), med("Metformin")]);
        let now = Utc::now();

        let updated = list.mark_taken("Lisinopril 10mg", now);
        assert_eq!(updated, vec!["Lisinopril".to_string()]);

        let meds = list.snapshot();
        assert_eq!(meds[0].status, MedicationStatus::Taken);
        assert_eq!(meds[0].last_taken, Some(now));
        assert_eq!(meds[1].status, MedicationStatus::Pending);
    }

    #[test]
    fn test_mark_taken_without_match_changes_nothing() {
        let list = MedicationList::new(vec![med("Metformin")]);
        assert!(list.mark_taken("aspirin", Utc::now()).is_empty());
        assert_eq!(list.snapshot()[0].status, MedicationStatus::Pending);
    }

    #[test]
    fn test_ids_are_assigned() {
        let list = MedicationList::new(vec![med("A"), med("B")]);
        let ids: Vec<_> = list.snapshot().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["med-1", "med-2"]);
    }
}

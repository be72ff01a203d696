//! Demo patient records used by the seeded store, the CLI and tests

use crate::patient::{Demographics, LabStatus, MedicationStatus, Patient};
use chrono::NaiveDate;

fn born(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// The three demo admissions, in listing order
#[must_use]
pub fn demo_patients() -> Vec<Patient> {
    vec![
        Patient::new(
            "P001",
            Demographics {
                name: "Eleanor Vance".to_string(),
                date_of_birth: born(1948, 3, 14),
                mrn: "MRN-448120".to_string(),
            },
            "Acute decompensated heart failure",
        )
        .with_notes(
            "Presented with 5 days of worsening dyspnoea and orthopnoea. Diuresed with IV \
             furosemide, net negative 4.2 L. Transitioned to oral diuretic on day 4. \
             Ambulating on room air at discharge.",
        )
        .with_lab("BNP", "1450 pg/mL", LabStatus::Abnormal)
        .with_lab("Creatinine", "1.3 mg/dL", LabStatus::Abnormal)
        .with_lab("Potassium", "4.1 mmol/L", LabStatus::Normal)
        .with_medication("Furosemide", "40 mg", "twice daily", MedicationStatus::Changed)
        .with_medication("Spironolactone", "25 mg", "daily", MedicationStatus::New)
        .with_medication("Metoprolol succinate", "50 mg", "daily", MedicationStatus::Continued),
        Patient::new(
            "P002",
            Demographics {
                name: "Marcus Reyes".to_string(),
                date_of_birth: born(1967, 11, 2),
                mrn: "MRN-530977".to_string(),
            },
            "Community-acquired pneumonia",
        )
        .with_notes(
            "Right lower lobe consolidation on chest film. Febrile to 39.1 C on admission, \
             defervesced after 48 h of ceftriaxone and azithromycin. Oxygen weaned on day 3.",
        )
        .with_lab("WBC", "14.8 x10^9/L", LabStatus::Abnormal)
        .with_lab("Procalcitonin", "0.9 ng/mL", LabStatus::Abnormal)
        .with_lab("Lactate", "1.1 mmol/L", LabStatus::Normal)
        .with_medication("Amoxicillin-clavulanate", "875 mg", "twice daily", MedicationStatus::New)
        .with_medication("Ceftriaxone", "1 g", "daily", MedicationStatus::Discontinued),
        Patient::new(
            "P003",
            Demographics {
                name: "Aisha Karimi".to_string(),
                date_of_birth: born(1995, 6, 21),
                mrn: "MRN-602315".to_string(),
            },
            "Diabetic ketoacidosis",
        )
        .with_notes(
            "Type 1 diabetes with missed insulin doses during a viral illness. Anion gap closed \
             within 18 h on insulin infusion. Transitioned to basal-bolus regimen, seen by \
             diabetes education.",
        )
        .with_lab("Glucose", "512 mg/dL", LabStatus::Critical)
        .with_lab("Bicarbonate", "11 mmol/L", LabStatus::Critical)
        .with_lab("HbA1c", "9.8 %", LabStatus::Abnormal)
        .with_medication("Insulin glargine", "22 units", "nightly", MedicationStatus::Changed)
        .with_medication("Insulin lispro", "1 unit per 10 g carbohydrate", "with meals", MedicationStatus::Continued),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn demo_ids_are_unique() {
        let patients = demo_patients();
        let ids: HashSet<_> = patients.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids.len(), patients.len());
    }

    #[test]
    fn demo_records_are_complete() {
        for patient in demo_patients() {
            assert!(!patient.display_name().is_empty());
            assert!(!patient.clinical_notes.is_empty());
            assert!(!patient.lab_results.is_empty());
            assert!(!patient.medication_changes.is_empty());
        }
    }
}

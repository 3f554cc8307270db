//! Lab record types for sepsis risk prediction.
//!
//! The remote model accepts a fixed set of clinical features (vitals and
//! labs). Anything outside that set never leaves the process.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Feature names accepted by the prediction service, in column order.
pub const FEATURE_NAMES: [&str; 28] = [
    "Age",
    "Gender",
    "HeartRate",
    "Temp",
    "SystolicBP",
    "MeanBP",
    "DiastolicBP",
    "RespRate",
    "OximetrySat",
    "Potassium",
    "Chloride",
    "Calcium",
    "Hemoglobin",
    "pH",
    "BaseExcess",
    "Bicarbonate",
    "FiO2",
    "Glucose",
    "BUN",
    "Creatinine",
    "Magnesium",
    "SGOT",
    "SGPT",
    "TotalBili",
    "WBC",
    "Platelets",
    "PaCO2",
    "Lactate",
];

/// Number of allow-listed features.
pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Name of the body temperature feature (degrees Celsius).
pub const TEMPERATURE_FIELD: &str = "Temp";

/// Position of `name` in [`FEATURE_NAMES`], if it is allow-listed.
#[must_use]
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|&f| f == name)
}

/// A sanitized set of lab values for one patient.
///
/// Only allow-listed features can be stored. Absent features are simply
/// omitted when the record is serialized for the prediction service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabRecord {
    values: [Option<f64>; FEATURE_COUNT],
}

impl LabRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of a feature by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).and_then(|i| self.values[i])
    }

    /// Set a feature value.
    ///
    /// Returns `false` (and stores nothing) when `name` is not allow-listed
    /// or the value is not finite.
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match feature_index(name) {
            Some(i) if value.is_finite() => {
                self.values[i] = Some(value);
                true
            }
            _ => false,
        }
    }

    /// Body temperature, if recorded.
    #[must_use]
    pub fn temperature(&self) -> Option<f64> {
        self.get(TEMPERATURE_FIELD)
    }

    /// Iterate over present features in allow-list order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES
            .iter()
            .zip(self.values.iter())
            .filter_map(|(&name, value)| value.map(|v| (name, v)))
    }

    /// Number of present features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the feature at allow-list position `index` is present.
    #[must_use]
    pub(crate) fn has_index(&self, index: usize) -> bool {
        self.values.get(index).is_some_and(Option::is_some)
    }
}

impl Serialize for LabRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Feature columns present in at least one record, in allow-list order.
#[must_use]
pub fn present_features<'a>(records: impl IntoIterator<Item = &'a LabRecord>) -> Vec<&'static str> {
    let mut present = [false; FEATURE_COUNT];
    for record in records {
        for (i, slot) in present.iter_mut().enumerate() {
            *slot |= record.has_index(i);
        }
    }

    FEATURE_NAMES
        .iter()
        .zip(present)
        .filter_map(|(&name, p)| p.then_some(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_allow_list() {
        assert_eq!(FEATURE_COUNT, 28);
        assert_eq!(feature_index("Age"), Some(0));
        assert_eq!(feature_index("Lactate"), Some(27));
        assert_eq!(feature_index("PatientID"), None);
        // Case matters: the service keys are exact.
        assert_eq!(feature_index("temp"), None);
    }

    #[test]
    fn test_set_rejects_unknown_and_non_finite() {
        let mut record = LabRecord::new();
        assert!(record.set("HeartRate", 97.0));
        assert!(!record.set("Name", 1.0));
        assert!(!record.set("Temp", f64::NAN));
        assert!(!record.set("Temp", f64::INFINITY));

        assert_eq!(record.len(), 1);
        assert_eq!(record.get("HeartRate"), Some(97.0));
        assert_eq!(record.temperature(), None);
    }

    #[test]
    fn test_serializes_present_fields_in_order() {
        let mut record = LabRecord::new();
        record.set("Temp", 36.6);
        record.set("Age", 71.0);

        let json = serde_json::to_string(&record).expect("Should serialize");
        assert_eq!(json, r#"{"Age":71.0,"Temp":36.6}"#);
    }

    #[test]
    fn test_present_features_union() {
        let mut a = LabRecord::new();
        a.set("Lactate", 2.1);
        let mut b = LabRecord::new();
        b.set("Age", 40.0);
        b.set("Temp", 37.0);

        assert_eq!(present_features([&a, &b]), vec!["Age", "Temp", "Lactate"]);
        assert!(present_features(std::iter::empty::<&LabRecord>()).is_empty());
    }
}

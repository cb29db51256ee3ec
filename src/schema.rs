//! The fixed MRN field schema.
//!
//! A Meter Replacement Notice always yields the same thirteen fields, in the
//! same order. [`MRN_FIELDS`] is the single list the prompt is built from and
//! [`MrnRecord`] is the only shape a successful extraction can take, so a
//! field can never be silently added or dropped on one side only.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names in declaration order.
pub const MRN_FIELDS: [&str; 13] = [
    "sub_division",
    "feeder_name",
    "consumer_name",
    "consumer_address",
    "consumer_account_no",
    "date_of_installation",
    "old_meter_no",
    "old_meter_reading",
    "old_meter_make",
    "new_meter_no",
    "new_meter_reading",
    "new_meter_make",
    "consumer_category",
];

/// Name of the field the normaliser repairs.
pub const SUB_DIVISION: &str = "sub_division";

/// A successfully extracted notice.
///
/// Every field is a string; an empty string means the field was not present
/// on the document. Serialises to a JSON object whose keys follow
/// [`MRN_FIELDS`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MrnRecord {
    pub sub_division: String,
    pub feeder_name: String,
    pub consumer_name: String,
    pub consumer_address: String,
    pub consumer_account_no: String,
    pub date_of_installation: String,
    pub old_meter_no: String,
    pub old_meter_reading: String,
    pub old_meter_make: String,
    pub new_meter_no: String,
    pub new_meter_reading: String,
    pub new_meter_make: String,
    pub consumer_category: String,
}

impl MrnRecord {
    /// Look up a field by its schema name.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields()
            .into_iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    /// All `(name, value)` pairs in schema order.
    pub fn fields(&self) -> [(&'static str, &str); 13] {
        [
            ("sub_division", self.sub_division.as_str()),
            ("feeder_name", self.feeder_name.as_str()),
            ("consumer_name", self.consumer_name.as_str()),
            ("consumer_address", self.consumer_address.as_str()),
            ("consumer_account_no", self.consumer_account_no.as_str()),
            ("date_of_installation", self.date_of_installation.as_str()),
            ("old_meter_no", self.old_meter_no.as_str()),
            ("old_meter_reading", self.old_meter_reading.as_str()),
            ("old_meter_make", self.old_meter_make.as_str()),
            ("new_meter_no", self.new_meter_no.as_str()),
            ("new_meter_reading", self.new_meter_reading.as_str()),
            ("new_meter_make", self.new_meter_make.as_str()),
            ("consumer_category", self.consumer_category.as_str()),
        ]
    }

    fn field_mut(&mut self, field: &str) -> Option<&mut String> {
        let slot = match field {
            "sub_division" => &mut self.sub_division,
            "feeder_name" => &mut self.feeder_name,
            "consumer_name" => &mut self.consumer_name,
            "consumer_address" => &mut self.consumer_address,
            "consumer_account_no" => &mut self.consumer_account_no,
            "date_of_installation" => &mut self.date_of_installation,
            "old_meter_no" => &mut self.old_meter_no,
            "old_meter_reading" => &mut self.old_meter_reading,
            "old_meter_make" => &mut self.old_meter_make,
            "new_meter_no" => &mut self.new_meter_no,
            "new_meter_reading" => &mut self.new_meter_reading,
            "new_meter_make" => &mut self.new_meter_make,
            "consumer_category" => &mut self.consumer_category,
            _ => return None,
        };
        Some(slot)
    }

    /// Build a record from a parsed model response.
    ///
    /// Schema fields missing from `object` stay empty; keys outside the
    /// schema are ignored. Non-string values are coerced with
    /// [`value_to_field`].
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut record = Self::default();
        for (key, value) in object {
            if let Some(slot) = record.field_mut(key) {
                *slot = value_to_field(value);
            }
        }
        record
    }
}

/// Render a JSON value as a field string.
///
/// `null` becomes empty, strings are taken verbatim, anything else uses its
/// compact JSON text (so a numeric `121336` still reads as `"121336"`).
pub fn value_to_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

//! Shipping form input and field-scoped validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use traft_core::{PhoneNumber, Pincode};

/// Raw shipping form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingForm {
    pub customer_name: String,
    pub phone_number: String,
    pub alternate_phone: String,
    pub instagram_id: String,
    pub address: String,
    pub district: String,
    pub state: String,
    pub pincode: String,
    pub landmark: String,
}

/// A form field that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    CustomerName,
    PhoneNumber,
    AlternatePhone,
    Address,
    District,
    State,
    Pincode,
}

impl Field {
    /// The field's form name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerName => "customerName",
            Self::PhoneNumber => "phoneNumber",
            Self::AlternatePhone => "alternatePhone",
            Self::Address => "address",
            Self::District => "district",
            Self::State => "state",
            Self::Pincode => "pincode",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field validation messages, rendered next to each offending input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<Field, String>,
}

impl ValidationErrors {
    /// Message for a field, if it failed.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Returns `true` if no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Failing fields in form order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.fields.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    fn add(&mut self, field: Field, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, msg)| format!("{field}: {msg}"))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validated shipping details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub customer_name: String,
    pub phone_number: PhoneNumber,
    pub alternate_phone: Option<PhoneNumber>,
    pub instagram_id: Option<String>,
    pub address: String,
    pub district: String,
    pub state: String,
    pub pincode: Pincode,
    pub landmark: Option<String>,
}

impl ShippingForm {
    /// Validate every field, collecting all failures at once.
    ///
    /// # Errors
    ///
    /// Returns the failing fields if any mandatory field is missing or any
    /// phone number or the pincode is malformed.
    pub fn validate(&self) -> Result<ShippingDetails, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let customer_name = required(&mut errors, Field::CustomerName, &self.customer_name, "Name");
        let address = required(&mut errors, Field::Address, &self.address, "Address");
        let district = required(&mut errors, Field::District, &self.district, "District");
        let state = required(&mut errors, Field::State, &self.state, "State");

        let phone_number = PhoneNumber::parse(&self.phone_number)
            .map_err(|e| errors.add(Field::PhoneNumber, capitalize(&e.to_string())))
            .ok();

        let alternate_phone = match optional(&self.alternate_phone) {
            None => None,
            Some(raw) => PhoneNumber::parse(&raw)
                .map_err(|e| errors.add(Field::AlternatePhone, capitalize(&e.to_string())))
                .ok(),
        };

        let pincode = Pincode::parse(&self.pincode)
            .map_err(|e| errors.add(Field::Pincode, capitalize(&e.to_string())))
            .ok();

        match (phone_number, pincode) {
            (Some(phone_number), Some(pincode)) if errors.is_empty() => Ok(ShippingDetails {
                customer_name,
                phone_number,
                alternate_phone,
                instagram_id: optional(&self.instagram_id)
                    .map(|handle| handle.trim_start_matches('@').to_owned()),
                address,
                district,
                state,
                pincode,
                landmark: optional(&self.landmark),
            }),
            _ => Err(errors),
        }
    }
}

impl From<&ShippingDetails> for ShippingForm {
    fn from(details: &ShippingDetails) -> Self {
        Self {
            customer_name: details.customer_name.clone(),
            phone_number: details.phone_number.to_string(),
            alternate_phone: details
                .alternate_phone
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            instagram_id: details.instagram_id.clone().unwrap_or_default(),
            address: details.address.clone(),
            district: details.district.clone(),
            state: details.state.clone(),
            pincode: details.pincode.to_string(),
            landmark: details.landmark.clone().unwrap_or_default(),
        }
    }
}

fn required(errors: &mut ValidationErrors, field: Field, value: &str, label: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, format!("{label} is required"));
    }
    trimmed.to_owned()
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

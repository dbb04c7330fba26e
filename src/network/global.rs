//! Network-wide constraints
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The name of the transmission expansion limit, removed when investment is allowed
pub const LV_LIMIT: &str = "lv_limit";

/// The kind of a global constraint
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum GlobalConstraintType {
    /// Limits total transmission volume (capacity times length) of expandable carriers
    #[string = "transmission_volume_expansion_limit"]
    TransmissionVolumeExpansionLimit,
    /// Limits total primary energy use weighted by a carrier attribute (e.g. CO2 emissions)
    #[string = "primary_energy"]
    PrimaryEnergy,
}

/// The sense of a linear constraint
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum ConstraintSense {
    /// Left-hand side at most right-hand side
    #[string = "<="]
    LessOrEqual,
    /// Left-hand side at least right-hand side
    #[string = ">="]
    GreaterOrEqual,
    /// Left-hand side equal to right-hand side
    #[string = "=="]
    Equal,
}

impl ConstraintSense {
    /// The (lower, upper) bounds of a row with this sense and the given right-hand side
    pub fn row_bounds(self, rhs: f64) -> (f64, f64) {
        match self {
            Self::LessOrEqual => (f64::NEG_INFINITY, rhs),
            Self::GreaterOrEqual => (rhs, f64::INFINITY),
            Self::Equal => (rhs, rhs),
        }
    }
}

/// A constraint spanning the whole network
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConstraint {
    /// Name of the constraint
    pub name: String,
    /// The kind of constraint
    pub kind: GlobalConstraintType,
    /// The sense of the constraint
    pub sense: ConstraintSense,
    /// The right-hand side
    pub constant: f64,
    /// Carrier attribute the constraint applies to (e.g. `co2_emissions`, or `AC, DC` for
    /// transmission limits)
    pub carrier_attribute: String,
}

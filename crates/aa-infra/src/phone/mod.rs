//! Phone number utilities backed by a static dial plan.

mod dial_plan;

pub use dial_plan::{country_calling_code, DialPlanPhoneNumbers};

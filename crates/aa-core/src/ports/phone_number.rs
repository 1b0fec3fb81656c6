/// Phone number utilities.
pub trait PhoneNumberPort: Send + Sync {
    /// Country calling code of an E.164 number, without the leading `+`.
    fn prefix_from_e164(&self, e164: &str) -> Option<String>;
}

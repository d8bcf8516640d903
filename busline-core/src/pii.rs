use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps passenger data so that `Debug`/`Display` (and therefore `tracing` fields)
/// never print the value. Serialization still emits the real value because API
/// responses and stored records need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl From<&str> for Masked<String> {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_value_in_debug() {
        let name = Masked::from("Asha Rao");
        assert_eq!(format!("{:?}", name), "********");
        assert_eq!(name.to_string(), "********");
        assert_eq!(name.expose(), "Asha Rao");
    }

    #[test]
    fn test_masked_serializes_real_value() {
        let name = Masked::from("Asha Rao");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"Asha Rao\"");

        let back: Masked<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}

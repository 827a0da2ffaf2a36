//! The versioned record contract.

use kvmirror_protocol::ETag;

/// Capability implemented by every concrete record payload type.
///
/// The synchronizer never inspects payloads itself; it parses incoming JSON
/// through this trait and asks payloads for a comparison value to decide
/// whether a change notification should fire.
pub trait PayloadCodec: Sized + Clone + Send + Sync + 'static {
    /// Parses a payload from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message when the JSON does not describe a
    /// valid payload. The caller maps this to a per-item `parse_error`.
    fn parse(value: &serde_json::Value) -> Result<Self, String>;

    /// Derives the string deciding whether a record "changed".
    ///
    /// The default is the key itself, so every applied write to a key counts
    /// as a change. Payload types can override this to suppress
    /// notifications for writes that do not alter the value they care about.
    fn comparison_value(&self, key: &str) -> String {
        key.to_owned()
    }
}

/// A single mirrored row: key, authority-issued tag, and parsed payload.
///
/// Records are immutable once stored. A change is modeled as delete-old +
/// insert-new-with-new-tag; the store never mutates a row in place.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedRecord<P> {
    /// Unique record key.
    pub key: String,
    /// Authority-issued version tag.
    pub e_tag: ETag,
    /// Parsed application payload.
    pub payload: P,
}

impl<P: PayloadCodec> VersionedRecord<P> {
    /// Creates a new record.
    pub fn new(key: impl Into<String>, e_tag: ETag, payload: P) -> Self {
        Self {
            key: key.into(),
            e_tag,
            payload,
        }
    }

    /// The derived comparison string for this record.
    pub fn comparison_value(&self) -> String {
        self.payload.comparison_value(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Plain;

    impl PayloadCodec for Plain {
        fn parse(_value: &serde_json::Value) -> Result<Self, String> {
            Ok(Plain)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Named(String);

    impl PayloadCodec for Named {
        fn parse(value: &serde_json::Value) -> Result<Self, String> {
            value
                .get("name")
                .and_then(|v| v.as_str())
                .map(|s| Named(s.to_owned()))
                .ok_or_else(|| "missing name".to_owned())
        }

        fn comparison_value(&self, _key: &str) -> String {
            self.0.clone()
        }
    }

    #[test]
    fn default_comparison_value_is_the_key() {
        let record = VersionedRecord::new("lot/1", 3, Plain);
        assert_eq!(record.comparison_value(), "lot/1");
    }

    #[test]
    fn overridden_comparison_value() {
        let payload = Named::parse(&serde_json::json!({"name": "west gate"})).unwrap();
        let record = VersionedRecord::new("gate/1", 1, payload);
        assert_eq!(record.comparison_value(), "west gate");
    }

    #[test]
    fn parse_failure_carries_a_message() {
        let err = Named::parse(&serde_json::json!({})).unwrap_err();
        assert_eq!(err, "missing name");
    }
}

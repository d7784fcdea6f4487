//! Default policy for optional inbound fields.
//!
//! Every place the normalizer substitutes a value for an absent field goes
//! through [`OrDefaultAt`], so the full list of defaulted fields can be found
//! by searching for `or_default_at`. Fields that must stay *absent* when the
//! source omits them (such as a list reply's `description`) never go through
//! here.

use tracing::trace;

pub(crate) trait OrDefaultAt<T> {
    /// Returns the value, or `T::default()` (empty string, zero, `false`) when
    /// it is absent. `path` names the source field for tracing.
    fn or_default_at(self, path: &str) -> T;
}

impl<T: Default> OrDefaultAt<T> for Option<T> {
    #[inline]
    fn or_default_at(self, path: &str) -> T {
        self.unwrap_or_else(|| {
            trace!(field = path, "absent field defaulted");
            T::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_present_values() {
        assert_eq!(Some("Danish".to_owned()).or_default_at("profile.name"), "Danish");
        assert!(Some(true).or_default_at("pricing.billable"));
    }

    #[test]
    fn substitutes_empty_values() {
        assert_eq!(None::<String>.or_default_at("location.name"), "");
        assert_eq!(None::<i64>.or_default_at("conversation.expiration_timestamp"), 0);
        assert!(!None::<bool>.or_default_at("pricing.billable"));
    }
}

//! # Permission records
//!
//! Stored grants and the filters used to look them up.
//! A grant ties a user to one document instance (`allow` + `for_value`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The `(user, allow, for_value)` triple a set of grants belongs to.
///
/// # Example
///
/// ```
/// use platform_user_permission::PermissionTarget;
///
/// let target = PermissionTarget::new("jane@example.com", "Company", "Acme");
/// assert_eq!(target.to_string(), "jane@example.com:Company:Acme");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PermissionTarget {
    /// User the grant is for.
    pub user: String,
    /// Document type of the granted instance (e.g. "User").
    pub allow: String,
    /// Identifier of the granted instance.
    pub for_value: String,
}

impl PermissionTarget {
    /// Create a new target.
    pub fn new(
        user: impl Into<String>,
        allow: impl Into<String>,
        for_value: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            allow: allow.into(),
            for_value: for_value.into(),
        }
    }

    /// Filter matching every grant for this target, regardless of mode.
    pub fn filter(&self) -> PermissionFilter {
        PermissionFilter::new()
            .user(&self.user)
            .allow(&self.allow)
            .for_value(&self.for_value)
    }

    /// Filter matching the apply-to-all grant for this target.
    pub fn apply_to_all_filter(&self) -> PermissionFilter {
        self.filter().apply_to_all(true)
    }

    /// Filter matching the applicable grants for this target.
    pub fn applicable_filter(&self) -> PermissionFilter {
        self.filter().apply_to_all(false)
    }
}

impl fmt::Display for PermissionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.user, self.allow, self.for_value)
    }
}

/// One stored user permission.
///
/// A record is either an apply-to-all grant (`applicable_for` is `None`) or a
/// grant restricted to a single applicable doctype.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionRecord {
    /// Unique record name.
    pub name: String,
    /// User the grant is for.
    pub user: String,
    /// Document type of the granted instance.
    pub allow: String,
    /// Identifier of the granted instance.
    pub for_value: String,
    /// Whether the grant applies to every doctype linking to `allow`.
    pub apply_to_all_doctypes: bool,
    /// The single doctype this grant applies to, when not apply-to-all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicable_for: Option<String>,
    /// Use `for_value` as the user's default for `allow`.
    #[serde(default)]
    pub is_default: bool,
    /// Do not extend the grant to descendants in tree doctypes.
    #[serde(default)]
    pub hide_descendants: bool,
    /// When the record was inserted.
    pub created_at: DateTime<Utc>,
}

impl PermissionRecord {
    /// Create an apply-to-all grant for a target.
    ///
    /// # Example
    ///
    /// ```
    /// use platform_user_permission::{PermissionRecord, PermissionTarget};
    ///
    /// let target = PermissionTarget::new("jane@example.com", "User", "jane@example.com");
    /// let record = PermissionRecord::apply_to_all(&target);
    /// assert!(record.apply_to_all_doctypes);
    /// assert!(record.applicable_for.is_none());
    /// ```
    pub fn apply_to_all(target: &PermissionTarget) -> Self {
        Self::build(target, true, None)
    }

    /// Create a grant restricted to one applicable doctype.
    pub fn applicable(target: &PermissionTarget, applicable_for: impl Into<String>) -> Self {
        Self::build(target, false, Some(applicable_for.into()))
    }

    fn build(target: &PermissionTarget, apply_to_all: bool, applicable_for: Option<String>) -> Self {
        Self {
            name: Uuid::now_v7().to_string(),
            user: target.user.clone(),
            allow: target.allow.clone(),
            for_value: target.for_value.clone(),
            apply_to_all_doctypes: apply_to_all,
            applicable_for,
            is_default: false,
            hide_descendants: false,
            created_at: Utc::now(),
        }
    }

    /// Mark this grant as the user's default for its doctype.
    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    /// Set whether descendants of a tree node are excluded.
    pub fn with_hide_descendants(mut self, hide: bool) -> Self {
        self.hide_descendants = hide;
        self
    }

    /// The target this record belongs to.
    pub fn target(&self) -> PermissionTarget {
        PermissionTarget::new(&self.user, &self.allow, &self.for_value)
    }

    /// Check whether two records describe the same grant.
    ///
    /// Record name, flags and timestamps are ignored.
    pub fn same_grant(&self, other: &PermissionRecord) -> bool {
        self.user == other.user
            && self.allow == other.allow
            && self.for_value == other.for_value
            && self.apply_to_all_doctypes == other.apply_to_all_doctypes
            && self.applicable_for == other.applicable_for
    }
}

/// Conjunctive filter over record fields. Unset fields match anything.
///
/// # Example
///
/// ```
/// use platform_user_permission::{PermissionFilter, PermissionRecord, PermissionTarget};
///
/// let target = PermissionTarget::new("jane@example.com", "User", "jane@example.com");
/// let record = PermissionRecord::applicable(&target, "Chat Room");
///
/// assert!(target.filter().matches(&record));
/// assert!(!target.apply_to_all_filter().matches(&record));
/// assert!(PermissionFilter::new().applicable_for("Chat Room").matches(&record));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_to_all_doctypes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicable_for: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

impl PermissionFilter {
    /// Create an empty filter that matches every record.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn allow(mut self, allow: impl Into<String>) -> Self {
        self.allow = Some(allow.into());
        self
    }

    pub fn for_value(mut self, for_value: impl Into<String>) -> Self {
        self.for_value = Some(for_value.into());
        self
    }

    pub fn apply_to_all(mut self, apply_to_all: bool) -> Self {
        self.apply_to_all_doctypes = Some(apply_to_all);
        self
    }

    pub fn applicable_for(mut self, doctype: impl Into<String>) -> Self {
        self.applicable_for = Some(doctype.into());
        self
    }

    pub fn is_default(mut self, is_default: bool) -> Self {
        self.is_default = Some(is_default);
        self
    }

    /// Check whether a record satisfies every set field of this filter.
    pub fn matches(&self, record: &PermissionRecord) -> bool {
        fn eq<T: PartialEq + ?Sized>(want: Option<&T>, have: &T) -> bool {
            want.map_or(true, |w| w == have)
        }

        eq(self.user.as_deref(), record.user.as_str())
            && eq(self.allow.as_deref(), record.allow.as_str())
            && eq(self.for_value.as_deref(), record.for_value.as_str())
            && eq(self.apply_to_all_doctypes.as_ref(), &record.apply_to_all_doctypes)
            && eq(self.is_default.as_ref(), &record.is_default)
            && match &self.applicable_for {
                None => true,
                Some(doctype) => record.applicable_for.as_deref() == Some(doctype.as_str()),
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> PermissionTarget {
        PermissionTarget::new("test@example.com", "User", "test@example.com")
    }

    #[test]
    fn test_record_modes() {
        let all = PermissionRecord::apply_to_all(&target());
        assert!(all.apply_to_all_doctypes);
        assert_eq!(all.applicable_for, None);

        let some = PermissionRecord::applicable(&target(), "Chat Room");
        assert!(!some.apply_to_all_doctypes);
        assert_eq!(some.applicable_for.as_deref(), Some("Chat Room"));
        assert_eq!(some.target(), target());
    }

    #[test]
    fn test_record_names_are_unique() {
        let a = PermissionRecord::apply_to_all(&target());
        let b = PermissionRecord::apply_to_all(&target());
        assert_ne!(a.name, b.name);
        assert!(a.same_grant(&b));
    }

    #[test]
    fn test_same_grant_ignores_flags() {
        let a = PermissionRecord::applicable(&target(), "Chat Room");
        let b = PermissionRecord::applicable(&target(), "Chat Room").with_default(true);
        let c = PermissionRecord::applicable(&target(), "Chat Message");
        assert!(a.same_grant(&b));
        assert!(!a.same_grant(&c));
    }

    #[test]
    fn test_filter_matching() {
        let all = PermissionRecord::apply_to_all(&target());
        let room = PermissionRecord::applicable(&target(), "Chat Room");

        assert!(PermissionFilter::new().matches(&all));
        assert!(target().apply_to_all_filter().matches(&all));
        assert!(!target().apply_to_all_filter().matches(&room));
        assert!(target().applicable_filter().matches(&room));

        let by_doctype = target().filter().applicable_for("Chat Room");
        assert!(by_doctype.matches(&room));
        assert!(!by_doctype.matches(&all));

        let other_user = PermissionFilter::new().user("someone@example.com");
        assert!(!other_user.matches(&room));
    }

    #[test]
    fn test_record_serialization_skips_empty_applicable() {
        let all = PermissionRecord::apply_to_all(&target());
        let json = serde_json::to_value(&all).unwrap();
        assert!(json.get("applicable_for").is_none());
        assert_eq!(json["apply_to_all_doctypes"], true);

        let back: PermissionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, all);
    }
}

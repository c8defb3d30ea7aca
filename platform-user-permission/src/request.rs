//! Reconciliation requests
//!
//! A [`ReconcileRequest`] names a target and the scope the stored grants
//! should have once reconciled. Untyped payloads (the JSON mapping form used
//! by HTTP handlers) are parsed through [`RawReconcileRequest`].

use serde::{Deserialize, Serialize};

use crate::error::{UserPermissionError, UserPermissionResult};
use crate::record::PermissionTarget;

/// Which doctypes a grant applies to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "mode", content = "doctypes")]
pub enum PermissionScope {
    /// Applies to every doctype linking to the target.
    ApplyToAll,
    /// Applies only to the listed doctypes, in request order.
    Applicable(Vec<String>),
}

impl PermissionScope {
    /// Build an applicable scope from any list of doctype names.
    pub fn applicable<I, S>(doctypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PermissionScope::Applicable(doctypes.into_iter().map(Into::into).collect())
    }

    /// Check if this is the apply-to-all scope.
    pub fn is_apply_to_all(&self) -> bool {
        matches!(self, PermissionScope::ApplyToAll)
    }

    /// The requested doctypes with duplicates removed, first occurrence wins.
    ///
    /// Empty for [`PermissionScope::ApplyToAll`].
    pub fn doctypes(&self) -> Vec<&str> {
        match self {
            PermissionScope::ApplyToAll => Vec::new(),
            PermissionScope::Applicable(list) => {
                let mut seen = Vec::with_capacity(list.len());
                for doctype in list {
                    if !seen.contains(&doctype.as_str()) {
                        seen.push(doctype.as_str());
                    }
                }
                seen
            }
        }
    }
}

/// A typed request to reconcile the grants of one target.
///
/// # Example
///
/// ```
/// use platform_user_permission::{PermissionScope, ReconcileRequest};
///
/// let request = ReconcileRequest::new(
///     "jane@example.com",
///     "User",
///     "jane@example.com",
///     PermissionScope::applicable(["Chat Room", "Chat Message"]),
/// );
/// assert!(!request.scope.is_apply_to_all());
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileRequest {
    /// The grants' owner and instance.
    pub target: PermissionTarget,
    /// Requested scope.
    pub scope: PermissionScope,
    /// Copied onto every inserted record.
    #[serde(default)]
    pub is_default: bool,
    /// Copied onto every inserted record.
    #[serde(default)]
    pub hide_descendants: bool,
}

impl ReconcileRequest {
    /// Create a request for `user` on the `doctype` instance `docname`.
    pub fn new(
        user: impl Into<String>,
        doctype: impl Into<String>,
        docname: impl Into<String>,
        scope: PermissionScope,
    ) -> Self {
        Self {
            target: PermissionTarget::new(user, doctype, docname),
            scope,
            is_default: false,
            hide_descendants: false,
        }
    }

    /// Shorthand for an apply-to-all request.
    pub fn apply_to_all(
        user: impl Into<String>,
        doctype: impl Into<String>,
        docname: impl Into<String>,
    ) -> Self {
        Self::new(user, doctype, docname, PermissionScope::ApplyToAll)
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn with_hide_descendants(mut self, hide: bool) -> Self {
        self.hide_descendants = hide;
        self
    }

    /// Parse the untyped JSON mapping form.
    ///
    /// # Example
    ///
    /// ```
    /// use platform_user_permission::ReconcileRequest;
    ///
    /// let request = ReconcileRequest::from_json_str(
    ///     r#"{"user": "jane@example.com", "doctype": "User",
    ///         "docname": "jane@example.com", "apply_to_all_doctypes": 1,
    ///         "applicable_doctypes": []}"#,
    /// ).unwrap();
    /// assert!(request.scope.is_apply_to_all());
    /// ```
    pub fn from_json_str(payload: &str) -> UserPermissionResult<Self> {
        let raw: RawReconcileRequest = serde_json::from_str(payload)?;
        raw.try_into()
    }

    /// Parse an already-decoded JSON value.
    pub fn from_json_value(payload: serde_json::Value) -> UserPermissionResult<Self> {
        let raw: RawReconcileRequest = serde_json::from_value(payload)?;
        raw.try_into()
    }

    /// Reject requests with an empty user, doctype or docname.
    pub fn validate(&self) -> UserPermissionResult<()> {
        let fields = [
            ("user", &self.target.user),
            ("doctype", &self.target.allow),
            ("docname", &self.target.for_value),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(UserPermissionError::InvalidRequest(format!(
                    "{} is required",
                    field
                )));
            }
        }
        if let PermissionScope::Applicable(list) = &self.scope {
            if list.iter().any(|d| d.trim().is_empty()) {
                return Err(UserPermissionError::InvalidRequest(
                    "applicable doctype names must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Flag that accepts either a JSON boolean or a 0/1 integer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    pub fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

/// The untyped mapping form of a request.
///
/// When `apply_to_all_doctypes` is set the applicable list is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawReconcileRequest {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub doctype: String,
    #[serde(default)]
    pub docname: String,
    #[serde(default)]
    pub apply_to_all_doctypes: Option<Flag>,
    #[serde(default)]
    pub applicable_doctypes: Vec<String>,
    #[serde(default)]
    pub is_default: Option<Flag>,
    #[serde(default)]
    pub hide_descendants: Option<Flag>,
}

impl TryFrom<RawReconcileRequest> for ReconcileRequest {
    type Error = UserPermissionError;

    fn try_from(raw: RawReconcileRequest) -> Result<Self, Self::Error> {
        let apply_to_all = raw.apply_to_all_doctypes.is_some_and(Flag::is_set);
        let scope = if apply_to_all {
            PermissionScope::ApplyToAll
        } else {
            PermissionScope::Applicable(raw.applicable_doctypes)
        };

        let request = ReconcileRequest::new(raw.user, raw.doctype, raw.docname, scope)
            .with_default(raw.is_default.is_some_and(Flag::is_set))
            .with_hide_descendants(raw.hide_descendants.is_some_and(Flag::is_set));
        request.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_apply_to_all_int_flag() {
        let request = ReconcileRequest::from_json_value(json!({
            "user": "test@example.com",
            "doctype": "User",
            "docname": "test@example.com",
            "apply_to_all_doctypes": 1,
            "applicable_doctypes": ["Chat Room"],
        }))
        .unwrap();

        assert_eq!(request.scope, PermissionScope::ApplyToAll);
        assert_eq!(request.target.allow, "User");
    }

    #[test]
    fn test_parse_applicable_list() {
        let request = ReconcileRequest::from_json_value(json!({
            "user": "test@example.com",
            "doctype": "User",
            "docname": "test@example.com",
            "apply_to_all_doctypes": false,
            "applicable_doctypes": ["Chat Room", "Chat Message"],
            "is_default": 1,
        }))
        .unwrap();

        assert_eq!(
            request.scope,
            PermissionScope::applicable(["Chat Room", "Chat Message"])
        );
        assert!(request.is_default);
        assert!(!request.hide_descendants);
    }

    #[test]
    fn test_missing_flag_means_applicable() {
        let request = ReconcileRequest::from_json_value(json!({
            "user": "test@example.com",
            "doctype": "User",
            "docname": "test@example.com",
        }))
        .unwrap();
        assert_eq!(request.scope, PermissionScope::Applicable(vec![]));
    }

    #[test]
    fn test_rejects_missing_user() {
        let err = ReconcileRequest::from_json_value(json!({
            "doctype": "User",
            "docname": "test@example.com",
            "apply_to_all_doctypes": 1,
        }))
        .unwrap_err();
        assert!(matches!(err, UserPermissionError::InvalidRequest(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = ReconcileRequest::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, UserPermissionError::Parse(_)));
    }

    #[test]
    fn test_doctypes_deduplicates_in_order() {
        let scope = PermissionScope::applicable(["B", "A", "B", "C", "A"]);
        assert_eq!(scope.doctypes(), vec!["B", "A", "C"]);
        assert!(PermissionScope::ApplyToAll.doctypes().is_empty());
    }

    #[test]
    fn test_rejects_blank_doctype_name() {
        let request = ReconcileRequest::new(
            "test@example.com",
            "User",
            "test@example.com",
            PermissionScope::applicable(["Chat Room", " "]),
        );
        assert!(request.validate().is_err());
    }
}

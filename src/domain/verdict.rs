use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Allow/deny reading of a decision, used only when enforcement is enabled.
///
/// The pass-through endpoint never looks at the decision; this is the
/// optional step that turns it into an access outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Allow,
    Deny,
    /// The decision had no recognizable allow flag
    Indeterminate,
}

impl Verdict {
    /// Interpret an engine decision document.
    ///
    /// Recognized shapes: `{"result": bool}` and `{"result": {"allow": bool}}`.
    pub fn from_decision(decision: &Value) -> Self {
        let result = match decision.get("result") {
            Some(r) => r,
            None => return Verdict::Indeterminate,
        };

        let allowed = match result {
            Value::Bool(b) => Some(*b),
            Value::Object(obj) => obj.get("allow").and_then(Value::as_bool),
            _ => None,
        };

        match allowed {
            Some(true) => Verdict::Allow,
            Some(false) => Verdict::Deny,
            None => Verdict::Indeterminate,
        }
    }

    /// Only an explicit allow lets a request through.
    #[inline]
    pub fn is_allowed(&self) -> bool {
        *self == Verdict::Allow
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allow => write!(f, "ALLOW"),
            Verdict::Deny => write!(f, "DENY"),
            Verdict::Indeterminate => write!(f, "INDETERMINATE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_result() {
        assert_eq!(Verdict::from_decision(&json!({"result": true})), Verdict::Allow);
        assert_eq!(Verdict::from_decision(&json!({"result": false})), Verdict::Deny);
    }

    #[test]
    fn test_allow_field() {
        let decision = json!({"result": {"allow": false, "reason": "no"}, "decision_id": "d1"});
        assert_eq!(Verdict::from_decision(&decision), Verdict::Deny);

        let decision = json!({"result": {"allow": true}});
        assert!(Verdict::from_decision(&decision).is_allowed());
    }

    #[test]
    fn test_indeterminate() {
        assert_eq!(Verdict::from_decision(&json!({})), Verdict::Indeterminate);
        assert_eq!(Verdict::from_decision(&json!({"result": "yes"})), Verdict::Indeterminate);
        assert_eq!(
            Verdict::from_decision(&json!({"result": {"allow": "true"}})),
            Verdict::Indeterminate
        );
        assert!(!Verdict::Indeterminate.is_allowed());
    }
}

//! Structural validation for plan documents.
//!
//! The shape is fixed: required fields and type checks only, plus one
//! pattern constraint on `creationDate`. Validation is pure and never
//! touches the store.
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// One validation failure, pointing at the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validator for the fixed plan document shape. Stateless once built;
/// a single instance is shared across all requests.
pub struct SchemaValidator {
    creation_date: Regex,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self {
            creation_date: Regex::new(r"^\d{2}-\d{2}-\d{4}$")
                .expect("creation date pattern is a valid regex"),
        }
    }

    /// Check `document` against the plan schema. An empty list means valid.
    pub fn validate(&self, document: &Value) -> Vec<FieldError> {
        let mut errors = Vec::new();

        let Some(root) = document.as_object() else {
            errors.push(FieldError::new("", "document must be a JSON object"));
            return errors;
        };

        for field in ["_org", "objectId", "objectType", "planType"] {
            require_string(root, "", field, &mut errors);
        }

        match root.get("creationDate") {
            Some(Value::String(date)) => {
                if !self.creation_date.is_match(date) {
                    errors.push(FieldError::new(
                        "/creationDate",
                        "must match pattern ^\\d{2}-\\d{2}-\\d{4}$",
                    ));
                }
            }
            Some(_) => errors.push(FieldError::new("/creationDate", "must be a string")),
            None => errors.push(FieldError::new("/creationDate", "required field is missing")),
        }

        match root.get("planCostShares") {
            Some(value) => check_cost_shares(value, "/planCostShares", &mut errors),
            None => errors.push(FieldError::new(
                "/planCostShares",
                "required field is missing",
            )),
        }

        match root.get("linkedPlanServices") {
            Some(Value::Array(services)) => {
                for (index, service) in services.iter().enumerate() {
                    check_plan_service(service, &format!("/linkedPlanServices/{index}"), &mut errors);
                }
            }
            Some(_) => errors.push(FieldError::new("/linkedPlanServices", "must be an array")),
            None => errors.push(FieldError::new(
                "/linkedPlanServices",
                "required field is missing",
            )),
        }

        errors
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Cost-share shape, used both at the top level and inside each linked
/// plan service.
fn check_cost_shares(value: &Value, path: &str, errors: &mut Vec<FieldError>) {
    let Some(fields) = value.as_object() else {
        errors.push(FieldError::new(path, "must be an object"));
        return;
    };
    require_number(fields, path, "deductible", errors);
    require_number(fields, path, "copay", errors);
    for field in ["_org", "objectId", "objectType"] {
        require_string(fields, path, field, errors);
    }
}

fn check_plan_service(value: &Value, path: &str, errors: &mut Vec<FieldError>) {
    let Some(fields) = value.as_object() else {
        errors.push(FieldError::new(path, "must be an object"));
        return;
    };

    let linked_path = format!("{path}/linkedService");
    match fields.get("linkedService") {
        Some(Value::Object(linked)) => {
            for field in ["_org", "objectId", "objectType", "name"] {
                require_string(linked, &linked_path, field, errors);
            }
        }
        Some(_) => errors.push(FieldError::new(linked_path, "must be an object")),
        None => errors.push(FieldError::new(linked_path, "required field is missing")),
    }

    let shares_path = format!("{path}/planserviceCostShares");
    match fields.get("planserviceCostShares") {
        Some(shares) => check_cost_shares(shares, &shares_path, errors),
        None => errors.push(FieldError::new(shares_path, "required field is missing")),
    }
}

fn require_string(fields: &Map<String, Value>, at: &str, name: &str, errors: &mut Vec<FieldError>) {
    match fields.get(name) {
        Some(Value::String(_)) => {}
        Some(_) => errors.push(FieldError::new(format!("{at}/{name}"), "must be a string")),
        None => errors.push(FieldError::new(
            format!("{at}/{name}"),
            "required field is missing",
        )),
    }
}

fn require_number(fields: &Map<String, Value>, at: &str, name: &str, errors: &mut Vec<FieldError>) {
    match fields.get(name) {
        Some(Value::Number(_)) => {}
        Some(_) => errors.push(FieldError::new(format!("{at}/{name}"), "must be a number")),
        None => errors.push(FieldError::new(
            format!("{at}/{name}"),
            "required field is missing",
        )),
    }
}

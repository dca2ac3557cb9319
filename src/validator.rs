//! # Request Body Validation
//!
//! A small capability trait so applications can plug in whatever schema language they
//! use. [`JsonSchemaValidator`] is the stock implementation; it compiles each distinct
//! schema once and shares the compiled validator across requests.
//!
//! ```rust
//! use headway::validator::{JsonSchemaValidator, Validator};
//! use serde_json::json;
//!
//! let v = JsonSchemaValidator::new();
//! let schema = json!({"type": "object", "required": ["name"]});
//! assert!(v.check(&schema, &json!({"name": "rex"})));
//! assert!(!v.check(&schema, &json!({})));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ErrorCondition, Exception};
use crate::server::HandlerRequest;

/// Validates JSON values against a schema.
pub trait Validator: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Whether `value` satisfies `schema`. An unusable schema fails every value.
    fn check(&self, schema: &Value, value: &Value) -> bool;
}

/// JSON Schema validator with a compiled-schema cache keyed by the schema's JSON text.
#[derive(Clone, Default)]
pub struct JsonSchemaValidator {
    cache: Arc<RwLock<HashMap<String, Arc<jsonschema::Validator>>>>,
}

impl JsonSchemaValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of compiled schemas held.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn get_or_compile(&self, schema: &Value) -> Option<Arc<jsonschema::Validator>> {
        let key = schema.to_string();
        if let Some(compiled) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Some(Arc::clone(compiled));
        }

        let compiled = match jsonschema::validator_for(schema) {
            Ok(v) => Arc::new(v),
            Err(e) => {
                warn!(error = %e, "Failed to compile JSON schema");
                return None;
            }
        };
        debug!(cached = self.cached() + 1, "Compiled JSON schema");
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(|| Arc::clone(&compiled));
        Some(compiled)
    }
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("cached", &self.cached())
            .finish()
    }
}

impl Validator for JsonSchemaValidator {
    fn name(&self) -> &str {
        "jsonschema"
    }

    fn check(&self, schema: &Value, value: &Value) -> bool {
        self.get_or_compile(schema)
            .is_some_and(|compiled| compiled.is_valid(value))
    }
}

impl HandlerRequest {
    /// Parse the body as JSON, check it against `schema` and deserialize it.
    ///
    /// Any failure is reported as `400 Bad Request`.
    pub fn validated_json<T: DeserializeOwned>(
        &self,
        validator: &dyn Validator,
        schema: &Value,
    ) -> Result<T, Exception> {
        let value: Value = self.json()?;
        if !validator.check(schema, &value) {
            debug!(
                request_id = %self.request_id,
                validator = validator.name(),
                path = %self.path,
                "Request body failed validation"
            );
            return Err(Exception::new(ErrorCondition::BadRequest));
        }
        serde_json::from_value(value).map_err(|e| {
            debug!(request_id = %self.request_id, error = %e, "Validated body did not deserialize");
            Exception::new(ErrorCondition::BadRequest)
        })
    }
}

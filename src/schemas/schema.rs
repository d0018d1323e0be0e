use jsonschema::{Draft, JSONSchema};
use schemars::{schema::RootSchema, JsonSchema};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::types::Itinerary;

type CompiledSchema = Result<JSONSchema, String>;

/// Cached JSON schema associated with a canonical record type.
///
/// The Draft-7 validator is compiled on first use and shared by clones.
#[derive(Clone)]
pub struct SchemaHandle {
    schema_name: &'static str,
    schema_json: Arc<Value>,
    compiled: Arc<OnceLock<CompiledSchema>>,
}

impl fmt::Debug for SchemaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaHandle")
            .field("schema_name", &self.schema_name)
            .field("compiled", &self.compiled.get().is_some())
            .finish_non_exhaustive()
    }
}

impl SchemaHandle {
    pub fn from_root_schema(schema_name: &'static str, root: RootSchema) -> Self {
        // RootSchema is plain data; serializing it cannot fail.
        let schema_json = serde_json::to_value(root).unwrap_or(Value::Null);

        Self {
            schema_name,
            schema_json: Arc::new(schema_json),
            compiled: Arc::new(OnceLock::new()),
        }
    }

    pub fn for_type<T: JsonSchema>(schema_name: &'static str) -> Self {
        Self::from_root_schema(schema_name, schemars::schema_for!(T))
    }

    pub fn schema_name(&self) -> &'static str {
        self.schema_name
    }

    pub fn schema_json(&self) -> &Value {
        self.schema_json.as_ref()
    }

    /// Compiled validator, or the compile error message.
    pub fn compiled(&self) -> Result<&JSONSchema, &str> {
        self.compiled
            .get_or_init(|| {
                JSONSchema::options()
                    .with_draft(Draft::Draft7)
                    .compile(self.schema_json())
                    .map_err(|err| err.to_string())
            })
            .as_ref()
            .map_err(String::as_str)
    }
}

/// Schema of the canonical itinerary, built once per process.
pub fn itinerary_schema() -> &'static SchemaHandle {
    static HANDLE: OnceLock<SchemaHandle> = OnceLock::new();
    HANDLE.get_or_init(|| SchemaHandle::for_type::<Itinerary>("Itinerary"))
}

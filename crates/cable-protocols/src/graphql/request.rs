//! GraphQL request envelopes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::document::{definitions, has_subscription, DefinitionKind};

/// The `{query, variables}` envelope sent upstream, over HTTP or the
/// `execute` channel action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphqlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
            operation_name: None,
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Envelope as a JSON object.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("query".to_string(), Value::String(self.query.clone()));
        object.insert("variables".to_string(), Value::Object(self.variables.clone()));
        if let Some(name) = &self.operation_name {
            object.insert("operationName".to_string(), Value::String(name.clone()));
        }
        Value::Object(object)
    }
}

/// An operation travelling through a link chain.
#[derive(Debug, Clone)]
pub struct Operation {
    pub request: GraphqlRequest,
    /// Free-form per-operation context shared between links.
    pub context: HashMap<String, Value>,
}

impl Operation {
    pub fn new(request: GraphqlRequest) -> Self {
        Self {
            request,
            context: HashMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn query(&self) -> &str {
        &self.request.query
    }

    pub fn definitions(&self) -> Vec<DefinitionKind> {
        definitions(&self.request.query)
    }

    /// Whether any top-level definition is a subscription.
    pub fn is_subscription(&self) -> bool {
        has_subscription(&self.request.query)
    }
}

impl From<GraphqlRequest> for Operation {
    fn from(request: GraphqlRequest) -> Self {
        Self::new(request)
    }
}

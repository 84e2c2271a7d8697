//! Named query parameters, serialized in the BigQuery REST shape.

use indexmap::IndexMap;
use serde::Serialize;

/// A SQL statement plus its bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub sql: String,
    pub parameters: Vec<QueryParameter>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    /// Bind a parameter.
    #[must_use]
    pub fn bind(mut self, parameter: QueryParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Look up a bound parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&QueryParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// One named parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameter {
    pub name: String,
    pub parameter_type: ParameterType,
    pub parameter_value: ParameterValue,
}

/// Parameter type descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterType {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_type: Option<Box<ParameterType>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub struct_types: Vec<StructFieldType>,
}

/// A named member of a STRUCT parameter type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructFieldType {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: ParameterType,
}

/// Parameter value: a scalar, an array, or a struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_values: Option<Vec<ParameterValue>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub struct_values: IndexMap<String, ParameterValue>,
}

impl ParameterType {
    fn scalar(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            array_type: None,
            struct_types: Vec::new(),
        }
    }

    fn array_of(element: Self) -> Self {
        Self {
            kind: "ARRAY".to_string(),
            array_type: Some(Box::new(element)),
            struct_types: Vec::new(),
        }
    }
}

impl ParameterValue {
    fn scalar(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }
}

impl QueryParameter {
    /// An `ARRAY<STRING>` parameter.
    pub fn string_array<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parameter_type: ParameterType::array_of(ParameterType::scalar("STRING")),
            parameter_value: ParameterValue {
                array_values: Some(values.into_iter().map(ParameterValue::scalar).collect()),
                ..ParameterValue::default()
            },
        }
    }

    /// An `ARRAY<STRUCT<f1 STRING, f2 STRING, ...>>` parameter.
    ///
    /// Every row must have one value per field name.
    pub fn string_struct_array(
        name: impl Into<String>,
        fields: &[&str],
        rows: impl IntoIterator<Item = Vec<String>>,
    ) -> Self {
        let struct_type = ParameterType {
            kind: "STRUCT".to_string(),
            array_type: None,
            struct_types: fields
                .iter()
                .map(|f| StructFieldType {
                    name: (*f).to_string(),
                    field_type: ParameterType::scalar("STRING"),
                })
                .collect(),
        };

        let values = rows
            .into_iter()
            .map(|row| ParameterValue {
                struct_values: fields
                    .iter()
                    .zip(row)
                    .map(|(f, v)| ((*f).to_string(), ParameterValue::scalar(v)))
                    .collect(),
                ..ParameterValue::default()
            })
            .collect();

        Self {
            name: name.into(),
            parameter_type: ParameterType::array_of(struct_type),
            parameter_value: ParameterValue {
                array_values: Some(values),
                ..ParameterValue::default()
            },
        }
    }

    /// Scalar values of an array parameter, in order.
    #[must_use]
    pub fn array_strings(&self) -> Vec<&str> {
        self.parameter_value
            .array_values
            .iter()
            .flatten()
            .filter_map(|v| v.value.as_deref())
            .collect()
    }
}

use super::document::{IndicatorDocument, SUPPORTED_API_VERSIONS, is_supported_api_version};
use serde_json::Value;
use thiserror::Error;

/// Errors raised before a document reaches validation.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("could not unmarshal indicators: {0}")]
    Unmarshal(String),

    #[error("apiVersion is required, supported versions are: {supported}", supported = SUPPORTED_API_VERSIONS.join(", "))]
    MissingApiVersion,

    #[error("invalid apiVersion '{0}', supported versions are: {supported}", supported = SUPPORTED_API_VERSIONS.join(", "))]
    UnsupportedApiVersion(String),
}

/// Reads a document from a JSON body, as sent to the registry.
pub fn read_document_json(bytes: &[u8]) -> Result<IndicatorDocument, DocumentError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| DocumentError::Unmarshal(e.to_string()))?;
    read_document_value(value)
}

/// Reads a document from YAML, the format used for documents kept on disk.
pub fn read_document_yaml(bytes: &[u8]) -> Result<IndicatorDocument, DocumentError> {
    let value: Value =
        serde_yaml::from_slice(bytes).map_err(|e| DocumentError::Unmarshal(e.to_string()))?;
    read_document_value(value)
}

/// Checks the api version of a generic value and converts it into a document.
///
/// The api version is checked first so that a document written for another
/// version is reported as such and not as a field mismatch.
pub fn read_document_value(value: Value) -> Result<IndicatorDocument, DocumentError> {
    if !value.is_object() {
        return Err(DocumentError::Unmarshal(
            "document must be an object".to_string(),
        ));
    }

    match value.get("apiVersion") {
        None | Some(Value::Null) => return Err(DocumentError::MissingApiVersion),
        Some(Value::String(version)) if is_supported_api_version(version) => {}
        Some(Value::String(version)) => {
            return Err(DocumentError::UnsupportedApiVersion(version.clone()));
        }
        Some(other) => return Err(DocumentError::UnsupportedApiVersion(other.to_string())),
    }

    serde_json::from_value(value).map_err(|e| DocumentError::Unmarshal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_json() {
        let document = read_document_json(
            br#"{"apiVersion":"indicatorprotocol.io/v1","spec":{"product":{"name":"p","version":"1"}}}"#,
        )
        .unwrap();
        assert_eq!(document.product_name(), "p");
    }

    #[test]
    fn test_read_yaml() {
        let yaml = r#"
apiVersion: indicatorprotocol.io/v1
kind: IndicatorDocument
metadata:
  labels:
    deployment: abc
spec:
  product:
    name: p
    version: "1.0"
  indicators:
  - name: latency
    promql: rate(latency[5m])
    thresholds:
    - level: warning
      operator: gt
      value: 100
"#;
        let document = read_document_yaml(yaml.as_bytes()).unwrap();
        assert_eq!(document.spec.product.version, "1.0");
        assert_eq!(document.spec.indicators[0].thresholds[0].value, 100.0);
    }

    #[test]
    fn test_malformed() {
        let err = read_document_json(b"{not json").unwrap_err();
        assert!(matches!(err, DocumentError::Unmarshal(_)));
        assert!(
            err.to_string()
                .starts_with("could not unmarshal indicators: ")
        );

        let err = read_document_json(b"[]").unwrap_err();
        assert!(matches!(err, DocumentError::Unmarshal(_)));
    }

    #[test]
    fn test_api_version_checked_first() {
        let err = read_document_json(br#"{"spec":{"indicators":"nope"}}"#).unwrap_err();
        assert!(matches!(err, DocumentError::MissingApiVersion));

        let err = read_document_json(br#"{"apiVersion":"v0","spec":{"indicators":"nope"}}"#)
            .unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedApiVersion(v) if v == "v0"));
    }

    #[test]
    fn test_wrong_field_types() {
        let err = read_document_json(
            br#"{"apiVersion":"indicatorprotocol.io/v1","spec":{"indicators":"nope"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::Unmarshal(_)));
    }
}

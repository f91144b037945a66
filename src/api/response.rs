use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Envelope wrapping every API response body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseResponse<T> {
    pub is_success: bool,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    pub result: Option<T>,
}

/// Application-level refusal (`isSuccess: false`), or a success envelope missing its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub code: String,
    pub message: String,
}

impl<T> BaseResponse<T> {
    pub fn success(result: T) -> Self {
        BaseResponse {
            is_success: true,
            code: "COMMON200".to_string(),
            message: "OK".to_string(),
            result: Some(result),
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        BaseResponse {
            is_success: false,
            code: code.into(),
            message: message.into(),
            result: None,
        }
    }

    /// Decodes a body whose `result` is only read when `isSuccess` is true.
    pub fn from_body(body: &str) -> serde_json::Result<Self>
    where
        T: DeserializeOwned,
    {
        let raw: BaseResponse<Value> = serde_json::from_str(body)?;
        let result = match raw.result {
            Some(value) if raw.is_success && !value.is_null() => Some(serde_json::from_value(value)?),
            _ => None,
        };
        Ok(BaseResponse {
            is_success: raw.is_success,
            code: raw.code,
            message: raw.message,
            result,
        })
    }

    pub fn into_result(self) -> Result<T, Rejection> {
        match (self.is_success, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(Rejection {
                code: self.code,
                message: self.message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{AskResult, RankingItem};

    #[test]
    fn parses_success_envelope() {
        let body = r#"{
            "isSuccess": true,
            "code": "COMMON200",
            "message": "OK",
            "result": { "keyword": ["security"], "answer": "Use a password manager." }
        }"#;
        let response: BaseResponse<AskResult> = serde_json::from_str(body).unwrap();
        let result = response.into_result().unwrap();
        assert_eq!(result.answer, "Use a password manager.");
        assert_eq!(result.keyword, vec!["security".to_string()]);
    }

    #[test]
    fn failure_envelope_without_result_is_a_rejection() {
        let body = r#"{"isSuccess": false, "code": "ASK400", "message": "Personal data detected", "result": null}"#;
        let response: BaseResponse<AskResult> = serde_json::from_str(body).unwrap();
        let rejection = response.into_result().unwrap_err();
        assert_eq!(rejection.code, "ASK400");
        assert_eq!(rejection.message, "Personal data detected");
    }

    #[test]
    fn failure_placeholder_result_is_not_decoded() {
        for placeholder in [r#"{}"#, r#""""#, "[]", "0"] {
            let body = format!(
                r#"{{"isSuccess": false, "code": "ASK400", "message": "Personal data detected", "result": {}}}"#,
                placeholder
            );
            let response = BaseResponse::<AskResult>::from_body(&body).unwrap();
            assert!(response.result.is_none());
            assert_eq!(response.into_result().unwrap_err().message, "Personal data detected");
        }
    }

    #[test]
    fn success_with_malformed_result_is_an_error() {
        let body = r#"{"isSuccess": true, "code": "COMMON200", "message": "OK", "result": {}}"#;
        assert!(BaseResponse::<AskResult>::from_body(body).is_err());
    }

    #[test]
    fn ranking_envelope_tolerates_fewer_items() {
        let body = r#"{"isSuccess": true, "code": "COMMON200", "message": "OK",
            "result": [{"keyword": "AI", "percentage": "60%"}]}"#;
        let response: BaseResponse<Vec<RankingItem>> = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_result().unwrap().len(), 1);
    }
}

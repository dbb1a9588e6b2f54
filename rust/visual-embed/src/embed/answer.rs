use serde_json::{Value, json};
use std::{fmt::Debug, rc::Rc};

use crate::{
    EmbedError, HttpError, OperationType,
    http::{HttpClient, HttpRequest},
};

/// Fetches further pages of the data behind a custom action.
#[derive(Clone)]
pub struct AnswerService {
    http: Rc<dyn HttpClient>,
    host: String,
    session: Value,
    query: String,
    operation: OperationType,
}

impl Debug for AnswerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerService")
            .field("host", &self.host)
            .field("operation", &self.operation)
            .finish()
    }
}

impl AnswerService {
    pub(crate) fn new(
        http: Rc<dyn HttpClient>,
        host: impl Into<String>,
        session: Value,
        query: impl Into<String>,
        operation: OperationType,
    ) -> Self {
        Self {
            http,
            host: host.into(),
            session,
            query: query.into(),
            operation,
        }
    }

    /// Build a service for a custom action payload, when its operation is
    /// one that supports pagination.
    pub(crate) fn for_custom_action(
        http: Rc<dyn HttpClient>,
        host: &str,
        data: &Value,
    ) -> Option<Self> {
        let operation = data
            .get("operation")
            .cloned()
            .and_then(|operation| serde_json::from_value::<OperationType>(operation).ok())?;
        let query = data
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let session = data.get("session").cloned().unwrap_or(Value::Null);

        Some(Self::new(http, host, session, query, operation))
    }

    /// The operation this service pages through
    pub fn operation(&self) -> OperationType {
        self.operation
    }

    fn variables(&self, offset: u64, batch_size: u64) -> Value {
        let mut variables = match self.operation {
            OperationType::GetChartWithData => json!({
                "batchSize": batch_size,
                "offset": offset * batch_size,
            }),
            OperationType::GetTableWithHeadlineData => json!({
                "dataPaginationParams": {
                    "isClientPaginated": true,
                    "offset": offset * batch_size,
                    "size": batch_size,
                }
            }),
        };
        variables["session"] = self.session.clone();
        variables
    }

    /// Fetch page `offset` of `batch_size` rows and return the `data` field
    /// of the response.
    pub async fn fetch_data(&self, offset: u64, batch_size: u64) -> Result<Value, EmbedError> {
        let operation = self.operation.as_str();
        let url = format!("{}/prism/?op={operation}", self.host);
        let body = json!({
            "operationName": operation,
            "query": self.query,
            "variables": self.variables(offset, batch_size),
        });

        let request = HttpRequest::post(url.as_str(), body.to_string())
            .with_header("content-type", "application/json;charset=UTF-8")
            .with_header("x-requested-by", "ThoughtSpot")
            .with_header("accept", "*/*")
            .with_header("accept-language", "en-us");
        let response = self.http.send(request).await?;

        let mut result: Value =
            serde_json::from_str(&response.body).map_err(|error| HttpError::Body {
                url,
                reason: error.to_string(),
            })?;
        Ok(result
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::ScriptedClient;
    use futures::FutureExt;

    #[test]
    fn it_pages_chart_data() {
        let http = ScriptedClient::new();
        http.reply("/prism/?op=GetChartWithData", 200, r#"{"data":{"rows":[1]}}"#);
        let service = AnswerService::for_custom_action(
            Rc::new(http.clone()),
            "https://tshost",
            &json!({ "operation": "GetChartWithData", "query": "q", "session": { "id": 1 } }),
        )
        .unwrap();

        let data = service.fetch_data(2, 50).now_or_never().unwrap().unwrap();

        assert_eq!(data, json!({ "rows": [1] }));
        let request = &http.requests()[0];
        assert_eq!(request.url, "https://tshost/prism/?op=GetChartWithData");
        assert_eq!(request.header("x-requested-by"), Some("ThoughtSpot"));
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "operationName": "GetChartWithData",
                "query": "q",
                "variables": { "session": { "id": 1 }, "batchSize": 50, "offset": 100 }
            })
        );
    }

    #[test]
    fn it_pages_table_data() {
        let http = ScriptedClient::new();
        let service = AnswerService::for_custom_action(
            Rc::new(http.clone()),
            "https://tshost",
            &json!({ "operation": "GetTableWithHeadlineData", "query": "q" }),
        )
        .unwrap();

        assert_eq!(
            service.variables(1, 20)["dataPaginationParams"],
            json!({ "isClientPaginated": true, "offset": 20, "size": 20 })
        );
    }

    #[test]
    fn it_ignores_other_operations() {
        let http = ScriptedClient::new();
        assert!(
            AnswerService::for_custom_action(
                Rc::new(http),
                "https://tshost",
                &json!({ "operation": "Other" })
            )
            .is_none()
        );
    }
}

use crate::config::ClientConfig;
use crate::error::{FailurePayload, GtmetrixError, GtmetrixResult};
use crate::query::TestQuery;
use crate::report::Report;
use crate::requestor::{ApiRequest, Requestor, Wait};
use crate::shape;
use crate::test::Test;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// Entry point of the library, bound to one API key.
///
/// Every [`Test`] and [`Report`] obtained through an account shares its
/// [`Requestor`].
#[derive(Debug, Clone)]
pub struct Account {
    requestor: Arc<Requestor>,
}

impl Account {
    pub fn new(config: ClientConfig) -> GtmetrixResult<Self> {
        Ok(Self {
            requestor: Arc::new(Requestor::new(&config)?),
        })
    }

    /// Like [`Account::new`], with a custom wait used for rate-limit backoff
    /// and completion polling.
    pub fn with_wait(config: ClientConfig, wait: Arc<dyn Wait>) -> GtmetrixResult<Self> {
        Ok(Self {
            requestor: Arc::new(Requestor::with_wait(&config, wait)?),
        })
    }

    pub fn from_env() -> GtmetrixResult<Self> {
        let config =
            ClientConfig::from_env().map_err(|message| GtmetrixError::InvalidConfig { message })?;
        Self::new(config)
    }

    pub fn requestor(&self) -> &Arc<Requestor> {
        &self.requestor
    }

    /// Starts a test of `url`. Extra test parameters (`location`, `browser`,
    /// `report`, `adblock`, ...) go into `attributes`.
    ///
    /// Does not wait for the test to finish; see [`Test::fetch`].
    pub fn start_test(&self, url: &str, attributes: Map<String, Value>) -> GtmetrixResult<Test> {
        let mut attributes = attributes;
        attributes.insert("url".to_string(), Value::String(url.to_string()));

        let body = json!({
            "data": {
                "type": shape::TEST_TYPE,
                "attributes": attributes,
            }
        });
        let request = ApiRequest::post("tests")
            .with_json(body)
            .with_header("Content-Type", JSON_API_CONTENT_TYPE)
            .with_retries(self.requestor.retries());

        let response = self.requestor.request(&request)?;
        let status = response.status();
        let value = response.into_data().unwrap_or(Value::Null);
        let test = Test::from_value(
            self.requestor.clone(),
            value,
            "API returned non-test for a started test",
            Some(status),
        )?;

        info!("Started test {} for {}", test.id(), url);
        Ok(test)
    }

    /// Lists recent tests. The API keeps tests for about 24 hours and only
    /// the first page of results is returned.
    pub fn list_tests(&self, query: &TestQuery) -> GtmetrixResult<Vec<Test>> {
        let request = ApiRequest::get(query.path()).with_retries(self.requestor.retries());
        let response = self.requestor.request(&request)?;
        let status = response.status();

        let items = match response.into_data() {
            Some(Value::Array(items)) => items,
            other => {
                return Err(GtmetrixError::failure(
                    "API returned non-list for a list of tests",
                    Some(status),
                    FailurePayload::Json(other.unwrap_or(Value::Null)),
                ))
            }
        };

        if !items.iter().all(shape::is_test) {
            return Err(GtmetrixError::failure(
                "API returned non-test in a list of tests",
                Some(status),
                FailurePayload::Json(Value::Array(items)),
            ));
        }

        let tests = items
            .into_iter()
            .map(|item| {
                Test::from_value(
                    self.requestor.clone(),
                    item,
                    "API returned non-test in a list of tests",
                    Some(status),
                )
            })
            .collect::<GtmetrixResult<Vec<_>>>()?;

        debug!("Listed {} tests", tests.len());
        Ok(tests)
    }

    /// Account details: API credit balance (`api_credits`) and next refill
    /// time (`api_refill`, UNIX seconds), as the raw user object.
    pub fn status(&self) -> GtmetrixResult<Map<String, Value>> {
        let request = ApiRequest::get("status").with_retries(self.requestor.retries());
        let response = self.requestor.request(&request)?;
        let status = response.status();

        match response.into_data() {
            Some(Value::Object(user)) if shape::is_user_object(&user) => Ok(user),
            other => Err(GtmetrixError::failure(
                "API returned non-user for status",
                Some(status),
                FailurePayload::Json(other.unwrap_or(Value::Null)),
            )),
        }
    }

    pub fn test(&self, test_id: &str) -> GtmetrixResult<Test> {
        Test::from_path(self.requestor.clone(), &format!("tests/{}", test_id))
    }

    /// Fetches a report by its id (slug).
    pub fn report(&self, report_id: &str) -> GtmetrixResult<Report> {
        Report::from_url(self.requestor.clone(), &format!("reports/{}", report_id))
    }
}

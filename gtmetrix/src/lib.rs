//! Blocking client for the GTmetrix REST API 2.0.
//!
//! Start from an [`Account`], built from a [`ClientConfig`] holding your API
//! key. Use it to start a test ([`Account::start_test`]), list recent tests
//! ([`Account::list_tests`]) or check the credit balance
//! ([`Account::status`]). A [`Test`] can be polled until it finishes
//! ([`Test::fetch`]) and then yields its [`Report`] ([`Test::report`]).
//!
//! ```no_run
//! use gtmetrix::{Account, ClientConfig};
//! use serde_json::Map;
//!
//! # fn main() -> gtmetrix::GtmetrixResult<()> {
//! let account = Account::new(ClientConfig::new("e8ddc55d93eb0e8281b255ea236dcc4f"))?;
//! let mut test = account.start_test("https://example.com", Map::new())?;
//! test.fetch(true, 10)?;
//! if let Some(report) = test.report()? {
//!     let pdf = report.resource_bytes("report.pdf")?;
//!     println!("{} bytes of PDF", pdf.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Two error families matter to callers: [`GtmetrixError::Api`] when the
//! service rejected a request with a proper error response, and
//! [`GtmetrixError::Failure`] when the service answered with something this
//! library did not expect.

pub mod account;
pub mod config;
pub mod error;
pub mod query;
pub mod report;
pub mod requestor;
pub mod resource;
pub mod shape;

pub use account::Account;
pub use config::ClientConfig;
pub use error::{
    ApiErrorObject, ApiErrorResponse, ApiFailure, FailureKind, FailurePayload, GtmetrixError,
    GtmetrixResult,
};
pub use query::{FilterOp, Sort, SortField, TestQuery};
pub use report::{Report, ResourceDestination, ResourceOutput};
pub use requestor::{ApiRequest, ApiResponse, RequestBody, Requestor, ThreadSleep, Wait};
pub use resource::ResourceData;
pub use test::Test;

pub mod prelude {
    pub use crate::account::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::query::*;
    pub use crate::report::*;
    pub use crate::requestor::*;
    pub use crate::resource::*;
    pub use crate::test::*;
}

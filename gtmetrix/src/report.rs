use crate::error::{FailurePayload, GtmetrixError, GtmetrixResult};
use crate::requestor::{ApiRequest, Requestor};
use crate::resource::ResourceData;
use crate::shape;
use crate::test::Test;
use reqwest::blocking::Response;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Where [`Report::resource`] puts a downloaded resource.
pub enum ResourceDestination<'a> {
    /// Buffer the whole resource and return it.
    Memory,
    /// Create the file (truncating an existing one) and stream into it.
    File(PathBuf),
    /// Stream into the given writer.
    Writer(&'a mut dyn Write),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutput {
    Bytes(Vec<u8>),
    /// Number of bytes streamed to a file or writer.
    Written(u64),
}

/// Results of a successfully finished test.
#[derive(Debug, Clone)]
pub struct Report {
    requestor: Arc<Requestor>,
    data: ResourceData,
}

impl Report {
    /// Fetches the report a link points to. Only links under the base URL
    /// (or paths relative to it) are supported.
    pub(crate) fn from_url(requestor: Arc<Requestor>, url: &str) -> GtmetrixResult<Self> {
        let path = match requestor.relative_path(url) {
            Some(path) => path.to_owned(),
            None => {
                return Err(GtmetrixError::failure(
                    format!("Report link {} is outside of the API base URL", url),
                    None,
                    FailurePayload::None,
                ))
            }
        };

        let request = ApiRequest::get(path).with_retries(requestor.retries());
        let response = requestor.request(&request)?;
        let status = response.status();
        let value = response.into_data().unwrap_or(Value::Null);
        let data = ResourceData::checked(
            value,
            shape::is_report,
            "API returned non-report for a report",
            Some(status),
        )?;

        debug!("Fetched report {}", data.id);
        Ok(Self { requestor, data })
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.data.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.data.attribute(name)
    }

    pub fn links(&self) -> Option<&Map<String, Value>> {
        self.data.links.as_ref()
    }

    pub fn link(&self, name: &str) -> Option<&str> {
        self.data.link(name)
    }

    pub fn data(&self) -> &ResourceData {
        &self.data
    }

    pub fn to_value(&self) -> Value {
        self.data.to_value()
    }

    /// Deletes the report. Any later operation on it fails with a
    /// "report not found" API error.
    pub fn delete(&self) -> GtmetrixResult<()> {
        let request = ApiRequest::delete(format!("reports/{}", self.data.id))
            .with_retries(self.requestor.retries())
            .raw();
        self.requestor.request(&request)?;
        info!("Deleted report {}", self.data.id);
        Ok(())
    }

    /// Starts a new test with the same parameters as the one that produced
    /// this report.
    pub fn retest(&self) -> GtmetrixResult<Test> {
        let request = ApiRequest::post(format!("reports/{}/retest", self.data.id))
            .with_retries(self.requestor.retries());
        let response = self.requestor.request(&request)?;
        let status = response.status();
        let value = response.into_data().unwrap_or(Value::Null);
        let test = Test::from_value(
            self.requestor.clone(),
            value,
            "API returned non-test for a retest",
            Some(status),
        )?;
        info!("Retest of report {} started as test {}", self.data.id, test.id());
        Ok(test)
    }

    /// Downloads a report resource such as `report.pdf`, `net.har` or
    /// `video.mp4`.
    ///
    /// `name` is either a resource file name, fetched from the generic
    /// `reports/{id}/resources/{name}` endpoint, or the name of a link on the
    /// report (`report_pdf`, `har`, ...). A link pointing outside of the API
    /// base URL is a failure. Redirects are followed since resources may be
    /// served from elsewhere.
    pub fn resource(
        &self,
        name: &str,
        destination: ResourceDestination<'_>,
    ) -> GtmetrixResult<ResourceOutput> {
        let body = self.open_resource(name)?;
        match destination {
            ResourceDestination::Memory => read_all(body, name).map(ResourceOutput::Bytes),
            ResourceDestination::File(path) => {
                save_to_file(body, name, &path).map(ResourceOutput::Written)
            }
            ResourceDestination::Writer(writer) => {
                stream_to(body, name, writer).map(ResourceOutput::Written)
            }
        }
    }

    pub fn resource_bytes(&self, name: &str) -> GtmetrixResult<Vec<u8>> {
        read_all(self.open_resource(name)?, name)
    }

    pub fn save_resource(&self, name: &str, path: impl AsRef<Path>) -> GtmetrixResult<u64> {
        save_to_file(self.open_resource(name)?, name, path.as_ref())
    }

    fn open_resource(&self, name: &str) -> GtmetrixResult<Response> {
        let request = ApiRequest::get(self.resource_path(name)?)
            .with_retries(self.requestor.retries())
            .following_redirects()
            .raw();
        let response = self.requestor.request(&request)?;
        response.into_body().ok_or_else(|| {
            GtmetrixError::failure(
                format!("API returned no body for resource {}", name),
                None,
                FailurePayload::None,
            )
        })
    }

    fn resource_path(&self, name: &str) -> GtmetrixResult<String> {
        let Some(url) = self.data.link(name) else {
            return Ok(format!("reports/{}/resources/{}", self.data.id, name));
        };
        match self.requestor.relative_path(url) {
            Some(path) => Ok(path.to_owned()),
            None => Err(GtmetrixError::failure(
                format!("Resource link {} is outside of the API base URL", url),
                None,
                FailurePayload::None,
            )),
        }
    }
}

fn read_all(mut body: Response, name: &str) -> GtmetrixResult<Vec<u8>> {
    let mut bytes = Vec::new();
    body.read_to_end(&mut bytes)?;
    debug!("Downloaded {} ({} bytes) into memory", name, bytes.len());
    Ok(bytes)
}

fn save_to_file(mut body: Response, name: &str, path: &Path) -> GtmetrixResult<u64> {
    let mut file = File::create(path)?;
    let written = io::copy(&mut body, &mut file)?;
    file.flush()?;
    debug!("Saved {} ({} bytes) to {}", name, written, path.display());
    Ok(written)
}

fn stream_to(mut body: Response, name: &str, writer: &mut dyn Write) -> GtmetrixResult<u64> {
    let written = io::copy(&mut body, &mut *writer)?;
    writer.flush()?;
    debug!("Streamed {} ({} bytes)", name, written);
    Ok(written)
}

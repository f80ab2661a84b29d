use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;
use crate::prediction::{Classifier, UNKNOWN_LABEL};
use crate::surface::Snapshot;

#[derive(Serialize)]
struct PredictRequest<'a> {
    image: &'a str,
}

#[derive(Deserialize, Default)]
struct PredictResponse {
    label: Option<String>,
    error: Option<String>,
}

/// `POST {base}/predict` with `{"image": <data url>}`, answering
/// `{"label": "..."}` or `{"error": "..."}`
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClassifierError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Classifier for HttpClassifier {
    fn classify(&self, image: &Snapshot) -> Result<String, ClassifierError> {
        let data_url = image.to_data_url();
        let response = self
            .client
            .post(&self.url)
            .json(&PredictRequest { image: &data_url })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .json::<PredictResponse>()
                .ok()
                .and_then(|body| body.error);
            return Err(match reason {
                Some(reason) => ClassifierError::Service(reason),
                None => ClassifierError::Status(status.as_u16()),
            });
        }

        let body: PredictResponse = response.json()?;
        if let Some(reason) = body.error {
            return Err(ClassifierError::Service(reason));
        }
        Ok(body
            .label
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string()))
    }
}

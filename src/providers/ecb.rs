use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::config::EcbProviderConfig;
use crate::core::{FetchError, RateFetcher, RateSnapshot};

/// Fetches the European Central Bank daily reference rates.
pub struct EcbRateFetcher {
    url: String,
    client: reqwest::Client,
}

impl EcbRateFetcher {
    pub fn new(base_url: &str, path: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent("fxrates/0.1")
            .timeout(timeout)
            .build()?;
        Ok(EcbRateFetcher {
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
            client,
        })
    }

    pub fn from_config(config: &EcbProviderConfig) -> Result<Self, FetchError> {
        Self::new(&config.base_url, &config.path, config.timeout())
    }
}

// The daily table nests three levels of `Cube` elements under the envelope:
// an unnamed wrapper, one dated cube, and a cube per currency. Other envelope
// children (subject, sender, notes) are skipped.
#[derive(Debug, Deserialize)]
struct EcbEnvelope {
    #[serde(rename = "Cube", default)]
    cube: Option<OuterCube>,
}

#[derive(Debug, Deserialize)]
struct OuterCube {
    #[serde(rename = "Cube")]
    daily: DailyCube,
}

#[derive(Debug, Deserialize)]
struct DailyCube {
    time: String,
    #[serde(rename = "$value", default)]
    rates: Vec<RateCube>,
}

#[derive(Debug, Deserialize)]
struct RateCube {
    currency: String,
    rate: String,
}

impl RateCube {
    fn into_pair(self) -> Option<(String, f64)> {
        match self.rate.trim().parse::<f64>() {
            Ok(rate) => Some((self.currency, rate)),
            Err(e) => {
                warn!(
                    currency = %self.currency,
                    rate = %self.rate,
                    error = %e,
                    "Skipping unparsable rate"
                );
                None
            }
        }
    }
}

/// Parses a daily reference rate document into a snapshot.
pub fn parse_daily_rates(body: &str) -> Result<RateSnapshot, FetchError> {
    let envelope: EcbEnvelope =
        serde_xml_rs::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let daily = envelope
        .cube
        .map(|outer| outer.daily)
        .ok_or(FetchError::MissingData("dated Cube element"))?;

    let date = NaiveDate::parse_from_str(daily.time.trim(), "%Y-%m-%d").map_err(|e| {
        FetchError::Parse(format!("Invalid effective date '{}': {}", daily.time, e))
    })?;

    RateSnapshot::new(date, daily.rates.into_iter().filter_map(RateCube::into_pair))
}

#[async_trait]
impl RateFetcher for EcbRateFetcher {
    #[instrument(name = "EcbRateFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<RateSnapshot, FetchError> {
        debug!("Requesting daily reference rates from {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let body = response.text().await?;
        let snapshot = parse_daily_rates(&body)?;

        debug!(
            date = %snapshot.date(),
            currencies = snapshot.len(),
            "Parsed daily reference rates"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DAILY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01" xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
	<gesmes:subject>Reference rates</gesmes:subject>
	<gesmes:Sender>
		<gesmes:name>European Central Bank</gesmes:name>
	</gesmes:Sender>
	<Cube>
		<Cube time='2022-10-03'>
			<Cube currency='USD' rate='0.9764'/>
			<Cube currency='JPY' rate='141.49'/>
			<Cube currency='GBP' rate='0.87070'/>
			<Cube currency='CHF' rate='0.9658'/>
		</Cube>
	</Cube>
</gesmes:Envelope>"#;

    const DAILY_PATH: &str = "/stats/eurofxref/eurofxref-daily.xml";

    async fn create_mock_server(response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(DAILY_PATH))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn fetcher_for(server: &MockServer) -> EcbRateFetcher {
        EcbRateFetcher::new(&server.uri(), DAILY_PATH, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_daily_rates() {
        let snapshot = parse_daily_rates(DAILY_XML).unwrap();

        assert_eq!(snapshot.date(), NaiveDate::from_ymd_opt(2022, 10, 3).unwrap());
        assert_eq!(snapshot.rate("USD"), Some(0.9764));
        assert_eq!(snapshot.rate("JPY"), Some(141.49));
        assert_eq!(snapshot.rate("GBP"), Some(0.8707));
        assert_eq!(snapshot.rate("EUR"), Some(1.0));
        assert_eq!(snapshot.len(), 5);
    }

    #[test]
    fn test_parse_rejects_malformed_xml() {
        let result = parse_daily_rates("<gesmes:Envelope><Cube>");
        assert!(matches!(result, Err(FetchError::Parse(_))));

        let result = parse_daily_rates("not xml at all");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_requires_dated_cube() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01">
	<gesmes:subject>Reference rates</gesmes:subject>
</gesmes:Envelope>"#;

        let result = parse_daily_rates(body);
        assert!(matches!(result, Err(FetchError::MissingData(_))));
    }

    #[test]
    fn test_parse_skips_unknown_envelope_elements() {
        let body = DAILY_XML.replace(
            "<Cube>\n\t\t<Cube time",
            "<gesmes:note>Published daily</gesmes:note>\n\t<gesmes:Footer><gesmes:link>https://www.ecb.europa.eu</gesmes:link></gesmes:Footer>\n\t<Cube>\n\t\t<Cube time",
        );
        assert!(body.contains("gesmes:note"));

        let snapshot = parse_daily_rates(&body).unwrap();
        assert_eq!(snapshot.date(), NaiveDate::from_ymd_opt(2022, 10, 3).unwrap());
        assert_eq!(snapshot.rate("USD"), Some(0.9764));
        assert_eq!(snapshot.len(), 5);
    }

    #[test]
    fn test_parse_skips_unparsable_rate() {
        let body = DAILY_XML.replace("rate='141.49'", "rate='n/a'");

        let snapshot = parse_daily_rates(&body).unwrap();
        assert_eq!(snapshot.rate("JPY"), None);
        assert_eq!(snapshot.rate("USD"), Some(0.9764));
        assert_eq!(snapshot.rate("GBP"), Some(0.8707));
        assert_eq!(snapshot.rate("CHF"), Some(0.9658));
        assert_eq!(snapshot.len(), 4);
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let body = DAILY_XML.replace("2022-10-03", "03/10/2022");

        let result = parse_daily_rates(&body);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid effective date '03/10/2022'")
        );
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string(DAILY_XML)).await;

        let snapshot = fetcher_for(&mock_server).fetch_rates().await.unwrap();
        assert_eq!(snapshot.rate("CHF"), Some(0.9658));
        assert_eq!(snapshot.rate("EUR"), Some(1.0));
    }

    #[tokio::test]
    async fn test_ecb_api_error_response() {
        let mock_server = create_mock_server(ResponseTemplate::new(500)).await;

        let result = fetcher_for(&mock_server).fetch_rates().await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error"
        );
    }

    #[tokio::test]
    async fn test_ecb_api_malformed_response() {
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string("{\"rates\": []}"))
                .await;

        let result = fetcher_for(&mock_server).fetch_rates().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200)
                .set_body_string(DAILY_XML)
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let fetcher =
            EcbRateFetcher::new(&mock_server.uri(), DAILY_PATH, Duration::from_millis(50))
                .unwrap();
        let result = fetcher.fetch_rates().await;
        assert!(matches!(result, Err(FetchError::Request(_))));
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        let mock_server = MockServer::start().await;
        let uri = mock_server.uri();
        drop(mock_server);

        let fetcher = EcbRateFetcher::new(&uri, DAILY_PATH, Duration::from_secs(1)).unwrap();
        let result = fetcher.fetch_rates().await;
        assert!(matches!(result, Err(FetchError::Request(_))));
    }
}

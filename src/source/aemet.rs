//! AEMET OpenData client
//!
//! Every OpenData endpoint answers with a small envelope instead of the data
//! itself:
//!
//! ```json
//! {"descripcion": "exito", "estado": 200, "datos": "https://...", "metadatos": "https://..."}
//! ```
//!
//! The records are then fetched from the `datos` URL. Data responses are
//! served as ISO-8859-15 more often than not, frequently without a charset
//! in `Content-Type`, so bodies that are not valid UTF-8 are decoded with the
//! declared charset or ISO-8859-15.

use crate::config::ApiConfig;
use crate::constants::{STATION_INVENTORY_ENDPOINT, STATION_OBSERVATION_ENDPOINT};
use crate::error::{Result, StationError};
use crate::models::{ObservationSnapshot, RawStationRecord, latest_observation};
use crate::source::{RecordSource, records_from_json};
use futures::stream::{self, StreamExt};
use encoding_rs::Encoding;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Indirection envelope returned by every OpenData endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub descripcion: String,
    pub estado: u16,
    pub datos: Option<String>,
    pub metadatos: Option<String>,
}

impl ApiEnvelope {
    /// Data URL, provided the envelope reports success
    pub fn data_url(&self, endpoint: &str) -> Result<&str> {
        if self.estado != StatusCode::OK.as_u16() {
            return Err(StationError::Api {
                status: self.estado,
                message: self.descripcion.clone(),
            });
        }
        self.datos
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| StationError::MissingDataUrl {
                endpoint: endpoint.to_string(),
            })
    }
}

/// Encoding named by the `charset` parameter of a `Content-Type` value
pub fn charset_encoding(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, label)| Encoding::for_label(label.trim().trim_matches('"').as_bytes()))
}

/// Decode a response body
///
/// UTF-8 is tried first. Otherwise the declared charset is used, and
/// ISO-8859-15 when none is declared.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    let encoding = content_type
        .and_then(charset_encoding)
        .filter(|encoding| *encoding != encoding_rs::UTF_8)
        .unwrap_or(encoding_rs::ISO_8859_15);
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        warn!("Response body had bytes invalid in {}", encoding.name());
    }
    text.into_owned()
}

/// Read a response body as text, see [`decode_body`]
async fn read_body(response: Response) -> Result<String> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = response.bytes().await?;
    Ok(decode_body(&bytes, content_type.as_deref()))
}

/// Observation endpoint path with the station id as one escaped segment
pub fn observation_endpoint(station_id: &str) -> Result<String> {
    let station_id = station_id.trim();
    if station_id.is_empty() || station_id == "." || station_id == ".." {
        return Err(StationError::configuration(format!(
            "Invalid station identifier: '{}'",
            station_id
        )));
    }
    Ok(STATION_OBSERVATION_ENDPOINT.replace("{id}", &urlencoding::encode(station_id)))
}

/// Client for the station inventory and conventional observations
#[derive(Debug, Clone)]
pub struct AemetClient {
    client: Client,
    base_url: String,
    api_key: String,
    max_concurrent_requests: usize,
}

impl AemetClient {
    pub fn new(config: &ApiConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_concurrent_requests: config.max_concurrent_requests.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Resolve an endpoint through its envelope and return the data payload
    #[instrument(skip(self))]
    async fn fetch_data(&self, endpoint: &str) -> Result<Value> {
        let url = self.endpoint_url(endpoint);
        debug!(url = %url, "Requesting AEMET envelope");

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;
        check_status(&response)?;
        let envelope: ApiEnvelope = serde_json::from_str(&read_body(response).await?)?;
        let data_url = envelope.data_url(endpoint)?;

        debug!(url = %data_url, "Requesting AEMET data");
        let response = self.client.get(data_url).send().await?;
        check_status(&response)?;
        let value = serde_json::from_str(&read_body(response).await?)?;
        Ok(value)
    }

    /// All observations of the last hours for one station
    pub async fn observations(&self, station_id: &str) -> Result<Vec<ObservationSnapshot>> {
        let endpoint = observation_endpoint(station_id)?;
        let value = self.fetch_data(&endpoint).await?;
        let observations: Vec<ObservationSnapshot> = serde_json::from_value(value)?;
        debug!(
            "Station {} returned {} observations",
            station_id,
            observations.len()
        );
        Ok(observations)
    }

    /// Most recent observation of one station, if it reported any
    pub async fn latest_observation(&self, station_id: &str) -> Result<Option<ObservationSnapshot>> {
        Ok(latest_observation(self.observations(station_id).await?))
    }

    /// Latest observations for several stations, requested concurrently
    ///
    /// Results come back in the order of `station_ids`. A failing station
    /// does not abort the others.
    pub async fn observations_for(
        &self,
        station_ids: &[String],
    ) -> Vec<(String, Result<Option<ObservationSnapshot>>)> {
        let mut results: Vec<(usize, String, Result<Option<ObservationSnapshot>>)> =
            stream::iter(station_ids.iter().enumerate())
                .map(|(index, station_id)| async move {
                    let result = self.latest_observation(station_id).await;
                    if let Err(e) = &result {
                        warn!("Observation lookup for {} failed: {}", station_id, e);
                    }
                    (index, station_id.clone(), result)
                })
                .buffer_unordered(self.max_concurrent_requests)
                .collect()
                .await;

        results.sort_by_key(|(index, _, _)| *index);
        results
            .into_iter()
            .map(|(_, station_id, result)| (station_id, result))
            .collect()
    }
}

impl RecordSource for AemetClient {
    fn name(&self) -> String {
        self.endpoint_url(STATION_INVENTORY_ENDPOINT)
    }

    async fn fetch_stations(&self) -> Result<Vec<RawStationRecord>> {
        let value = self.fetch_data(STATION_INVENTORY_ENDPOINT).await?;
        let records = records_from_json(&self.name(), value)?;
        info!("Fetched {} stations from AEMET OpenData", records.len());
        Ok(records)
    }
}

fn check_status(response: &Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(StationError::Api {
        status: status.as_u16(),
        message: status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP responder: maps request paths to (status, body)
    async fn serve(routes: Vec<(&'static str, u16, String)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut buffer = vec![0u8; 8192];
                    let mut read = 0;
                    while !buffer[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buffer[read..]).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => read += n,
                        }
                    }
                    let request = String::from_utf8_lossy(&buffer[..read]).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let (status, body) = routes
                        .iter()
                        .find(|(prefix, _, _)| path.starts_with(prefix))
                        .map(|(_, status, body)| (*status, body.clone()))
                        .unwrap_or((404, String::new()));

                    let response = format!(
                        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", address)
    }

    fn client(base_url: &str) -> AemetClient {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        };
        AemetClient::new(&config, "test-key").unwrap()
    }

    fn envelope(base_url: &str, data_path: &str) -> String {
        format!(
            r#"{{"descripcion":"exito","estado":200,"datos":"{}{}","metadatos":"{}/meta"}}"#,
            base_url, data_path, base_url
        )
    }

    #[test]
    fn test_envelope_data_url() {
        let ok: ApiEnvelope =
            serde_json::from_str(r#"{"descripcion":"exito","estado":200,"datos":"http://x/d"}"#)
                .unwrap();
        assert_eq!(ok.data_url("/e").unwrap(), "http://x/d");

        let missing: ApiEnvelope =
            serde_json::from_str(r#"{"descripcion":"exito","estado":200}"#).unwrap();
        assert!(matches!(
            missing.data_url("/e"),
            Err(StationError::MissingDataUrl { .. })
        ));

        let failed: ApiEnvelope = serde_json::from_str(
            r#"{"descripcion":"No hay datos que satisfagan esos criterios","estado":404}"#,
        )
        .unwrap();
        match failed.data_url("/e") {
            Err(StationError::Api { status, message }) => {
                assert_eq!(status, 404);
                assert!(message.starts_with("No hay datos"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_body_charsets() {
        assert_eq!(decode_body("CORUÑA".as_bytes(), None), "CORUÑA");
        assert_eq!(
            decode_body("CORUÑA €".as_bytes(), Some("application/json;charset=ISO-8859-15")),
            "CORUÑA €"
        );

        // Bytes where ISO-8859-15 and Latin-1 disagree
        let latin9 = [b'C', b'O', b'R', b'U', 0xD1, b'A', b' ', 0xA4, b' ', 0xBD, b' ', 0xA6];
        assert_eq!(decode_body(&latin9, None), "CORUÑA € œ Š");
        assert_eq!(
            decode_body(&latin9, Some("text/plain; charset=\"iso-8859-15\"")),
            "CORUÑA € œ Š"
        );
        // Unknown labels fall back to ISO-8859-15
        assert_eq!(
            decode_body(&latin9, Some("application/json; charset=x-unknown")),
            "CORUÑA € œ Š"
        );
        // A declared charset wins over the default
        assert_eq!(
            decode_body(&[0x80], Some("text/plain; charset=windows-1252")),
            "€"
        );
    }

    #[test]
    fn test_charset_encoding() {
        assert_eq!(
            charset_encoding("application/json; charset=ISO-8859-15"),
            Some(encoding_rs::ISO_8859_15)
        );
        assert_eq!(
            charset_encoding("application/json;Charset=utf-8"),
            Some(encoding_rs::UTF_8)
        );
        assert_eq!(charset_encoding("application/json"), None);
    }

    #[test]
    fn test_observation_endpoint_escapes_id() {
        assert_eq!(
            observation_endpoint("3195").unwrap(),
            "/observacion/convencional/datos/estacion/3195"
        );
        assert_eq!(
            observation_endpoint("3195?api_key=x/y#z").unwrap(),
            "/observacion/convencional/datos/estacion/3195%3Fapi_key%3Dx%2Fy%23z"
        );
        assert_eq!(
            observation_endpoint("../../valores").unwrap(),
            "/observacion/convencional/datos/estacion/..%2F..%2Fvalores"
        );
        assert!(matches!(
            observation_endpoint(".."),
            Err(StationError::Configuration { .. })
        ));
        assert!(observation_endpoint("  ").is_err());
    }

    #[tokio::test]
    async fn test_fetch_stations_two_step() {
        let data = r#"[{"indicativo":"3195","nombre":"MADRID, RETIRO","provincia":"MADRID","altitud":"667","latitud":"402443N","longitud":"034041W"}]"#;
        let data_server = serve(vec![("/sh/stations", 200, data.to_string())]).await;
        let api_server = serve(vec![(
            "/valores/climatologicos/inventarioestaciones",
            200,
            envelope(&data_server, "/sh/stations"),
        )])
        .await;

        let records = client(&api_server).fetch_stations().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].get("latitud"),
            Some(&Value::String("402443N".to_string()))
        );
    }

    #[tokio::test]
    async fn test_fetch_stations_http_error() {
        let api_server = serve(vec![(
            "/valores/climatologicos/inventarioestaciones",
            401,
            r#"{"descripcion":"API key invalido","estado":401}"#.to_string(),
        )])
        .await;

        let err = client(&api_server).fetch_stations().await.unwrap_err();
        assert!(matches!(err, StationError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_latest_observation_and_concurrent_lookups() {
        let observations = r#"[
            {"idema":"3195","fint":"2026-10-16T10:00:00+0000","ta":18.2,"hr":55.0},
            {"idema":"3195","fint":"2026-10-16T12:00:00+0000","ta":21.4,"hr":40.0},
            {"idema":"3195","fint":"2026-10-16T11:00:00+0000","ta":20.1}
        ]"#;
        let data_server = serve(vec![("/sh/obs", 200, observations.to_string())]).await;
        let api_server = serve(vec![
            (
                "/observacion/convencional/datos/estacion/3195",
                200,
                envelope(&data_server, "/sh/obs"),
            ),
            (
                "/observacion/convencional/datos/estacion/9999",
                200,
                r#"{"descripcion":"No hay datos que satisfagan esos criterios","estado":404}"#
                    .to_string(),
            ),
        ])
        .await;
        let client = client(&api_server);

        let latest = client.latest_observation("3195").await.unwrap().unwrap();
        assert_eq!(latest.temperature, Some(21.4));

        let ids = vec!["9999".to_string(), "3195".to_string()];
        let results = client.observations_for(&ids).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "9999");
        assert!(matches!(results[0].1, Err(StationError::Api { status: 404, .. })));
        assert_eq!(results[1].0, "3195");
        assert!(results[1].1.as_ref().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_station_id_stays_one_path_segment() {
        let observations = r#"[{"idema":"3195","fint":"2026-10-16T12:00:00+0000","ta":21.4}]"#;
        let data_server = serve(vec![("/sh/obs", 200, observations.to_string())]).await;
        let api_server = serve(vec![(
            "/observacion/convencional/datos/estacion/3195%3Fapi_key%3Dx%2Fy%23z?api_key=test-key",
            200,
            envelope(&data_server, "/sh/obs"),
        )])
        .await;
        let client = client(&api_server);

        let latest = client
            .latest_observation("3195?api_key=x/y#z")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.temperature, Some(21.4));

        // Only the escaped form is routed
        let err = client.latest_observation("3195").await.unwrap_err();
        assert!(matches!(err, StationError::Api { status: 404, .. }));
    }
}

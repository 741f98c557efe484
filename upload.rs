use std::time::Duration;

use crate::error::UploadError;
use crate::structs::CorrectedReading;

pub trait Reporter {
    /// Posts one reading, returning the server's response body.
    fn upload(&mut self, reading: &CorrectedReading) -> Result<String, UploadError>;
}

/// Weather Underground PWS upload.
/// cf. http://wiki.wunderground.com/index.php/PWS_-_Upload_Protocol
pub struct WundergroundReporter {
    agent: ureq::Agent,
    url: String,
    station_id: String,
    station_key: String,
}

impl WundergroundReporter {
    pub fn new(url: String, station_id: String, station_key: String, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("piweather/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            url,
            station_id,
            station_key,
        }
    }

    fn query(&self, reading: &CorrectedReading) -> Vec<(&'static str, String)> {
        vec![
            ("action", "updateraw".to_string()),
            ("ID", self.station_id.clone()),
            ("PASSWORD", self.station_key.clone()),
            ("dateutc", "now".to_string()),
            ("tempf", format!("{:.1}", reading.temp_f)),
            ("humidity", format!("{:.1}", reading.humidity_pct)),
            ("baromin", format!("{:.1}", reading.pressure_in_hg)),
        ]
    }
}

impl Reporter for WundergroundReporter {
    fn upload(&mut self, reading: &CorrectedReading) -> Result<String, UploadError> {
        let request = self
            .query(reading)
            .iter()
            .fold(self.agent.get(&self.url), |request, (key, value)| {
                request.query(key, value)
            });

        match request.call() {
            Ok(response) => Ok(response.into_string()?.trim().to_string()),
            Err(ureq::Error::Status(status, response)) => Err(UploadError::Status {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(e)) => Err(UploadError::Transport(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    fn reading() -> CorrectedReading {
        CorrectedReading {
            temp_c: 15.0,
            temp_f: 59.0,
            humidity_pct: 46.0,
            pressure_in_hg: 29.9,
        }
    }

    fn reporter(url: String) -> WundergroundReporter {
        WundergroundReporter::new(url, "KSTATION1".into(), "s3cret&key".into(), Duration::from_secs(5))
    }

    // Accepts one connection, answers with `status_line` and hands back the request line.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/weatherstation/updateweatherstation.php", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }
            write!(
                stream,
                "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            )
            .unwrap();
            request_line
        });
        (url, handle)
    }

    #[test]
    fn query_has_protocol_fields_in_order() {
        let keys: Vec<&str> = reporter("http://localhost".into())
            .query(&reading())
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, ["action", "ID", "PASSWORD", "dateutc", "tempf", "humidity", "baromin"]);
    }

    #[test]
    fn formats_values() {
        let query = reporter("http://localhost".into()).query(&CorrectedReading {
            temp_c: 22.0,
            temp_f: 71.6,
            humidity_pct: 40.0,
            pressure_in_hg: 30.0,
        });
        assert_eq!(query[4], ("tempf", "71.6".to_string()));
        assert_eq!(query[5], ("humidity", "40.0".to_string()));
        assert_eq!(query[6], ("baromin", "30.0".to_string()));
    }

    #[test]
    fn uploads_with_get() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", "success\n");
        let body = reporter(url).upload(&reading()).unwrap();
        assert_eq!(body, "success");

        let request_line = server.join().unwrap();
        assert!(request_line.starts_with("GET /weatherstation/updateweatherstation.php?"));
        assert!(request_line.contains("action=updateraw"));
        assert!(request_line.contains("ID=KSTATION1"));
        assert!(request_line.contains("PASSWORD=s3cret%26key"));
        assert!(request_line.contains("dateutc=now"));
        assert!(request_line.contains("tempf=59.0"));
        assert!(request_line.contains("humidity=46.0&"));
        assert!(request_line.contains("baromin=29.9"));
    }

    #[test]
    fn non_success_status_is_an_error() {
        let (url, server) = serve_once("HTTP/1.1 401 Unauthorized", "INVALIDPASSWORDID");
        match reporter(url).upload(&reading()) {
            Err(UploadError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "INVALIDPASSWORDID");
            }
            other => panic!("expected status error, got {:?}", other),
        }
        server.join().unwrap();
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let result = reporter(format!("http://127.0.0.1:{}/", port)).upload(&reading());
        assert!(matches!(result, Err(UploadError::Transport(_))));
    }
}

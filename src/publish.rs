//! Best-effort feature delivery to a local consumer.
//!
//! Each event becomes one JSON `POST` to the consumer endpoint. Nothing is
//! queued or retried; a failed send only loses that event. The response body
//! is ignored.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::features::FeatureEvent;

/// Sink for feature events.
pub trait FeaturePublisher {
    /// Deliver one event. An `Err` loses only this event.
    fn publish(&mut self, event: &FeatureEvent) -> Result<()>;
}

/// JSON-over-HTTP publisher.
pub struct HttpPublisher {
    agent: ureq::Agent,
    endpoint: String,
    sent: u64,
}

impl HttpPublisher {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self {
            agent,
            endpoint: endpoint.to_string(),
            sent: 0,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Events accepted by the consumer so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl FeaturePublisher for HttpPublisher {
    fn publish(&mut self, event: &FeatureEvent) -> Result<()> {
        let body = event.to_json().context("encode feature event")?;
        match self
            .agent
            .post(&self.endpoint)
            .set("Content-type", "application/json")
            .send_string(&body)
        {
            Ok(_) => {
                self.sent += 1;
                Ok(())
            }
            Err(ureq::Error::Status(code, _)) => Err(anyhow!(
                "consumer at {} answered HTTP {}",
                self.endpoint,
                code
            )),
            Err(err) => {
                Err(anyhow::Error::new(err).context(format!("send to {}", self.endpoint)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{ExtractedFeatures, GlobalDescriptor, RegionGrid};
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn event() -> FeatureEvent {
        let global = GlobalDescriptor::new(vec![0.5, -0.25]);
        let grid = RegionGrid::new(1, 2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        FeatureEvent::new(ExtractedFeatures::new(global, grid).unwrap(), 12.5)
    }

    /// Accept one request, answer 200 and hand back (request head, body).
    fn one_shot_consumer(listener: TcpListener) -> thread::JoinHandle<(String, String)> {
        thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("read header");
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().expect("content length");
                    }
                }
                head.push_str(&line);
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).expect("read body");
            let mut stream = stream;
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .expect("write response");
            (head, String::from_utf8(body).expect("utf8 body"))
        })
    }

    #[test]
    fn posts_json_event_to_features_path() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let consumer = one_shot_consumer(listener);

        let mut publisher = HttpPublisher::new(
            &format!("http://127.0.0.1:{}/features", port),
            Duration::from_secs(5),
        );
        publisher.publish(&event())?;
        assert_eq!(publisher.sent(), 1);

        let (head, body) = consumer.join().expect("consumer thread");
        assert!(head.starts_with("POST /features HTTP/1.1"), "head: {}", head);
        assert!(head.to_ascii_lowercase().contains("content-type: application/json"));

        let value: serde_json::Value = serde_json::from_str(&body)?;
        assert_eq!(value["clsFeatures"], serde_json::json!([0.5, -0.25]));
        assert_eq!(
            value["patchFeatures"],
            serde_json::json!([[[1.0, 2.0], [3.0, 4.0]]])
        );
        assert_eq!(value["timestamp"], serde_json::json!(12.5));
        Ok(())
    }

    #[test]
    fn connection_refused_is_reported_not_raised() -> Result<()> {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0")?;
            listener.local_addr()?.port()
        };
        let mut publisher = HttpPublisher::new(
            &format!("http://127.0.0.1:{}/features", port),
            Duration::from_millis(500),
        );
        assert!(publisher.publish(&event()).is_err());
        assert_eq!(publisher.sent(), 0);
        Ok(())
    }
}

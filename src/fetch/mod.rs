use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Status and body of one GET. Bodies of non-success responses are not read.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: StatusCode,
    pub body: String,
}

/// The network seam of the harvester. Transport faults (DNS, TLS, timeouts)
/// come back as `Err`; any HTTP response, whatever its status, is `Ok`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &Url, user_agent: &str, timeout: Duration)
        -> Result<FetchedPage>;
}

/// `reqwest`-backed fetcher used against www.sec.gov.
#[derive(Debug, Clone)]
pub struct EdgarClient {
    client: Client,
}

impl EdgarClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder().gzip(true).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for EdgarClient {
    async fn fetch_page(
        &self,
        url: &Url,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<FetchedPage> {
        log::debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, mime::TEXT_HTML.as_ref())
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        log::debug!("Response status: {}", status);

        if !status.is_success() {
            return Ok(FetchedPage {
                status,
                body: String::new(),
            });
        }

        let body = response.text().await?;
        log::debug!("Received content length: {}", body.len());

        Ok(FetchedPage { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    const CONTACT: &str = "research@example.com";

    /// Serves one connection with a canned response and hands back the raw
    /// request head. With `None` the connection is held open without answering.
    async fn serve_once(response: Option<String>) -> (Url, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let _ = tx.send(String::from_utf8_lossy(&head).to_string());
            match response {
                Some(response) => {
                    stream.write_all(response.as_bytes()).await.unwrap();
                    stream.shutdown().await.ok();
                }
                None => tokio::time::sleep(Duration::from_secs(5)).await,
            }
        });

        let url = Url::parse(&format!("http://{}/Archives/edgar/data/1/2/doc.htm", addr)).unwrap();
        (url, rx)
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    #[tokio::test]
    async fn test_fetch_page_sends_contact_header() {
        let (url, request) = serve_once(Some(http_response("200 OK", "<p>10-K</p>"))).await;
        let client = EdgarClient::new().unwrap();

        let page = client
            .fetch_page(&url, CONTACT, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(page.status, StatusCode::OK);
        assert_eq!(page.body, "<p>10-K</p>");

        let head = request.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /archives/edgar/data/1/2/doc.htm http/1.1"));
        assert!(head.contains(&format!("user-agent: {}\r\n", CONTACT)));
        assert!(head.contains("accept: text/html\r\n"));
    }

    #[tokio::test]
    async fn test_fetch_page_skips_error_bodies() {
        let (url, _request) =
            serve_once(Some(http_response("404 Not Found", "<h1>No such filing</h1>"))).await;
        let client = EdgarClient::new().unwrap();

        let page = client
            .fetch_page(&url, CONTACT, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(page.status, StatusCode::NOT_FOUND);
        assert!(page.body.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_page_applies_timeout() {
        let (url, _request) = serve_once(None).await;
        let client = EdgarClient::new().unwrap();

        let started = std::time::Instant::now();
        let result = client
            .fetch_page(&url, CONTACT, Duration::from_millis(200))
            .await;

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}

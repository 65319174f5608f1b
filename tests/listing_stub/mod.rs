use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum StubPage {
    Html(String),
    Status(u16),
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct StubRequest {
    pub page: u32,
    pub user_agent: Option<String>,
}

/// Serves `/search?...&page=N` from a fixed list of pages. Pages past the end
/// are valid HTML without listing items.
pub struct ListingStub {
    pub search_url: String,
    requests: Arc<Mutex<Vec<StubRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListingStub {
    pub fn spawn(pages: Vec<StubPage>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start listing stub server");
        let addr = server.server_addr();
        let search_url = format!("http://{addr}/search?q=subject%3AScience+fiction");

        let requests: Arc<Mutex<Vec<StubRequest>>> = Arc::default();
        let seen = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                let Some(page) = page_param(&url) else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("missing page").with_status_code(400),
                    );
                    continue;
                };
                let user_agent = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("User-Agent"))
                    .map(|h| h.value.as_str().to_owned());
                seen.lock()
                    .expect("lock stub requests")
                    .push(StubRequest { page, user_agent });

                let response = match pages.get(page as usize - 1) {
                    Some(StubPage::Html(html)) => html_response(html.clone(), 200),
                    Some(StubPage::Status(code)) => {
                        tiny_http::Response::from_string("error").with_status_code(*code)
                    }
                    None => html_response(listing_page(&[]), 200),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            search_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().expect("lock stub requests").clone()
    }

    #[allow(dead_code)]
    pub fn requested_pages(&self) -> Vec<u32> {
        self.requests().into_iter().map(|r| r.page).collect()
    }
}

impl Drop for ListingStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn page_param(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("page="))
        .and_then(|page| page.parse().ok())
        .filter(|page| *page >= 1)
}

fn html_response(html: String, status: u16) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let header =
        tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..])
            .expect("build header");
    tiny_http::Response::from_string(html)
        .with_status_code(status)
        .with_header(header)
}

#[allow(dead_code)]
pub fn listing_item(
    title: &str,
    author: &str,
    details: &str,
    rating: &str,
    want_to_read: &str,
    editions: Option<&str>,
) -> String {
    let editions = editions
        .map(|text| format!(r#"<a href="/works/x/editions">{text}</a>"#))
        .unwrap_or_default();
    format!(
        r#"<li class="searchResultItem">
  <div class="resultTitle"><h3 class="booktitle"><a href="/works/x">{title}</a></h3></div>
  <span class="bookauthor">{author}</span>
  <span class="resultDetails">{details}</span>
  <span itemprop="ratingValue">{rating}</span>
  <span itemprop="reviewCount">{want_to_read}</span>
  {editions}
</li>"#
    )
}

pub fn listing_page(items: &[String]) -> String {
    format!(
        "<!doctype html>\n<html><body><ul class=\"list-books\">{}</ul></body></html>\n",
        items.concat()
    )
}

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Request head (and body) as the destination received it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Canned response written back by the scripted destination.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    chunk_size: Option<usize>,
}

impl ScriptedResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            chunk_size: None,
        }
    }

    /// Send the body with `Transfer-Encoding: chunked`, one write per chunk.
    pub fn chunked(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size.max(1));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    fn head(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason(self.status));
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        let has_length = self
            .headers
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case("content-length"));
        if self.chunk_size.is_some() {
            head.push_str("Transfer-Encoding: chunked\r\n");
        } else if !has_length {
            head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        }
        head.push_str("Connection: close\r\n\r\n");
        head.into_bytes()
    }

    fn write_to(&self, writer: &mut impl Write) -> std::io::Result<()> {
        writer.write_all(&self.head())?;
        let Some(chunk_size) = self.chunk_size else {
            writer.write_all(&self.body)?;
            return writer.flush();
        };

        writer.flush()?;
        for chunk in self.body.chunks(chunk_size) {
            writer.write_all(format!("{:x}\r\n", chunk.len()).as_bytes())?;
            writer.write_all(chunk)?;
            writer.write_all(b"\r\n")?;
            writer.flush()?;
            // Give the proxy a chance to read each chunk on its own.
            thread::sleep(Duration::from_millis(2));
        }
        writer.write_all(b"0\r\n\r\n")?;
        writer.flush()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        404 => "Not Found",
        _ => "Status",
    }
}

/// Plain-TCP HTTP/1.1 destination answering every request with a script.
pub struct Upstream {
    port: u16,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl Upstream {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&CapturedRequest) -> ScriptedResponse + Send + Sync + 'static,
    {
        // Bound before returning, so no readiness polling is needed.
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind upstream");
        let port = listener.local_addr().expect("upstream addr").port();

        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(handler);

        let captured = requests.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let captured = captured.clone();
                let handler = handler.clone();
                thread::spawn(move || serve(stream, &captured, handler.as_ref()));
            }
        });

        Self { port, requests }
    }

    /// Answers every request with the same response.
    pub fn fixed(response: ScriptedResponse) -> Self {
        Self::start(move |_| response.clone())
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Absolute destination URL on this upstream.
    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn serve<F>(stream: TcpStream, captured: &Mutex<Vec<CapturedRequest>>, handler: &F)
where
    F: Fn(&CapturedRequest) -> ScriptedResponse,
{
    let mut writer = match stream.try_clone() {
        Ok(w) => w,
        Err(_) => return,
    };
    let mut reader = BufReader::new(stream);

    let Some(request) = read_request(&mut reader) else {
        return;
    };
    let response = handler(&request);
    captured.lock().unwrap().push(request);

    let _ = response.write_to(&mut writer);
}

fn read_request(reader: &mut BufReader<TcpStream>) -> Option<CapturedRequest> {
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(n, _)| n == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).ok()?;

    Some(CapturedRequest {
        method,
        path,
        headers,
        body,
    })
}

use std::io;
use std::net::{Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpListener, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use strand_http::connection::{DEFAULT_BUFFER_SIZE, HttpConnection, WorkerContext};
use strand_http::handler::Handler;
use strand_http::queue::{DEFAULT_QUEUE_CAPACITY, WorkQueue};
use thiserror::Error;
use tracing::{Level, error, info, trace, warn};
use tracing_subscriber::FmtSubscriber;

use crate::router::Router;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WORKERS: usize = 20;
pub const DEFAULT_SERVE_ROOT: &str = "serve";

#[derive(Debug)]
pub struct ServerBuilder {
    address: io::Result<Vec<SocketAddr>>,
    serve_root: PathBuf,
    workers: usize,
    queue_capacity: usize,
    buffer_size: usize,
}

impl ServerBuilder {
    fn new() -> Self {
        Self {
            address: Ok(vec![SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))]),
            serve_root: PathBuf::from(DEFAULT_SERVE_ROOT),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = address.to_socket_addrs().map(Iterator::collect);
        self
    }

    /// Directory whose files are served.
    pub fn serve_root(mut self, serve_root: impl Into<PathBuf>) -> Self {
        self.serve_root = serve_root.into();
        self
    }

    /// Number of worker threads, each serving one connection at a time.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Accepted connections allowed to wait for a free worker.
    pub fn queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Size of each worker's read window, the largest request accepted.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let address = self.address?;
        if address.is_empty() {
            return Err(ServerBuildError::MissingAddress);
        }
        if self.workers == 0 {
            return Err(ServerBuildError::NoWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ServerBuildError::NoQueueCapacity);
        }
        if self.buffer_size == 0 {
            return Err(ServerBuildError::NoBuffer);
        }

        Ok(Server {
            address,
            serve_root: self.serve_root,
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            buffer_size: self.buffer_size,
        })
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("address must resolve: {source}")]
    InvalidAddress {
        #[from]
        source: io::Error,
    },
    #[error("address must be set")]
    MissingAddress,
    #[error("at least one worker is required")]
    NoWorkers,
    #[error("queue capacity must be positive")]
    NoQueueCapacity,
    #[error("buffer size must be positive")]
    NoBuffer,
}

/// The strand origin server: one accept loop feeding a fixed pool of workers.
#[derive(Debug)]
pub struct Server {
    address: Vec<SocketAddr>,
    serve_root: PathBuf,
    workers: usize,
    queue_capacity: usize,
    buffer_size: usize,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Installs the log subscriber, binds and serves forever.
    pub fn start(self) -> io::Result<()> {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            warn!(cause = %e, "keeping the installed subscriber");
        }

        info!(address = ?self.address, serve_root = %self.serve_root.display(), workers = self.workers, "start listening");
        let listener = TcpListener::bind(self.address.as_slice()).inspect_err(|e| error!(cause = %e, "bind server error"))?;
        self.serve(listener)
    }

    /// Serves connections accepted on `listener`; only returns if a worker
    /// thread cannot be spawned.
    pub fn serve(self, listener: TcpListener) -> io::Result<()> {
        let queue = Arc::new(WorkQueue::with_capacity(self.queue_capacity));
        let router = Arc::new(Router::new(self.serve_root));

        for id in 0..self.workers {
            let queue = Arc::clone(&queue);
            let router = Arc::clone(&router);
            let buffer_size = self.buffer_size;
            thread::Builder::new()
                .name(format!("strand-worker-{id}"))
                .spawn(move || worker_loop(&queue, router.as_ref(), buffer_size))?;
        }

        loop {
            match listener.accept() {
                Ok((stream, _remote_addr)) => queue.enqueue(stream),
                Err(e) => warn!(cause = %e, "failed to accept"),
            }
        }
    }
}

fn worker_loop<H>(queue: &WorkQueue<TcpStream>, handler: &H, buffer_size: usize)
where
    H: Handler + ?Sized,
{
    let mut context = match WorkerContext::new(buffer_size) {
        Ok(context) => context,
        Err(e) => {
            error!(cause = %e, "can't allocate worker arena, worker exits");
            return;
        }
    };

    loop {
        let stream = queue.dequeue();
        serve_connection(&stream, handler, &mut context);
    }
}

fn serve_connection<H>(stream: &TcpStream, handler: &H, context: &mut WorkerContext)
where
    H: Handler + ?Sized,
{
    let peer = stream.peer_addr().ok();
    info!(peer = ?peer, "picked up connection");

    match HttpConnection::new(stream, stream, context).process(handler) {
        Ok(()) => info!(peer = ?peer, "finished process, connection shutdown"),
        Err(e) => error!(peer = ?peer, cause = %e, "service has error, connection shutdown"),
    }

    if let Err(e) = stream.shutdown(Shutdown::Write) {
        trace!(cause = %e, "shutdown of a closed connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    fn start(root: &TempDir) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Server::builder().serve_root(root.path()).workers(2).build().unwrap();
        thread::spawn(move || server.serve(listener));
        addr
    }

    fn site() -> TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(root.path().join("large.txt"), "compressible ".repeat(200)).unwrap();
        fs::create_dir(root.path().join("docs")).unwrap();
        fs::write(root.path().join("docs/index.html"), "<h1>docs</h1>").unwrap();
        root
    }

    /// Sends `request`, half-closes, and reads until the server closes.
    fn exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(request).unwrap();
        stream.shutdown(Shutdown::Write).unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).unwrap();
        response
    }

    fn exchange_str(addr: SocketAddr, request: &str) -> String {
        String::from_utf8(exchange(addr, request.as_bytes())).unwrap()
    }

    #[test]
    fn user_agent() {
        let root = site();
        let addr = start(&root);

        let response = exchange_str(addr, "GET /user-agent HTTP/1.1\r\nUser-Agent: test-agent\r\n\r\n");
        assert_eq!(response, "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 10\r\n\r\ntest-agent");

        let response = exchange_str(addr, "POST /user-agent HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi");
        assert_eq!(response, "HTTP/1.1 405 Method Not Allowed\r\nAllow: GET, HEAD\r\nContent-Length: 0\r\n\r\n");
    }

    #[test]
    fn echo() {
        let root = site();
        let addr = start(&root);

        let response = exchange_str(addr, "GET /echo/hello HTTP/1.1\r\n\r\n");
        assert_eq!(response, "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello");

        let response = exchange_str(addr, "GET /echo HTTP/1.1\r\n\r\n");
        assert_eq!(response, "HTTP/1.1 301 Moved Permanently\r\nLocation: /echo/\r\nContent-Length: 0\r\n\r\n");
    }

    #[test]
    fn static_files_and_redirects() {
        let root = site();
        let addr = start(&root);

        let response = exchange_str(addr, "GET / HTTP/1.1\r\n\r\n");
        assert_eq!(response, "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 13\r\n\r\n<h1>home</h1>");

        let response = exchange_str(addr, "GET /docs HTTP/1.1\r\n\r\n");
        assert_eq!(response, "HTTP/1.1 301 Moved Permanently\r\nLocation: /docs/\r\nContent-Length: 0\r\n\r\n");

        let response = exchange_str(addr, "GET /docs/index.html HTTP/1.1\r\n\r\n");
        assert_eq!(response, "HTTP/1.1 301 Moved Permanently\r\nLocation: /docs/\r\nContent-Length: 0\r\n\r\n");

        let response = exchange_str(addr, "HEAD /docs/ HTTP/1.1\r\n\r\n");
        assert_eq!(response, "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 13\r\n\r\n");
    }

    #[test]
    fn missing_file() {
        let root = site();
        let addr = start(&root);

        let response = exchange_str(addr, "GET /missing-file.txt HTTP/1.1\r\n\r\n");
        assert_eq!(response, "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");

        fs::write(root.path().join("404.html"), "nothing here").unwrap();
        let response = exchange_str(addr, "GET /missing-file.txt HTTP/1.1\r\n\r\n");
        assert_eq!(response, "HTTP/1.1 404 Not Found\r\nContent-Type: text/html\r\nContent-Length: 12\r\n\r\nnothing here");
    }

    #[test]
    fn request_target_encoding() {
        let root = site();
        fs::write(root.path().join("caf\u{e9}.txt"), "latte").unwrap();
        let addr = start(&root);

        let response = exchange_str(addr, "GET /caf\u{e9}.txt HTTP/1.1\r\n\r\n");
        assert_eq!(response, "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nlatte");

        let response = exchange(addr, b"GET /caf\xe9.txt HTTP/1.1\r\n\r\n");
        assert_eq!(response, b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
    }

    #[test]
    fn traversal() {
        let root = site();
        let addr = start(&root);

        let response = exchange_str(addr, "GET /../../etc/passwd HTTP/1.1\r\n\r\n");
        assert_eq!(response, "HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
    }

    #[test]
    fn gzip_negotiation() {
        let root = site();
        let addr = start(&root);

        let response = exchange(addr, b"GET /large.txt HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n");
        let split = response.windows(4).position(|window| window == b"\r\n\r\n").unwrap() + 4;
        let head = std::str::from_utf8(&response[..split]).unwrap();
        assert!(head.contains("Content-Encoding: gzip\r\n"), "{head}");

        let body = &response[split..];
        assert!(body.len() < 13 * 200);
        let mut decoded = String::new();
        GzDecoder::new(body).read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, "compressible ".repeat(200));

        let response = exchange_str(addr, "GET /echo/tiny HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n");
        assert_eq!(response, "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 4\r\n\r\ntiny");
    }

    #[test]
    fn pipelined_requests() {
        let root = site();
        let addr = start(&root);

        let response = exchange_str(addr, "GET /echo/one HTTP/1.1\r\n\r\nGET /echo/two HTTP/1.1\r\n\r\n");
        assert_eq!(
            response,
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 3\r\n\r\none\
             HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 3\r\n\r\ntwo"
        );
    }

    #[test]
    fn oversized_request() {
        let root = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Server::builder().serve_root(root.path()).workers(1).buffer_size(128).build().unwrap();
        thread::spawn(move || server.serve(listener));

        // exactly one window without a head terminator, so nothing is left unread
        let request = format!("GET /{}", "a".repeat(123));
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(request.as_bytes()).unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).unwrap();
        assert_eq!(response, b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
    }

    #[test]
    fn builder_validation() {
        assert!(matches!(Server::builder().workers(0).build(), Err(ServerBuildError::NoWorkers)));
        assert!(matches!(Server::builder().queue_capacity(0).build(), Err(ServerBuildError::NoQueueCapacity)));
        assert!(matches!(Server::builder().buffer_size(0).build(), Err(ServerBuildError::NoBuffer)));
        assert!(matches!(Server::builder().address("not an address").build(), Err(ServerBuildError::InvalidAddress { .. })));
        assert!(matches!(Server::builder().address(Vec::<SocketAddr>::new().as_slice()).build(), Err(ServerBuildError::MissingAddress)));

        let server = Server::builder().build().unwrap();
        assert_eq!(server.address, [SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))]);
        assert_eq!(server.serve_root, PathBuf::from(DEFAULT_SERVE_ROOT));
    }
}

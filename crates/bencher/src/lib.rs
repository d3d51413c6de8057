//! Shared fixtures for the strand benchmarks.

/// A raw request captured in `resources/request`.
#[derive(Debug, Copy, Clone)]
pub struct RequestFixture {
    name: &'static str,
    raw: &'static str,
}

impl RequestFixture {
    pub const fn new(name: &'static str, raw: &'static str) -> Self {
        Self { name, raw }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn raw(&self) -> &'static str {
        self.raw
    }

    /// Request target of the fixture, the second token of its request line.
    pub fn target(&self) -> &'static str {
        self.raw.split(' ').nth(1).unwrap_or("/")
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

pub static GET_SMALL: RequestFixture = RequestFixture::new("get_small", include_str!("../resources/request/get_small.txt"));
pub static GET_LARGE: RequestFixture = RequestFixture::new("get_large", include_str!("../resources/request/get_large.txt"));
pub static POST_BODY: RequestFixture = RequestFixture::new("post_body", include_str!("../resources/request/post_body.txt"));

pub fn request_fixtures() -> [RequestFixture; 3] {
    [GET_SMALL, GET_LARGE, POST_BODY]
}

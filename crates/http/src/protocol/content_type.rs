/// Media types the server emits in `Content-Type`.
///
/// `ApplicationOctetStream` is the default for content whose type is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    #[default]
    ApplicationOctetStream,
    ImageAvif,
    ImageBmp,
    ImageGif,
    ImageJpeg,
    ImagePng,
    ImageXIcon,
    ImageWebp,
    TextCss,
    TextHtml,
    TextJavascript,
    TextPlain,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::ApplicationOctetStream => "application/octet-stream",
            ContentType::ImageAvif => "image/avif",
            ContentType::ImageBmp => "image/bmp",
            ContentType::ImageGif => "image/gif",
            ContentType::ImageJpeg => "image/jpeg",
            ContentType::ImagePng => "image/png",
            ContentType::ImageXIcon => "image/x-icon",
            ContentType::ImageWebp => "image/webp",
            ContentType::TextCss => "text/css",
            ContentType::TextHtml => "text/html",
            ContentType::TextJavascript => "text/javascript",
            ContentType::TextPlain => "text/plain",
        }
    }
}

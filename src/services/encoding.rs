use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, warn};

/// Charset of a response body, as far as it can be told from the bytes.
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub encoding: &'static Encoding,
    pub had_bom: bool,
}

pub fn detect(bytes: &[u8]) -> Detection {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return Detection {
            encoding,
            had_bom: true,
        };
    }

    // Plain UTF-8 is by far the common case; skip the detector for it.
    if std::str::from_utf8(bytes).is_ok() {
        return Detection {
            encoding: UTF_8,
            had_bom: false,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);

    Detection {
        encoding: detector.guess(Some(b"de"), true),
        had_bom: false,
    }
}

/// Decodes a page body into text. Bytes the detected charset cannot map
/// become U+FFFD.
pub fn decode(bytes: &[u8]) -> String {
    let detection = detect(bytes);
    let (text, actual, had_errors) = detection.encoding.decode(bytes);

    if had_errors {
        warn!(encoding = actual.name(), "body contains undecodable bytes");
    } else if actual != UTF_8 {
        debug!(encoding = actual.name(), bom = detection.had_bom, "decoded non-UTF-8 body");
    }

    text.into_owned()
}

//! Stream locators.
//!
//! A [`StreamLocator`] is a media URL viewed as an authority/path plus an
//! ordered query multimap. The only mutation it offers is [`StreamLocator::append`]:
//! existing parameters are never replaced or reordered, and repeated keys keep
//! their insertion order. Serializing an untouched locator yields the string it
//! was parsed from (for already-normalized URLs).

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

/// A structured, additive-only media locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLocator {
    url: Url,
}

impl StreamLocator {
    /// Parse a media descriptor as a locator.
    ///
    /// Fails for strings that are not absolute URLs and for opaque
    /// references (`urn:`, `entity:` and similar) that have no authority to
    /// address a backend.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input.trim())
            .map_err(|e| Error::locator(format!("not a URL ({e}): {input}")))?;

        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(Error::locator(format!("opaque reference: {input}")));
        }

        Ok(Self { url })
    }

    /// Append a query parameter after all existing ones.
    pub fn append(&mut self, key: &str, value: &str) -> &mut Self {
        self.url.query_pairs_mut().append_pair(key, value);
        self
    }

    /// Append one parameter per value, keeping the order of `values`.
    pub fn append_all<I, S>(&mut self, key: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        {
            let mut pairs = self.url.query_pairs_mut();
            for value in values {
                pairs.append_pair(key, value.as_ref());
            }
        }
        self
    }

    /// All query parameters in order, decoded.
    pub fn params(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Every value recorded for `key`, in order.
    pub fn values(&self, key: &str) -> Vec<String> {
        self.url
            .query_pairs()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    /// Scheme, host and port, e.g. `https://media.example:8443`.
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// Scheme, authority and path without query or fragment.
    pub fn base(&self) -> String {
        let mut base = self.url.clone();
        base.set_query(None);
        base.set_fragment(None);
        base.to_string()
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

    pub fn into_string(self) -> String {
        self.url.into()
    }
}

impl fmt::Display for StreamLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_untouched() {
        for input in [
            "https://h/s?foo=1",
            "https://media.example:8443/hlsv2/abc/master.m3u8?a=1&a=2&b=x",
            "http://10.0.0.2:11470/stream/file.mkv",
        ] {
            let locator = StreamLocator::parse(input).unwrap();
            assert_eq!(locator.to_string(), input);
        }
    }

    #[test]
    fn test_append_is_additive() {
        let mut locator = StreamLocator::parse("https://h/s?foo=1&videoCodecs=vp9").unwrap();
        locator.append("videoCodecs", "h264");

        assert_eq!(locator.values("videoCodecs"), vec!["vp9", "h264"]);
        assert_eq!(locator.values("foo"), vec!["1"]);
        assert_eq!(
            locator.to_string(),
            "https://h/s?foo=1&videoCodecs=vp9&videoCodecs=h264"
        );
    }

    #[test]
    fn test_append_all_preserves_order() {
        let mut locator = StreamLocator::parse("https://h/s").unwrap();
        locator.append_all("audioCodecs", ["vorbis", "aac", "mp3"]);
        assert_eq!(locator.values("audioCodecs"), vec!["vorbis", "aac", "mp3"]);
        assert_eq!(
            locator.to_string(),
            "https://h/s?audioCodecs=vorbis&audioCodecs=aac&audioCodecs=mp3"
        );
    }

    #[test]
    fn test_append_keeps_fragment() {
        let mut locator = StreamLocator::parse("https://h/s?foo=1#t=10").unwrap();
        locator.append("maxAudioChannels", "2");
        assert_eq!(locator.to_string(), "https://h/s?foo=1&maxAudioChannels=2#t=10");
    }

    #[test]
    fn test_params_decoded() {
        let locator = StreamLocator::parse("https://h/s?name=a%20b&x=1").unwrap();
        assert_eq!(
            locator.params(),
            vec![
                ("name".to_string(), "a b".to_string()),
                ("x".to_string(), "1".to_string())
            ]
        );
    }

    #[test]
    fn test_rejects_opaque_references() {
        assert!(matches!(
            StreamLocator::parse("urn:stremio:tt0111161"),
            Err(Error::Locator(_))
        ));
        assert!(StreamLocator::parse("tt0111161").is_err());
        assert!(StreamLocator::parse("").is_err());
    }

    #[test]
    fn test_origin_and_base() {
        let locator =
            StreamLocator::parse("https://media.example:8443/hlsv2/abc/master.m3u8?x=1").unwrap();
        assert_eq!(locator.origin(), "https://media.example:8443");
        assert_eq!(locator.base(), "https://media.example:8443/hlsv2/abc/master.m3u8");
    }
}

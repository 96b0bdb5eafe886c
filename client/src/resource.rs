use core::fmt;

use url::Url;

const SEP: char = '/';

/// Gateway endpoint URL built from a base URI plus path pieces.
#[derive(Clone)]
pub struct Resource {
    url: Url,
}

impl Resource {
    #[must_use]
    pub fn new(uri: &str) -> Option<Resource> {
        let base = Url::parse(uri).ok()?;
        Some(Resource { url: base })
    }

    /// Appends path pieces, collapsing duplicate separators. A trailing
    /// separator on `path` is kept.
    pub fn append_path(&mut self, path: &str) -> &mut Self {
        let Some(segments) = self.url.path_segments() else {
            if let Ok(u) = self.url.join(path) {
                self.url = u;
            }
            return self;
        };

        let mut joined = segments
            .chain(path.split(SEP))
            .filter(|x| !x.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        if path.ends_with(SEP) {
            joined.push(SEP);
        }
        self.url.set_path(&joined);
        self
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

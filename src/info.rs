use std::fmt;

use crate::gl::Gl;

/// A version number for a specific component of an OpenGL implementation
#[derive(Clone, Eq, Ord, PartialEq, PartialOrd)]
pub struct Version {
    pub is_embedded: bool,
    pub major: u32,
    pub minor: u32,
    pub revision: Option<u32>,
    pub vendor_info: String,
}

impl Version {
    /// Create a new OpenGL version number
    pub fn new(major: u32, minor: u32, revision: Option<u32>, vendor_info: &str) -> Self {
        Version {
            is_embedded: false,
            major,
            minor,
            revision,
            vendor_info: vendor_info.to_string(),
        }
    }

    /// Create a new OpenGL ES version number
    pub fn new_embedded(major: u32, minor: u32, vendor_info: &str) -> Self {
        Version {
            is_embedded: true,
            major,
            minor,
            revision: None,
            vendor_info: vendor_info.to_string(),
        }
    }

    /// Get a tuple of (major, minor) versions
    pub fn tuple(&self) -> (u32, u32) {
        (self.major, self.minor)
    }

    /// According to the OpenGL specification, the version information is
    /// expected to follow the following syntax:
    ///
    /// ~~~bnf
    /// <major>       ::= <number>
    /// <minor>       ::= <number>
    /// <revision>    ::= <number>
    /// <vendor-info> ::= <string>
    /// <release>     ::= <major> "." <minor> ["." <release>]
    /// <version>     ::= <release> [" " <vendor-info>]
    /// ~~~
    ///
    /// Note that this function is intentionally lenient in regards to parsing,
    /// and will try to recover at least the first two version numbers without
    /// resulting in an `Err`.
    pub fn parse(mut src: &str) -> Result<Version, String> {
        let original = src;
        let es_sig = " ES ";
        let is_es = match src.rfind(es_sig) {
            Some(pos) => {
                src = &src[pos + es_sig.len()..];
                true
            }
            None => false,
        };
        let (version, vendor_info) = match src.find(' ') {
            Some(i) => (&src[..i], &src[i + 1..]),
            None => (src, ""),
        };

        let mut it = version.split('.');
        let major = it.next().and_then(|s| s.parse().ok());
        let minor = it.next().and_then(|s| s.parse().ok());
        let revision = it.next().and_then(|s| s.parse().ok());

        match (major, minor) {
            (Some(major), Some(minor)) => Ok(Version {
                is_embedded: is_es,
                major,
                minor,
                revision,
                vendor_info: vendor_info.to_string(),
            }),
            _ => Err(if is_es { src.to_string() } else { original.to_string() }),
        }
    }

    pub fn is_supported(&self, major: u32, minor: u32) -> bool {
        !self.is_embedded && (self.major, self.minor) >= (major, minor)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.major, self.minor, self.revision, &self.vendor_info[..]) {
            (major, minor, Some(revision), "") => write!(f, "{}.{}.{}", major, minor, revision),
            (major, minor, None, "") => write!(f, "{}.{}", major, minor),
            (major, minor, Some(revision), vendor_info) => {
                write!(f, "{}.{}.{}, {}", major, minor, revision, vendor_info)
            }
            (major, minor, None, vendor_info) => {
                write!(f, "{}.{}, {}", major, minor, vendor_info)
            }
        }
    }
}

/// OpenGL implementation information and the limits the device relies on.
#[derive(Debug)]
pub struct Info {
    pub vendor: String,
    pub renderer: String,
    pub version: Version,
    pub shading_language: Version,
    pub max_render_targets: i32,
    pub max_texture_units: i32,
    pub max_vertex_attributes: i32,
    pub max_elements_vertices: i32,
    pub max_elements_indices: i32,
}

pub fn query(gl: &dyn Gl) -> Info {
    let version = Version::parse(&gl.get_string(glow::VERSION))
        .unwrap_or_else(|s| {
            error!("Unparsable GL version string '{}'", s);
            Version::new(0, 0, None, "")
        });
    let shading_language = Version::parse(&gl.get_string(glow::SHADING_LANGUAGE_VERSION))
        .unwrap_or_else(|_| Version::new(0, 0, None, ""));
    Info {
        vendor: gl.get_string(glow::VENDOR),
        renderer: gl.get_string(glow::RENDERER),
        version,
        shading_language,
        max_render_targets: gl.get_integer(glow::MAX_DRAW_BUFFERS),
        max_texture_units: gl.get_integer(glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS),
        max_vertex_attributes: gl.get_integer(glow::MAX_VERTEX_ATTRIBS),
        max_elements_vertices: gl.get_integer(glow::MAX_ELEMENTS_VERTICES),
        max_elements_indices: gl.get_integer(glow::MAX_ELEMENTS_INDICES),
    }
}

impl Info {
    pub fn dump(&self) {
        info!("Vendor: {}", self.vendor);
        info!("Renderer: {}", self.renderer);
        info!("Version: {:?}", self.version);
        info!("Shading Language: {:?}", self.shading_language);
        info!("Max render targets: {}", self.max_render_targets);
        info!("Max texture units: {}", self.max_texture_units);
        info!("Max vertex attributes: {}", self.max_vertex_attributes);
        info!(
            "Max elements: {} vertices, {} indices",
            self.max_elements_vertices, self.max_elements_indices
        );
    }
}

//! Composition options and configuration.

/// Default `/Producer` written into composed documents.
pub const DEFAULT_PRODUCER: &str = concat!("pdfworker ", env!("CARGO_PKG_VERSION"));

/// Options for composing an output document.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Decode distinct sources in parallel
    pub parallel: bool,

    /// Flate-compress streams that are still uncompressed in the output
    pub compress: bool,

    /// Document information written into the output
    pub metadata: OutputMetadata,
}

impl ComposeOptions {
    /// Create new compose options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable parallel decoding.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel decoding.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Enable or disable output stream compression.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Set output metadata.
    pub fn with_metadata(mut self, metadata: OutputMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            compress: false,
            metadata: OutputMetadata::default(),
        }
    }
}

/// Document information dictionary of the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMetadata {
    /// Document title
    pub title: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Application that created the content
    pub creator: Option<String>,
    /// Application that produced the PDF
    pub producer: Option<String>,
    /// Write CreationDate/ModDate
    pub timestamps: bool,
}

impl OutputMetadata {
    /// Metadata with nothing but the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the creator.
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    /// Set or clear the producer.
    pub fn with_producer(mut self, producer: Option<String>) -> Self {
        self.producer = producer;
        self
    }

    /// Enable or disable timestamps.
    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }
}

impl Default for OutputMetadata {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            creator: None,
            producer: Some(DEFAULT_PRODUCER.to_string()),
            timestamps: true,
        }
    }
}

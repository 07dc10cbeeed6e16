//! Recursive, proxy-aware config loading.
//!
//! A document is read through the backend registered for its location,
//! deserialized into a generic structure and then parsed as the target type.
//! If that fails but the document is a [`ProxyConfig`], the loader follows the
//! proxy's reference and starts over on the referenced document. Every
//! `(location, path)` visited during one top-level call is kept in a chain; a
//! revisit fails with [`Error::CircularReference`].

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::storage::{path, Managers};
use crate::types::{DataFormat, Location, ProxyConfig};

/// Default ceiling on the number of documents in one resolution chain.
pub const DEFAULT_MAX_CHAIN_LENGTH: usize = 32;

type Chain = Vec<(Location, String)>;

/// Loads typed configs from any registered backend.
///
/// ```ignore
/// let managers = storage::default_managers(None)?;
/// let loader = ConfigLoader::new(&managers);
/// let cfg: GeneralConfig = loader.load_from_file(Location::Os, "setup/config.yaml", None)?;
/// ```
pub struct ConfigLoader<'a> {
    managers: &'a Managers,
    max_chain_length: Option<usize>,
}

impl<'a> ConfigLoader<'a> {
    pub fn new(managers: &'a Managers) -> Self {
        Self { managers, max_chain_length: Some(DEFAULT_MAX_CHAIN_LENGTH) }
    }

    /// Bounds acyclic proxy chains; `None` leaves only cycle detection.
    pub fn max_chain_length(mut self, max: Option<usize>) -> Self {
        self.max_chain_length = max;
        self
    }

    /// Reads the raw bytes at `(loc, path)` and determines their format,
    /// from `fmt` if given, otherwise from the file extension.
    pub fn get_file_contents(
        &self,
        loc: Location,
        path: &str,
        fmt: Option<DataFormat>,
    ) -> Result<(Vec<u8>, DataFormat)> {
        let manager = self.managers.get(&loc).ok_or(Error::UnsupportedBackend(loc))?;

        let fmt = match fmt {
            Some(fmt) => fmt,
            None => {
                let (_, _, ext) = manager.path_split(path);
                DataFormat::from_extension(&ext).ok_or_else(|| {
                    error!("unrecognised format '{}' of {}-file '{}'", ext, loc, path);
                    Error::UnsupportedFormat(if ext.is_empty() { path.to_string() } else { ext })
                })?
            }
        };

        let contents = manager.get_file(path).read_bytes().map_err(|e| {
            error!("could not load or read {}-file in '{}' - {}", loc, path, e);
            e
        })?;

        Ok((contents, fmt))
    }

    /// Loads the document at `(loc, path)`, following proxies.
    pub fn load_from_file<T: DeserializeOwned>(
        &self,
        loc: Location,
        path: &str,
        fmt: Option<DataFormat>,
    ) -> Result<T> {
        info!("Loading config {}/{}", loc, path);
        let mut chain = vec![(loc, path::normalize(path))];
        self.resolve_file(loc, path, fmt, &mut chain)
    }

    /// Loads a document from bytes already in hand, following proxies.
    pub fn load_from_contents<T: DeserializeOwned>(&self, contents: &[u8], fmt: DataFormat) -> Result<T> {
        let mut chain = Chain::new();
        self.resolve_contents(contents, fmt, &mut chain)
    }

    /// Loads the document a proxy points to.
    pub fn load_from_proxy<T: DeserializeOwned>(&self, proxy: &ProxyConfig) -> Result<T> {
        let mut chain = Chain::new();
        self.follow_proxy(proxy, &mut chain)
    }

    fn resolve_file<T: DeserializeOwned>(
        &self,
        loc: Location,
        path: &str,
        fmt: Option<DataFormat>,
        chain: &mut Chain,
    ) -> Result<T> {
        let (contents, fmt) = self.get_file_contents(loc, path, fmt)?;
        self.resolve_contents(&contents, fmt, chain)
    }

    fn resolve_contents<T: DeserializeOwned>(
        &self,
        contents: &[u8],
        fmt: DataFormat,
        chain: &mut Chain,
    ) -> Result<T> {
        let assets = parse_contents(contents, fmt)?;

        // Proxy parsing is only a fallback: its failure never hides the
        // primary error.
        let primary = match serde_json::from_value::<T>(assets.clone()) {
            Ok(cfg) => return Ok(cfg),
            Err(e) => e,
        };
        match serde_json::from_value::<ProxyConfig>(assets) {
            Ok(proxy) => self.follow_proxy(&proxy, chain),
            Err(_) => Err(Error::parse(fmt, primary)),
        }
    }

    fn follow_proxy<T: DeserializeOwned>(&self, proxy: &ProxyConfig, chain: &mut Chain) -> Result<T> {
        let target = &proxy.reference;
        let key = (target.location, path::normalize(&target.path));

        if chain.contains(&key) {
            chain.push(key);
            return Err(Error::CircularReference { chain: chain.clone() });
        }
        if let Some(max) = self.max_chain_length {
            if chain.len() >= max {
                chain.push(key);
                return Err(Error::ChainTooLong { max, chain: chain.clone() });
            }
        }

        debug!("Following proxy to {}/{}", target.location, target.path);
        chain.push(key);
        self.resolve_file(target.location, &target.path, target.format, chain)
    }
}

/// Deserializes bytes into a generic structure.
pub fn parse_contents(contents: &[u8], fmt: DataFormat) -> Result<Value> {
    match fmt {
        DataFormat::Json => serde_json::from_slice(contents).map_err(|e| Error::parse(fmt, e)),
        DataFormat::Yaml => serde_yaml_ng::from_slice(contents).map_err(|e| Error::parse(fmt, e)),
    }
}

/// A payload handed to [`PayloadParser::parse`].
#[derive(Debug, Clone)]
pub enum Payload<T> {
    /// Already the target type.
    Parsed(T),
    /// Serialized bytes.
    Raw(Vec<u8>),
}

/// Parses request payloads that may arrive typed, as bytes, or not at all
/// (in which case a configured default document is loaded).
pub struct PayloadParser<'a, T> {
    managers: &'a Managers,
    location: Option<Location>,
    root: Option<String>,
    max_chain_length: Option<usize>,
    _marker: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> PayloadParser<'a, T> {
    pub fn new(managers: &'a Managers) -> Self {
        Self {
            managers,
            location: None,
            root: None,
            max_chain_length: Some(DEFAULT_MAX_CHAIN_LENGTH),
            _marker: PhantomData,
        }
    }

    /// The document loaded when no payload is given.
    pub fn with_default(mut self, location: Location, root: impl Into<String>) -> Self {
        self.location = Some(location);
        self.root = Some(root.into());
        self
    }

    pub fn max_chain_length(mut self, max: Option<usize>) -> Self {
        self.max_chain_length = max;
        self
    }

    /// Resolves a payload.
    ///
    /// `format` is a declared format name or extension. Raw bytes default to
    /// JSON; the default document defaults to its file extension.
    pub fn parse(&self, payload: Option<Payload<T>>, format: Option<&str>) -> Result<T> {
        let fmt = format.map(str::parse::<DataFormat>).transpose()?;
        let loader = ConfigLoader::new(self.managers).max_chain_length(self.max_chain_length);

        match payload {
            Some(Payload::Parsed(value)) => Ok(value),
            Some(Payload::Raw(contents)) => {
                loader.load_from_contents(&contents, fmt.unwrap_or(DataFormat::Json))
            }
            None => match (self.location, self.root.as_deref()) {
                (Some(loc), Some(root)) => loader.load_from_file(loc, root, fmt),
                _ => Err(Error::MissingSource(std::any::type_name::<T>().to_string())),
            },
        }
    }
}

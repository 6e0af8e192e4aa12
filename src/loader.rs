use crate::error::{FxError, FxResult};
use log::debug;
use std::collections::HashMap;
use std::path::PathBuf;

pub type LoadFn = Box<dyn Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync>;

/// Ordered list of byte sources for named assets.
#[derive(Default)]
pub struct LoaderChain {
    loaders: Vec<(String, LoadFn)>,
}

impl LoaderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a loader; earlier loaders win.
    pub fn push(
        &mut self,
        label: impl Into<String>,
        f: impl Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync + 'static,
    ) {
        self.loaders.push((label.into(), Box::new(f)));
    }

    pub fn with(
        mut self,
        label: impl Into<String>,
        f: impl Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync + 'static,
    ) -> Self {
        self.push(label, f);
        self
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// First successful result in chain order.
    pub fn load(&self, name: &str) -> FxResult<Vec<u8>> {
        for (i, (label, f)) in self.loaders.iter().enumerate() {
            match f(name) {
                Ok(bytes) => return Ok(bytes),
                Err(err) => debug!("loader {i} ({label}) failed for {name:?}: {err:#}"),
            }
        }
        Err(FxError::NotFound(name.to_string()))
    }
}

/// Reads `root/name` from the file system.
pub fn fs_loader(
    root: impl Into<PathBuf>,
) -> impl Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync + 'static {
    let root = root.into();
    move |name| {
        let path = root.join(name);
        std::fs::read(&path).map_err(|e| anyhow::anyhow!("read {}: {e}", path.display()))
    }
}

/// Serves assets compiled into the binary.
pub fn embedded_loader(
    assets: HashMap<&'static str, &'static [u8]>,
) -> impl Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync {
    move |name| {
        assets
            .get(name)
            .map(|b| b.to_vec())
            .ok_or_else(|| anyhow::anyhow!("{name} is not embedded"))
    }
}

use crate::loader::LoaderChain;
use crate::palette::PaletteTable;

/// State shared by everything rendering within one run: the grayscale palette
/// and the asset loader chain. Independent runs own independent contexts.
#[derive(Default)]
pub struct RenderContext {
    pub palette: PaletteTable,
    pub loaders: LoaderChain,
}

impl RenderContext {
    pub fn new(palette: PaletteTable, loaders: LoaderChain) -> Self {
        Self { palette, loaders }
    }

    pub fn with_palette(mut self, palette: PaletteTable) -> Self {
        self.palette = palette;
        self
    }
}

//! Rendering options shared by the raster and vector outputs.

pub const MIN_SIZE_PX: u32 = 128;
pub const MAX_SIZE_PX: u32 = 512;
pub const SIZE_STEP_PX: u32 = 64;
/// Quiet zone around the symbol, in modules.
pub const MARGIN_MODULES: u32 = 2;

/// User-adjustable render options. Error correction is fixed at medium
/// (see `encoder::EC_LEVEL`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    size_px: u32,
    /// Dark module color, passed to the encoder as typed.
    pub foreground: String,
    /// Light module color, passed to the encoder as typed.
    pub background: String,
}

impl RenderOptions {
    /// Build options, snapping the size onto the 128..=512 / 64 grid.
    pub fn new(size_px: u32, foreground: impl Into<String>, background: impl Into<String>) -> Self {
        Self {
            size_px: snap_size(size_px),
            foreground: foreground.into(),
            background: background.into(),
        }
    }

    pub fn size_px(&self) -> u32 {
        self.size_px
    }

    /// One step larger; returns false at the maximum.
    pub fn grow(&mut self) -> bool {
        self.set_size(self.size_px.saturating_add(SIZE_STEP_PX))
    }

    /// One step smaller; returns false at the minimum.
    pub fn shrink(&mut self) -> bool {
        self.set_size(self.size_px.saturating_sub(SIZE_STEP_PX))
    }

    fn set_size(&mut self, size_px: u32) -> bool {
        let snapped = snap_size(size_px);
        let changed = snapped != self.size_px;
        self.size_px = snapped;
        changed
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::new(256, "#000000", "#FFFFFF")
    }
}

fn snap_size(size_px: u32) -> u32 {
    let clamped = size_px.clamp(MIN_SIZE_PX, MAX_SIZE_PX);
    MIN_SIZE_PX + (clamped - MIN_SIZE_PX) / SIZE_STEP_PX * SIZE_STEP_PX
}

/// Parse `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA` into RGBA bytes.
pub fn parse_hex_color(s: &str) -> Option<[u8; 4]> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).chain("ff".chars()).collect(),
        4 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => format!("{hex}ff"),
        8 => hex.to_string(),
        _ => return None,
    };
    let mut rgba = [0u8; 4];
    for (i, byte) in rgba.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&expanded[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_snaps_onto_step_grid() {
        assert_eq!(RenderOptions::new(0, "#000", "#fff").size_px(), 128);
        assert_eq!(RenderOptions::new(300, "#000", "#fff").size_px(), 256);
        assert_eq!(RenderOptions::new(4096, "#000", "#fff").size_px(), 512);
    }

    #[test]
    fn grow_and_shrink_stop_at_bounds() {
        let mut opts = RenderOptions::default();
        let mut seen = vec![opts.size_px()];
        while opts.grow() {
            seen.push(opts.size_px());
        }
        assert_eq!(seen, vec![256, 320, 384, 448, 512]);
        assert!(!opts.grow());
        while opts.shrink() {}
        assert_eq!(opts.size_px(), 128);
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex_color("#000000"), Some([0, 0, 0, 255]));
        assert_eq!(parse_hex_color("#FFFFFF"), Some([255, 255, 255, 255]));
        assert_eq!(parse_hex_color("#f80"), Some([255, 136, 0, 255]));
        assert_eq!(parse_hex_color("#0008"), Some([0, 0, 0, 0x88]));
        assert_eq!(parse_hex_color("#FfFf"), Some([255, 255, 255, 255]));
        assert_eq!(parse_hex_color("#11223380"), Some([0x11, 0x22, 0x33, 0x80]));
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("red"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }
}

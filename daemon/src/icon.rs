use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Raw pixel data as it arrives in an `image-data` hint:
/// width, height, rowstride, alpha flag, bits per sample, channel
/// count, and the pixel bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: i32,
    pub height: i32,
    pub rowstride: i32,
    pub has_alpha: bool,
    pub bits_per_sample: i32,
    pub channels: i32,
    pub data: Vec<u8>,
}

impl RawImage {
    /// Re-encodes the raw pixels as a PNG byte sequence. Malformed
    /// dimensions or truncated pixel data yield `None`; the caller
    /// degrades to an event without the picture.
    pub fn encode_png(&self) -> Option<Vec<u8>> {
        if self.width <= 0 || self.height <= 0 || self.rowstride <= 0 {
            return None;
        }
        if self.bits_per_sample != 8 {
            return None;
        }
        let channels: usize = if self.has_alpha { 4 } else { 3 };
        if self.channels != channels as i32 {
            return None;
        }

        let width = self.width as usize;
        let height = self.height as usize;
        let rowstride = self.rowstride as usize;
        let row_len = width * channels;

        // Rows may be padded out to the rowstride; repack them tight.
        let mut pixels = Vec::with_capacity(row_len * height);
        for row in 0..height {
            let start = row * rowstride;
            pixels.extend_from_slice(self.data.get(start..start + row_len)?);
        }

        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, self.width as u32, self.height as u32);
        encoder.set_color(if self.has_alpha {
            png::ColorType::Rgba
        } else {
            png::ColorType::Rgb
        });
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().ok()?;
        writer.write_image_data(&pixels).ok()?;
        writer.finish().ok()?;

        Some(out)
    }
}

/// Resolves icon names and desktop-entry ids against the filesystem.
///
/// Built once at startup from the XDG data directories; lookups never
/// fail hard, a miss degrades to `None` / the package-name fallback.
pub struct IconResolver {
    icons: HashMap<String, PathBuf>,
    app_names: HashMap<String, String>,
}

impl IconResolver {
    pub fn from_xdg() -> Self {
        let mut data_dirs: Vec<PathBuf> = Vec::new();
        if let Some(home) = xdg::BaseDirectories::new().get_data_home() {
            data_dirs.push(home);
        }
        match std::env::var("XDG_DATA_DIRS") {
            Ok(paths) => data_dirs.extend(paths.split(':').map(PathBuf::from)),
            Err(_) => data_dirs.push(PathBuf::from("/usr/share")),
        }

        let icon_dirs: Vec<PathBuf> = data_dirs.iter().map(|d| d.join("icons")).collect();
        let app_dirs: Vec<PathBuf> = data_dirs.iter().map(|d| d.join("applications")).collect();
        Self::with_paths(&icon_dirs, &app_dirs)
    }

    pub fn with_paths(icon_dirs: &[PathBuf], app_dirs: &[PathBuf]) -> Self {
        let mut icons = HashMap::new();
        for dir in icon_dirs {
            scan_icons(dir, &mut icons);
        }

        let mut app_names = HashMap::new();
        for dir in app_dirs {
            scan_desktop_entries(dir, &mut app_names);
        }

        debug!(
            icons = icons.len(),
            applications = app_names.len(),
            "icon resolver ready"
        );
        Self { icons, app_names }
    }

    /// Empty resolver; every lookup misses.
    pub fn empty() -> Self {
        Self {
            icons: HashMap::new(),
            app_names: HashMap::new(),
        }
    }

    /// PNG bytes for an icon name or absolute icon path.
    pub fn app_icon(&self, icon_name: &str) -> Option<Vec<u8>> {
        if icon_name.is_empty() {
            return None;
        }
        let path = Path::new(icon_name);
        if path.is_absolute() {
            return load_png(path);
        }
        self.icons.get(icon_name).and_then(|p| load_png(p))
    }

    /// Display name from the desktop entry for a package id.
    pub fn app_name(&self, package: &str) -> Option<String> {
        self.app_names.get(package).cloned()
    }

    /// File contents named by an `image-path` hint, when it is a PNG.
    pub fn picture_from_path(&self, path: &str) -> Option<Vec<u8>> {
        load_png(Path::new(path))
    }
}

fn load_png(path: &Path) -> Option<Vec<u8>> {
    let bytes = fs::read(path).ok()?;
    if bytes.starts_with(&PNG_SIGNATURE) {
        Some(bytes)
    } else {
        None
    }
}

fn scan_icons(path: &Path, buf: &mut HashMap<String, PathBuf>) {
    // Early return if its not a scannable directory
    if !path.exists() || !path.is_dir() {
        return;
    }

    let Ok(entries) = fs::read_dir(path) else {
        return;
    };
    for entry in entries.flatten() {
        let entry_path = entry.path();
        if entry_path.is_dir() {
            scan_icons(&entry_path, buf);
        } else if let Some(ext) = entry_path.extension().and_then(|e| e.to_str()) {
            if ext.eq_ignore_ascii_case("png") {
                if let Some(stem) = entry_path.file_stem().and_then(|s| s.to_str()) {
                    buf.entry(stem.to_string()).or_insert(entry_path);
                }
            }
        }
    }
}

fn scan_desktop_entries(path: &Path, buf: &mut HashMap<String, String>) {
    let Ok(entries) = fs::read_dir(path) else {
        return;
    };
    for entry in entries.flatten() {
        let entry_path = entry.path();
        let is_desktop = entry_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext == "desktop");
        if !is_desktop {
            continue;
        }
        let Some(stem) = entry_path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Some(name) = desktop_entry_name(&entry_path) {
            buf.entry(stem.to_string()).or_insert(name);
        }
    }
}

fn desktop_entry_name(path: &Path) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;
    contents
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("Name="))
        .map(str::to_owned)
}

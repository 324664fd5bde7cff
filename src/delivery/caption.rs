use crate::provider::ImageResult;

pub const RESIZE_MARKER: &str = " <resize>";
pub const CAPTION_LIMIT: usize = 1024;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Size in megabytes with one decimal, rounding halves away from zero.
pub fn size_mb(byte_size: u64) -> String {
    let megabytes = byte_size as f64 / BYTES_PER_MB;
    format!("{:.1}", (megabytes * 10.0).round() / 10.0)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn finish(body: &str, resized: bool) -> String {
    let suffix = if resized { RESIZE_MARKER } else { "" };
    let budget = CAPTION_LIMIT - suffix.chars().count();
    format!("{}{suffix}", truncate_chars(body, budget))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCaption {
    headline: String,
    full: String,
}

impl ImageCaption {
    pub fn new(display_name: &str, sequence_number: u32, image: &ImageResult) -> Self {
        let headline = format!("{display_name} №{sequence_number}");
        let tags = image.tag_line();
        let mut full = headline.clone();
        if !tags.is_empty() {
            full.push(' ');
            full.push_str(&tags);
        }
        full.push_str(&format!(
            " ({}x{} pix, {} Mb)",
            image.width,
            image.height,
            size_mb(image.byte_size)
        ));
        Self { headline, full }
    }

    /// `Waifu №1`, used on the photo when the Info button carries the details.
    pub fn headline(&self, resized: bool) -> String {
        finish(&self.headline, resized)
    }

    pub fn full(&self, resized: bool) -> String {
        finish(&self.full, resized)
    }
}

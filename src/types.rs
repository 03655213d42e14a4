//! Core data structures shared across the extraction, matching, and
//! identification stages.

/// A decoded, orientation-normalized bitmap fed to the engine.
///
/// `data` is row-major, top-to-bottom, with `depth` bits per pixel
/// (8 for grayscale, 24 for RGB).
#[derive(Debug, Clone)]
pub struct Image {
    pub width: u16,
    pub height: u16,
    pub depth: u8,
    pub data: Vec<u8>,
}

impl Image {
    pub fn new(width: u16, height: u16, depth: u8, data: Vec<u8>) -> Self {
        debug_assert!(depth == 8 || depth == 24, "depth must be 8 or 24 bits");
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * depth as usize / 8,
            "image buffer size does not match width * height * depth"
        );
        Image {
            width,
            height,
            depth,
            data,
        }
    }
}

/// An ordered sequence of images representing one subject.
pub type Multiface = Vec<Image>;

/// Engine-routing tag; purely informational to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateRole {
    InitV,
    Verification,
    InitI,
    Identification,
}

/// A single descriptor record as stored in the binary descriptor file.
///
/// `label > 0`: successful extraction, absolute value is the class id.
/// `label < 0`: electively refused; `payload` is all zero bytes.
/// `label == 0`: reserved/invalid, must never reach a matching stage.
#[derive(Debug, Clone)]
pub struct DescriptorRecord {
    pub label: i32,
    pub payload: Vec<u8>,
}

impl DescriptorRecord {
    pub fn is_refused(&self) -> bool {
        self.label < 0
    }

    /// The absolute class id, regardless of refusal status.
    pub fn class_id(&self) -> i32 {
        self.label.abs()
    }
}

/// One candidate returned by an identification search.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub assigned: bool,
    pub template_id: String,
    pub similarity_score: f64,
}

impl Candidate {
    /// Parse the class id out of a `"<seq>_<class_id>"` template id, using
    /// the first underscore as the separator. `"none"` means unassigned.
    pub fn parsed_class_id(&self) -> Option<i32> {
        parse_template_id(&self.template_id)
    }
}

/// Parse a `"<seq>_<class_id>"` template id into its class id component.
/// Returns `None` for the sentinel `"none"`.
pub fn parse_template_id(template_id: &str) -> Option<i32> {
    if template_id == "none" {
        return None;
    }
    let underscore = template_id.find('_')?;
    template_id[underscore + 1..].parse().ok()
}

/// One logical template: one or more image paths sharing a class id.
#[derive(Debug, Clone)]
pub struct TemplateSpec {
    pub class_id: i32,
    pub paths: Vec<String>,
}

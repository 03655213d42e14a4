//! The engine contract: the trait boundary every pluggable face
//! recognition backend implements, and the status type its operations
//! return.
//!
//! This mirrors the abstract `Interface` / `IdentInterface` pair from the
//! reference API — one trait per pipeline (verification, identification)
//! so an engine author only implements what their backend supports.

mod stub;

pub use stub::StubEngine;

use crate::types::{Candidate, Multiface, TemplateRole};

/// Closed set of outcomes an engine call can report. `Success` is the
/// only code that does not abort the calling driver; `RefuseInput` is
/// the only failure a driver treats as expected (encoded as a negative
/// label rather than propagated as an error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCode {
    Success,
    ConfigError,
    RefuseInput,
    ExtractError,
    ParseError,
    TemplateCreationError,
    VerifTemplateError,
    FaceDetectionError,
    NumDataError,
    TemplateFormatError,
    InitDirError,
    InputLocationError,
    MemoryError,
    NotImplemented,
    VendorError,
}

impl std::fmt::Display for EngineCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            EngineCode::Success => "success",
            EngineCode::ConfigError => "error reading configuration files",
            EngineCode::RefuseInput => "elective refusal to process the input",
            EngineCode::ExtractError => "involuntary failure to process the image",
            EngineCode::ParseError => "cannot parse the input data",
            EngineCode::TemplateCreationError => "elective refusal to produce a template",
            EngineCode::VerifTemplateError => "one or both input templates were the result of failed feature extraction",
            EngineCode::FaceDetectionError => "unable to detect a face in the image",
            EngineCode::NumDataError => "number of input images not supported",
            EngineCode::TemplateFormatError => "template is an incorrect format or defective",
            EngineCode::InitDirError => "an operation on the init directory failed",
            EngineCode::InputLocationError => "cannot locate the input data",
            EngineCode::MemoryError => "memory allocation failed",
            EngineCode::NotImplemented => "function is not implemented",
            EngineCode::VendorError => "vendor-defined error",
        };
        write!(f, "{text}")
    }
}

/// What every engine call returns: a closed result code plus a free-form
/// diagnostic string (often empty on success).
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub code: EngineCode,
    pub info: String,
}

impl EngineStatus {
    pub fn ok() -> Self {
        EngineStatus { code: EngineCode::Success, info: String::new() }
    }

    pub fn new(code: EngineCode, info: impl Into<String>) -> Self {
        EngineStatus { code, info: info.into() }
    }

    pub fn is_success(&self) -> bool {
        self.code == EngineCode::Success
    }

    pub fn is_refusal(&self) -> bool {
        self.code == EngineCode::RefuseInput
    }
}

/// One eye center per detected face, in image-relative coordinates.
/// Carried through the verification/identification contracts for parity
/// with the reference API; the harness itself never reads it back.
pub type EyeCoordinates = Vec<(f32, f32)>;

/// The 1:1 verification pipeline: build a template from a face (or pair
/// of faces), then compare two templates for similarity.
pub trait VerificationEngine: Send + Sync {
    fn initialize(&mut self, config_dir: &str) -> EngineStatus;

    /// Turn one or more images of a subject into an opaque template byte
    /// vector, plus detected eye coordinates and an overall quality score.
    /// A `RefuseInput` status means the caller should encode this record
    /// as an elective refusal rather than abort the run. Neither `eyes`
    /// nor `quality` feed any downstream decision in this harness; they
    /// exist only because the contract it mirrors exposes them.
    fn create_template(&self, faces: &Multiface, role: TemplateRole, templ: &mut Vec<u8>, eyes: &mut EyeCoordinates, quality: &mut f64) -> EngineStatus;

    /// Compare two templates, writing the similarity score to `similarity`.
    fn match_templates(&self, verif_templ: &[u8], reference_templ: &[u8], similarity: &mut f64) -> EngineStatus;

    /// Retrain the engine's model from `config_dir` into `trained_config_dir`.
    /// Out of scope for the reference stub; not invoked by any harness stage.
    fn train(&mut self, config_dir: &str, trained_config_dir: &str) -> EngineStatus;
}

/// The 1:N identification pipeline: build templates, maintain a gallery,
/// and search it.
pub trait IdentificationEngine: Send + Sync {
    fn initialize_template_creation(&mut self, config_dir: &str, role: TemplateRole) -> EngineStatus;

    fn create_template(&self, faces: &Multiface, role: TemplateRole, templ: &mut Vec<u8>, eyes: &mut EyeCoordinates) -> EngineStatus;

    fn finalize_init(&mut self, config_dir: &str, init_dir: &str, edb: &str, edb_manifest: &str) -> EngineStatus;

    fn initialize_identification(&mut self, config_dir: &str, init_dir: &str) -> EngineStatus;

    /// Search the gallery, writing up to `candidate_list_length` hits into
    /// `candidate_list` (highest similarity first) and a binary match
    /// decision into `decision`.
    fn identify_template(
        &self,
        id_template: &[u8],
        candidate_list_length: u32,
        candidate_list: &mut Vec<Candidate>,
        decision: &mut bool,
    ) -> EngineStatus;

    fn gallery_insert_id(&mut self, templ: &[u8], id: &str) -> EngineStatus;

    fn gallery_delete_id(&mut self, id: &str) -> EngineStatus;
}

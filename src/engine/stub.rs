//! A deterministic, in-memory reference engine. It makes no accuracy
//! claims — its templates and similarity function exist only so the
//! harness's pipelines are exercisable end to end without a real
//! recognition backend wired in.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHasher;
use std::hash::Hasher;

use super::{EngineCode, EngineStatus, EyeCoordinates, IdentificationEngine, VerificationEngine};
use crate::types::{Candidate, Multiface, TemplateRole};

/// Fixed template size the stub always produces.
const STUB_DESC_SIZE: usize = 16;

/// A reference `VerificationEngine` + `IdentificationEngine` implementation.
///
/// Templates are an `ahash` digest of the concatenated image bytes,
/// repeated to fill [`STUB_DESC_SIZE`] bytes; similarity between two
/// templates is the fraction of matching bytes. An empty `faces` list is
/// treated as an elective refusal, mirroring the reference API's
/// `RefuseInput` contract for unusable input.
pub struct StubEngine {
    gallery: Vec<(String, Vec<u8>)>,
    next_seq: u64,
}

impl Default for StubEngine {
    fn default() -> Self {
        StubEngine { gallery: Vec::new(), next_seq: 0 }
    }
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn digest(faces: &Multiface) -> Vec<u8> {
        let mut hasher = AHasher::default();
        for image in faces {
            hasher.write_u16(image.width);
            hasher.write_u16(image.height);
            hasher.write(&image.data);
        }
        let digest = hasher.finish().to_le_bytes();
        digest.iter().cycle().take(STUB_DESC_SIZE).copied().collect()
    }

    fn similarity(a: &[u8], b: &[u8]) -> f64 {
        if a.is_empty() || b.is_empty() || a.len() != b.len() {
            return 0.0;
        }
        let matching = a.iter().zip(b).filter(|(x, y)| x == y).count();
        matching as f64 / a.len() as f64
    }
}

/// A max-heap entry for top-k candidate selection. Ties on `similarity`
/// are broken by `seq`, a strictly increasing insertion counter, so two
/// gallery entries with identical scores are never collapsed into one
/// slot the way a `BTreeMap<OrderedFloat, _>` keyed purely on score
/// would collapse them.
struct HeapEntry {
    similarity: f64,
    seq: u64,
    id: String,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.similarity == other.similarity && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; we want the *lowest* ranked entry to
        // surface first so it can be evicted when the heap exceeds k, so
        // this reverses the natural "bigger similarity wins" order.
        match other.similarity.partial_cmp(&self.similarity) {
            Some(Ordering::Equal) | None => other.seq.cmp(&self.seq),
            Some(ordering) => ordering,
        }
    }
}

impl VerificationEngine for StubEngine {
    fn initialize(&mut self, _config_dir: &str) -> EngineStatus {
        EngineStatus::ok()
    }

    fn create_template(
        &self,
        faces: &Multiface,
        _role: TemplateRole,
        templ: &mut Vec<u8>,
        eyes: &mut EyeCoordinates,
        quality: &mut f64,
    ) -> EngineStatus {
        eyes.clear();
        *quality = 0.0;
        if faces.is_empty() {
            templ.clear();
            return EngineStatus::new(EngineCode::RefuseInput, "no input images");
        }
        *templ = Self::digest(faces);
        *quality = 1.0;
        EngineStatus::ok()
    }

    fn match_templates(&self, verif_templ: &[u8], reference_templ: &[u8], similarity: &mut f64) -> EngineStatus {
        if verif_templ.is_empty() || reference_templ.is_empty() {
            *similarity = 0.0;
            return EngineStatus::new(EngineCode::VerifTemplateError, "empty template");
        }
        *similarity = Self::similarity(verif_templ, reference_templ);
        EngineStatus::ok()
    }

    fn train(&mut self, _config_dir: &str, _trained_config_dir: &str) -> EngineStatus {
        EngineStatus::new(EngineCode::NotImplemented, "training is out of scope for the reference stub")
    }
}

impl IdentificationEngine for StubEngine {
    fn initialize_template_creation(&mut self, _config_dir: &str, _role: TemplateRole) -> EngineStatus {
        EngineStatus::ok()
    }

    fn create_template(
        &self,
        faces: &Multiface,
        _role: TemplateRole,
        templ: &mut Vec<u8>,
        eyes: &mut EyeCoordinates,
    ) -> EngineStatus {
        eyes.clear();
        if faces.is_empty() {
            templ.clear();
            return EngineStatus::new(EngineCode::RefuseInput, "no input images");
        }
        *templ = Self::digest(faces);
        EngineStatus::ok()
    }

    fn finalize_init(&mut self, _config_dir: &str, _init_dir: &str, _edb: &str, _edb_manifest: &str) -> EngineStatus {
        EngineStatus::ok()
    }

    fn initialize_identification(&mut self, _config_dir: &str, _init_dir: &str) -> EngineStatus {
        EngineStatus::ok()
    }

    fn identify_template(
        &self,
        id_template: &[u8],
        candidate_list_length: u32,
        candidate_list: &mut Vec<Candidate>,
        decision: &mut bool,
    ) -> EngineStatus {
        candidate_list.clear();
        *decision = false;

        if id_template.is_empty() {
            return EngineStatus::new(EngineCode::VerifTemplateError, "empty query template");
        }

        let k = candidate_list_length as usize;
        if k == 0 {
            return EngineStatus::ok();
        }

        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(k + 1);
        for (seq, (id, templ)) in self.gallery.iter().enumerate() {
            let similarity = Self::similarity(id_template, templ);
            heap.push(HeapEntry { similarity, seq: seq as u64, id: id.clone() });
            if heap.len() > k {
                heap.pop();
            }
        }

        let mut entries: Vec<HeapEntry> = heap.into_vec();
        entries.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.seq.cmp(&b.seq))
        });

        for entry in entries {
            candidate_list.push(Candidate {
                assigned: true,
                template_id: entry.id,
                similarity_score: entry.similarity,
            });
        }

        if let Some(best) = candidate_list.first() {
            *decision = best.similarity_score > 0.5;
        }

        EngineStatus::ok()
    }

    fn gallery_insert_id(&mut self, templ: &[u8], id: &str) -> EngineStatus {
        if templ.is_empty() {
            return EngineStatus::new(EngineCode::TemplateFormatError, "cannot insert empty template");
        }
        self.gallery.push((id.to_string(), templ.to_vec()));
        self.next_seq += 1;
        EngineStatus::ok()
    }

    fn gallery_delete_id(&mut self, id: &str) -> EngineStatus {
        let before = self.gallery.len();
        self.gallery.retain(|(gallery_id, _)| gallery_id != id);
        if self.gallery.len() == before {
            return EngineStatus::new(EngineCode::InputLocationError, format!("id not found: {id}"));
        }
        EngineStatus::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Image;

    fn face(seed: u8) -> Multiface {
        vec![Image::new(2, 2, 8, vec![seed; 4])]
    }

    #[test]
    fn create_template_refuses_empty_input() {
        let engine = StubEngine::new();
        let mut templ = Vec::new();
        let mut eyes = EyeCoordinates::new();
        let mut quality = 0.0;
        let status = VerificationEngine::create_template(&engine, &[], TemplateRole::InitV, &mut templ, &mut eyes, &mut quality);
        assert_eq!(status.code, EngineCode::RefuseInput);
        assert!(templ.is_empty());
    }

    #[test]
    fn identical_faces_match_with_similarity_one() {
        let engine = StubEngine::new();
        let mut t1 = Vec::new();
        let mut t2 = Vec::new();
        let mut eyes = EyeCoordinates::new();
        let mut quality = 0.0;
        VerificationEngine::create_template(&engine, &face(7), TemplateRole::InitV, &mut t1, &mut eyes, &mut quality);
        VerificationEngine::create_template(&engine, &face(7), TemplateRole::Verification, &mut t2, &mut eyes, &mut quality);

        let mut similarity = 0.0;
        let status = engine.match_templates(&t1, &t2, &mut similarity);
        assert!(status.is_success());
        assert_eq!(similarity, 1.0);
    }

    #[test]
    fn different_faces_do_not_match_perfectly() {
        let engine = StubEngine::new();
        let mut t1 = Vec::new();
        let mut t2 = Vec::new();
        let mut eyes = EyeCoordinates::new();
        let mut quality = 0.0;
        VerificationEngine::create_template(&engine, &face(7), TemplateRole::InitV, &mut t1, &mut eyes, &mut quality);
        VerificationEngine::create_template(&engine, &face(99), TemplateRole::Verification, &mut t2, &mut eyes, &mut quality);

        let mut similarity = 0.0;
        engine.match_templates(&t1, &t2, &mut similarity);
        assert!(similarity < 1.0);
    }

    #[test]
    fn identify_returns_top_k_best_first() {
        let mut engine = StubEngine::new();
        let mut eyes = EyeCoordinates::new();
        for seed in 0..5u8 {
            let mut templ = Vec::new();
            IdentificationEngine::create_template(&engine, &face(seed), TemplateRole::InitI, &mut templ, &mut eyes);
            engine.gallery_insert_id(&templ, &format!("0_{seed}"));
        }

        let mut query = Vec::new();
        IdentificationEngine::create_template(&engine, &face(3), TemplateRole::Identification, &mut query, &mut eyes);

        let mut candidates = Vec::new();
        let mut decision = false;
        let status = engine.identify_template(&query, 3, &mut candidates, &mut decision);
        assert!(status.is_success());
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].template_id, "0_3");
        assert!(decision);
        for window in candidates.windows(2) {
            assert!(window[0].similarity_score >= window[1].similarity_score);
        }
    }

    #[test]
    fn identify_does_not_collapse_tied_scores() {
        let mut engine = StubEngine::new();
        // two distinct gallery ids that will produce identical templates,
        // and therefore identical similarity to any query.
        let mut templ = Vec::new();
        let mut eyes = EyeCoordinates::new();
        IdentificationEngine::create_template(&engine, &face(1), TemplateRole::InitI, &mut templ, &mut eyes);
        engine.gallery_insert_id(&templ, "0_100");
        engine.gallery_insert_id(&templ, "1_200");

        let mut candidates = Vec::new();
        let mut decision = false;
        engine.identify_template(&templ, 2, &mut candidates, &mut decision);
        assert_eq!(candidates.len(), 2);
        let ids: Vec<&str> = candidates.iter().map(|c| c.template_id.as_str()).collect();
        assert!(ids.contains(&"0_100"));
        assert!(ids.contains(&"1_200"));
    }

    #[test]
    fn delete_then_search_excludes_deleted_id() {
        let mut engine = StubEngine::new();
        let mut templ = Vec::new();
        let mut eyes = EyeCoordinates::new();
        IdentificationEngine::create_template(&engine, &face(5), TemplateRole::InitI, &mut templ, &mut eyes);
        engine.gallery_insert_id(&templ, "0_5");
        assert!(engine.gallery_delete_id("0_5").is_success());

        let mut candidates = Vec::new();
        let mut decision = false;
        engine.identify_template(&templ, 5, &mut candidates, &mut decision);
        assert!(candidates.is_empty());
        assert!(!decision);
    }

    #[test]
    fn delete_unknown_id_is_an_error() {
        let mut engine = StubEngine::new();
        let status = engine.gallery_delete_id("missing");
        assert_eq!(status.code, EngineCode::InputLocationError);
    }

    #[test]
    fn candidate_list_length_zero_yields_empty_list() {
        let mut engine = StubEngine::new();
        let mut templ = Vec::new();
        let mut eyes = EyeCoordinates::new();
        IdentificationEngine::create_template(&engine, &face(1), TemplateRole::InitI, &mut templ, &mut eyes);
        engine.gallery_insert_id(&templ, "0_1");

        let mut candidates = Vec::new();
        let mut decision = false;
        let status = engine.identify_template(&templ, 0, &mut candidates, &mut decision);
        assert!(status.is_success());
        assert!(candidates.is_empty());
    }
}

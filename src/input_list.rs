//! Parsing and deterministic worker-bucketing of `path class_id
//! template_id` input lists.
//!
//! A `template_id` of `0` means "this image is its own template"; any
//! other `template_id` groups every line sharing it into one multi-image
//! template. Buckets are assigned with the same near-even split as the
//! original allocator so run-to-run results only depend on `count_proc`
//! through timing, never through which records land in which bucket.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::HarnessError;
use crate::types::TemplateSpec;

/// Near-even bucket allocator: `total / count_proc` per bucket, with the
/// first `total % count_proc` buckets getting one extra slot. A bucket is
/// closed and a new one opened once it reaches its target size for the
/// number of buckets opened so far.
struct ListProcessor {
    buckets: Vec<Vec<TemplateSpec>>,
    bucket_size: usize,
    extended_count: usize,
}

impl ListProcessor {
    fn new(total: usize, count_proc: usize) -> Self {
        ListProcessor {
            buckets: Vec::new(),
            bucket_size: total / count_proc,
            extended_count: total % count_proc,
        }
    }

    fn add(&mut self, spec: TemplateSpec) {
        let target_size = if self.buckets.len() <= self.extended_count {
            self.bucket_size + 1
        } else {
            self.bucket_size
        };

        if self.buckets.is_empty() || self.buckets.last().unwrap().len() == target_size {
            self.buckets.push(Vec::new());
        }
        self.buckets.last_mut().unwrap().push(spec);
    }
}

/// Parse an input list file and split its templates into `count_proc`
/// near-evenly sized buckets. Returns the buckets plus the total template
/// count (for logging and descriptor-file preallocation).
pub fn parse_input_list(path: &Path, count_proc: usize) -> Result<(Vec<Vec<TemplateSpec>>, usize), HarnessError> {
    let file = File::open(path).map_err(HarnessError::Io)?;
    let reader = BufReader::new(file);

    let mut keys: BTreeMap<i32, i32> = BTreeMap::new();
    let mut grouped: BTreeMap<i32, Vec<String>> = BTreeMap::new();
    let mut singles: Vec<(i32, String)> = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(HarnessError::Io)?;
        let mut fields = line.split_whitespace();

        let path_field = match fields.next() {
            Some(p) => p,
            None => break,
        };
        let class_id: i32 = fields
            .next()
            .ok_or_else(|| HarnessError::Parse(format!("missing class id in line: {line}")))?
            .parse()
            .map_err(|_| HarnessError::Parse(format!("non-integer class id in line: {line}")))?;
        let template_id: i32 = fields
            .next()
            .ok_or_else(|| HarnessError::Parse(format!("missing template id in line: {line}")))?
            .parse()
            .map_err(|_| HarnessError::Parse(format!("non-integer template id in line: {line}")))?;

        if class_id < 0 {
            return Err(HarnessError::Parse(format!("negative class id: {class_id}")));
        }
        if template_id < 0 {
            return Err(HarnessError::Parse(format!("negative template id: {template_id}")));
        }

        if template_id != 0 {
            match keys.get(&template_id) {
                Some(&existing) if existing != class_id => {
                    return Err(HarnessError::Parse(format!(
                        "template {template_id} assigned to both class {existing} and {class_id}"
                    )));
                }
                _ => {
                    keys.insert(template_id, class_id);
                }
            }
            grouped.entry(template_id).or_default().push(path_field.to_string());
        } else {
            singles.push((class_id, path_field.to_string()));
        }
    }

    let total = keys.len() + singles.len();
    if total == 0 {
        return Err(HarnessError::Data(format!("empty input list in file: {}", path.display())));
    }

    let mut processor = ListProcessor::new(total, count_proc.max(1));

    for (class_id, image_path) in singles {
        processor.add(TemplateSpec { class_id, paths: vec![image_path] });
    }
    for (template_id, class_id) in &keys {
        let paths = grouped.remove(template_id).unwrap_or_default();
        processor.add(TemplateSpec { class_id: *class_id, paths });
    }

    tracing::info!(
        templates = total,
        count_proc,
        per_proc = processor.buckets.first().map(|b| b.len()).unwrap_or(0),
        "input list parsed"
    );

    Ok((processor.buckets, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_list(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn singles_and_groups_both_become_templates() {
        let file = write_list(&["a.png 1 0", "b.png 2 1", "c.png 2 1"]);
        let (buckets, total) = parse_input_list(file.path(), 1).unwrap();
        assert_eq!(total, 2);
        let all: Vec<&TemplateSpec> = buckets.iter().flatten().collect();
        assert!(all.iter().any(|t| t.class_id == 1 && t.paths == vec!["a.png"]));
        assert!(all.iter().any(|t| t.class_id == 2 && t.paths.len() == 2));
    }

    #[test]
    fn near_even_bucket_split() {
        let lines: Vec<String> = (0..7).map(|i| format!("img{i}.png {i} 0")).collect();
        let line_refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let file = write_list(&line_refs);

        let (buckets, total) = parse_input_list(file.path(), 3).unwrap();
        assert_eq!(total, 7);
        let sizes: Vec<usize> = buckets.iter().map(|b| b.len()).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 7);
        // 7 / 3 = 2 remainder 1: exactly one bucket carries the extra slot.
        assert_eq!(sizes.iter().filter(|&&s| s == 3).count(), 1);
        assert_eq!(sizes.iter().filter(|&&s| s == 2).count(), 2);
    }

    #[test]
    fn inconsistent_class_id_for_same_template_is_an_error() {
        let file = write_list(&["a.png 1 5", "b.png 2 5"]);
        let result = parse_input_list(file.path(), 1);
        assert!(result.is_err());
    }

    #[test]
    fn negative_class_id_is_an_error() {
        let file = write_list(&["a.png -1 0"]);
        assert!(parse_input_list(file.path(), 1).is_err());
    }

    #[test]
    fn empty_list_is_an_error() {
        let file = write_list(&[]);
        assert!(parse_input_list(file.path(), 1).is_err());
    }

    #[test]
    fn bucket_count_independent_determinism() {
        let lines: Vec<String> = (0..12).map(|i| format!("img{i}.png {i} 0")).collect();
        let line_refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let file = write_list(&line_refs);

        let (buckets_one, _) = parse_input_list(file.path(), 1).unwrap();
        let (buckets_four, _) = parse_input_list(file.path(), 4).unwrap();

        let flat_one: Vec<i32> = buckets_one.iter().flatten().map(|t| t.class_id).collect();
        let flat_four: Vec<i32> = buckets_four.iter().flatten().map(|t| t.class_id).collect();
        assert_eq!(flat_one, flat_four);
    }
}

use std::collections::BTreeMap;

use serde::Serialize;

use super::rules::{FieldSpec, BUILTIN_SPECS};
use crate::models::FieldKey;
use crate::pipeline::extraction::SourceText;

/// A value found in source text and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedValue {
    pub value: String,
    pub rule: &'static str,
}

/// Result of one extraction pass. Fields without a match are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractedFields {
    values: BTreeMap<FieldKey, ExtractedValue>,
}

impl ExtractedFields {
    pub fn get(&self, key: FieldKey) -> Option<&ExtractedValue> {
        self.values.get(&key)
    }

    pub fn value(&self, key: FieldKey) -> Option<&str> {
        self.get(key).map(|v| v.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &ExtractedValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// `(key, value)` pairs, ready for `FieldMap::merge_extracted`.
    pub fn values(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.value.as_str()))
    }
}

/// Runs every field's rule chain over a source text.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    specs: Vec<FieldSpec>,
}

impl FieldExtractor {
    pub fn new(specs: Vec<FieldSpec>) -> Self {
        Self { specs }
    }

    /// The bilingual chains for all Randomization Plan fields.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_SPECS.clone())
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    /// First matching rule per field wins; later rules are not evaluated.
    pub fn extract(&self, text: &SourceText) -> ExtractedFields {
        let mut fields = ExtractedFields::default();

        for spec in &self.specs {
            let found = spec
                .rules
                .iter()
                .find_map(|rule| rule.apply(text.as_str()).map(|value| (rule.label, value)));

            if let Some((rule, value)) = found {
                tracing::debug!(field = %spec.key, rule, "Field extracted");
                fields.values.insert(spec.key, ExtractedValue { value, rule });
            }
        }

        tracing::info!(
            matched = fields.len(),
            total = self.specs.len(),
            "Field extraction complete"
        );
        fields
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use regex::Regex;

    use super::*;
    use crate::models::{FieldMap, MergeMode};
    use crate::pipeline::fields::rules::ExtractionRule;

    fn extract(text: &str) -> ExtractedFields {
        FieldExtractor::builtin().extract(&SourceText::from(text))
    }

    #[test]
    fn protocol_number_and_phase() {
        let fields = extract("Protocol No. ABC-123\nPhase 2");
        assert_eq!(fields.value(FieldKey::ProtocolNo), Some("ABC-123"));
        assert_eq!(fields.value(FieldKey::Phase), Some("Phase 2"));
    }

    #[test]
    fn korean_phase_unchanged() {
        let fields = extract("제1상");
        assert_eq!(fields.value(FieldKey::Phase), Some("제1상"));
        assert_eq!(fields.get(FieldKey::Phase).unwrap().rule, "phase_ko");
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn no_cues_no_values() {
        let fields = extract("Lorem ipsum dolor sit amet.\n안녕하세요, 반갑습니다.");
        assert!(fields.is_empty());

        let mut map = FieldMap::new();
        let before = map.clone();
        assert!(map.merge_extracted(fields.values(), MergeMode::FillEmpty).is_empty());
        assert_eq!(map, before);
    }

    #[test]
    fn first_matching_rule_wins_and_stops() {
        let second_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&second_calls);

        let spec = FieldSpec::new(
            FieldKey::Phase,
            vec![
                ExtractionRule::new("first", Regex::new(r"Phase (\d)").unwrap())
                    .with_normalizer(Arc::new(|v: &str| Some(format!("EN-{v}")))),
                ExtractionRule::new("second", Regex::new(r"Phase (\d)").unwrap())
                    .with_normalizer(Arc::new(move |v: &str| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Some(format!("KO-{v}"))
                    })),
            ],
        );

        let fields = FieldExtractor::new(vec![spec]).extract(&SourceText::from("Phase 3"));
        assert_eq!(fields.value(FieldKey::Phase), Some("EN-3"));
        assert_eq!(fields.get(FieldKey::Phase).unwrap().rule, "first");
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn later_rule_runs_when_first_misses() {
        let spec = FieldSpec::new(
            FieldKey::Site,
            vec![
                ExtractionRule::new("never", Regex::new(r"NOPE(\w+)").unwrap()),
                ExtractionRule::new("fallback", Regex::new(r"Site: (\w+)").unwrap()),
            ],
        );
        let fields = FieldExtractor::new(vec![spec]).extract(&SourceText::from("Site: Busan"));
        assert_eq!(fields.get(FieldKey::Site).unwrap().rule, "fallback");
    }

    #[test]
    fn blank_label_does_not_borrow_a_later_prose_hit() {
        let fields = extract("의뢰자:   \nSponsor: Acme Inc\n의뢰자 승인 필요");
        let sponsor = fields.get(FieldKey::Sponsor).unwrap();
        assert_eq!(sponsor.value, "Acme Inc");
        assert_eq!(sponsor.rule, "sponsor_en");
    }

    #[test]
    fn repeated_extraction_is_idempotent() {
        let text = SourceText::from("Protocol No. ABC-123\nPhase 2\n시험책임자: 김철수");
        let extractor = FieldExtractor::builtin();
        let mut map = FieldMap::new();

        let first = map.merge_extracted(extractor.extract(&text).values(), MergeMode::FillEmpty);
        assert_eq!(first.len(), 3);
        let snapshot = map.clone();

        let second = map.merge_extracted(extractor.extract(&text).values(), MergeMode::FillEmpty);
        assert!(second.is_empty());
        assert_eq!(map, snapshot);
    }

    #[test]
    fn full_bilingual_protocol() {
        let text = "\
임상시험명: 건강한 성인 자원자를 대상으로 한 생물학적 동등성 시험
An open-label, randomized, single-dose, two-way crossover study in healthy volunteers
시험계획서 번호 (Protocol No.): HB-BE-2024-01
Version 1.0
제1상
임상시험의뢰자: 한빛제약
임상시험실시기관: 서울대학교병원
시험책임자: 김철수
Sequences: TR, RT
12 subjects per sequence";
        let fields = extract(text);
        assert_eq!(fields.value(FieldKey::ProtocolNo), Some("HB-BE-2024-01"));
        assert_eq!(fields.value(FieldKey::Version), Some("1.0"));
        assert_eq!(fields.value(FieldKey::Phase), Some("제1상"));
        assert_eq!(fields.value(FieldKey::Sponsor), Some("한빛제약"));
        assert_eq!(fields.value(FieldKey::Site), Some("서울대학교병원"));
        assert_eq!(fields.value(FieldKey::Pi), Some("김철수"));
        assert_eq!(
            fields.value(FieldKey::KorTitle),
            Some("건강한 성인 자원자를 대상으로 한 생물학적 동등성 시험")
        );
        assert!(fields
            .value(FieldKey::EngTitle)
            .unwrap()
            .starts_with("An open-label, randomized"));
        assert_eq!(fields.value(FieldKey::Sequences), Some("TR, RT"));
        assert_eq!(fields.value(FieldKey::NPerArm), Some("12"));
        assert_eq!(fields.value(FieldKey::Arms), None);
    }
}

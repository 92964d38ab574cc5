//! Integration tests for the content validation engine
//!
//! Each test drives the public surface the way a host application does:
//! build (or reuse) a registry, parse a document, run the validator, and
//! inspect the issue list.

use aurum_descriptors::{c32, Mapping, Registry, ValidationKind};
use aurum_models::ValueModel;
use aurum_validator::{ContentValidator, DocumentValidator, IssueKind, ValidationIssue};
use roxmltree::Document;
use serde_json::json;
use std::sync::Arc;

fn standard_registry() -> Arc<Registry> {
    Arc::new(c32::registry().expect("standard registry builds"))
}

fn validate(
    registry: Arc<Registry>,
    kind: ValidationKind,
    components: &[&str],
    gold: serde_json::Value,
    xml: &str,
) -> Vec<ValidationIssue> {
    let gold = ValueModel::new(gold).expect("gold model is an object");
    let doc = Document::parse(xml).expect("document parses");
    let validator = ContentValidator::new(registry, kind)
        .with_components(components.iter().map(|s| s.to_string()))
        .expect("components are registered");
    validator.validate(gold.as_gold(), &doc)
}

const LANGUAGES_DOC: &str = r#"
    <ClinicalDocument xmlns="urn:hl7-org:v3">
        <recordTarget>
            <patientRole>
                <patient>
                    <languageCommunication>
                        <languageCode code="en-US"/>
                        <preferenceInd value="true"/>
                    </languageCommunication>
                </patient>
            </patientRole>
        </recordTarget>
    </ClinicalDocument>
"#;

#[test]
fn matching_language_yields_no_issues() {
    let issues = validate(
        standard_registry(),
        ValidationKind::C32v21,
        &["languages"],
        json!({ "languages": [ { "language_code": "en-US" } ] }),
        LANGUAGES_DOC,
    );
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
}

#[test]
fn unmatched_language_reports_expected_and_provided_sections() {
    let issues = validate(
        standard_registry(),
        ValidationKind::C32v21,
        &["languages"],
        json!({ "languages": [ { "language_code": "foo" } ] }),
        LANGUAGES_DOC,
    );

    assert_eq!(issues.len(), 1);
    let issue = &issues[0];
    assert!(issue.reviewable());
    match &issue.kind {
        IssueKind::NoMatchingSection {
            expected_section,
            provided_sections,
        } => {
            assert_eq!(expected_section.get("language_code").map(String::as_str), Some("foo"));
            assert_eq!(provided_sections.len(), 1);
            assert_eq!(
                provided_sections[0].get("language_code").map(String::as_str),
                Some("en-US")
            );
        }
        other => panic!("expected NoMatchingSection, got {:?}", other),
    }
}

#[test]
fn field_mismatch_reports_comparison_with_document_location() {
    let issues = validate(
        standard_registry(),
        ValidationKind::C32v21,
        &["languages"],
        json!({ "languages": [ { "language_code": "en-US", "preference": "false" } ] }),
        LANGUAGES_DOC,
    );

    assert_eq!(issues.len(), 1);
    let issue = &issues[0];
    match &issue.kind {
        IssueKind::Comparison { expected, provided } => {
            assert_eq!(expected, "false");
            assert_eq!(provided.as_deref(), Some("true"));
        }
        other => panic!("expected Comparison, got {:?}", other),
    }
    assert!(issue.reviewable());
    let location = issue.location.as_deref().unwrap_or_default();
    assert!(
        location.contains("preferenceInd"),
        "location should pin the actual node, got {}",
        location
    );
}

#[test]
fn missing_required_section_pins_the_nearest_resolvable_ancestor() {
    let issues = validate(
        standard_registry(),
        ValidationKind::C32v21,
        &["medications"],
        json!({ "medications": [ { "product_name": "Aspirin" } ] }),
        r#"<ClinicalDocument xmlns="urn:hl7-org:v3"><recordTarget/></ClinicalDocument>"#,
    );

    assert_eq!(issues.len(), 1);
    let issue = &issues[0];
    assert!(!issue.reviewable());
    match &issue.kind {
        IssueKind::SectionNotFound { locator } => {
            assert!(locator.contains("2.16.840.1.113883.10.20.1.8"));
        }
        other => panic!("expected SectionNotFound, got {:?}", other),
    }
    // Nothing on the locator path resolves, so the location falls back to
    // the document root element.
    assert_eq!(issue.location.as_deref(), Some("/ClinicalDocument"));
}

const TWO_MEDICATIONS_DOC: &str = r#"
    <ClinicalDocument xmlns="urn:hl7-org:v3">
        <component><structuredBody><component>
            <section>
                <templateId root="2.16.840.1.113883.10.20.1.8"/>
                <entry>
                    <substanceAdministration>
                        <statusCode code="completed"/>
                        <consumable><manufacturedProduct><manufacturedMaterial>
                            <name>Lisinopril</name>
                        </manufacturedMaterial></manufacturedProduct></consumable>
                    </substanceAdministration>
                </entry>
                <entry>
                    <substanceAdministration>
                        <statusCode code="active"/>
                        <consumable><manufacturedProduct><manufacturedMaterial>
                            <name>Aspirin</name>
                        </manufacturedMaterial></manufacturedProduct></consumable>
                    </substanceAdministration>
                </entry>
            </section>
        </component></structuredBody></component>
    </ClinicalDocument>
"#;

#[test]
fn repeating_matches_are_order_independent() {
    // Gold lists Aspirin first; the document lists it second.
    let issues = validate(
        standard_registry(),
        ValidationKind::C32v21,
        &["medications"],
        json!({
            "medications": [
                { "product_name": "Aspirin", "status": "active" },
                { "product_name": "Lisinopril", "status": "completed" }
            ]
        }),
        TWO_MEDICATIONS_DOC,
    );
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
}

const DEREFERENCED_MEDICATION_DOC: &str = r##"
    <ClinicalDocument xmlns="urn:hl7-org:v3">
        <component><structuredBody><component>
            <section>
                <templateId root="2.16.840.1.113883.10.20.1.8"/>
                <text>
                    <content ID="med-1">Aspirin 81mg Tablet</content>
                </text>
                <entry>
                    <substanceAdministration>
                        <consumable><manufacturedProduct><manufacturedMaterial>
                            <name><reference value="#med-1"/></name>
                        </manufacturedMaterial></manufacturedProduct></consumable>
                    </substanceAdministration>
                </entry>
            </section>
        </component></structuredBody></component>
    </ClinicalDocument>
"##;

#[test]
fn v25_medication_names_resolve_through_free_text_references() {
    let gold = json!({ "medications": [ { "product_name": "Aspirin 81mg Tablet" } ] });

    let issues = validate(
        standard_registry(),
        ValidationKind::C32v25,
        &["medications"],
        gold.clone(),
        DEREFERENCED_MEDICATION_DOC,
    );
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);

    // Without the v2.5 dereference override the raw name element is
    // empty, so the same document no longer matches.
    let issues = validate(
        standard_registry(),
        ValidationKind::C32v21,
        &["medications"],
        gold,
        DEREFERENCED_MEDICATION_DOC,
    );
    assert_eq!(issues.len(), 1);
    assert!(matches!(issues[0].kind, IssueKind::NoMatchingSection { .. }));
}

const FULL_DOC: &str = r#"
    <ClinicalDocument xmlns="urn:hl7-org:v3">
        <recordTarget>
            <patientRole>
                <addr>
                    <streetAddressLine>1 Main St</streetAddressLine>
                    <city>Boston</city>
                    <state>MA</state>
                    <postalCode>02134</postalCode>
                </addr>
                <telecom value="tel:+1-781-555-1212" use="HP"/>
                <patient>
                    <name>
                        <given>Adam</given>
                        <family>Everyman</family>
                        <suffix>Jr</suffix>
                    </name>
                    <administrativeGenderCode code="M"/>
                    <birthTime value="19741225"/>
                    <languageCommunication>
                        <languageCode code="en-US"/>
                    </languageCommunication>
                </patient>
            </patientRole>
        </recordTarget>
        <component><structuredBody><component>
            <section>
                <templateId root="2.16.840.1.113883.10.20.1.8"/>
                <entry>
                    <substanceAdministration>
                        <statusCode code="completed"/>
                        <effectiveTime><low value="20100521"/></effectiveTime>
                        <doseQuantity value="1"/>
                        <consumable><manufacturedProduct><manufacturedMaterial>
                            <code code="307782"/>
                            <name>Aspirin</name>
                        </manufacturedMaterial></manufacturedProduct></consumable>
                    </substanceAdministration>
                </entry>
            </section>
        </component></structuredBody></component>
    </ClinicalDocument>
"#;

fn full_gold() -> serde_json::Value {
    json!({
        "personal_information": {
            "patient": {
                "first_name": "Adam",
                "last_name": "Everyman",
                "suffix": "Jr",
                "birth_date": "1974-12-25",
                "gender": "M"
            },
            "address": {
                "street": "1 Main St",
                "city": "Boston",
                "state": "MA",
                "postal_code": "02134"
            },
            "telecom": { "value": "tel:+1-781-555-1212", "use": "HP" }
        },
        "languages": [ { "language_code": "en-US" } ],
        "medications": [ {
            "product_name": "Aspirin",
            "product_code": "307782",
            "dose_value": "1",
            "status": "completed",
            "start_date": "2010-05-21"
        } ]
    })
}

#[test]
fn document_encoding_its_own_gold_model_validates_cleanly() {
    // Every component in the registry runs; the ones the gold model says
    // nothing about must stay silent.
    let gold = ValueModel::new(full_gold()).unwrap();
    let doc = Document::parse(FULL_DOC).unwrap();
    let validator = ContentValidator::new(standard_registry(), ValidationKind::C32v21);
    let issues = validator.validate(gold.as_gold(), &doc);
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
}

#[test]
fn dates_compare_across_model_and_document_forms() {
    // Gold carries ISO dates, the document HL7 brief-form timestamps.
    let mut gold = full_gold();
    gold["medications"][0]["start_date"] = json!("2010-05-22");
    let issues = validate(
        standard_registry(),
        ValidationKind::C32v21,
        &["medications"],
        gold,
        FULL_DOC,
    );

    assert_eq!(issues.len(), 1);
    match &issues[0].kind {
        IssueKind::Comparison { expected, provided } => {
            assert_eq!(expected, "20100522");
            assert_eq!(provided.as_deref(), Some("20100521"));
        }
        other => panic!("expected Comparison, got {:?}", other),
    }
}

#[test]
fn locator_failures_degrade_to_reported_issues() {
    let mut mapping = Mapping::new();
    mapping
        .component("demo", |c| {
            c.field_at("broken", "cda:[")?;
            c.field_at("title", "//cda:title")
        })
        .unwrap();
    let registry = Arc::new(mapping.build());

    let issues = validate(
        registry,
        ValidationKind::C32v21,
        &["demo"],
        json!({ "broken": "x", "title": "Summary" }),
        r#"<ClinicalDocument xmlns="urn:hl7-org:v3"><title>Summary</title></ClinicalDocument>"#,
    );

    // The malformed locator reports once; the healthy field still
    // validated (and matched) despite it.
    assert_eq!(issues.len(), 1);
    assert!(matches!(issues[0].kind, IssueKind::General));
    assert!(issues[0].message.contains("parse error"));
}

#[test]
fn validators_compose_behind_the_plugin_contract() {
    let content: Box<dyn DocumentValidator> =
        Box::new(ContentValidator::new(standard_registry(), ValidationKind::C32v21));

    let gold = ValueModel::new(json!({ "languages": [ { "language_code": "en-US" } ] })).unwrap();
    let doc = Document::parse(LANGUAGES_DOC).unwrap();

    let mut issues = Vec::new();
    issues.extend(content.validate(gold.as_gold(), &doc));
    assert_eq!(content.name(), "content");
    assert!(issues.is_empty());
}

#[test]
fn unknown_component_selection_is_a_configuration_error() {
    let result = ContentValidator::new(standard_registry(), ValidationKind::C32v21)
        .with_components(["no_such_component"]);
    assert!(result.is_err());
}

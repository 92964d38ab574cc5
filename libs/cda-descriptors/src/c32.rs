//! Built-in C32/CCD component library
//!
//! The standard component-module set, declared against the CCD section
//! template OIDs. Gold models address these components by their keys
//! (`medications`, `allergies`, ...); repeating entries are matched by
//! the `matches_by` identity fields noted per section.
//!
//! v2.5 C32 documents move several display names out of the structured
//! entries into section free text; the affected fields carry a
//! `dereference` override for [`ValidationKind::C32v25`] and
//! [`ValidationKind::C32v25C83`].

use crate::builder::Mapping;
use crate::error::Result;
use crate::options::{LocateBy, Options, ValidationKind};
use crate::registry::Registry;

const MEDICATIONS_TID: &str = "2.16.840.1.113883.10.20.1.8";
const ALLERGIES_TID: &str = "2.16.840.1.113883.10.20.1.2";
const CONDITIONS_TID: &str = "2.16.840.1.113883.10.20.1.11";
const RESULTS_TID: &str = "2.16.840.1.113883.10.20.1.14";
const IMMUNIZATIONS_TID: &str = "2.16.840.1.113883.10.20.1.6";
const VITAL_SIGNS_TID: &str = "2.16.840.1.113883.10.20.1.16";
const ENCOUNTERS_TID: &str = "2.16.840.1.113883.10.20.1.3";

/// Dereference free-text names on the v2.5 family.
fn deref_on_v25(options: Options) -> Options {
    options
        .for_kind(ValidationKind::C32v25, |o| o.dereference(true))
        .for_kind(ValidationKind::C32v25C83, |o| o.dereference(true))
}

/// Build the standard registry.
pub fn registry() -> Result<Registry> {
    let mut mapping = Mapping::new();

    mapping
        .common_at("address", "cda:addr", |a| {
            a.field_at_with("street", "cda:streetAddressLine", Options::new().required(false))?;
            a.field("city")?;
            a.field_with("state", Options::new().required(false))?;
            a.field_with("postal_code", Options::new().required(false))
        })?
        .common_at("telecom", "cda:telecom", |t| {
            t.field_with("value", Options::new().locate_by(LocateBy::Attribute))?;
            t.field_with(
                "use",
                Options::new().locate_by(LocateBy::Attribute).required(false),
            )
        })?;

    mapping.component_at(
        "personal_information",
        "//cda:recordTarget/cda:patientRole",
        |c| {
            c.section_at("patient", "cda:patient", |p| {
                p.field_at("first_name", "cda:name/cda:given")?;
                p.field_at("last_name", "cda:name/cda:family")?;
                p.field_with(
                    "cda:name/cda:suffix",
                    Options::new().accessor("suffix").required(false),
                )?;
                p.field_at("birth_date", "cda:birthTime/@value")?;
                p.field_at_with(
                    "gender",
                    "cda:administrativeGenderCode/@code",
                    Options::new().required(false),
                )
            })?;
            c.reference("address")?;
            c.reference("telecom")
        },
    )?;

    mapping.component("languages", |c| {
        c.repeating_section_at_with(
            "language_communication",
            "//cda:recordTarget/cda:patientRole/cda:patient/cda:languageCommunication",
            Options::new()
                .matches_by(["language_code"])
                .accessor("languages"),
            |s| {
                s.field_at("language_code", "cda:languageCode/@code")?;
                s.field_at_with(
                    "language_ability_mode",
                    "cda:modeCode/@code",
                    Options::new().required(false),
                )?;
                s.field_at_with(
                    "preference",
                    "cda:preferenceInd/@value",
                    Options::new().required(false),
                )
            },
        )
    })?;

    mapping.component_at(
        "healthcare_providers",
        "//cda:documentationOf/cda:serviceEvent",
        |c| {
            c.repeating_section_at_with(
                "provider",
                "cda:performer",
                Options::new()
                    .matches_by(["first_name", "last_name"])
                    .accessor("providers"),
                |p| {
                    p.field_at("first_name", "cda:assignedEntity/cda:assignedPerson/cda:name/cda:given")?;
                    p.field_at("last_name", "cda:assignedEntity/cda:assignedPerson/cda:name/cda:family")?;
                    p.field_at_with(
                        "provider_role",
                        "cda:functionCode/@code",
                        Options::new().required(false),
                    )?;
                    p.field_at_with(
                        "start_service",
                        "cda:time/cda:low/@value",
                        Options::new().required(false),
                    )?;
                    p.field_at_with(
                        "end_service",
                        "cda:time/cda:high/@value",
                        Options::new().required(false),
                    )
                },
            )
        },
    )?;

    mapping.component_with(
        "medications",
        Options::new().template_id(MEDICATIONS_TID),
        |c| {
            c.repeating_section_at_with(
                "medication",
                "cda:entry/cda:substanceAdministration",
                Options::new()
                    .matches_by(["product_name"])
                    .accessor("medications"),
                |m| {
                    m.field_at_with(
                        "product_name",
                        "cda:consumable/cda:manufacturedProduct/cda:manufacturedMaterial/cda:name",
                        deref_on_v25(Options::new()),
                    )?;
                    m.field_at_with(
                        "product_code",
                        "cda:consumable/cda:manufacturedProduct/cda:manufacturedMaterial/cda:code/@code",
                        Options::new().required(false),
                    )?;
                    m.field_at_with(
                        "dose_value",
                        "cda:doseQuantity/@value",
                        Options::new().required(false),
                    )?;
                    m.field_at_with(
                        "status",
                        "cda:statusCode/@code",
                        Options::new().required(false),
                    )?;
                    m.field_at_with(
                        "start_date",
                        "cda:effectiveTime/cda:low/@value",
                        Options::new().required(false),
                    )
                },
            )
        },
    )?;

    mapping.component_with(
        "allergies",
        Options::new().template_id(ALLERGIES_TID),
        |c| {
            c.repeating_section_at_with(
                "allergy",
                "cda:entry/cda:act/cda:entryRelationship/cda:observation",
                Options::new()
                    .matches_by(["free_text_product"])
                    .accessor("allergies"),
                |a| {
                    a.field_at_with(
                        "free_text_product",
                        "cda:participant/cda:participantRole/cda:playingEntity/cda:name",
                        deref_on_v25(Options::new()),
                    )?;
                    a.field_at_with(
                        "product_code",
                        "cda:participant/cda:participantRole/cda:playingEntity/cda:code/@code",
                        Options::new().required(false),
                    )?;
                    a.field_at_with(
                        "start_event",
                        "cda:effectiveTime/cda:low/@value",
                        Options::new().required(false),
                    )?;
                    a.field_at_with(
                        "severity",
                        "cda:entryRelationship/cda:observation/cda:value/@code",
                        Options::new().required(false),
                    )
                },
            )
        },
    )?;

    mapping.component_with(
        "conditions",
        Options::new().template_id(CONDITIONS_TID),
        |c| {
            c.repeating_section_at_with(
                "condition",
                "cda:entry/cda:act/cda:entryRelationship/cda:observation",
                Options::new()
                    .matches_by(["problem_name"])
                    .accessor("conditions"),
                |p| {
                    p.field_at_with("problem_name", "cda:text", deref_on_v25(Options::new()))?;
                    p.field_at_with(
                        "problem_code",
                        "cda:value/@code",
                        Options::new().required(false),
                    )?;
                    p.field_at_with(
                        "problem_date",
                        "cda:effectiveTime/cda:low/@value",
                        Options::new().required(false),
                    )
                },
            )
        },
    )?;

    mapping.component_with("results", Options::new().template_id(RESULTS_TID), |c| {
        c.repeating_section_at_with(
            "result",
            "cda:entry/cda:organizer/cda:component/cda:observation",
            Options::new().matches_by(["result_code"]).accessor("results"),
            |r| {
                r.field_at("result_code", "cda:code/@code")?;
                r.field_at_with("value_scalar", "cda:value/@value", Options::new().required(false))?;
                r.field_at_with("value_unit", "cda:value/@unit", Options::new().required(false))?;
                r.field_at_with(
                    "result_date",
                    "cda:effectiveTime/@value",
                    Options::new().required(false),
                )
            },
        )
    })?;

    mapping.component_with(
        "immunizations",
        Options::new().template_id(IMMUNIZATIONS_TID),
        |c| {
            c.repeating_section_at_with(
                "immunization",
                "cda:entry/cda:substanceAdministration",
                Options::new()
                    .matches_by(["vaccine_name"])
                    .accessor("immunizations"),
                |i| {
                    i.field_at_with(
                        "vaccine_name",
                        "cda:consumable/cda:manufacturedProduct/cda:manufacturedMaterial/cda:name",
                        deref_on_v25(Options::new()),
                    )?;
                    i.field_at_with(
                        "administration_date",
                        "cda:effectiveTime/@value",
                        Options::new().required(false),
                    )?;
                    i.field_with(
                        "negation_ind",
                        Options::new().locate_by(LocateBy::Attribute).required(false),
                    )
                },
            )
        },
    )?;

    mapping.component_with(
        "vital_signs",
        Options::new().template_id(VITAL_SIGNS_TID),
        |c| {
            c.repeating_section_at_with(
                "vital_sign",
                "cda:entry/cda:organizer/cda:component/cda:observation",
                Options::new()
                    .matches_by(["vital_sign_code"])
                    .accessor("vital_signs"),
                |v| {
                    v.field_at("vital_sign_code", "cda:code/@code")?;
                    v.field_at_with("value_scalar", "cda:value/@value", Options::new().required(false))?;
                    v.field_at_with("value_unit", "cda:value/@unit", Options::new().required(false))?;
                    v.field_at_with(
                        "vital_sign_date",
                        "cda:effectiveTime/@value",
                        Options::new().required(false),
                    )
                },
            )
        },
    )?;

    mapping.component_with(
        "encounters",
        Options::new().template_id(ENCOUNTERS_TID),
        |c| {
            c.repeating_section_at_with(
                "encounter",
                "cda:entry/cda:encounter",
                Options::new()
                    .matches_by(["encounter_code"])
                    .accessor("encounters"),
                |e| {
                    e.field_at("encounter_code", "cda:code/@code")?;
                    e.field_at_with(
                        "encounter_date",
                        "cda:effectiveTime/cda:low/@value",
                        Options::new().required(false),
                    )
                },
            )
        },
    )?;

    Ok(mapping.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_builds() {
        let registry = registry().unwrap();
        for key in [
            "personal_information",
            "languages",
            "healthcare_providers",
            "medications",
            "allergies",
            "conditions",
            "results",
            "immunizations",
            "vital_signs",
            "encounters",
        ] {
            assert!(registry.get(key).is_ok(), "missing component {}", key);
        }
    }

    #[test]
    fn medication_names_dereference_only_on_v25() {
        let registry = registry().unwrap();
        let tree = registry.get("medications").unwrap().tree();
        let medication = tree.child_by_key(tree.root_id(), "medication").unwrap();
        let name = tree.child_by_key(medication, "product_name").unwrap();

        let options = &tree.get(name).options;
        assert!(!options.dereferences(ValidationKind::C32v21));
        assert!(options.dereferences(ValidationKind::C32v25));
        assert!(options.dereferences(ValidationKind::C32v25C83));
    }

    #[test]
    fn every_descriptor_has_a_unique_index_key() {
        let registry = registry().unwrap();
        for key in registry.keys().collect::<Vec<_>>() {
            let tree = registry.get(key).unwrap().tree();
            let mut seen = std::collections::BTreeSet::new();
            for id in 0..tree.len() {
                assert!(
                    seen.insert(tree.index_key(id)),
                    "duplicate index key in component {}",
                    key
                );
            }
        }
    }
}

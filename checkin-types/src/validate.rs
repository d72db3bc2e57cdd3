//! Structural checks over a loaded phase definition.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{FieldKind, PhaseDefinition, QuestionKind};

/// Overall outcome of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    Pass,
    Warn,
    Fail,
}

/// Errors and warnings found in a phase definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub phase: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn status(&self) -> ValidationStatus {
        if !self.errors.is_empty() {
            ValidationStatus::Fail
        } else if !self.warnings.is_empty() {
            ValidationStatus::Warn
        } else {
            ValidationStatus::Pass
        }
    }

    /// Check whether the report passes; in strict mode warnings fail too.
    pub fn passes(&self, strict: bool) -> bool {
        self.errors.is_empty() && (!strict || self.warnings.is_empty())
    }
}

/// Run every check against `definition`.
pub fn validate(definition: &PhaseDefinition) -> ValidationReport {
    let mut report = ValidationReport {
        phase: definition.id().to_string(),
        ..Default::default()
    };

    check_references(definition, &mut report);
    check_manifests(definition, &mut report);
    check_options(definition, &mut report);
    check_fields(definition, &mut report);
    check_duplicate_orders(definition, &mut report);
    check_orphans(definition, &mut report);
    check_best_practices(definition, &mut report);

    report
}

fn check_references(definition: &PhaseDefinition, report: &mut ValidationReport) {
    if definition.id().is_empty() {
        report.errors.push("Missing display.id".to_string());
    }
    for question in definition.questions() {
        if definition.section(question.section_id()).is_none() {
            report.errors.push(format!(
                "{}: Invalid section_id '{}' (section doesn't exist)",
                question.id(),
                question.section_id()
            ));
        }
    }
    for section in definition.sections() {
        for id in &section.question_ids {
            if !definition.contains(id.as_str()) {
                report.errors.push(format!(
                    "Section '{}': References non-existent question '{id}'",
                    section.id
                ));
            }
        }
    }
}

fn check_manifests(definition: &PhaseDefinition, report: &mut ValidationReport) {
    if definition.manifests().is_empty() {
        report.errors.push("No manifests defined".to_string());
    }
    for (name, manifest) in definition.manifests() {
        let mut seen = BTreeSet::new();
        for id in manifest.question_ids() {
            if !definition.contains(id.as_str()) {
                report.errors.push(format!(
                    "Manifest '{name}': References non-existent question '{id}'"
                ));
            }
            if !seen.insert(id.as_str()) {
                report
                    .errors
                    .push(format!("Manifest '{name}': Lists '{id}' more than once"));
            }
        }
    }
}

fn check_options(definition: &PhaseDefinition, report: &mut ValidationReport) {
    for question in definition.questions() {
        let kind = question.kind();
        if !kind.is_select() {
            continue;
        }
        if kind.options().is_empty() {
            report.errors.push(format!(
                "{}: Select-type question missing options array",
                question.id()
            ));
        }
        let mut values = BTreeSet::new();
        for (i, option) in kind.options().iter().enumerate() {
            if option.value.is_empty() {
                report
                    .errors
                    .push(format!("{}: Option {i} missing 'value'", question.id()));
            }
            if option.label.is_empty() {
                report
                    .errors
                    .push(format!("{}: Option {i} missing 'label'", question.id()));
            }
            if !values.insert(option.value.as_str()) {
                report.errors.push(format!(
                    "{}: Duplicate option value '{}'",
                    question.id(),
                    option.value
                ));
            }
        }
    }
}

fn check_fields(definition: &PhaseDefinition, report: &mut ValidationReport) {
    for question in definition.questions() {
        let QuestionKind::Compound(compound) = question.kind() else {
            continue;
        };
        if compound.fields.is_empty() {
            report.errors.push(format!(
                "{}: Compound question missing 'fields' array",
                question.id()
            ));
        }
        let keys: BTreeSet<&str> = compound.fields.iter().map(|f| f.key.as_str()).collect();
        if keys.len() != compound.fields.len() {
            report
                .errors
                .push(format!("{}: Compound field keys are not unique", question.id()));
        }
        for field in &compound.fields {
            if field.key.is_empty() {
                report
                    .errors
                    .push(format!("{}: Compound field missing 'key'", question.id()));
            }
            if let Some(rule) = &field.show_when
                && !keys.contains(rule.field.as_str())
            {
                report.errors.push(format!(
                    "{}: Field '{}' showWhen references unknown field '{}'",
                    question.id(),
                    field.key,
                    rule.field
                ));
            }
            let is_select = matches!(
                field.kind,
                FieldKind::SingleSelect(_) | FieldKind::MultiSelect(_) | FieldKind::RankedSelect(_)
            );
            if is_select && field.kind.options().is_empty() {
                report.errors.push(format!(
                    "{}: Field '{}' is a select without options",
                    question.id(),
                    field.key
                ));
            }
        }
    }
}

fn check_duplicate_orders(definition: &PhaseDefinition, report: &mut ValidationReport) {
    for section in definition.sections() {
        let mut orders: BTreeMap<u32, &str> = BTreeMap::new();
        for id in &section.question_ids {
            let Some(question) = definition.question(id.as_str()) else {
                continue;
            };
            if let Some(previous) = orders.insert(question.order(), id.as_str()) {
                report.errors.push(format!(
                    "Section {}: Duplicate order {} ({previous} and {id})",
                    section.id,
                    question.order()
                ));
            }
        }
    }
}

fn check_orphans(definition: &PhaseDefinition, report: &mut ValidationReport) {
    let in_sections: BTreeSet<&str> = definition
        .sections()
        .iter()
        .flat_map(|s| s.question_ids.iter().map(|id| id.as_str()))
        .collect();
    let in_manifests: BTreeSet<&str> = definition
        .manifests()
        .values()
        .flat_map(|m| m.question_ids().iter().map(|id| id.as_str()))
        .collect();

    let orphans: Vec<&str> = definition
        .questions()
        .map(|q| q.id().as_str())
        .filter(|id| !in_sections.contains(id))
        .collect();
    if !orphans.is_empty() {
        report.warnings.push(format!(
            "Orphan questions (not in any section): {}",
            orphans.join(", ")
        ));
    }

    let unlisted: Vec<&str> = definition
        .questions()
        .map(|q| q.id().as_str())
        .filter(|id| !in_manifests.contains(id))
        .collect();
    if !unlisted.is_empty() {
        report.warnings.push(format!(
            "Questions in no manifest (never shown): {}",
            unlisted.join(", ")
        ));
    }
}

fn check_best_practices(definition: &PhaseDefinition, report: &mut ValidationReport) {
    for question in definition.questions() {
        if let QuestionKind::MultiSelect(multi) = question.kind()
            && multi.max_selected().is_none()
        {
            report.warnings.push(format!(
                "{}: multi_select has no max limit ({} options)",
                question.id(),
                multi.options.len()
            ));
        }
    }
}

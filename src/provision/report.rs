use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;

use super::{Stage, StageOutcome, SystemProfile};
use crate::ui::{self, prelude::*};

#[derive(Debug, Clone, Serialize)]
struct StageEntry {
    stage: Stage,
    #[serde(flatten)]
    outcome: StageOutcome,
}

/// Completion report built up as stages finish.
#[derive(Debug, Clone)]
pub struct Report {
    distro_name: String,
    outcomes: Vec<(Stage, StageOutcome)>,
}

impl Report {
    pub fn new(profile: &SystemProfile) -> Self {
        Self {
            distro_name: profile.distro_name.clone(),
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.outcomes.push((stage, outcome));
    }

    #[cfg(test)]
    pub fn outcomes(&self) -> &[(Stage, StageOutcome)] {
        &self.outcomes
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, o)| matches!(o, StageOutcome::Failed(_)))
    }

    fn to_json(&self) -> serde_json::Value {
        let stages: Vec<StageEntry> = self
            .outcomes
            .iter()
            .map(|(stage, outcome)| StageEntry {
                stage: *stage,
                outcome: outcome.clone(),
            })
            .collect();
        serde_json::json!({
            "distribution": self.distro_name,
            "stages": stages,
            "log": ui::run_log_path(),
        })
    }

    fn table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Stage").add_attribute(Attribute::Bold),
            Cell::new("Result").add_attribute(Attribute::Bold),
            Cell::new("Details").add_attribute(Attribute::Bold),
        ]);

        for (stage, outcome) in &self.outcomes {
            let (result, details) = match outcome {
                StageOutcome::Completed => (Cell::new("done").fg(Color::Green), String::new()),
                StageOutcome::Skipped(reason) => {
                    (Cell::new("skipped").fg(Color::Yellow), reason.clone())
                }
                StageOutcome::Failed(reason) => (Cell::new("failed").fg(Color::Red), reason.clone()),
            };
            table.add_row(vec![Cell::new(stage.title()), result, Cell::new(details)]);
        }
        table
    }

    pub fn print(&self) {
        let summary = if self.has_failures() {
            format!("Provisioning of {} finished with failures", self.distro_name)
        } else {
            format!("Provisioning of {} finished", self.distro_name)
        };

        match get_output_format() {
            OutputFormat::Json => emit(
                Level::Info,
                "report.summary",
                &summary,
                Some(self.to_json()),
            ),
            OutputFormat::Text => {
                heading("Summary");
                if !self.outcomes.is_empty() {
                    println!("{}", self.table());
                }
                let level = if self.has_failures() {
                    Level::Warn
                } else {
                    Level::Success
                };
                emit(level, "report.summary", &summary, None);
                if let Some(log) = ui::run_log_path() {
                    emit(
                        Level::Info,
                        "report.log",
                        &format!("Log: {}", log.display()),
                        None,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::distro::OperatingSystem;

    fn report() -> Report {
        Report::new(&SystemProfile {
            distro_name: "Fedora Linux 41".to_string(),
            distro: OperatingSystem::Fedora,
            is_privileged_user: false,
            has_sudo: true,
        })
    }

    #[test]
    fn skipped_stages_are_not_failures() {
        let mut report = report();
        report.record(Stage::Credentials, StageOutcome::Completed);
        report.record(Stage::Boot, StageOutcome::Skipped("declined".to_string()));
        assert!(!report.has_failures());

        report.record(
            Stage::Packages,
            StageOutcome::Failed("unsupported distribution".to_string()),
        );
        assert!(report.has_failures());
        assert_eq!(report.outcomes().len(), 3);
    }

    #[test]
    fn json_lists_stages_in_order() {
        let mut report = report();
        report.record(Stage::Repository, StageOutcome::Completed);
        report.record(Stage::Boot, StageOutcome::Skipped("grub/grub not found".to_string()));

        let json = report.to_json();
        assert_eq!(json["distribution"], "Fedora Linux 41");
        assert_eq!(json["stages"][0]["stage"], "repository");
        assert_eq!(json["stages"][0]["status"], "completed");
        assert_eq!(json["stages"][1]["status"], "skipped");
        assert_eq!(json["stages"][1]["detail"], "grub/grub not found");
    }

    #[test]
    fn table_shows_reasons() {
        let mut report = report();
        report.record(Stage::Packages, StageOutcome::Failed("dnf exploded".to_string()));
        let rendered = report.table().to_string();
        assert!(rendered.contains("Applications"));
        assert!(rendered.contains("dnf exploded"));
    }
}

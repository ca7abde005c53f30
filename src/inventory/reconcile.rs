//! Baseline reconciliation.
//!
//! [`reconcile`] is pure: it compares one snapshot against the stored baseline
//! and reports, per component family, whether the family was skipped, still
//! matches, or drifted. Persisting the outcome (dedup, upsert, auto-heal) is the
//! job of `db::services::change_record_service`.

use crate::db::enums::{ChangeType, ComponentType, Severity};
use crate::inventory::matching::{Indexed, MatchedBy, pair_entries};
use crate::inventory::snapshot::{
    CpuSpec, GpuSpec, InventorySnapshot, MotherboardSpec, RamModuleSpec, StorageDiskSpec,
};

/// The trusted hardware configuration recorded at first contact. RAM and
/// storage entries always carry their index and are sorted by it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    pub cpu: Option<CpuSpec>,
    pub gpu: Option<GpuSpec>,
    pub motherboard: Option<MotherboardSpec>,
    pub ram: Vec<RamModuleSpec>,
    pub storage: Vec<StorageDiskSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub change_type: ChangeType,
    pub severity: Severity,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FamilyOutcome {
    /// Nothing comparable on one side; leave the family alone.
    Skipped,
    /// Matches the baseline; any open record is stale.
    Consistent,
    Drift(Divergence),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyReport {
    pub component_type: ComponentType,
    pub outcome: FamilyOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub families: Vec<FamilyReport>,
}

impl ReconcileReport {
    pub fn outcome(&self, component_type: ComponentType) -> Option<&FamilyOutcome> {
        self.families
            .iter()
            .find(|f| f.component_type == component_type)
            .map(|f| &f.outcome)
    }

    pub fn drifts(&self) -> impl Iterator<Item = (ComponentType, &Divergence)> {
        self.families.iter().filter_map(|f| match &f.outcome {
            FamilyOutcome::Drift(d) => Some((f.component_type, d)),
            _ => None,
        })
    }
}

fn present<'a>(baseline: Option<&'a str>, incoming: Option<&'a str>) -> Option<(&'a str, &'a str)> {
    Some((baseline?, incoming?))
}

fn model_identity(
    component_type: ComponentType,
    baseline: Option<&str>,
    incoming: Option<&str>,
) -> FamilyOutcome {
    let Some((old, new)) = present(baseline, incoming) else {
        return FamilyOutcome::Skipped;
    };
    if old == new {
        return FamilyOutcome::Consistent;
    }
    FamilyOutcome::Drift(Divergence {
        change_type: ChangeType::Mismatch,
        severity: Severity::Warning,
        old_value: Some(old.to_string()),
        new_value: Some(new.to_string()),
        message: format!("{} mismatch: baseline {} vs actual {}", component_type.label(), old, new),
    })
}

fn reconcile_cpu(baseline: Option<&CpuSpec>, incoming: Option<&CpuSpec>) -> FamilyOutcome {
    model_identity(
        ComponentType::Cpu,
        baseline.and_then(|c| c.model.as_deref()),
        incoming.and_then(|c| c.model.as_deref()),
    )
}

fn reconcile_gpu(baseline: Option<&GpuSpec>, incoming: Option<&GpuSpec>) -> FamilyOutcome {
    model_identity(
        ComponentType::Gpu,
        baseline.and_then(|g| g.model.as_deref()),
        incoming.and_then(|g| g.model.as_deref()),
    )
}

fn motherboard_composite(spec: &MotherboardSpec) -> String {
    format!(
        "{}|{}",
        spec.model.as_deref().unwrap_or_default(),
        spec.serial_number.as_deref().unwrap_or_default()
    )
}

fn reconcile_motherboard(
    baseline: Option<&MotherboardSpec>,
    incoming: Option<&MotherboardSpec>,
) -> FamilyOutcome {
    let (Some(baseline), Some(incoming)) = (baseline, incoming) else {
        return FamilyOutcome::Skipped;
    };
    let model = present(baseline.model.as_deref(), incoming.model.as_deref());
    let serial = present(baseline.serial_number.as_deref(), incoming.serial_number.as_deref());
    if model.is_none() && serial.is_none() {
        return FamilyOutcome::Skipped;
    }

    let model_changed = model.filter(|(old, new)| old != new);
    let serial_changed = serial.filter(|(old, new)| old != new);

    let (change_type, severity, message) = match (model_changed, serial_changed) {
        (None, None) => return FamilyOutcome::Consistent,
        (Some((old_model, new_model)), Some((old_serial, new_serial))) => (
            ChangeType::Replaced,
            Severity::Critical,
            format!(
                "Motherboard replaced: baseline {old_model} (SN {old_serial}) vs actual {new_model} (SN {new_serial})"
            ),
        ),
        (None, Some((old_serial, new_serial))) => (
            ChangeType::SerialChanged,
            Severity::Critical,
            format!("Motherboard serial changed: baseline SN {old_serial} vs actual SN {new_serial}"),
        ),
        (Some((old_model, new_model)), None) => (
            ChangeType::ModelChanged,
            Severity::Warning,
            format!("Motherboard model mismatch: baseline {old_model} vs actual {new_model}"),
        ),
    };

    FamilyOutcome::Drift(Divergence {
        change_type,
        severity,
        old_value: Some(motherboard_composite(baseline)),
        new_value: Some(motherboard_composite(incoming)),
        message,
    })
}

/// A RAM module or storage disk as seen by the per-slot comparison.
trait SlotEntry: Indexed {
    /// Prefix for composites and messages, e.g. `slot` or `disk`.
    const UNIT: &'static str;
    fn soft_fields(&self) -> [(&'static str, Option<&str>); 2];
    fn serial(&self) -> Option<&str>;

    fn composite(&self, slot: i32) -> String {
        let [a, b] = self.soft_fields();
        format!(
            "{}{}={}|{}|{}",
            Self::UNIT,
            slot,
            a.1.unwrap_or_default(),
            b.1.unwrap_or_default(),
            self.serial().unwrap_or_default()
        )
    }
}

impl Indexed for RamModuleSpec {
    fn index(&self) -> Option<i32> {
        self.slot_index
    }
}

impl SlotEntry for RamModuleSpec {
    const UNIT: &'static str = "slot";

    fn soft_fields(&self) -> [(&'static str, Option<&str>); 2] {
        [("capacity", self.capacity.as_deref()), ("model", self.model.as_deref())]
    }

    fn serial(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }
}

impl Indexed for StorageDiskSpec {
    fn index(&self) -> Option<i32> {
        self.disk_index
    }
}

impl SlotEntry for StorageDiskSpec {
    const UNIT: &'static str = "disk";

    fn soft_fields(&self) -> [(&'static str, Option<&str>); 2] {
        [("model", self.model.as_deref()), ("size", self.size.as_deref())]
    }

    fn serial(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }
}

/// Compares every paired slot and folds all divergent slots of the family into
/// one divergence. A serial mismatch anywhere makes the whole family critical.
fn reconcile_slots<E: SlotEntry>(
    component_type: ComponentType,
    baseline: &[E],
    incoming: &[E],
) -> FamilyOutcome {
    let pairs = pair_entries(baseline, incoming);

    let mut compared = false;
    let mut identity_mismatch = false;
    let mut details = Vec::new();
    let mut old_parts = Vec::new();
    let mut new_parts = Vec::new();

    for pair in &pairs {
        let mut diffs = Vec::new();

        let soft = pair.baseline.soft_fields().into_iter().zip(pair.incoming.soft_fields());
        for ((field, old), (_, new)) in soft {
            if let Some((old, new)) = present(old, new) {
                compared = true;
                if old != new {
                    diffs.push(format!("{field} baseline {old} vs actual {new}"));
                }
            }
        }

        if let Some((old, new)) = present(pair.baseline.serial(), pair.incoming.serial()) {
            compared = true;
            if old != new {
                identity_mismatch = true;
                diffs.push(format!("serial baseline {old} vs actual {new}"));
            }
        }

        if !diffs.is_empty() {
            let basis = match pair.matched_by {
                MatchedBy::Index => "",
                MatchedBy::Position => " (matched by position)",
            };
            details.push(format!("{} {}{basis}: {}", E::UNIT, pair.slot, diffs.join(", ")));
            old_parts.push(pair.baseline.composite(pair.slot));
            new_parts.push(pair.incoming.composite(pair.slot));
        }
    }

    if !compared {
        return FamilyOutcome::Skipped;
    }
    if details.is_empty() {
        return FamilyOutcome::Consistent;
    }

    let severity = if identity_mismatch {
        Severity::Critical
    } else {
        Severity::Warning
    };
    FamilyOutcome::Drift(Divergence {
        change_type: ChangeType::Modified,
        severity,
        old_value: Some(old_parts.join(";")),
        new_value: Some(new_parts.join(";")),
        message: format!("{} mismatch: {}", component_type.label(), details.join("; ")),
    })
}

/// Diffs `snapshot` against `baseline`, family by family.
pub fn reconcile(baseline: &Baseline, snapshot: &InventorySnapshot) -> ReconcileReport {
    let families = vec![
        FamilyReport {
            component_type: ComponentType::Cpu,
            outcome: reconcile_cpu(baseline.cpu.as_ref(), snapshot.cpu.as_ref()),
        },
        FamilyReport {
            component_type: ComponentType::Gpu,
            outcome: reconcile_gpu(baseline.gpu.as_ref(), snapshot.gpu.as_ref()),
        },
        FamilyReport {
            component_type: ComponentType::Motherboard,
            outcome: reconcile_motherboard(baseline.motherboard.as_ref(), snapshot.motherboard.as_ref()),
        },
        FamilyReport {
            component_type: ComponentType::Ram,
            outcome: reconcile_slots(ComponentType::Ram, &baseline.ram, &snapshot.ram),
        },
        FamilyReport {
            component_type: ComponentType::Storage,
            outcome: reconcile_slots(ComponentType::Storage, &baseline.storage, &snapshot.storage),
        },
    ];
    ReconcileReport { families }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram(slot: Option<i32>, capacity: &str, serial: &str) -> RamModuleSpec {
        RamModuleSpec {
            slot_index: slot,
            capacity: Some(capacity.to_string()),
            serial_number: Some(serial.to_string()),
            ..Default::default()
        }
    }

    fn disk(index: Option<i32>, model: &str, serial: &str) -> StorageDiskSpec {
        StorageDiskSpec {
            disk_index: index,
            model: Some(model.to_string()),
            size: Some("512GB".to_string()),
            serial_number: Some(serial.to_string()),
            ..Default::default()
        }
    }

    fn baseline() -> Baseline {
        Baseline {
            cpu: Some(CpuSpec { model: Some("Intel i5-10400".into()), ..Default::default() }),
            gpu: Some(GpuSpec { model: Some("GTX 1650".into()) }),
            motherboard: Some(MotherboardSpec {
                model: Some("B460M".into()),
                serial_number: Some("MB-001".into()),
            }),
            ram: vec![ram(Some(0), "8GB", "R-A"), ram(Some(1), "8GB", "R-B")],
            storage: vec![disk(Some(0), "Samsung 970", "D-A")],
        }
    }

    fn matching_snapshot() -> InventorySnapshot {
        let b = baseline();
        InventorySnapshot {
            hostname: "lab-01".into(),
            cpu: b.cpu,
            gpu: b.gpu,
            motherboard: b.motherboard,
            ram: b.ram,
            storage: b.storage,
            ..Default::default()
        }
    }

    fn drift(report: &ReconcileReport, component_type: ComponentType) -> Divergence {
        match report.outcome(component_type) {
            Some(FamilyOutcome::Drift(d)) => d.clone(),
            other => panic!("expected drift for {component_type}, got {other:?}"),
        }
    }

    #[test]
    fn identical_snapshot_is_consistent_everywhere() {
        let report = reconcile(&baseline(), &matching_snapshot());
        assert!(report
            .families
            .iter()
            .all(|f| f.outcome == FamilyOutcome::Consistent));
        assert_eq!(report.drifts().count(), 0);
    }

    #[test]
    fn cpu_model_change_is_a_warning_with_both_values() {
        let mut snapshot = matching_snapshot();
        snapshot.cpu = Some(CpuSpec { model: Some("Intel i7-10700".into()), ..Default::default() });

        let d = drift(&reconcile(&baseline(), &snapshot), ComponentType::Cpu);
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.change_type, ChangeType::Mismatch);
        assert_eq!(d.old_value.as_deref(), Some("Intel i5-10400"));
        assert_eq!(d.new_value.as_deref(), Some("Intel i7-10700"));
        assert_eq!(d.message, "CPU mismatch: baseline Intel i5-10400 vs actual Intel i7-10700");
    }

    #[test]
    fn motherboard_classification_covers_all_four_cases() {
        let cases = [
            ("B460M", "MB-001", None),
            ("B460M", "MB-999", Some((ChangeType::SerialChanged, Severity::Critical))),
            ("Z490", "MB-001", Some((ChangeType::ModelChanged, Severity::Warning))),
            ("Z490", "MB-999", Some((ChangeType::Replaced, Severity::Critical))),
        ];
        for (model, serial, expected) in cases {
            let mut snapshot = matching_snapshot();
            snapshot.motherboard = Some(MotherboardSpec {
                model: Some(model.into()),
                serial_number: Some(serial.into()),
            });
            let report = reconcile(&baseline(), &snapshot);
            match expected {
                None => assert_eq!(report.outcome(ComponentType::Motherboard), Some(&FamilyOutcome::Consistent)),
                Some((change_type, severity)) => {
                    let d = drift(&report, ComponentType::Motherboard);
                    assert_eq!((d.change_type, d.severity), (change_type, severity));
                    assert_eq!(d.old_value.as_deref(), Some("B460M|MB-001"));
                    assert_eq!(d.new_value, Some(format!("{model}|{serial}")));
                }
            }
        }
    }

    #[test]
    fn motherboard_without_reported_serial_compares_model_only() {
        let mut snapshot = matching_snapshot();
        snapshot.motherboard = Some(MotherboardSpec { model: Some("B460M".into()), serial_number: None });
        assert_eq!(
            reconcile(&baseline(), &snapshot).outcome(ComponentType::Motherboard),
            Some(&FamilyOutcome::Consistent)
        );
    }

    #[test]
    fn ram_mismatches_aggregate_into_one_divergence() {
        let mut snapshot = matching_snapshot();
        snapshot.ram = vec![ram(Some(0), "16GB", "R-A"), ram(Some(1), "8GB", "R-Z")];

        let d = drift(&reconcile(&baseline(), &snapshot), ComponentType::Ram);
        assert_eq!(d.severity, Severity::Critical);
        assert_eq!(d.change_type, ChangeType::Modified);
        assert_eq!(d.new_value.as_deref(), Some("slot0=16GB||R-A;slot1=8GB||R-Z"));
        assert_eq!(d.old_value.as_deref(), Some("slot0=8GB||R-A;slot1=8GB||R-B"));
        assert_eq!(
            d.message,
            "RAM mismatch: slot 0: capacity baseline 8GB vs actual 16GB; slot 1: serial baseline R-B vs actual R-Z"
        );
    }

    #[test]
    fn soft_only_ram_change_is_a_warning() {
        let mut snapshot = matching_snapshot();
        snapshot.ram = vec![ram(Some(0), "16GB", "R-A"), ram(Some(1), "8GB", "R-B")];
        let d = drift(&reconcile(&baseline(), &snapshot), ComponentType::Ram);
        assert_eq!(d.severity, Severity::Warning);
    }

    #[test]
    fn reordered_ram_with_slot_indices_is_consistent() {
        let mut snapshot = matching_snapshot();
        snapshot.ram = vec![ram(Some(1), "8GB", "R-B"), ram(Some(0), "8GB", "R-A")];
        assert_eq!(
            reconcile(&baseline(), &snapshot).outcome(ComponentType::Ram),
            Some(&FamilyOutcome::Consistent)
        );
    }

    #[test]
    fn reordered_ram_without_slot_indices_matches_by_position() {
        let mut snapshot = matching_snapshot();
        snapshot.ram = vec![ram(None, "8GB", "R-B"), ram(None, "8GB", "R-A")];
        let d = drift(&reconcile(&baseline(), &snapshot), ComponentType::Ram);
        assert_eq!(d.severity, Severity::Critical);
        assert_eq!(
            d.message,
            "RAM mismatch: slot 0 (matched by position): serial baseline R-A vs actual R-B; \
             slot 1 (matched by position): serial baseline R-B vs actual R-A"
        );
    }

    #[test]
    fn serial_mismatch_escalates_only_its_own_family() {
        let mut snapshot = matching_snapshot();
        snapshot.cpu = Some(CpuSpec { model: Some("Intel i7-10700".into()), ..Default::default() });
        snapshot.storage = vec![disk(Some(0), "Samsung 970", "D-Z")];

        let report = reconcile(&baseline(), &snapshot);
        assert_eq!(drift(&report, ComponentType::Cpu).severity, Severity::Warning);
        let storage = drift(&report, ComponentType::Storage);
        assert_eq!(storage.severity, Severity::Critical);
        assert_eq!(storage.new_value.as_deref(), Some("disk0=Samsung 970|512GB|D-Z"));
    }

    #[test]
    fn absent_families_are_skipped() {
        let snapshot = InventorySnapshot { hostname: "lab-01".into(), ..Default::default() };
        let report = reconcile(&baseline(), &snapshot);
        assert!(report.families.iter().all(|f| f.outcome == FamilyOutcome::Skipped));

        let report = reconcile(&Baseline::default(), &matching_snapshot());
        assert!(report.families.iter().all(|f| f.outcome == FamilyOutcome::Skipped));
    }
}

// Algebraic properties of identifier formatting and scenario comparison.

use geo::{coord, MultiPolygon, Rect};
use proptest::prelude::*;
use redistrict::{
    compare_scenarios, deformat_electorate_id, format_electorate_id, AssignmentRecord,
    ComparisonRequest, Crs, ElectorateId, Meshblock, MeshblockLayer, MeshblockNumber, ScenarioId,
    ScenarioRegistry, Settings, Task, TaskControl,
};

fn task() -> impl Strategy<Value = Task> {
    prop_oneof![Just(Task::GeneralNorth), Just(Task::GeneralSouth), Just(Task::Maori)]
}

proptest! {
    #[test]
    fn deformat_inverts_format(id in 1u32..10_000, task in task()) {
        let formatted = format_electorate_id(&id.to_string(), task);
        prop_assert!(formatted.starts_with(task.letter()));
        prop_assert_eq!(deformat_electorate_id(&formatted).unwrap(), id.to_string());
    }

    #[test]
    fn format_is_idempotent(id in 1u32..10_000, task in task()) {
        let once = format_electorate_id(&id.to_string(), task);
        prop_assert_eq!(format_electorate_id(&once, task), once);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn changed_set_is_symmetric(pairs in proptest::collection::vec((1i64..6, 1i64..6), 1..8)) {
        let meshblocks = MeshblockLayer::new(Crs::NZTM, (0..pairs.len())
            .map(|i| {
                let x = 2.0 * i as f64;
                let shape = MultiPolygon(vec![Rect::new(coord! { x: x, y: 0.0 }, coord! { x: x + 1.0, y: 1.0 }).to_polygon()]);
                Meshblock::new(MeshblockNumber(100 + i as u32), shape)
            })
            .collect()
        ).unwrap();

        let mut rows = Vec::new();
        for (i, &(a, b)) in pairs.iter().enumerate() {
            let number = MeshblockNumber(100 + i as u32);
            rows.push(AssignmentRecord::new(ScenarioId(1), number).with_electorate(Task::Maori, ElectorateId(a)));
            rows.push(AssignmentRecord::new(ScenarioId(2), number).with_electorate(Task::Maori, ElectorateId(b)));
        }
        let registry = ScenarioRegistry::from_parts(
            [(ScenarioId(1), "A".to_string()), (ScenarioId(2), "B".to_string())],
            rows,
        ).unwrap();

        let run = |base: i64, secondary: i64| compare_scenarios(
            &registry,
            &meshblocks,
            ComparisonRequest { task: Task::Maori, base_scenario: ScenarioId(base), secondary_scenario: ScenarioId(secondary), extent: None },
            &Settings::default(),
            &TaskControl::new(),
        ).unwrap();

        let forward = run(1, 2);
        let backward = run(2, 1);
        prop_assert_eq!(&forward.changed, &backward.changed);
        prop_assert_eq!(forward.changed.len(), pairs.iter().filter(|(a, b)| a != b).count());

        for record in &forward.changed_meshblocks {
            let mirrored = backward.changed_meshblocks.iter()
                .find(|other| other.meshblock_number == record.meshblock_number)
                .unwrap();
            prop_assert_eq!(&mirrored.previous_electorate, &record.new_electorate);
            prop_assert_eq!(&mirrored.new_electorate, &record.previous_electorate);
        }
    }
}

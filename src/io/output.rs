use std::{fs::File, io::{BufWriter, Write}, path::Path};

use serde_json::{json, Map, Value};

use crate::{compare::ComparisonOutput, error::Result, io::geojson::feature_collection, types::MeshblockNumber};

fn properties(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Map<String, Value> {
    pairs.into_iter().map(|(key, value)| (key.to_string(), value)).collect()
}

fn formatted(numbers: &[MeshblockNumber]) -> Vec<String> {
    numbers.iter().map(MeshblockNumber::formatted).collect()
}

/// JSON document for a comparison: changed meshblocks and changed areas
/// as feature collections, plus the concordance and bookkeeping lists.
pub fn comparison_to_json(output: &ComparisonOutput) -> Value {
    let meshblocks = feature_collection(output.changed_meshblocks.iter().map(|record| (
        properties([
            ("meshblock_number", json!(record.meshblock_number)),
            ("previous_electorate_id", json!(record.previous_electorate_id)),
            ("new_electorate_id", json!(record.new_electorate_id)),
            ("previous_electorate", json!(record.previous_electorate)),
            ("new_electorate", json!(record.new_electorate)),
            ("dummy_electorate", json!(record.dummy_electorate)),
        ]),
        Some(&record.geometry),
    )));

    let areas = feature_collection(output.changed_areas.iter().map(|area| (
        properties([
            ("dummy_electorate_id", json!(area.dummy_electorate_id)),
            ("previous_electorate", json!(area.previous_electorate)),
            ("new_electorate", json!(area.new_electorate)),
            ("current_population", json!(area.current_population)),
            ("variance_year_1", json!(area.variance_year_1)),
            ("variance_year_2", json!(area.variance_year_2)),
        ]),
        Some(&area.geometry),
    )));

    json!({
        "task": output.task,
        "changed_meshblocks": meshblocks,
        "changed_areas": areas,
        "concordance": output.concordance,
        "dummy_electorates": output.dummy_electorates,
        "unassigned": formatted(&output.unassigned),
        "skipped": formatted(&output.skipped),
    })
}

/// Write [`comparison_to_json`] to `path`.
pub fn write_comparison(path: &Path, output: &ComparisonOutput) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &comparison_to_json(output))?;
    writer.flush()?;
    Ok(())
}
